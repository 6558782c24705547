//! platewise: analyze a meal photo or description from the command line.
//!
//! Prints JSON to stdout.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;

use platewise::{
    Config, FoodInput, ImageData, MealAnalyzer, PlatewiseBuilder, PlatewiseError, Secrets,
};

/// Meal nutrition analysis
#[derive(Parser)]
#[command(name = "platewise")]
#[command(version)]
#[command(about = "Estimate calories and macros for a meal")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify a meal and resolve its nutrition
    Analyze {
        /// Meal photo (jpeg, png, webp, heic)
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Meal description, or extra context for the photo
        #[arg(short, long)]
        text: Option<String>,
        /// Print the fixed placeholder record instead of "unresolved"
        #[arg(long)]
        placeholder: bool,
    },

    /// Identify a meal without looking up nutrition
    Identify {
        #[arg(short, long)]
        image: Option<PathBuf>,
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Resolve nutrition for a known description and ingredient list
    Resolve {
        /// Meal description
        description: String,
        /// Ingredient line (repeatable)
        #[arg(short = 'g', long = "ingredient")]
        ingredients: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;
    let analyzer = build_analyzer(&config, &secrets)?;

    match args.command {
        Command::Analyze {
            image,
            text,
            placeholder,
        } => {
            let input = food_input(image.as_deref(), text).await?;
            let analysis = analyzer.analyze(&input).await?;
            if placeholder && !analysis.nutrition.is_resolved() {
                let record = analysis.nutrition.record_or_placeholder();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "identification": analysis.identification,
                        "nutrition": record,
                        "placeholder": true,
                    }))?
                );
            } else {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            }
        }
        Command::Identify { image, text } => {
            let input = food_input(image.as_deref(), text).await?;
            let identification = analyzer.identify(&input).await?;
            println!("{}", serde_json::to_string_pretty(&identification)?);
        }
        Command::Resolve {
            description,
            ingredients,
        } => {
            let resolved = analyzer.resolve(&ingredients, &description).await?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
    }

    Ok(())
}

fn build_analyzer(config: &Config, secrets: &Secrets) -> Result<MealAnalyzer, PlatewiseError> {
    PlatewiseBuilder::from_config(config, secrets)?.build()
}

/// Read the optional image and combine it with the optional text.
async fn food_input(image: Option<&Path>, text: Option<String>) -> Result<FoodInput, PlatewiseError> {
    let image = match image {
        Some(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                PlatewiseError::InvalidInput(format!("cannot read image {path:?}: {e}"))
            })?;
            let mime = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(ImageData::mime_for_extension)
                .unwrap_or("image/jpeg");
            debug!(bytes = bytes.len(), mime, "image loaded");
            Some(ImageData::from_bytes(mime, &bytes))
        }
        None => None,
    };

    Ok(FoodInput { image, text })
}
