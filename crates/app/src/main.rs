use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "legible", version, about = "OCR documents and extract invoice fields")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: normalize, recognize, extract, report.
    Process {
        /// Image to process.
        image: PathBuf,
        /// TOML config file; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip document preprocessing even if the config enables it.
        #[arg(long)]
        no_preprocess: bool,
        /// Keep the engine's line breaks in dense-text transcripts.
        #[arg(long)]
        preserve_orientation: bool,
        /// Print the result as JSON instead of plain text.
        #[arg(long)]
        json: bool,
        /// Write the word-boxed visualization image here.
        #[arg(long)]
        annotate: Option<PathBuf>,
        /// Write the plain-text transcript here.
        #[arg(long)]
        transcript: Option<PathBuf>,
        /// Directory for intermediate artifacts (default: alongside the input).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Run only the document preprocessing pipeline and save the result.
    Normalize {
        /// Image to normalize.
        image: PathBuf,
        /// Where to write the normalized PNG.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 1)]
        noise_iterations: u32,
        #[arg(long, default_value_t = 2)]
        thicken_iterations: u32,
    },
    /// Extract invoice fields from an existing transcript file.
    Extract {
        /// Plain-text transcript to scan.
        textfile: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Process {
            image,
            config,
            no_preprocess,
            preserve_orientation,
            json,
            annotate,
            transcript,
            output_dir,
        } => {
            commands::process(commands::ProcessArgs {
                image,
                config,
                no_preprocess,
                preserve_orientation,
                json,
                annotate,
                transcript,
                output_dir,
            })
            .await
        }
        Command::Normalize { image, output, noise_iterations, thicken_iterations } => {
            commands::normalize(&image, &output, noise_iterations, thicken_iterations)
        }
        Command::Extract { textfile } => commands::extract(&textfile),
    }
}
