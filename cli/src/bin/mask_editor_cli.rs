use clap::{Parser, Subcommand, ValueEnum};
use cli::EditScript;
use color_eyre::eyre::Result;
use mask_editor::{
    EditSubject, EditorCommand, EditorConfig, EditorSession, FileSaveHandler, Outcome, ToolKind,
    UrlFetcher,
};
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an edit script against an original/processed pair and save the result
    Apply {
        /// Original (pre-removal) image: local path, file:// or http(s) URL
        #[arg(long)]
        original: String,
        /// Processed (background-removed) image: local path, file:// or http(s) URL
        #[arg(long)]
        processed: String,
        /// Edit script (.toml or .json)
        #[arg(short, long)]
        script: PathBuf,
        /// Where to write the edited PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Editor configuration (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print a JSON schema
    Schema {
        #[arg(value_enum, default_value = "commands")]
        target: SchemaTarget,
    },
    /// List the available tools
    Tools,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaTarget {
    Config,
    Commands,
    Script,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Apply { original, processed, script, output, config } => {
            apply_script(original, processed, script, output, config.as_deref()).await?;
        }
        Commands::Schema { target } => {
            let schema = match target {
                SchemaTarget::Config => serde_json::to_string_pretty(&EditorConfig::schema())?,
                SchemaTarget::Commands => serde_json::to_string_pretty(&EditorCommand::schema())?,
                SchemaTarget::Script => serde_json::to_string_pretty(&EditScript::schema())?,
            };
            println!("{schema}");
        }
        Commands::Tools => {
            for tool in ToolKind::iter() {
                println!("{tool}");
            }
        }
    }

    Ok(())
}

async fn apply_script(
    original: &str,
    processed: &str,
    script_path: &Path,
    output: &Path,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => EditorConfig::from_file(path)?,
        None => EditorConfig::default(),
    };
    config.validate()?;

    let script = EditScript::from_file(script_path)?;
    let subject = script.subject.clone().unwrap_or_else(|| EditSubject::Wardrobe {
        item_id: output
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "edit".to_string()),
    });
    info!("Replaying {} steps for {}", script.steps.len(), subject.id());

    let mut session = EditorSession::new(UrlFetcher::new(), original, processed, subject, config);
    let editor = session.load().await?;
    if let Some(view) = script.view {
        editor.set_view_size(view.width, view.height);
    }

    let mut commits = 0;
    for (i, step) in script.steps.into_iter().enumerate() {
        let name = step.to_string();
        match editor.execute(step) {
            Outcome::Committed => commits += 1,
            Outcome::Ignored => warn!("Step {} ({}) had no effect", i + 1, name),
            outcome => debug!("Step {} ({}) -> {:?}", i + 1, name, outcome),
        }
    }
    if editor.is_busy() {
        warn!("Script ended mid-gesture; finishing it");
        if editor.execute(EditorCommand::PointerUp) == Outcome::Committed {
            commits += 1;
        }
    }
    info!("{} actions committed, {} undo steps available", commits, editor.history().index());

    session.save(&FileSaveHandler::new(output)).await?;
    info!("✅ Saved edited image to {:?}", output);
    Ok(())
}
