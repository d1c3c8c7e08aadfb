//! modforge: scaffold module definitions and generate their sources
//!
//! Subcommands:
//! - `init`: write a fresh `module.json`
//! - `scaffold`: interactive model editor backed by a SQL schema dump
//! - `generate`: render backend and frontend files for a module
//! - `discover`: list every module definition under a set of roots
//! - `query`: filter the models of a module by dot-path predicates
//! - `show`: print the models of a module

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod error;
mod schema;
mod session;

#[derive(Parser, Debug)]
#[command(name = "modforge")]
#[command(about = "Scaffold module definitions and generate PHP/TypeScript sources")]
struct Args {
    /// Project configuration file
    #[arg(short, long, global = true, default_value = modforge_gen::config::CONFIG_FILE)]
    config: PathBuf,

    /// Override `modules_path` from the configuration
    #[arg(long, global = true)]
    modules_path: Option<PathBuf>,

    /// Coerce unknown field types to `string` while loading
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create `<modules_path>/<MODULE>/module.json`
    Init {
        module: String,
        /// Replace an existing definition
        #[arg(long)]
        force: bool,
    },

    /// Interactively add models from a SQL schema file
    Scaffold {
        module: String,
        /// File with `CREATE TABLE` statements
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Generate files for the models of a module
    Generate {
        module: String,
        /// Only these model keys (all models when omitted)
        #[arg(short, long = "model")]
        models: Vec<String>,
        /// Overwrite existing files instead of keeping or patching them
        #[arg(long)]
        force: bool,
        /// Report what would be written without touching the disk
        #[arg(long)]
        dry_run: bool,
    },

    /// Find and load every module definition below the given roots
    Discover {
        #[arg(default_value = ".")]
        roots: Vec<PathBuf>,
        /// File name patterns (defaults from the configuration)
        #[arg(short, long = "pattern")]
        patterns: Vec<String>,
        /// throw, skip or suffix
        #[arg(long)]
        on_duplicate: Option<modforge_gen::DuplicatePolicy>,
        /// Report unreadable files and continue
        #[arg(long)]
        keep_going: bool,
    },

    /// List models matching every `--where "<path> <op> <value>"`
    Query {
        module: String,
        #[arg(short, long = "where")]
        predicates: Vec<String>,
    },

    /// Print the models of a module
    Show { module: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = modforge_gen::ProjectConfig::load_or_default(&args.config)?;
    if let Some(path) = args.modules_path {
        config.modules_path = path;
    }
    if args.lenient {
        config.lenient_field_types = true;
    }

    match args.command {
        Command::Init { module, force } => {
            commands::init(&config, &module, force)?;
        }
        Command::Scaffold { module, schema } => commands::scaffold(&config, &module, &schema)?,
        Command::Generate {
            module,
            models,
            force,
            dry_run,
        } => {
            let files = commands::generate(&config, &module, &models, force, dry_run)?;
            for file in &files {
                println!("{:>11}  {}", file.action.to_string(), file.path.display());
            }
            eprintln!(
                "{} {} file(s) for module {}",
                if dry_run { "Would write" } else { "Processed" },
                files.len(),
                module
            );
        }
        Command::Discover {
            roots,
            patterns,
            on_duplicate,
            keep_going,
        } => {
            let policy = on_duplicate.unwrap_or(config.discovery.on_duplicate);
            let modules = commands::discover(&config, &roots, &patterns, policy, keep_going)?;
            let rows: Vec<Vec<String>> = modules
                .iter()
                .map(|(name, module)| {
                    vec![
                        name.clone(),
                        module.models().count().to_string(),
                        module
                            .source_path()
                            .map(|p| p.display().to_string())
                            .unwrap_or_default(),
                    ]
                })
                .collect();
            println!("{}", session::format_table(&["module", "models", "path"], &rows));
        }
        Command::Query { module, predicates } => {
            for key in commands::query(&config, &module, &predicates)? {
                println!("{key}");
            }
        }
        Command::Show { module } => {
            let store = commands::open(&config, &module)?;
            println!("{}", session::format_table(&session::MODEL_HEADERS, &session::model_rows(&store)));
        }
    }

    Ok(())
}
