/*!
blockdash Command Line Interface

Renders dashboards from a catalog against a SQLite database, and shows the
SQL, fields and sources a catalog declares.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use blockdash::reader::data::{load_sample_data, SAMPLE_CATALOG};
use blockdash::reader::SqliteReader;
use blockdash::{Catalog, Dashboard, LayoutKind, Preferences, Viewer, VERSION};

#[derive(Parser)]
#[command(name = "blockdash")]
#[command(about = "Declarative dashboards over SQL")]
#[command(version = VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by commands that work on one data source
#[derive(clap::Args)]
pub struct SourceArgs {
    /// Data source id
    source: String,

    /// Catalog JSON file (defaults to the bundled demo catalog)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Preferences as a JSON object
    #[arg(long)]
    prefs: Option<String>,

    /// Preferences JSON file
    #[arg(long, conflicts_with = "prefs")]
    prefs_file: Option<PathBuf>,

    /// Override the layout (table, cards, accordion)
    #[arg(long)]
    layout: Option<LayoutKind>,

    /// Zero-based page to show
    #[arg(long)]
    page: Option<u64>,

    /// Rows per page (0 = all)
    #[arg(long)]
    per_page: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a dashboard and print the outcome as JSON
    Render {
        #[command(flatten)]
        args: SourceArgs,

        /// Database connection string
        #[arg(long, default_value = "sqlite://memory")]
        reader: String,

        /// Load the bundled sample tables into the database first
        #[arg(long)]
        sample: bool,

        /// Show error details in the outcome
        #[arg(long)]
        privileged: bool,

        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the data and count SQL a dashboard would run
    Sql {
        #[command(flatten)]
        args: SourceArgs,
    },

    /// List the field definitions of a catalog
    Fields {
        /// Catalog JSON file (defaults to the bundled demo catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// List the data sources of a catalog
    Sources {
        /// Catalog JSON file (defaults to the bundled demo catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog {}", path.display()))?;
            Ok(Catalog::from_json(&json)?)
        }
        None => Ok(Catalog::from_json(SAMPLE_CATALOG)?),
    }
}

fn load_preferences(args: &SourceArgs) -> anyhow::Result<Preferences> {
    let mut prefs = match (&args.prefs, &args.prefs_file) {
        (Some(json), _) => Preferences::from_json(json)?,
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read preferences {}", path.display()))?;
            Preferences::from_json(&json)?
        }
        (None, None) => Preferences::default(),
    };
    if let Some(layout) = args.layout {
        prefs.layout = Some(layout);
    }
    if let Some(page) = args.page {
        prefs.current_page = page;
    }
    if let Some(per_page) = args.per_page {
        prefs.per_page = per_page;
    }
    Ok(prefs)
}

fn emit(json: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
            eprintln!("Output written to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            args,
            reader,
            sample,
            privileged,
            output,
        } => {
            let catalog = load_catalog(args.catalog.as_deref())?;
            let source = catalog
                .source(&args.source)
                .with_context(|| format!("Unknown data source '{}'", args.source))?;
            let prefs = load_preferences(&args)?;

            let reader = SqliteReader::from_connection_string(&reader)?;
            if sample {
                load_sample_data(&reader)?;
            }

            let outcome = Dashboard::new(&catalog, source, prefs)
                .render_safely(&reader, Viewer { privileged });
            let json = serde_json::to_string_pretty(&outcome)?;
            emit(&json, output.as_deref())?;

            if !outcome.is_rendered() {
                std::process::exit(1);
            }
        }

        Commands::Sql { args } => {
            let catalog = load_catalog(args.catalog.as_deref())?;
            let source = catalog
                .source(&args.source)
                .with_context(|| format!("Unknown data source '{}'", args.source))?;
            let prefs = load_preferences(&args)?;

            let composed = Dashboard::new(&catalog, source, prefs).compose()?;
            println!("-- data\n{}\n", composed.sql);
            println!("-- count\n{}\n", composed.count_sql);
            println!("-- params\n{}", serde_json::to_string_pretty(&composed.params)?);
        }

        Commands::Fields { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            for field in catalog.fields().get_all() {
                let attributes: Vec<String> = field
                    .attributes()
                    .iter()
                    .map(|a| a.attribute_kind().to_string())
                    .collect();
                println!(
                    "{:<20} {:<40} {:<20} {}{}",
                    field.name(),
                    field.select(),
                    field.title(),
                    if field.is_visible() { "visible" } else { "hidden" },
                    if attributes.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", attributes.join(", "))
                    }
                );
            }
        }

        Commands::Sources { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            for source in catalog.sources() {
                println!(
                    "{:<16} {:<24} layout={} fields={} filters={}",
                    source.id,
                    source.title(),
                    source.layout,
                    source.fields.len(),
                    source.filters.len()
                );
            }
        }
    }

    Ok(())
}
