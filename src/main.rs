use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use grbac_gen::config::{parse_extensions, Config};
use grbac_gen::{generate, policy};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate RBAC permissions from route annotations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan sources for route annotations and write the policy file
    Generate {
        /// Root directory to scan
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Output policy file
        #[arg(long)]
        out: Option<PathBuf>,
        /// Host assigned to permissions without one
        #[arg(long)]
        host: Option<String>,
        /// File extensions to scan, comma separated or repeated
        #[arg(long = "ext")]
        extensions: Vec<String>,
        /// Fail on the first unparsable annotation
        #[arg(long)]
        strict: bool,
    },
    /// Validate an existing policy file
    Check { file: PathBuf },
}

fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            dir,
            out,
            host,
            extensions,
            strict,
        } => {
            let mut config = Config::from_env().context("invalid configuration")?;
            if let Some(dir) = dir {
                config.source_dir = dir;
            }
            if let Some(out) = out {
                config.output = out;
            }
            if let Some(host) = host {
                config.default_host = host;
            }
            let extensions: Vec<String> = extensions.iter().flat_map(|e| parse_extensions(e)).collect();
            if !extensions.is_empty() {
                config.extensions = extensions;
            }
            config.strict |= strict;

            let report = generate::run(&config)
                .with_context(|| format!("failed to generate policy from {}", config.source_dir.display()))?;

            tracing::info!(
                scanned = report.scanned,
                parsed = report.parsed,
                skipped = ?report.skipped,
                permissions = report.docs.len(),
                "generation finished"
            );
            println!("Wrote {} permissions to {}", report.docs.len(), config.output.display());
        }
        Commands::Check { file } => {
            let docs = policy::read_policy(&file)
                .with_context(|| format!("invalid policy file {}", file.display()))?;
            println!("{} permissions OK", docs.len());
        }
    }

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
