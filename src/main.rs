//! CLI entry point for spacetraveling

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::Spacetraveling;

#[derive(Parser)]
#[command(name = "spacetraveling")]
#[command(author = "Yukang Chen")]
#[command(version = "0.1.0")]
#[command(about = "A static blog generator backed by a headless CMS", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new site
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        folder: PathBuf,
    },

    /// Generate static files
    #[command(alias = "g")]
    Generate {
        /// Regenerate every article, fresh or not
        #[arg(short, long)]
        force: bool,
    },

    /// Start a local server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Serve the existing output without generating first
        #[arg(long)]
        r#static: bool,
    },

    /// Clean the public folder and render manifest
    Clean,

    /// List posts
    List {
        /// Follow every page instead of only the first
        #[arg(short, long)]
        all: bool,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "spacetraveling=debug,info"
    } else {
        "spacetraveling=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    // Content-service credentials may live in a .env file
    match dotenvy::from_path(base_dir.join(".env")) {
        Ok(()) => tracing::debug!("Loaded .env from {:?}", base_dir),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to read .env: {}", e),
    }

    match cli.command {
        Commands::Init { folder } => {
            let target_dir = if folder.is_absolute() {
                folder
            } else {
                base_dir.join(folder)
            };
            tracing::info!("Initializing site in {:?}", target_dir);
            spacetraveling::commands::init::init_site(&target_dir)?;
            println!("Initialized site in {:?}", target_dir);
        }

        Commands::Generate { force } => {
            let app = Spacetraveling::new(&base_dir)?;
            tracing::info!("Generating static files...");
            let summary = spacetraveling::commands::generate::run(&app, force).await?;
            println!(
                "Generated successfully! ({} written, {} up to date)",
                summary.written, summary.fresh
            );
        }

        Commands::Server {
            port,
            ip,
            open,
            r#static,
        } => {
            let app = Spacetraveling::new(&base_dir)?;
            let source = Arc::new(app.client()?);

            if !r#static {
                tracing::info!("Generating static files...");
                spacetraveling::commands::generate::run_with_source(&app, source.clone(), false)
                    .await?;
            }

            tracing::info!("Starting server at http://{}:{}", ip, port);
            spacetraveling::server::start(&app, source, &ip, port, open).await?;
        }

        Commands::Clean => {
            let app = Spacetraveling::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            app.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { all } => {
            let app = Spacetraveling::new(&base_dir)?;
            spacetraveling::commands::list::run(&app, all).await?;
        }

        Commands::Version => {
            println!("spacetraveling version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
