use clap::{Parser, Subcommand};
use mediashelf::config::{self, ServerConfig};
use mediashelf::library::MediaLibrary;
use mediashelf::media::MediaKind;
use mediashelf::watcher::ChangeWatcher;
use mediashelf::{output, server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "mediashelf")]
#[command(about = "Serve music, images and documents on the local network")]
#[command(long_about = "\
Serve music, images and documents on the local network

One directory per kind, each indexed into an in-memory collection that is
rebuilt whenever files change:

  media/
  ├── music/          # mp3, m4a, flac, ogg, wav → title, artist, lyrics, duration
  ├── images/         # jpg, png, gif, webp, tiff → title, caption, size, date taken
  ├── documents/      # anything else → size and type
  └── thumbnails/     # generated: <image filename>.jpg

Image metadata resolution (first available wins):
  Title:    IPTC object name → EXIF XP title → EXIF document name → filename
  Caption:  IPTC caption → EXIF XP comment → EXIF description → \"\"
  Taken:    EXIF original date → EXIF date → file modification time

Run 'mediashelf gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Media root, overriding `library.root` from the config
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index all collections, watch for changes and serve over HTTP
    Serve,
    /// Scan one collection and print it
    List {
        /// music, images or documents
        kind: MediaKind,
    },
    /// Rebuild all collections once and print the counts
    Refresh,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    init_tracing();
    let mut config = config::load_config(&cli.config)?;
    if let Some(root) = cli.root {
        config.library.root = root;
    }
    init_thread_pool(&config.processing);

    match cli.command {
        Command::Serve => serve(config)?,
        Command::List { kind } => {
            let library = MediaLibrary::new(&config);
            let collection = library.list_collection(kind);
            output::print_collection(kind, &collection);
        }
        Command::Refresh => {
            let library = MediaLibrary::new(&config);
            let counts = library.force_refresh();
            output::print_refresh_counts(&counts);
        }
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let library = Arc::new(MediaLibrary::new(&config));
    library.force_refresh();

    let _watcher = if config.watcher.enabled {
        let roots: Vec<_> = MediaKind::ALL
            .into_iter()
            .map(|kind| (library.dir(kind).to_path_buf(), kind))
            .collect();
        let on_change = Arc::clone(&library);
        match ChangeWatcher::start(
            &roots,
            library.classifier().clone(),
            config.watcher.debounce(),
            move || {
                on_change.force_refresh();
            },
        ) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(error = %e, "change watching unavailable, use /api/refresh instead");
                None
            }
        }
    } else {
        None
    };

    let app = server::router(library);
    let address = config.server.address();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&address).await?;
        info!(%address, "listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutting down");
            })
            .await
    })?;

    Ok(())
}
