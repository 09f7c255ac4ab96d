use apod_desktop::{cache::CacheReader, gui, ApodConfig};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apod-viewer")]
#[command(
    version,
    about = "APOD Viewer, a GUI to browse the APOD images in the local cache."
)]
struct Args {
    #[arg(
        short,
        long,
        help = "Directory containing the image cache (defaults to the configured one)"
    )]
    parent: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ApodConfig::load_or_default()?;
    let parent = args.parent.unwrap_or(config.cache_parent);

    let cache = CacheReader::initialize(&parent, ())?;
    gui::run_viewer(cache, &config.theme)?;
    Ok(())
}
