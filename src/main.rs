use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;

use apod_desktop::{
    apod::parse_apod_date, desktop::set_desktop_background, ApodClient, ApodConfig,
    ApodDisplayInfo, ApodSource, CacheManager,
};

#[derive(Parser)]
#[command(name = "apod-desktop")]
#[command(
    version,
    about = "Downloads NASA's Astronomy Picture of the Day for a date, caches it and sets it as the desktop background."
)]
pub struct Args {
    #[arg(
        value_parser = parse_date_arg,
        help = "APOD date (YYYY-MM-DD), defaults to today"
    )]
    date: Option<NaiveDate>,
    #[arg(
        short,
        long,
        help = "Directory the image cache is created in (will be saved in config if used once)"
    )]
    parent: Option<PathBuf>,
    #[arg(long, help = "Only cache the APOD, leave the desktop background alone")]
    no_wallpaper: bool,
    #[arg(short, long, help = "List all cached APODs and exit")]
    list: bool,
}

fn parse_date_arg(input: &str) -> Result<NaiveDate, String> {
    parse_apod_date(input, Local::now().date_naive()).map_err(|e| e.to_string())
}

/// Caches the APOD for `date` and looks up what to show for it. Failures are
/// reported on stderr and leave the rest of the run to be skipped.
fn cache_apod<S: ApodSource>(
    rt: &tokio::runtime::Runtime,
    cache: &CacheManager<S>,
    date: NaiveDate,
) -> Option<ApodDisplayInfo> {
    let cached = rt
        .block_on(cache.ensure_cached(date))
        .and_then(|id| cache.display_info(id));
    match cached {
        Ok(apod) => Some(apod),
        Err(e) => {
            eprintln!("Failed to cache APOD for {}: {}", date, e);
            None
        }
    }
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
    let mut config = ApodConfig::load_or_default()?;

    let parent = args.parent.clone().unwrap_or_else(|| config.cache_parent.clone());
    let parent = std::path::absolute(&parent)?;
    let cache = CacheManager::initialize(&parent, ApodClient::from_config(&config))?;

    if args.parent.is_some() && config.cache_parent != parent {
        config.cache_parent = parent;
        config.save()?;
    }

    if args.list {
        for record in cache.all_records()? {
            println!("{}  {}", record.date, record.title);
        }
        return Ok(());
    }

    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    println!("APOD date: {}", date);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let Some(apod) = cache_apod(&rt, &cache, date) else {
        return Ok(());
    };

    println!("APOD title: {}", apod.title);
    println!("APOD file: {}", apod.file_path.display());
    println!();
    println!("{}", apod.explanation);

    if config.set_wallpaper && !args.no_wallpaper {
        if let Err(e) = set_desktop_background(&apod.file_path) {
            eprintln!("Could not set desktop background: {}", e);
        }
    }

    Ok(())
}
