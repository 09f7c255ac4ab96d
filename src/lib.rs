pub mod apod;
pub mod cache;
pub mod config;
pub mod desktop;
pub mod utils;

#[cfg(feature = "gui")]
pub mod gui;

#[cfg(feature = "cli")]
pub use apod::ApodClient;
pub use apod::{ApodInfo, ApodSource, MediaKind};
pub use cache::{ApodDisplayInfo, CacheConfig, CacheManager};
pub use config::ApodConfig;
pub use desktop::WallpaperManager;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to fetch APOD metadata for {date}: {status}")]
    FetchFailed { date: String, status: String },
    #[error("Failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Failed to initialize image cache: {0}")]
    StoreInitFailed(String),
    #[error("APOD for {0} is already cached")]
    AlreadyCached(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[cfg(feature = "cli")]
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Desktop environment error: {0}")]
    DesktopEnv(String),
    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(feature = "gui")]
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
