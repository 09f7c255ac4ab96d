use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};
use std::process::Command;

pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .or_else(|| {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home).join(".config")
            })
        })
        .map(|dir| dir.join(PathBuf::from("apod-desktop")))
        .ok_or_else(|| Error::Config(
            "Could not find config directory. Please set HOME or XDG_CONFIG_HOME environment variable.".to_string()
        ))?;

    if !config_dir.exists() {
        create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Directory holding the running executable, or the working directory if
/// that cannot be determined. May be relative; the cache resolves it.
pub fn get_program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Writes image bytes to `path`, creating or truncating the file.
pub fn save_image(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            create_dir_all(parent)?;
        }
    }
    write(path, bytes)?;
    Ok(())
}

/// SHA-256 of the content, lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Builds a cache file name from an APOD title and the URL it was downloaded from.
///
/// Whitespace-separated words are joined with a single underscore, every character
/// other than letters, digits and underscores is dropped, and the URL's extension
/// is kept as is.
pub fn apod_file_name(title: &str, image_url: &str) -> String {
    let stem: String = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let stem = if stem.is_empty() { "apod".to_string() } else { stem };

    match url_extension(image_url) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let path = match path.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p)?,
        None => path,
    };
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    let (name, ext) = last_segment.rsplit_once('.')?;
    if name.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

/// Size of `(width, height)` scaled to fit inside `max`, keeping the aspect ratio.
///
/// The ratio is not clamped, so images smaller than `max` are scaled up.
pub fn scale_to_fit(size: (u32, u32), max: (u32, u32)) -> (u32, u32) {
    let (width, height) = size;
    if width == 0 || height == 0 {
        return (0, 0);
    }

    let ratio = f64::min(
        max.0 as f64 / width as f64,
        max.1 as f64 / height as f64,
    );
    (
        (width as f64 * ratio).floor() as u32,
        (height as f64 * ratio).floor() as u32,
    )
}

#[cfg(feature = "gui")]
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    Ok(image::image_dimensions(path)?)
}

#[cfg(any(feature = "cli", feature = "gui"))]
pub fn send_notification(title: &str, message: &str, image: Option<&Path>) -> Result<()> {
    let mut notification = notify_rust::Notification::new();
    notification.summary(title).body(message);

    if let Some(image_path) = image {
        notification.image_path(image_path.to_string_lossy().as_ref());
    }

    notification
        .show()
        .map_err(|e| Error::DesktopEnv(e.to_string()))?;
    Ok(())
}
