use crate::{Error, Result};
use std::path::Path;
use tracing::info;

pub mod hyprland;
pub mod plasma;

pub trait WallpaperManager {
    fn name(&self) -> &'static str;
    fn set_wallpaper(&self, path: &Path) -> Result<()>;
    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()>;
}

pub fn get_wallpaper_manager() -> Result<Box<dyn WallpaperManager>> {
    if !cfg!(target_os = "linux") {
        return Err(Error::DesktopEnv(
            "Setting the desktop background is not supported on this platform".to_string(),
        ));
    }

    let desktop = std::env::var("XDG_CURRENT_DESKTOP").unwrap_or_default();

    match desktop.to_lowercase().as_str() {
        "hyprland" => Ok(Box::new(hyprland::HyprlandManager::new()?)),
        "kde" | "plasma" => Ok(Box::new(plasma::PlasmaManager::new()?)),
        _ => {
            if hyprland::HyprlandManager::is_available() {
                Ok(Box::new(hyprland::HyprlandManager::new()?))
            } else if plasma::PlasmaManager::is_available() {
                Ok(Box::new(plasma::PlasmaManager::new()?))
            } else {
                Err(Error::DesktopEnv(
                    "No supported desktop environment found".to_string(),
                ))
            }
        }
    }
}

/// Sets `path` as the desktop background with whichever backend is available.
pub fn set_desktop_background(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(Error::NotFound(format!("image file {}", path.display())));
    }

    let manager = get_wallpaper_manager()?;
    manager.set_wallpaper(path)?;
    info!(backend = manager.name(), path = %path.display(), "desktop background updated");

    if let Err(e) = manager.notify("APOD Desktop", "Desktop background updated", Some(path)) {
        tracing::warn!("Failed to send notification: {}", e);
    }
    Ok(())
}
