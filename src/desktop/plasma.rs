use super::WallpaperManager;
use crate::utils::command_exists;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

#[cfg(any(feature = "cli", feature = "gui"))]
use crate::utils::send_notification;

pub struct PlasmaManager;

impl PlasmaManager {
    pub fn new() -> Result<Self> {
        if !command_exists("qdbus") {
            return Err(Error::DesktopEnv(
                "QDBus command not found. Please install qdbus.".to_string(),
            ));
        }
        Ok(Self)
    }

    pub fn is_available() -> bool {
        std::env::var("KDE_SESSION_VERSION").is_ok()
    }
}

fn wallpaper_script(path: &Path) -> String {
    format!(
        r#"
        var allDesktops = desktops();
        for (i=0;i<allDesktops.length;i++) {{
            d = allDesktops[i];
            d.wallpaperPlugin = "org.kde.image";
            d.currentConfigGroup = Array("Wallpaper", "org.kde.image", "General");
            d.writeConfig("Image", "file://{}");
        }}
        "#,
        path.to_string_lossy().replace('"', "\\\"")
    )
}

impl WallpaperManager for PlasmaManager {
    fn name(&self) -> &'static str {
        "plasma"
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        let output = Command::new("qdbus")
            .args([
                "org.kde.plasmashell",
                "/PlasmaShell",
                "org.kde.PlasmaShell.evaluateScript",
            ])
            .arg(wallpaper_script(path))
            .output()?;

        if !output.status.success() {
            return Err(Error::DesktopEnv(format!(
                "Failed to set wallpaper: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(())
    }

    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()> {
        #[cfg(any(feature = "cli", feature = "gui"))]
        {
            if !command_exists("kdialog") {
                return send_notification(title, message, image);
            }

            let mut cmd = Command::new("kdialog");
            cmd.args(["--title", title, "--passivepopup", message, "5"]);

            if let Some(image_path) = image {
                cmd.arg("--icon").arg(image_path);
            }

            let output = cmd.output()?;

            if !output.status.success() {
                return send_notification(title, message, image);
            }

            Ok(())
        }
        #[cfg(not(any(feature = "cli", feature = "gui")))]
        {
            let _ = (title, message, image);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallpaper_script_points_at_file() {
        let script = wallpaper_script(Path::new("/home/me/image_cache/Orion.jpg"));
        assert!(script.contains(r#"d.writeConfig("Image", "file:///home/me/image_cache/Orion.jpg");"#));
    }
}
