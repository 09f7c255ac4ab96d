use super::WallpaperManager;
use crate::utils::command_exists;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::warn;

#[cfg(any(feature = "cli", feature = "gui"))]
use crate::utils::send_notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WallpaperTool {
    Hyprpaper,
    Swww,
    Swaybg,
}

impl WallpaperTool {
    fn detect() -> Vec<Self> {
        [
            ("hyprpaper", Self::Hyprpaper),
            ("swww", Self::Swww),
            ("swaybg", Self::Swaybg),
        ]
        .into_iter()
        .filter(|(cmd, _)| command_exists(cmd))
        .map(|(_, tool)| tool)
        .collect()
    }

    fn apply(self, path: &Path) -> Result<()> {
        match self {
            Self::Hyprpaper => {
                run(Command::new("hyprctl").args(["hyprpaper", "preload"]).arg(path))?;
                let mut target = std::ffi::OsString::from(",");
                target.push(path);
                run(Command::new("hyprctl").args(["hyprpaper", "wallpaper"]).arg(target))
            }
            Self::Swww => run(Command::new("swww").arg("img").arg(path).args(["-t", "grow"])),
            Self::Swaybg => {
                Command::new("swaybg").arg("-i").arg(path).spawn()?;
                Ok(())
            }
        }
    }
}

fn run(cmd: &mut Command) -> Result<()> {
    let output = cmd.output()?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::DesktopEnv(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ))
    }
}

pub struct HyprlandManager {
    tools: Vec<WallpaperTool>,
}

impl HyprlandManager {
    pub fn new() -> Result<Self> {
        let tools = WallpaperTool::detect();
        if tools.is_empty() {
            return Err(Error::DesktopEnv(
                "No supported wallpaper tool found. Please install one of hyprpaper, swww, or swaybg.".to_string(),
            ));
        }
        Ok(Self { tools })
    }

    pub fn is_available() -> bool {
        std::env::var("HYPRLAND_INSTANCE_SIGNATURE").is_ok()
    }
}

impl WallpaperManager for HyprlandManager {
    fn name(&self) -> &'static str {
        "hyprland"
    }

    fn set_wallpaper(&self, path: &Path) -> Result<()> {
        for tool in &self.tools {
            match tool.apply(path) {
                Ok(()) => return Ok(()),
                Err(e) => warn!(?tool, "wallpaper command failed: {}", e),
            }
        }

        Err(Error::DesktopEnv(
            "Failed to set wallpaper. No supported wallpaper tool (hyprpaper, swww, or swaybg) succeeded".to_string()
        ))
    }

    fn notify(&self, title: &str, message: &str, image: Option<&Path>) -> Result<()> {
        #[cfg(any(feature = "cli", feature = "gui"))]
        {
            send_notification(title, message, image)?;
        }
        #[cfg(not(any(feature = "cli", feature = "gui")))]
        {
            let _ = (title, message, image);
        }
        Ok(())
    }
}
