pub mod viewer;

use crate::cache::CacheReader;

pub fn run_viewer(cache: CacheReader, theme: &str) -> crate::Result<()> {
    use iced::Result as IcedResult;

    let result: IcedResult = viewer::run_apod_viewer(cache, viewer::string_to_theme(theme));

    result.map_err(|e| crate::Error::DesktopEnv(format!("GUI error: {e}")))?;
    Ok(())
}
