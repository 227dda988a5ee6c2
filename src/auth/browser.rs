//! Usage: Default browser launch for the provider consent page.

use crate::shared::error::{AppError, AppResult};
use std::process::Command;

/// Seam for the facade; tests script this instead of spawning a browser.
pub type BrowserOpener = dyn Fn(&str) -> AppResult<()> + Send + Sync;

pub fn open_browser(url: &str) -> AppResult<()> {
    #[cfg(target_os = "windows")]
    {
        // URL protocol handler directly, so the default browser opens instead
        // of File Explorer for some URL shapes.
        Command::new("rundll32.exe")
            .arg("url.dll,FileProtocolHandler")
            .arg(url)
            .spawn()
            .map_err(|e| AppError::Internal(format!("failed to open browser: {e}")))?;
        return Ok(());
    }

    #[cfg(target_os = "macos")]
    {
        Command::new("open")
            .arg(url)
            .spawn()
            .map_err(|e| AppError::Internal(format!("failed to open browser: {e}")))?;
        return Ok(());
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Command::new("xdg-open")
            .arg(url)
            .spawn()
            .map_err(|e| AppError::Internal(format!("failed to open browser: {e}")))?;
        return Ok(());
    }

    #[allow(unreachable_code)]
    Err(AppError::Internal(
        "browser open is unsupported on this platform".to_string(),
    ))
}
