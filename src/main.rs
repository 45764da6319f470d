//! Optic Lab
//!
//! Desktop tool for intensity profiles: open an image (or grab one from the
//! camera), drag a region of interest, and plot and export the averaged
//! profile along either axis.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod analysis;
mod camera;
mod config;
mod gui;
mod logging;
mod paths;

use anyhow::{anyhow, Result};

fn main() -> Result<()> {
    // Logs directory must exist before the logger opens its file
    paths::ensure_directories()?;

    let config_warning = config::init_config();
    let config = config::get_config();

    logging::init_logging(config.level_filter())?;
    logging::install_panic_hook();

    if let Some(warning) = config_warning {
        log::warn!("{}", warning);
    }
    log::info!("Optic Lab starting (config: {})", paths::get_config_path().display());

    match gui::run_gui(config) {
        Ok(()) => {
            log::info!("GUI application exited normally");
            Ok(())
        }
        Err(e) => {
            log::error!("GUI error: {}", e);
            Err(anyhow!("GUI error: {}", e))
        }
    }
}
