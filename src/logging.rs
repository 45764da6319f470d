//! Logger setup.
//!
//! Records go through the `log` facade to `env_logger`, which is configured
//! from config.json rather than the environment. Every line is timestamped
//! and written both to stdout and to `<exe_dir>/logs/optic_lab.log`.

use anyhow::{Context, Result};
use chrono::Local;
use log::LevelFilter;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};

/// Log file name inside the logs directory.
const LOG_FILE_NAME: &str = "optic_lab.log";

/// Duplicates log output to stdout and the log file.
struct TeeWriter {
    file: Option<File>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stdout().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            // A full disk should not take console logging down with it
            let _ = file.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Installs the global logger. Call once, after the logs directory exists.
pub fn init_logging(level: LevelFilter) -> Result<()> {
    let log_path = crate::paths::get_logs_dir().join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {:<5} {}",
                Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(TeeWriter { file })))
        .try_init()
        .context("Failed to install logger")?;

    if !log_path.exists() {
        log::warn!("Could not open log file {}", log_path.display());
    }

    Ok(())
}

/// Logs panics before the default hook prints them.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();

        log::error!("[PANIC]{} {}", location, msg);
        default_hook(panic_info);
    }));
}
