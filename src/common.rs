//! Common constants and helper functions used by the library and the binary

use anyhow::Context;
use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, SharedLogger, TermLogger, TerminalMode, WriteLogger};
use std::fs;
use std::fs::File;
use std::path::PathBuf;

pub const APP_NAME: &str = "App Instance";

/// Name used in place of [APP_NAME] when running as a packaged (store) instance
pub const STORE_ALIAS_NAME: &str = "AppInstance";

pub const APP_DIRECTORY_NAME: &str = "app-instance";

/// Path to the local application data folder
/// This is where the logs will be stored
pub fn local_data_directory() -> anyhow::Result<PathBuf> {
    let path = dirs::data_local_dir()
        .context("Unable to get data_local_dir()")?
        .join(APP_DIRECTORY_NAME);
    fs::create_dir_all(&path).context("Unable to create data directory")?;
    Ok(path)
}

/// Directory shared by every instance in the current login session
/// Lock files and receiver endpoints live here on Unix
pub fn session_directory() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIRECTORY_NAME)
}

/// Escapes a name so that it can be used as a single file name component.
/// Distinct names always map to distinct file names.
pub fn file_name_component(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for b in name.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                escaped.push(b as char)
            }
            _ => escaped.push_str(&format!("%{:02X}", b)),
        }
    }
    escaped
}

pub fn install_logger(debug: bool, to_disk: bool) -> anyhow::Result<()> {
    let filter = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = simplelog::ConfigBuilder::default()
        .set_target_level(LevelFilter::Debug)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        filter,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if to_disk {
        let file = File::create(get_log_path()?).context("Unable to create log file")?;
        let file_logger = WriteLogger::new(filter, config, file);
        loggers.push(file_logger);
    }
    CombinedLogger::init(loggers)?;
    if debug {
        log::warn!("Debug logging enabled");
    }
    Ok(())
}

pub fn get_log_path() -> anyhow::Result<PathBuf> {
    Ok(local_data_directory()?.join("log.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_unchanged() {
        assert_eq!(file_name_component("MutexAppInstance4f9wB"), "MutexAppInstance4f9wB");
        assert_eq!(file_name_component("main-app_v1.2"), "main-app_v1.2");
    }

    #[test]
    fn separators_and_spaces_are_escaped() {
        assert_eq!(file_name_component("App Instance"), "App%20Instance");
        assert_eq!(file_name_component("a/b"), "a%2Fb");
        assert_eq!(file_name_component("%"), "%25");
    }

    #[test]
    fn escaping_is_injective_for_lookalikes() {
        assert_ne!(file_name_component("a b"), file_name_component("a%20b"));
        assert_ne!(file_name_component("a/b"), file_name_component("a_b"));
    }
}
