//! How an instance was launched, and the message a secondary instance forwards to the primary

use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct StartupSettings {
    /// Server to connect to once started
    #[arg(long)]
    pub server: Option<String>,
    /// Database to open on the server
    #[arg(long)]
    pub database: Option<String>,
    /// Process that launched this instance
    #[arg(long)]
    pub parent_process_id: Option<u32>,
    /// Main window title of the launching process
    #[arg(long)]
    pub parent_window_title: Option<String>,
    /// Files to open
    pub files: Vec<PathBuf>,
}

#[derive(Parser)]
#[command(no_binary_name = true)]
struct StartupArgs {
    #[command(flatten)]
    settings: StartupSettings,
}

impl StartupSettings {
    /// Parses raw startup arguments, not including the binary name
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        StartupArgs::try_parse_from(args).map(|a| a.settings)
    }

    pub fn from_command_line() -> Result<Self, clap::Error> {
        Self::from_args(std::env::args_os().skip(1))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StartupMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_process_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_process_main_window_title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

impl StartupMessage {
    pub fn to_settings(&self) -> StartupSettings {
        StartupSettings {
            server: self.server_name.clone(),
            database: self.database_name.clone(),
            parent_process_id: self.parent_process_id,
            parent_window_title: self.parent_process_main_window_title.clone(),
            files: self.files.clone(),
        }
    }

    /// True when the secondary was launched without any arguments
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl From<&StartupSettings> for StartupMessage {
    fn from(settings: &StartupSettings) -> Self {
        Self {
            server_name: settings.server.clone(),
            database_name: settings.database.clone(),
            parent_process_id: settings.parent_process_id,
            parent_process_main_window_title: settings.parent_window_title.clone(),
            files: settings.files.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_arguments() {
        let settings = StartupSettings::from_args([
            "--server",
            "localhost:5000",
            "--database",
            "Sales",
            "--parent-process-id",
            "4242",
            "--parent-window-title",
            "Report - Desktop",
            "a.pbix",
            "b.pbix",
        ])
        .unwrap();
        assert_eq!(settings.server.as_deref(), Some("localhost:5000"));
        assert_eq!(settings.database.as_deref(), Some("Sales"));
        assert_eq!(settings.parent_process_id, Some(4242));
        assert_eq!(settings.parent_window_title.as_deref(), Some("Report - Desktop"));
        assert_eq!(
            settings.files,
            vec![PathBuf::from("a.pbix"), PathBuf::from("b.pbix")]
        );
    }

    #[test]
    fn no_arguments_is_empty() {
        let settings = StartupSettings::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(settings, StartupSettings::default());
        assert!(StartupMessage::from(&settings).is_empty());
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        assert!(StartupSettings::from_args(["--parent-process-id", "not-a-pid"]).is_err());
        assert!(StartupSettings::from_args(["--unknown"]).is_err());
    }

    #[test]
    fn message_reconstructs_settings() {
        let settings = StartupSettings {
            server: Some("srv".into()),
            database: None,
            parent_process_id: Some(7),
            parent_window_title: None,
            files: vec![PathBuf::from("model.bim")],
        };
        let message = StartupMessage::from(&settings);
        assert!(!message.is_empty());
        assert_eq!(message.to_settings(), settings);
    }

    #[test]
    fn json_uses_pascal_case_and_skips_absent_fields() {
        let message = StartupMessage {
            server_name: Some("srv".into()),
            parent_process_id: Some(7),
            ..Default::default()
        };
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"ServerName":"srv","ParentProcessId":7}"#);
        let parsed: StartupMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, message);
    }
}
