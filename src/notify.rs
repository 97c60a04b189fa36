//! "Run finished" notification through an external program
//!
//! The command line is split on whitespace; the message is appended as the
//! last argument, e.g. `messagebox "done creating \"allfiles.db\"!"`.
//! Failures are logged and never affect the run.

use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default)]
pub struct Notifier {
    command: Option<Vec<String>>,
}

impl Notifier {
    pub fn new(command: Option<&str>) -> Self {
        let command = command
            .map(|c| c.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty());
        Self { command }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    /// Run the command with `message`; returns whether it exited successfully
    pub fn notify(&self, message: &str) -> bool {
        let Some((program, args)) = self.command.as_ref().and_then(|c| c.split_first()) else {
            debug!("No notification command configured");
            return false;
        };

        let status = Command::new(program)
            .args(args)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => {
                info!(command = %program, "Notification sent");
                true
            }
            Ok(status) => {
                warn!(command = %program, "Notification command exited with {}", status);
                false
            }
            Err(e) => {
                warn!(command = %program, "Failed to run notification command: {}", e);
                false
            }
        }
    }
}

/// Message sent when a listing is written
pub fn finished_message(outputs: &[std::path::PathBuf]) -> String {
    let names: Vec<String> = outputs
        .iter()
        .map(|p| format!("{:?}", p.display().to_string()))
        .collect();
    format!("done creating {}!", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_disabled_notifier() {
        assert!(!Notifier::disabled().is_enabled());
        assert!(!Notifier::new(Some("   ")).is_enabled());
        assert!(!Notifier::disabled().notify("hello"));
    }

    #[test]
    fn test_missing_program_is_not_fatal() {
        let notifier = Notifier::new(Some("definitely-not-a-real-program-4242"));
        assert!(notifier.is_enabled());
        assert!(!notifier.notify("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_command() {
        assert!(Notifier::new(Some("true")).notify("done"));
        assert!(!Notifier::new(Some("false")).notify("done"));
    }

    #[test]
    fn test_finished_message() {
        let msg = finished_message(&[PathBuf::from("allfiles.db")]);
        assert_eq!(msg, "done creating \"allfiles.db\"!");
    }
}
