use anyhow::{Context, Result};
use keeper_core::report::Reporter;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Echoing reporter: info goes to stdout (unless disabled), warnings and
/// errors to stderr, and everything to the log file when one is configured.
pub struct EchoReporter {
    echo_info: bool,
    log: Option<Mutex<File>>,
}

impl EchoReporter {
    pub fn new(echo_info: bool, log_file: Option<&Path>) -> Result<Self> {
        let log = match log_file {
            Some(p) => {
                let mut f = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(p)
                    .with_context(|| format!("open log file {:?}", p))?;
                // Runs append to the same file; mark where this one starts.
                writeln!(f, "{}", "-".repeat(40)).with_context(|| format!("write {:?}", p))?;
                Some(Mutex::new(f))
            }
            None => None,
        };
        Ok(Self { echo_info, log })
    }

    fn emit(&self, level: &str, msg: &str) {
        if level != "INFO" {
            eprintln!("{}", msg);
        } else if self.echo_info {
            println!("{}", msg);
        }
        if let Some(log) = &self.log {
            let ts = chrono::Utc::now().to_rfc3339();
            let mut f = log.lock().unwrap();
            if let Err(e) = writeln!(f, "{} {:<5} {}", ts, level, msg) {
                tracing::warn!(error = %e, "log file write failed");
            }
        }
    }
}

impl Reporter for EchoReporter {
    fn info(&self, msg: &str) {
        self.emit("INFO", msg);
    }
    fn warn(&self, msg: &str) {
        self.emit("WARN", msg);
    }
    fn error(&self, msg: &str) {
        self.emit("ERROR", msg);
    }
}
