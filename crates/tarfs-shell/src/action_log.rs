//! CSV log of interactively executed commands

use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::debug;

pub const HEADER: &str = "timestamp,user,command";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Append-only CSV file with one row per command
#[derive(Debug)]
pub struct ActionLog {
    path: PathBuf,
}

impl ActionLog {
    /// Open the log, writing the header row if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                writeln!(file, "{}", HEADER)?;
                debug!("Created action log {}", path.display());
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, user: &str, command: &str) -> io::Result<()> {
        self.record_at(Local::now().naive_local(), user, command)
    }

    pub fn record_at(&self, timestamp: NaiveDateTime, user: &str, command: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(
            file,
            "{},{},{}",
            timestamp.format(TIMESTAMP_FORMAT),
            csv_field(user),
            csv_field(command)
        )
    }
}

fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
