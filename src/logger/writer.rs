//! Access log writer
//!
//! Access lines go to a file or stdout; diagnostics go through `tracing`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static ACCESS_WRITER: OnceLock<AccessWriter> = OnceLock::new();

enum AccessTarget {
    Stdout,
    File(Mutex<File>),
}

pub struct AccessWriter {
    target: AccessTarget,
}

impl AccessWriter {
    fn new(access_log_file: Option<&str>) -> io::Result<Self> {
        let target = match access_log_file {
            Some(path) => AccessTarget::File(Mutex::new(open_log_file(path)?)),
            None => AccessTarget::Stdout,
        };
        Ok(Self { target })
    }

    pub fn write_line(&self, line: &str) {
        match &self.target {
            AccessTarget::Stdout => println!("{line}"),
            AccessTarget::File(file) => {
                if let Ok(mut f) = file.lock() {
                    if let Err(e) = writeln!(f, "{line}") {
                        tracing::warn!(error = %e, "failed to write access log");
                    }
                }
            }
        }
    }
}

/// Open or create a log file for appending
pub(crate) fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global access writer; fails if already installed
pub fn init(access_log_file: Option<&str>) -> io::Result<()> {
    let writer = AccessWriter::new(access_log_file)?;
    ACCESS_WRITER.set(writer).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "access log writer already initialized",
        )
    })
}

/// Write one access line, to stdout when no writer was installed
pub fn write_access(line: &str) {
    match ACCESS_WRITER.get() {
        Some(writer) => writer.write_line(line),
        None => println!("{line}"),
    }
}
