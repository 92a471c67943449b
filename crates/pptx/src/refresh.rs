//! Hand-off to the external chart-refresh step.
//!
//! Rewritten embedded workbooks leave each chart's cached values stale until
//! a native presentation application opens the file, redraws every chart
//! whose data is not externally linked (including charts nested in groups)
//! and saves it again. That step lives outside this crate; this module only
//! defines how it is invoked.

use pptsync_core::{Error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Redraws the charts of a saved presentation in place.
pub trait ChartRefresher {
    fn refresh(&self, document_path: &Path) -> Result<()>;
}

/// Runs an external program with the document path as its last argument.
#[derive(Debug, Clone)]
pub struct CommandRefresher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl CommandRefresher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument passed before the document path.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl ChartRefresher for CommandRefresher {
    fn refresh(&self, document_path: &Path) -> Result<()> {
        log::info!(
            "Refreshing charts of {} with {}",
            document_path.display(),
            self.program.display()
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(document_path)
            .status()
            .map_err(|e| Error::RefreshError(format!("Failed to run {}: {}", self.program.display(), e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::RefreshError(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )))
        }
    }
}
