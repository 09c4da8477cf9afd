use std::io::Write;

use chrono::Local;
use tracing::warn;

use crate::paths::Paths;

/// Append-only daily run journal. One file per calendar day under
/// `logs/`, one line per event. Write failures are logged and swallowed;
/// the journal must never take down the polling loop.
#[derive(Debug, Clone)]
pub struct Journal {
    paths: Paths,
}

impl Journal {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    pub fn append(&self, message: &str) {
        let path = self.paths.daily_log(Local::now().date_naive());
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
            writeln!(file, "{}", message)?;
            Ok(())
        })();
        if let Err(e) = result {
            warn!(error = %e, path = %path.display(), "Journal write failed");
        }
    }
}
