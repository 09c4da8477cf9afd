use std::path::PathBuf;

use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        let base = dirs::home_dir()
            .map(|h| h.join(".slotwatch"))
            .unwrap_or_else(|| PathBuf::from(".slotwatch"));
        Self { base }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// One journal file per calendar day, `logs/log_YYYY-MM-DD.txt`.
    pub fn daily_log(&self, date: NaiveDate) -> PathBuf {
        self.logs_dir().join(format!("log_{}.txt", date))
    }

    pub fn browser_data_dir(&self) -> PathBuf {
        self.base.join("browser")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base)?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.browser_data_dir())?;
        Ok(())
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_log_path_embeds_date() {
        let paths = Paths::with_base(PathBuf::from("/tmp/sw"));
        let date = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
        assert_eq!(
            paths.daily_log(date),
            PathBuf::from("/tmp/sw/logs/log_2025-02-10.txt")
        );
    }
}
