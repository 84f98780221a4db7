//! File name filtering with include/exclude regular expressions.

use regex::Regex;

use crate::{Error, Result};

/// Decides which file names in the watched directory are ingested.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    monitor: Vec<Regex>,
    ignore: Vec<Regex>,
}

impl FileFilter {
    /// Create a filter from include and exclude patterns.
    ///
    /// Patterns are unanchored regular expressions matched against the bare
    /// file name.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first pattern that fails to
    /// compile.
    pub fn new<S: AsRef<str>>(monitor: &[S], ignore: &[S]) -> Result<Self> {
        Ok(Self {
            monitor: compile(monitor, "files_to_monitor")?,
            ignore: compile(ignore, "files_to_ignore")?,
        })
    }

    /// Check if a name matches the monitor list. An empty list monitors
    /// everything.
    #[must_use]
    pub fn is_monitored(&self, name: &str) -> bool {
        self.monitor.is_empty() || self.monitor.iter().any(|re| re.is_match(name))
    }

    /// Check if a name matches the ignore list.
    #[must_use]
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(name))
    }

    /// Check if a file should be ingested.
    #[must_use]
    pub fn is_eligible(&self, name: &str) -> bool {
        self.is_monitored(name) && !self.is_ignored(name)
    }
}

fn compile<S: AsRef<str>>(patterns: &[S], option: &str) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Regex::new(pattern)
                .map_err(|e| Error::config(format!("invalid {option} pattern '{pattern}': {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: &[&str] = &[];

    #[test]
    fn test_empty_filter_monitors_everything() {
        let filter = FileFilter::new(NONE, NONE).unwrap();
        assert!(filter.is_monitored("anything.bin"));
        assert!(!filter.is_ignored("anything.bin"));
        assert!(filter.is_eligible("anything.bin"));
    }

    #[test]
    fn test_monitor_patterns_or_semantics() {
        let filter = FileFilter::new(&[r".*\.csv$", r"^export_"], NONE).unwrap();
        assert!(filter.is_eligible("data.csv"));
        assert!(filter.is_eligible("export_2024.json"));
        assert!(!filter.is_eligible("data.json"));
    }

    #[test]
    fn test_ignore_wins_over_monitor() {
        let filter = FileFilter::new(&[r"\.csv"], &[r"^\.", r"partial"]).unwrap();
        assert!(filter.is_eligible("metrics.csv"));
        assert!(!filter.is_eligible(".hidden.csv"));
        assert!(!filter.is_eligible("metrics.partial.csv"));
    }

    #[test]
    fn test_ignore_only() {
        let filter = FileFilter::new(NONE, &[r"\.DS_Store"]).unwrap();
        assert!(!filter.is_eligible(".DS_Store"));
        assert!(filter.is_eligible("a.csv"));
    }

    #[test]
    fn test_matches_unanchored() {
        let filter = FileFilter::new(&["csv"], NONE).unwrap();
        assert!(filter.is_monitored("data.csv.gz"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = FileFilter::new(&["("], NONE).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("files_to_monitor"));

        let err = FileFilter::new(NONE, &["[z-a]"]).unwrap_err();
        assert!(err.to_string().contains("files_to_ignore"));
    }
}
