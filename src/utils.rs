use crate::{Result, ScanError};
use log::info;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;

/// Target and path normalization, list loading
pub mod targets {
    use super::*;

    const SCHEMES: [&str; 2] = ["http://", "https://"];

    /// Normalize a raw host entry into `scheme://authority[/path]`.
    ///
    /// Adds `https://` when no scheme is given and strips trailing slashes and
    /// whitespace. Applying it twice gives the same value as applying it once.
    pub fn normalize_host(host: &str) -> Result<String> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ScanError::InvalidTarget("empty host".to_string()));
        }

        let (scheme, rest) = match split_scheme(host) {
            Some((scheme, rest)) => (scheme.to_string(), rest),
            None => ("https://".to_string(), host),
        };

        let rest = rest.trim_end_matches(|c: char| c == '/' || c.is_whitespace());
        if rest.is_empty() {
            return Err(ScanError::InvalidTarget(format!("no host in '{}'", host)));
        }

        Ok(format!("{}{}", scheme, rest))
    }

    fn split_scheme(host: &str) -> Option<(&str, &str)> {
        SCHEMES.iter().find_map(|scheme| {
            let prefix = host.get(..scheme.len())?;
            prefix
                .eq_ignore_ascii_case(scheme)
                .then(|| host.split_at(scheme.len()))
        })
    }

    /// Make sure a path starts with `/`.
    pub fn normalize_path(path: &str) -> String {
        let path = path.trim();
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        }
    }

    /// Parse `Key: Value` (or `Key:Value`) header arguments. Entries without
    /// a colon are ignored.
    pub fn parse_headers<S: AsRef<str>>(raw: &[S]) -> HashMap<String, String> {
        raw.iter()
            .filter_map(|header| {
                let (key, value) = header.as_ref().split_once(':')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.trim_start().to_string()))
            })
            .collect()
    }

    /// Load one entry per line, skipping blanks and `#` comments.
    pub async fn load_list(path: &Path) -> Result<Vec<String>> {
        if !path.exists() {
            return Err(ScanError::InvalidInput(format!("File not found: {}", path.display())));
        }

        let content = fs::read_to_string(path).await
            .map_err(|e| ScanError::InvalidInput(format!("Failed to read {}: {}", path.display(), e)))?;

        let entries: Vec<String> = content
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        info!("Loaded {} entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    pub async fn load_hosts(path: &Path) -> Result<Vec<String>> {
        load_list(path).await
    }

    pub async fn load_paths(path: &Path) -> Result<Vec<String>> {
        Ok(load_list(path).await?
            .iter()
            .map(|p| normalize_path(p))
            .collect())
    }
}

/// Progress reporting utilities
pub mod progress {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Duration;

    pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
        let pb = ProgressBar::new(total);

        if let Ok(style) = ProgressStyle::default_bar()
            .template("  {spinner:.cyan} [{bar:25.green/bright_black}] {pos:>3}/{len:3} {msg} [{elapsed}<{eta}]")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
        }

        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }
}

/// Time and formatting utilities
pub mod time {
    use chrono::{SecondsFormat, Utc};
    use std::time::Duration;

    /// Current UTC time as ISO-8601 with a trailing `Z`.
    pub fn now_iso8601() -> String {
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Format duration as human readable string
    pub fn format_duration(duration: Duration) -> String {
        let secs = duration.as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}
