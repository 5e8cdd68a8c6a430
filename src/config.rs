use crate::utils::targets::normalize_path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: u64 = 10; // seconds
pub const WAF_BYPASS_TIMEOUT: u64 = 20; // seconds
pub const DEFAULT_THREADS: usize = 10;
pub const DEFAULT_WAF_BYPASS_SIZE_KB: usize = 128;
/// Upper bound for the junk field, 64 MiB.
pub const MAX_WAF_BYPASS_SIZE_KB: usize = 64 * 1024;

/// Detection technique. Each one owns exactly one payload and one checker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    /// Side-channel check, nothing is executed on the target
    Safe,
    /// Arithmetic proof-of-concept, result comes back in a redirect
    #[default]
    Rce,
    /// Alternate encoding of the RCE primitive that passes Vercel's WAF
    #[serde(rename = "vercel_waf")]
    VercelWafBypass,
}

impl Technique {
    pub fn label(&self) -> &'static str {
        match self {
            Technique::Safe => "Safe Side-Channel",
            Technique::Rce => "RCE Proof-of-Concept",
            Technique::VercelWafBypass => "Vercel WAF Bypass",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetOs {
    #[default]
    Unix,
    Windows,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Per-request timeout in seconds. `None` means "not chosen by the user".
    pub timeout: Option<u64>,
    pub threads: usize,
    pub verify_ssl: bool,
    pub technique: Technique,
    pub target_os: TargetOs,
    pub waf_bypass: bool,
    pub waf_bypass_size_kb: usize,
    pub paths: Vec<String>,
    pub follow_redirects: bool,
    /// Extra request headers; they replace defaults with the same name.
    pub custom_headers: HashMap<String, String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            threads: DEFAULT_THREADS,
            verify_ssl: true,
            technique: Technique::Rce,
            target_os: TargetOs::Unix,
            waf_bypass: false,
            waf_bypass_size_kb: DEFAULT_WAF_BYPASS_SIZE_KB,
            paths: Vec::new(),
            follow_redirects: true,
            custom_headers: HashMap::new(),
        }
    }
}

impl ScanConfig {
    pub fn load_from_file(path: &str) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn save_to_file(&self, path: &str) -> crate::Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| crate::ScanError::InvalidInput(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Timeout in seconds actually used for requests.
    ///
    /// Padded WAF-bypass bodies take longer to upload, so the default grows to
    /// 20s with `waf_bypass`. An explicit timeout always wins.
    pub fn effective_timeout(&self) -> u64 {
        match self.timeout {
            Some(secs) => secs,
            None if self.waf_bypass => WAF_BYPASS_TIMEOUT,
            None => DEFAULT_TIMEOUT,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.effective_timeout())
    }

    /// Worker pool size, never zero.
    pub fn concurrency(&self) -> usize {
        self.threads.max(1)
    }

    /// Paths to probe on every host, in order. Falls back to the root path.
    pub fn target_paths(&self) -> Vec<String> {
        let paths: Vec<String> = self
            .paths
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| normalize_path(p))
            .collect();

        if paths.is_empty() {
            vec!["/".to_string()]
        } else {
            paths
        }
    }

    /// Padding size for the WAF-bypass junk field, if enabled. Capped at
    /// [`MAX_WAF_BYPASS_SIZE_KB`].
    pub fn waf_padding_kb(&self) -> Option<usize> {
        self.waf_bypass
            .then_some(self.waf_bypass_size_kb.min(MAX_WAF_BYPASS_SIZE_KB))
    }
}
