//! Rscan RSC - High fidelity scanner for the React Server Components /
//! Next.js deserialization RCE (CVE-2025-55182, CVE-2025-66478).
//!
//! The scanner sends one crafted multipart server-action request per path and
//! decides from the response alone whether the flight decoder can be driven
//! into code execution. Three fixed techniques are available: a safe
//! side-channel check, an arithmetic RCE proof-of-concept and a variant of the
//! latter encoded to pass Vercel's WAF.
//!
//! # Warning
//! This tool is designed for ethical penetration testing and security assessment
//! purposes only. Users are responsible for ensuring they have proper authorization
//! before scanning any networks or systems.

pub mod cli;
pub mod config;
pub mod payload;
pub mod checker;
pub mod transport;
pub mod redirect;
pub mod scanner;
pub mod coordinator;
pub mod reporting;
pub mod display;
pub mod utils;
pub mod error;

pub use error::{Result, ScanError, TransportError};

/// Common types shared by the scanner and the output layers
pub mod types {
    use crate::utils::time::now_iso8601;
    use serde::{Deserialize, Serialize};

    /// Outcome of scanning one host.
    ///
    /// `vulnerable` is tri-state: `Some(true)` detected, `Some(false)` checked
    /// and not vulnerable, `None` could not be determined.
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
    pub struct ScanResult {
        pub host: String,
        pub vulnerable: Option<bool>,
        pub status_code: Option<u16>,
        pub error: Option<String>,
        pub request: Option<String>,
        pub response: Option<String>,
        pub final_url: Option<String>,
        pub tested_url: Option<String>,
        pub timestamp: String,
    }

    impl ScanResult {
        pub fn new(host: &str) -> Self {
            Self {
                host: host.to_string(),
                vulnerable: None,
                status_code: None,
                error: None,
                request: None,
                response: None,
                final_url: None,
                tested_url: None,
                timestamp: now_iso8601(),
            }
        }

        /// Result for a host whose scan could not run at all.
        pub fn errored(host: &str, error: impl Into<String>) -> Self {
            let mut result = Self::new(host);
            result.error = Some(error.into());
            result
        }

        pub fn is_redirected(&self) -> bool {
            match (&self.tested_url, &self.final_url) {
                (Some(tested), Some(last)) => tested != last,
                _ => false,
            }
        }

        pub fn is_vulnerable(&self) -> bool {
            self.vulnerable == Some(true)
        }

        pub fn is_safe(&self) -> bool {
            self.vulnerable == Some(false)
        }
    }
}
