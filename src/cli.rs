use crate::config::{ScanConfig, TargetOs, Technique};
use crate::utils::targets::{normalize_path, parse_headers};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rscan-rsc")]
#[command(about = "React2Shell scanner - detects CVE-2025-55182 and CVE-2025-66478")]
#[command(long_about = r#"
High fidelity detection of the React Server Components / Next.js
deserialization RCE. By default a harmless arithmetic proof-of-concept
(41*271) is executed and its result read back from the redirect it triggers.

WARNING: This tool should only be used on systems you own or have explicit
permission to test. Unauthorized scanning may be illegal.

Examples:
  rscan-rsc -u https://example.com
  rscan-rsc -l hosts.txt -t 20 -o results.json
  rscan-rsc -l hosts.txt --threads 50 --timeout 15
  rscan-rsc -u https://example.com -H "Authorization: Bearer token"
  rscan-rsc -u https://example.com --path /_next --path /api
  rscan-rsc -u https://example.com --path-file paths.txt
  rscan-rsc -u https://example.com --safe-check
  rscan-rsc -u https://example.com --windows --waf-bypass
"#)]
#[command(version)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "list"])))]
pub struct Cli {
    /// Single URL/host to check
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// File with hosts to check, one per line
    #[arg(short, long, value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Configuration file (TOML, JSON or YAML); flags override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Request timeout in seconds (default: 10, 20 with --waf-bypass)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output file for results (JSON)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Save every result, not only vulnerable hosts
    #[arg(long)]
    pub all_results: bool,

    /// Disable SSL certificate verification
    #[arg(short = 'k', long)]
    pub insecure: bool,

    /// Custom header 'Key: Value' (repeatable)
    #[arg(short = 'H', long = "header", value_name = "HEADER")]
    pub headers: Vec<String>,

    /// Use the side-channel check instead of the RCE proof-of-concept
    #[arg(long, conflicts_with = "vercel_waf_bypass")]
    pub safe_check: bool,

    /// Use the Vercel WAF bypass payload variant
    #[arg(long)]
    pub vercel_waf_bypass: bool,

    /// Use PowerShell instead of a Unix shell for the RCE command
    #[arg(long)]
    pub windows: bool,

    /// Prepend random junk data to get past WAF body inspection
    #[arg(long)]
    pub waf_bypass: bool,

    /// Size of the junk data in KB
    #[arg(long, value_name = "KB")]
    pub waf_bypass_size: Option<usize>,

    /// Path to test, e.g. '/_next' (repeatable)
    #[arg(long = "path", value_name = "PATH")]
    pub paths: Vec<String>,

    /// File with paths to test, one per line
    #[arg(long, value_name = "FILE")]
    pub path_file: Option<PathBuf>,

    /// Do not follow same-host redirects
    #[arg(long)]
    pub no_follow_redirects: bool,

    /// Verbose output (-v shows safe/error hosts and response previews, -vv debug logs)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only vulnerable hosts)
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    pub fn technique(&self) -> Option<Technique> {
        if self.safe_check {
            Some(Technique::Safe)
        } else if self.vercel_waf_bypass {
            Some(Technique::VercelWafBypass)
        } else {
            None
        }
    }

    /// Layer the command-line flags over a base configuration. Flags that
    /// were not given leave the base value alone.
    pub fn apply_to(&self, config: &mut ScanConfig) {
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.timeout.is_some() {
            config.timeout = self.timeout;
        }
        if self.insecure {
            config.verify_ssl = false;
        }
        if let Some(technique) = self.technique() {
            config.technique = technique;
        }
        if self.windows {
            config.target_os = TargetOs::Windows;
        }
        if self.waf_bypass {
            config.waf_bypass = true;
        }
        if let Some(size) = self.waf_bypass_size {
            config.waf_bypass_size_kb = size;
        }
        if !self.headers.is_empty() {
            config.custom_headers.extend(parse_headers(self.headers.as_slice()));
        }
        if !self.paths.is_empty() {
            config.paths = self.paths.iter().map(|p| normalize_path(p)).collect();
        }
        if self.no_follow_redirects {
            config.follow_redirects = false;
        }
    }
}
