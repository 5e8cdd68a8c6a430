use crate::checker::Probe;
use crate::config::{ScanConfig, Technique};
use crate::payload::{PayloadArtifact, PayloadOptions};
use crate::redirect::RedirectResolver;
use crate::transport::Transport;
use crate::types::ScanResult;
use crate::utils::targets::normalize_host;
use log::{debug, info, warn};
use std::sync::Arc;
use url::Url;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0.3112.113 Safari/537.36 Assetnote/1.0.0";

/// Outcome of one exploit request against one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// Fingerprint seen, host is vulnerable
    Detected,
    /// Timed out under RCE: patched servers hang instead of redirecting
    ConclusiveNegative,
    /// Response received, nothing found
    Clean,
    /// Transport failure, host state unknown
    Failed,
}

impl Attempt {
    fn is_terminal(self) -> bool {
        matches!(self, Attempt::Detected | Attempt::ConclusiveNegative)
    }
}

/// Per-host scan state machine.
///
/// Paths are tried in order; the first detection or conclusive negative ends
/// the scan. A clean answer may be followed by one retry against the end of
/// the same-host redirect chain.
pub struct HostScanner {
    config: Arc<ScanConfig>,
    transport: Arc<dyn Transport>,
    resolver: RedirectResolver,
    probe: Probe,
}

impl HostScanner {
    pub fn new(config: Arc<ScanConfig>, transport: Arc<dyn Transport>) -> Self {
        let resolver = RedirectResolver::new(Arc::clone(&transport));
        let probe = config.technique.probe();

        Self { config, transport, resolver, probe }
    }

    pub async fn scan(&self, raw_host: &str) -> ScanResult {
        let mut result = ScanResult::new(raw_host);

        let host = match normalize_host(raw_host) {
            Ok(host) => host,
            Err(e) => {
                warn!("Skipping '{}': {}", raw_host, e);
                result.error = Some(e.to_string());
                return result;
            }
        };
        result.host = host.clone();

        let payload = self.probe.build(&PayloadOptions {
            target_os: self.config.target_os,
            waf_padding_kb: self.config.waf_padding_kb(),
        });
        let headers = self.request_headers(payload.content_type());

        let mut had_failure = false;

        for path in self.config.target_paths() {
            let test_url = format!("{}{}", host, path);

            let attempt = self.attempt(&test_url, &test_url, &headers, &payload, &mut result).await;
            if attempt.is_terminal() {
                return result;
            }
            if attempt == Attempt::Failed {
                had_failure = true;
                continue;
            }

            if !self.config.follow_redirects {
                continue;
            }

            let resolved = self.resolver.resolve(&test_url).await;
            if resolved == test_url {
                continue;
            }

            debug!("{} redirects to {}, retrying there", test_url, resolved);
            match self.attempt(&test_url, &resolved, &headers, &payload, &mut result).await {
                attempt if attempt.is_terminal() => return result,
                Attempt::Failed => had_failure = true,
                _ => {}
            }
        }

        if result.vulnerable.is_none() && !had_failure {
            result.vulnerable = Some(false);
        }

        result
    }

    /// Send the payload to `target_url` and fold the outcome into `result`.
    /// `tested_url` is the URL before any redirect resolution.
    async fn attempt(
        &self,
        tested_url: &str,
        target_url: &str,
        headers: &[(String, String)],
        payload: &PayloadArtifact,
        result: &mut ScanResult,
    ) -> Attempt {
        result.tested_url = Some(tested_url.to_string());
        result.final_url = Some(target_url.to_string());
        result.request = Some(raw_request(target_url, headers, payload));

        let reply = match self.transport.send(target_url, headers, payload.body()).await {
            Ok(reply) => reply,
            Err(e) if e.is_timeout() && self.probe.technique == Technique::Rce => {
                debug!("{} timed out under RCE check, treating as not vulnerable", target_url);
                result.vulnerable = Some(false);
                result.error = Some(e.to_string());
                return Attempt::ConclusiveNegative;
            }
            Err(e) => {
                debug!("{} failed: {}", target_url, e);
                result.error = Some(e.to_string());
                return Attempt::Failed;
            }
        };

        result.status_code = Some(reply.status);
        result.response = Some(reply.raw());

        if self.probe.is_vulnerable(&reply) {
            info!("{} is vulnerable ({})", target_url, self.probe.technique.label());
            result.vulnerable = Some(true);
            return Attempt::Detected;
        }

        Attempt::Clean
    }

    /// Default headers with the user's custom headers layered on top.
    /// Overrides match header names case-insensitively.
    pub fn request_headers(&self, content_type: &str) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = [
            ("User-Agent", USER_AGENT),
            ("Next-Action", "x"),
            ("X-Nextjs-Request-Id", "b5dce965"),
            ("Content-Type", content_type),
            ("X-Nextjs-Html-Request-Id", "SSTMXm7OJ_g0Ncx6jpQt9"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut custom: Vec<_> = self.config.custom_headers.iter().collect();
        custom.sort();
        for (name, value) in custom {
            match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
                Some(existing) => *existing = (name.clone(), value.clone()),
                None => headers.push((name.clone(), value.clone())),
            }
        }

        headers
    }
}

/// Raw HTTP/1.1 rendering of the exploit request, for the result record.
fn raw_request(url: &str, headers: &[(String, String)], payload: &PayloadArtifact) -> String {
    let (target, host) = match Url::parse(url) {
        Ok(parsed) => {
            let mut target = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                target.push('?');
                target.push_str(query);
            }
            let host = match parsed.port() {
                Some(port) => format!("{}:{}", parsed.host_str().unwrap_or_default(), port),
                None => parsed.host_str().unwrap_or_default().to_string(),
            };
            (target, host)
        }
        Err(_) => ("/".to_string(), url.to_string()),
    };

    let mut raw = format!("POST {} HTTP/1.1\r\nHost: {}\r\n", target, host);
    for (name, value) in headers {
        raw.push_str(&format!("{}: {}\r\n", name, value));
    }
    raw.push_str(&format!("Content-Length: {}\r\n\r\n", payload.len()));
    raw.push_str(&payload.body_text());
    raw
}
