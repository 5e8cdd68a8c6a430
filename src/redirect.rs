use crate::transport::Transport;
use log::{debug, info};
use std::sync::Arc;
use url::Url;

pub const MAX_REDIRECTS: usize = 10;

/// Walks redirect chains with HEAD probes, never leaving the authority of the
/// URL it started from.
pub struct RedirectResolver {
    transport: Arc<dyn Transport>,
    max_redirects: usize,
}

impl RedirectResolver {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_limit(transport, MAX_REDIRECTS)
    }

    pub fn with_limit(transport: Arc<dyn Transport>, max_redirects: usize) -> Self {
        Self { transport, max_redirects }
    }

    /// Follow same-authority redirects from `url` and return where the chain
    /// ends. A hop to a foreign authority ends the walk at the URL before it.
    pub async fn resolve(&self, url: &str) -> String {
        let original_authority = match Url::parse(url) {
            Ok(parsed) => authority(&parsed),
            Err(_) => return url.to_string(),
        };

        let mut current = url.to_string();

        for _ in 0..self.max_redirects {
            let location = match self.transport.probe_redirect(&current).await {
                Some(location) => location,
                None => break,
            };

            let next = match Url::parse(&current).and_then(|base| base.join(&location)) {
                Ok(next) => next,
                Err(e) => {
                    debug!("Unusable Location '{}' from {}: {}", location, current, e);
                    break;
                }
            };

            if authority(&next) != original_authority {
                info!("Not following redirect from {} to foreign host {}", current, next);
                break;
            }

            debug!("Redirect {} -> {}", current, next);
            current = next.to_string();
        }

        current
    }
}

/// `host[:port]` as written in the URL, the part redirects must not change.
fn authority(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
