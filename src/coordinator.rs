use crate::config::ScanConfig;
use crate::scanner::HostScanner;
use crate::transport::{HttpTransport, Transport};
use crate::types::ScanResult;
use crate::Result;
use futures::stream::{self, Stream, StreamExt};
use log::{error, info};
use std::sync::Arc;

/// Builds the transport a single scan task will own.
pub type TransportFactory = Arc<dyn Fn(&ScanConfig) -> Result<Arc<dyn Transport>> + Send + Sync>;

/// Runs one isolated scan per host on a bounded pool of tasks.
///
/// Tasks only share the read-only config. Each builds its own transport and
/// result, so nothing needs locking.
pub struct ScanCoordinator {
    config: Arc<ScanConfig>,
    transport_factory: TransportFactory,
}

impl ScanCoordinator {
    pub fn new(config: ScanConfig) -> Self {
        Self::with_transport_factory(
            config,
            Arc::new(|config: &ScanConfig| -> Result<Arc<dyn Transport>> {
                let transport = HttpTransport::new(config.request_timeout(), config.verify_ssl)?;
                Ok(Arc::new(transport) as Arc<dyn Transport>)
            }),
        )
    }

    pub fn with_transport_factory(config: ScanConfig, transport_factory: TransportFactory) -> Self {
        Self {
            config: Arc::new(config),
            transport_factory,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Results in completion order, one per input host.
    pub fn scan_stream(&self, hosts: Vec<String>) -> impl Stream<Item = ScanResult> + Send + 'static {
        let limit = self.config.concurrency();
        let config = Arc::clone(&self.config);
        let factory = Arc::clone(&self.transport_factory);

        info!("Scanning {} host(s) with {} worker(s)", hosts.len(), limit);

        stream::iter(hosts)
            .map(move |host| {
                let config = Arc::clone(&config);
                let factory = Arc::clone(&factory);
                async move {
                    let task_host = host.clone();
                    let handle = tokio::spawn(async move { scan_host(config, factory, task_host).await });

                    match handle.await {
                        Ok(result) => result,
                        Err(e) => {
                            error!("Scan task for {} aborted: {}", host, e);
                            ScanResult::errored(&host, format!("Scan task failed: {}", e))
                        }
                    }
                }
            })
            .buffer_unordered(limit)
    }

    /// Run every scan and collect the results, still in completion order.
    pub async fn scan_all(&self, hosts: Vec<String>) -> Vec<ScanResult> {
        self.scan_stream(hosts).collect().await
    }
}

async fn scan_host(config: Arc<ScanConfig>, factory: TransportFactory, host: String) -> ScanResult {
    let transport = match factory(&config) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Could not build HTTP client for {}: {}", host, e);
            return ScanResult::errored(&host, e.to_string());
        }
    };

    HostScanner::new(config, transport).scan(&host).await
}
