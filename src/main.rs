use clap::Parser;
use env_logger::Env;
use futures::StreamExt;
use rscan_rsc::{
    cli::Cli,
    config::ScanConfig,
    coordinator::ScanCoordinator,
    display::DisplayManager,
    reporting::{self, ScanSummary},
    types::ScanResult,
    utils::{progress, targets, time},
    Result,
};
use std::process;
use std::time::Instant;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 | 1 => "warn",
            2 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let display = DisplayManager::new(cli.no_color, cli.quiet, cli.verbose > 0);

    match run(&cli, &display).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            display.print_error(&format!("Scan failed: {}", e));
            process::exit(2);
        }
    }
}

async fn run(cli: &Cli, display: &DisplayManager) -> Result<i32> {
    display.print_banner();

    let mut config = match &cli.config {
        Some(path) => {
            let config = ScanConfig::load_from_file(&path.to_string_lossy())?;
            display.print_success(&format!("Loaded configuration from {}", path.display()));
            config
        }
        None => ScanConfig::default(),
    };
    cli.apply_to(&mut config);

    if let Some(path_file) = &cli.path_file {
        config.paths = targets::load_paths(path_file).await?;
    }

    let hosts = match (&cli.url, &cli.list) {
        (Some(url), _) => vec![url.clone()],
        (None, Some(list)) => targets::load_hosts(list).await?,
        (None, None) => Vec::new(),
    };

    if hosts.is_empty() {
        display.print_error("No hosts to scan");
        return Ok(1);
    }

    display.print_config(&config, hosts.len());
    if !config.verify_ssl {
        display.print_warning("SSL certificate verification is disabled");
    }

    let start = Instant::now();
    let single_host = hosts.len() == 1;
    let coordinator = ScanCoordinator::new(config);

    let progress_bar = (!single_host && !display.is_quiet())
        .then(|| progress::create_progress_bar(hosts.len() as u64, "Scanning"));

    let mut results: Vec<ScanResult> = Vec::with_capacity(hosts.len());
    let mut stream = Box::pin(coordinator.scan_stream(hosts));

    while let Some(result) = stream.next().await {
        if display.should_print(&result, single_host) {
            match &progress_bar {
                Some(pb) => pb.suspend(|| display.print_result(&result)),
                None => display.print_result(&result),
            }
        }
        if let Some(pb) = &progress_bar {
            pb.inc(1);
        }
        results.push(result);
    }

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    display.print_summary(&ScanSummary::from_results(&results));

    if let Some(output) = &cli.output {
        reporting::save_results(&results, output, !cli.all_results).await?;
        display.print_success(&format!("Results saved to {}", output.display()));
    }

    display.print_success(&format!("Scan completed in {}", time::format_duration(start.elapsed())));

    Ok(reporting::exit_code(&results))
}
