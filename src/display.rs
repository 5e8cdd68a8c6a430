use crate::config::ScanConfig;
use crate::reporting::ScanSummary;
use crate::types::ScanResult;
use colored::*;

/// Terminal rendering. Built once in `main` and never mutated; the scanner
/// core does not know it exists.
#[derive(Debug, Clone, Copy)]
pub struct DisplayManager {
    use_colors: bool,
    quiet_mode: bool,
    verbose: bool,
}

impl DisplayManager {
    pub fn new(no_color: bool, quiet: bool, verbose: bool) -> Self {
        let use_colors = !no_color
            && std::env::var("NO_COLOR").is_err()
            && std::env::var("TERM").map_or(true, |term| term != "dumb");

        Self {
            use_colors,
            quiet_mode: quiet,
            verbose,
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet_mode
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Vulnerable hosts are always shown; safe and errored hosts only in
    /// verbose mode, or for a single-host scan that is not quiet.
    pub fn should_print(&self, result: &ScanResult, single_host: bool) -> bool {
        if result.is_vulnerable() {
            return true;
        }
        if self.quiet_mode {
            return false;
        }
        self.verbose || single_host
    }

    pub fn print_banner(&self) {
        if self.quiet_mode { return; }

        let title = "RSCAN RSC - React2Shell Scanner";
        let subtitle = "CVE-2025-55182 & CVE-2025-66478 Detection";

        if self.use_colors {
            let width = subtitle.len().max(title.len());
            println!();
            println!("  {}", "┌─".bright_cyan().to_string() + &"─".repeat(width + 2) + "─┐");
            println!("  {} {} {}",
                "│".bright_cyan(),
                format!("{:^width$}", title, width = width + 2).bright_red().bold(),
                "│".bright_cyan()
            );
            println!("  {} {} {}",
                "│".bright_cyan(),
                format!("{:^width$}", subtitle, width = width + 2).yellow(),
                "│".bright_cyan()
            );
            println!("  {}", "└─".bright_cyan().to_string() + &"─".repeat(width + 2) + "─┘");
            println!();
        } else {
            let border = "=".repeat(subtitle.len() + 4);
            println!("\n{}", border);
            println!("  {}  ", title);
            println!("  {}  ", subtitle);
            println!("{}\n", border);
        }
    }

    pub fn print_config(&self, config: &ScanConfig, host_count: usize) {
        if self.quiet_mode { return; }

        let paths = config.target_paths();
        let mut paths_display = paths.iter().take(2).cloned().collect::<Vec<_>>().join(", ");
        if paths.len() > 2 {
            paths_display.push_str(&format!(" (+{} more)", paths.len() - 2));
        }

        let mut options = Vec::new();
        if config.target_os == crate::config::TargetOs::Windows {
            options.push("Windows".to_string());
        }
        if let Some(kb) = config.waf_padding_kb() {
            options.push(format!("WAF bypass ({}KB)", kb));
        }
        if !config.verify_ssl {
            options.push("No SSL verification".to_string());
        }
        if !config.follow_redirects {
            options.push("No redirects".to_string());
        }

        let rows = [
            ("Targets", format!("{} host(s)", host_count)),
            ("Paths", paths_display),
            ("Threads", config.concurrency().to_string()),
            ("Timeout", format!("{}s", config.effective_timeout())),
            ("Mode", config.technique.label().to_string()),
            ("Options", if options.is_empty() { "-".to_string() } else { options.join(", ") }),
        ];

        self.print_section_header("SCAN CONFIGURATION");
        for (label, value) in rows {
            if self.use_colors {
                println!("  {} {:<9} {}", "•".bright_blue(), format!("{}:", label).bright_white().bold(), value.yellow());
            } else {
                println!("  {:<9} {}", format!("{}:", label), value);
            }
        }
        println!();
    }

    pub fn print_result(&self, result: &ScanResult) {
        match result.vulnerable {
            Some(true) => self.print_vulnerable(result),
            Some(false) => self.print_safe(result),
            None => self.print_undetermined(result),
        }

        if self.verbose {
            self.print_response_preview(result);
        }
    }

    fn print_vulnerable(&self, result: &ScanResult) {
        let status = result.status_code.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());

        if self.use_colors {
            println!("\n  {}", "[VULNERABLE]".bright_red().bold());
            println!("  ├─ {} {}", "Target:".cyan(), result.host.bright_white().bold());
            println!("  ├─ {} {}", "Status:".cyan(), format!("[{}]", status).yellow());
            if result.is_redirected() {
                println!("  └─ {} {}", "Redirect:".magenta(), result.final_url.as_deref().unwrap_or_default());
            } else {
                println!("  └─ {}", "CVE-2025-55182/66478 DETECTED!".bright_red().bold());
            }
        } else {
            println!("\n  [VULNERABLE]");
            println!("  ├─ Target: {}", result.host);
            println!("  ├─ Status: [{}]", status);
            if result.is_redirected() {
                println!("  └─ Redirect: {}", result.final_url.as_deref().unwrap_or_default());
            } else {
                println!("  └─ CVE-2025-55182/66478 DETECTED!");
            }
        }
    }

    fn print_safe(&self, result: &ScanResult) {
        let detail = match (result.status_code, &result.error) {
            (Some(status), _) => format!("[{}]", status),
            (None, Some(error)) => format!("- {}", error),
            (None, None) => String::new(),
        };

        if self.use_colors {
            println!("  {} {} {}", "[SAFE]".bright_green().bold(), result.host.white(), detail.green());
        } else {
            println!("  [SAFE] {} {}", result.host, detail);
        }

        if result.is_redirected() && self.verbose {
            println!("    └─ Redirect: {}", result.final_url.as_deref().unwrap_or_default());
        }
    }

    fn print_undetermined(&self, result: &ScanResult) {
        let error = result.error.as_deref().unwrap_or("Unknown error");

        if self.use_colors {
            println!("  {} {}", "[ERROR]".bright_yellow().bold(), result.host.white());
            println!("    └─ {}", error.yellow());
        } else {
            println!("  [ERROR] {}", result.host);
            println!("    └─ {}", error);
        }
    }

    fn print_response_preview(&self, result: &ScanResult) {
        let response = match &result.response {
            Some(response) => response,
            None => return,
        };

        let lines: Vec<&str> = response.split("\r\n").take(10).collect();
        if self.use_colors {
            println!("\n  {}", "Response Preview:".cyan().bold());
        } else {
            println!("\n  Response Preview:");
        }
        for (idx, line) in lines.iter().enumerate() {
            let prefix = if idx + 1 < lines.len() { "  │ " } else { "  └─" };
            println!("{}{}", prefix, line.truncate_with_ellipsis(100));
        }
    }

    pub fn print_summary(&self, summary: &ScanSummary) {
        if self.quiet_mode { return; }

        println!();
        self.print_section_header("SCAN SUMMARY");

        if self.use_colors {
            let vulnerable = if summary.vulnerable > 0 {
                summary.vulnerable.to_string().bright_red().bold()
            } else {
                summary.vulnerable.to_string().bright_green().bold()
            };
            println!("  {:<16} {}", "Total Scanned:".bright_white().bold(), summary.total.to_string().cyan().bold());
            println!("  {:<16} {}", "Vulnerable:".bright_white().bold(), vulnerable);
            println!("  {:<16} {}", "Safe:".bright_white().bold(), summary.safe.to_string().green());
            println!("  {:<16} {}", "Errors:".bright_white().bold(), summary.errors.to_string().yellow());
            println!();

            if summary.vulnerable > 0 {
                println!("  {} {} {} vulnerable host(s) detected!",
                    "[!]".yellow(), "ACTION REQUIRED:".bright_red().bold(), summary.vulnerable);
            } else {
                println!("  {} No vulnerabilities detected.", "[+] All systems secure!".bright_green());
            }
        } else {
            println!("  {:<16} {}", "Total Scanned:", summary.total);
            println!("  {:<16} {}", "Vulnerable:", summary.vulnerable);
            println!("  {:<16} {}", "Safe:", summary.safe);
            println!("  {:<16} {}", "Errors:", summary.errors);
            println!();

            if summary.vulnerable > 0 {
                println!("  [!] ACTION REQUIRED: {} vulnerable host(s) detected!", summary.vulnerable);
            } else {
                println!("  [+] All systems secure! No vulnerabilities detected.");
            }
        }
        println!();
    }

    /// Print a section header with consistent styling
    pub fn print_section_header(&self, title: &str) {
        if self.quiet_mode { return; }

        if self.use_colors {
            println!("  {}", title.bright_cyan().bold());
            println!("  {}", "─".repeat(title.chars().count()).bright_black());
        } else {
            println!("  {}", title);
            println!("  {}", "-".repeat(title.chars().count()));
        }
    }

    /// Print a clean success message
    pub fn print_success(&self, message: &str) {
        if self.quiet_mode { return; }

        if self.use_colors {
            println!("  {} {}", "✓".bright_green().bold(), message.green());
        } else {
            println!("[✓] {}", message);
        }
    }

    /// Print a clean warning message
    pub fn print_warning(&self, message: &str) {
        if self.quiet_mode { return; }

        if self.use_colors {
            println!("  {} {}", "!".bright_yellow().bold(), message.yellow());
        } else {
            println!("[!] {}", message);
        }
    }

    /// Print a clean error message
    pub fn print_error(&self, message: &str) {
        if self.use_colors {
            eprintln!("  {} {}", "✗".bright_red().bold(), message.red().bold());
        } else {
            eprintln!("[✗] {}", message);
        }
    }
}

/// String extension trait for better output formatting
trait StringExt {
    fn truncate_with_ellipsis(&self, max_len: usize) -> String;
}

impl StringExt for str {
    fn truncate_with_ellipsis(&self, max_len: usize) -> String {
        if self.chars().count() <= max_len {
            self.to_string()
        } else {
            let kept: String = self.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}
