use clap::Parser;
use rscan_rsc::{
    checker::{is_vulnerable_rce, is_vulnerable_safe, is_vulnerable_vercel},
    cli::Cli,
    config::{ScanConfig, TargetOs, Technique, MAX_WAF_BYPASS_SIZE_KB},
    payload::{self, PayloadOptions, BOUNDARY, FINGERPRINT, FINGERPRINT_OPERANDS},
    reporting::{self, ScanReport, ScanSummary},
    transport::HttpReply,
    types::ScanResult,
    utils::targets,
    Result, TransportError,
};

const ALL_TECHNIQUES: [Technique; 3] = [Technique::Safe, Technique::Rce, Technique::VercelWafBypass];

#[test]
fn test_config_default() {
    let config = ScanConfig::default();

    assert_eq!(config.timeout, None);
    assert_eq!(config.effective_timeout(), 10);
    assert_eq!(config.threads, 10);
    assert!(config.verify_ssl);
    assert_eq!(config.technique, Technique::Rce);
    assert_eq!(config.target_os, TargetOs::Unix);
    assert!(!config.waf_bypass);
    assert_eq!(config.waf_bypass_size_kb, 128);
    assert!(config.follow_redirects);
    assert_eq!(config.target_paths(), vec!["/".to_string()]);
}

#[test]
fn test_waf_bypass_raises_default_timeout_only() {
    let mut config = ScanConfig {
        waf_bypass: true,
        ..Default::default()
    };
    assert_eq!(config.effective_timeout(), 20);

    config.timeout = Some(10);
    assert_eq!(config.effective_timeout(), 10);

    config.timeout = Some(5);
    assert_eq!(config.effective_timeout(), 5);
}

#[test]
fn test_waf_padding_size_is_capped() {
    let config = ScanConfig {
        waf_bypass: true,
        waf_bypass_size_kb: usize::MAX,
        ..Default::default()
    };
    assert_eq!(config.waf_padding_kb(), Some(MAX_WAF_BYPASS_SIZE_KB));

    let disabled = ScanConfig {
        waf_bypass_size_kb: usize::MAX,
        ..Default::default()
    };
    assert_eq!(disabled.waf_padding_kb(), None);

    let artifact = payload::build_rce(&PayloadOptions {
        target_os: TargetOs::Unix,
        waf_padding_kb: Some(usize::MAX),
    });
    assert!(artifact.len() >= MAX_WAF_BYPASS_SIZE_KB * 1024);
    assert!(artifact.len() < MAX_WAF_BYPASS_SIZE_KB * 1024 + 4096);
}

#[test]
fn test_concurrency_never_zero() {
    let config = ScanConfig {
        threads: 0,
        ..Default::default()
    };
    assert_eq!(config.concurrency(), 1);
}

#[test]
fn test_target_paths_are_normalized_in_order() {
    let config = ScanConfig {
        paths: vec!["api".into(), "/_next".into(), "  ".into(), "/".into()],
        ..Default::default()
    };
    assert_eq!(config.target_paths(), vec!["/api", "/_next", "/"]);
}

#[test]
fn test_config_save_and_load() -> Result<()> {
    use tempfile::Builder;

    let mut config = ScanConfig::default();
    config.timeout = Some(15);
    config.technique = Technique::VercelWafBypass;
    config.target_os = TargetOs::Windows;
    config.paths = vec!["/api".to_string()];
    config.custom_headers.insert("x-api-key".to_string(), "secret".to_string());

    let temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    let temp_path = temp_file.path().to_str().unwrap();

    config.save_to_file(temp_path)?;
    let loaded = ScanConfig::load_from_file(temp_path)?;

    assert_eq!(loaded.timeout, Some(15));
    assert_eq!(loaded.technique, Technique::VercelWafBypass);
    assert_eq!(loaded.target_os, TargetOs::Windows);
    assert_eq!(loaded.paths, vec!["/api".to_string()]);
    assert_eq!(loaded.custom_headers.get("x-api-key").map(String::as_str), Some("secret"));

    Ok(())
}

#[test]
fn test_normalize_host() {
    assert_eq!(targets::normalize_host("example.com").unwrap(), "https://example.com");
    assert_eq!(targets::normalize_host("http://example.com").unwrap(), "http://example.com");
    assert_eq!(targets::normalize_host("https://example.com/").unwrap(), "https://example.com");
    assert_eq!(targets::normalize_host("  example.com:8443//  ").unwrap(), "https://example.com:8443");
    assert_eq!(targets::normalize_host("HTTP://Example.com").unwrap(), "HTTP://Example.com");

    assert!(targets::normalize_host("").is_err());
    assert!(targets::normalize_host("   ").is_err());
    assert!(targets::normalize_host("https://").is_err());
    assert!(targets::normalize_host("///").is_err());
}

#[test]
fn test_normalize_host_strips_whitespace_before_slash() {
    assert_eq!(targets::normalize_host("example.com /").unwrap(), "https://example.com");
    assert_eq!(targets::normalize_host("http://a\t/").unwrap(), "http://a");
    assert!(targets::normalize_host("https:// / ").is_err());
}

#[test]
fn test_normalize_host_is_idempotent() {
    let inputs = [
        "example.com",
        "example.com/",
        "http://example.com",
        "https://example.com/app/",
        " 10.0.0.1:3000 ",
        "HTTPS://Example.com//",
        "https:////odd",
        "ftp://example.com",
        "example.com /",
        "http://a\t/",
        "https://example.com/ / ",
    ];

    for input in inputs {
        let once = targets::normalize_host(input).unwrap();
        let twice = targets::normalize_host(&once).unwrap();
        assert_eq!(once, twice, "normalize_host not idempotent for {:?}", input);
        assert!(once.contains("://"), "{:?} has no scheme", once);
        assert!(!once.ends_with('/'), "{:?} has a trailing slash", once);
    }
}

#[test]
fn test_normalize_path() {
    assert_eq!(targets::normalize_path("api"), "/api");
    assert_eq!(targets::normalize_path("/api"), "/api");
    assert_eq!(targets::normalize_path(" _next "), "/_next");
}

#[test]
fn test_parse_headers() {
    let headers = targets::parse_headers(&["Authorization: Bearer token", "X-Test:value", "broken", ": empty"]);

    assert_eq!(headers.len(), 2);
    assert_eq!(headers.get("Authorization").map(String::as_str), Some("Bearer token"));
    assert_eq!(headers.get("X-Test").map(String::as_str), Some("value"));
}

#[tokio::test]
async fn test_list_loading() -> Result<()> {
    use tempfile::NamedTempFile;
    use tokio::fs;

    let temp_file = NamedTempFile::new().unwrap();
    fs::write(temp_file.path(), "# targets\nexample.com\n\n  https://a.test/  \n#skip\napi\n").await.unwrap();

    let hosts = targets::load_hosts(temp_file.path()).await?;
    assert_eq!(hosts, vec!["example.com", "https://a.test/", "api"]);

    let paths = targets::load_paths(temp_file.path()).await?;
    assert_eq!(paths, vec!["/example.com", "/https://a.test/", "/api"]);

    let missing = targets::load_hosts(std::path::Path::new("/definitely/not/here.txt")).await;
    assert!(missing.is_err());

    Ok(())
}

#[test]
fn test_content_type_boundary_matches_body() {
    for technique in ALL_TECHNIQUES {
        for waf_padding_kb in [None, Some(1)] {
            let options = PayloadOptions { target_os: TargetOs::Unix, waf_padding_kb };
            let artifact = technique.probe().build(&options);

            let prefix = "multipart/form-data; boundary=";
            assert!(artifact.content_type().starts_with(prefix), "{:?}", technique);
            let boundary = &artifact.content_type()[prefix.len()..];
            assert_eq!(boundary, BOUNDARY);

            let body = artifact.body_text();
            assert!(body.starts_with(&format!("--{}\r\n", boundary)), "{:?}", technique);
            assert!(body.ends_with(&format!("--{}--", boundary)), "{:?}", technique);

            // every delimiter line uses the same token
            for line in body.split("\r\n").filter(|l| l.starts_with("--")) {
                assert!(line == format!("--{}", boundary) || line == format!("--{}--", boundary), "{}", line);
            }
        }
    }
}

#[test]
fn test_safe_payload() {
    let body = payload::build_safe(&PayloadOptions::default()).body_text();
    assert!(body.contains(r#"["$1:aa:aa"]"#));
    assert!(!body.contains("execSync"));
}

#[test]
fn test_rce_payload_fingerprint() {
    let (a, b) = FINGERPRINT_OPERANDS;
    assert_eq!((a * b).to_string(), FINGERPRINT);

    let unix = payload::build_rce(&PayloadOptions::default()).body_text();
    assert!(unix.contains(&format!("echo $(({}*{}))", a, b)));
    assert!(unix.contains("NEXT_REDIRECT;push;/login?a=${res};307;"));
    assert!(unix.contains(r#""_formData":{"get":"$1:constructor:constructor"}"#));

    let windows = payload::build_rce(&PayloadOptions {
        target_os: TargetOs::Windows,
        waf_padding_kb: None,
    })
    .body_text();
    assert!(windows.contains(r#"powershell -c \"41*271\""#));
    assert!(!windows.contains("echo $(("));
}

#[test]
fn test_deterministic_builds() {
    let options = PayloadOptions::default();
    assert_eq!(payload::build_safe(&options), payload::build_safe(&options));
    assert_eq!(payload::build_rce(&options), payload::build_rce(&options));
    assert_eq!(payload::build_vercel_waf_bypass(&options), payload::build_vercel_waf_bypass(&options));
}

#[test]
fn test_vercel_payload_differs_from_rce() {
    let vercel = payload::build_vercel_waf_bypass(&PayloadOptions::default()).body_text();
    assert!(vercel.contains(r#"$3:\"$$:constructor:constructor"#));
    assert!(vercel.contains("name=\"3\"\r\n\r\n{\"\\\"$$\":{}}\r\n"));
    assert_ne!(vercel, payload::build_rce(&PayloadOptions::default()).body_text());
}

fn junk_field(body: &str) -> (String, String) {
    // first part is the junk: name="<12 letters>", blank line, junk, CRLF
    let name_start = body.find("name=\"").unwrap() + "name=\"".len();
    let name_end = name_start + body[name_start..].find('"').unwrap();
    let value_start = name_end + "\"\r\n\r\n".len();
    let value_end = value_start + body[value_start..].find("\r\n").unwrap();
    (body[name_start..name_end].to_string(), body[value_start..value_end].to_string())
}

#[test]
fn test_waf_bypass_padding() {
    let plain = payload::build_rce(&PayloadOptions::default());
    let options = PayloadOptions {
        target_os: TargetOs::Unix,
        waf_padding_kb: Some(128),
    };
    let first = payload::build_rce(&options);
    let second = payload::build_rce(&options);

    assert!(first.len() >= plain.len() + 128 * 1024);

    let (name_a, junk_a) = junk_field(&first.body_text());
    let (name_b, junk_b) = junk_field(&second.body_text());

    assert_eq!(name_a.len(), 12);
    assert!(name_a.chars().all(|c| c.is_ascii_lowercase()));
    assert_eq!(junk_a.len(), 128 * 1024);
    assert!(junk_a.chars().all(|c| c.is_ascii_alphanumeric()));

    assert_ne!(name_a, name_b);
    assert_ne!(junk_a, junk_b);

    // the exploit fields come after the junk
    let body = first.body_text();
    assert!(body.find(&name_a).unwrap() < body.find("name=\"0\"").unwrap());
}

#[test]
fn test_rce_checker() {
    let hit = HttpReply::new(307).with_header("Location", "/login?a=11111;307;");
    assert!(is_vulnerable_rce(&hit));
    assert!(is_vulnerable_vercel(&hit));

    let action_redirect = HttpReply::new(303).with_header("X-Action-Redirect", "/login?a=11111;push");
    assert!(is_vulnerable_rce(&action_redirect));

    // server actions report the redirect in a header on a 200
    let action_redirect_ok = HttpReply::new(200).with_header("X-Action-Redirect", "/login?a=11111;push");
    assert!(is_vulnerable_rce(&action_redirect_ok));

    let unrelated = HttpReply::new(200).with_body("<html>hello</html>");
    assert!(!is_vulnerable_rce(&unrelated));

    let wrong_value = HttpReply::new(307).with_header("Location", "/login?a=111112");
    assert!(!is_vulnerable_rce(&wrong_value));

    let not_redirect = HttpReply::new(200).with_header("Location", "/login?a=11111");
    assert!(!is_vulnerable_rce(&not_redirect));

    let elsewhere = HttpReply::new(302).with_header("Location", "/home");
    assert!(!is_vulnerable_rce(&elsewhere));
}

#[test]
fn test_safe_checker() {
    let body = "0:{\"a\":\"$@1\"}\n1:E{\"digest\":\"2971658870\"}\n";

    assert!(is_vulnerable_safe(&HttpReply::new(500).with_body(body)));
    assert!(!is_vulnerable_safe(&HttpReply::new(200).with_body(body)));
    assert!(!is_vulnerable_safe(&HttpReply::new(500).with_body("Internal Server Error")));
    assert!(!is_vulnerable_safe(&HttpReply::new(500).with_header("Server", "Vercel").with_body(body)));
    assert!(!is_vulnerable_safe(&HttpReply::new(500).with_header("Netlify-Vary", "query").with_body(body)));
}

#[test]
fn test_probe_pairs_payload_and_checker() {
    let redirect = HttpReply::new(307).with_header("location", "/login?a=11111;307;");
    assert!(Technique::Rce.probe().is_vulnerable(&redirect));
    assert!(Technique::VercelWafBypass.probe().is_vulnerable(&redirect));
    assert!(!Technique::Safe.probe().is_vulnerable(&redirect));

    for technique in ALL_TECHNIQUES {
        assert_eq!(technique.probe().technique, technique);
    }
}

#[test]
fn test_reply_raw_capture_is_truncated() {
    let reply = HttpReply::new(500)
        .with_header("Content-Type", "text/x-component")
        .with_body(&"é".repeat(3000));
    let raw = reply.raw();

    assert!(raw.starts_with("HTTP/1.1 500 Internal Server Error\r\ncontent-type: text/x-component\r\n\r\n"));
    let body = raw.split("\r\n\r\n").nth(1).unwrap();
    assert_eq!(body.chars().count(), 2000);
}

#[test]
fn test_scan_result() {
    let result = ScanResult::new("https://example.com");
    assert_eq!(result.vulnerable, None);
    assert!(result.timestamp.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(&result.timestamp).is_ok());
    assert!(!result.is_redirected());

    let mut redirected = result.clone();
    redirected.tested_url = Some("https://example.com/".into());
    redirected.final_url = Some("https://example.com/".into());
    assert!(!redirected.is_redirected());
    redirected.final_url = Some("https://example.com/en/".into());
    assert!(redirected.is_redirected());
}

#[test]
fn test_scan_result_serialization() {
    let mut result = ScanResult::new("https://example.com");
    result.status_code = Some(303);

    let value = serde_json::to_value(&result).unwrap();
    let object = value.as_object().unwrap();
    for field in ["host", "vulnerable", "status_code", "error", "request", "response", "final_url", "tested_url", "timestamp"] {
        assert!(object.contains_key(field), "missing {}", field);
    }
    assert!(object["vulnerable"].is_null());
    assert_eq!(object["status_code"], 303);
}

#[tokio::test]
async fn test_save_results_and_exit_code() -> Result<()> {
    let mut vulnerable = ScanResult::new("https://a.test");
    vulnerable.vulnerable = Some(true);
    let mut safe = ScanResult::new("https://b.test");
    safe.vulnerable = Some(false);
    let errored = ScanResult::errored("https://c.test", "Connection error: refused");

    let results = vec![vulnerable, safe.clone(), errored.clone()];
    assert_eq!(reporting::exit_code(&results), 1);
    assert_eq!(reporting::exit_code(&[safe, errored]), 0);
    assert_eq!(reporting::exit_code(&[]), 0);

    let summary = ScanSummary::from_results(&results);
    assert_eq!(summary, ScanSummary { total: 3, vulnerable: 1, safe: 1, errors: 1 });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("results.json");

    reporting::save_results(&results, &path, true).await?;
    let report: ScanReport = serde_json::from_str(&tokio::fs::read_to_string(&path).await?)?;
    assert_eq!(report.total_results, 1);
    assert_eq!(report.results[0].host, "https://a.test");
    assert!(report.scan_time.ends_with('Z'));

    reporting::save_results(&results, &path, false).await?;
    let report: ScanReport = serde_json::from_str(&tokio::fs::read_to_string(&path).await?)?;
    assert_eq!(report.total_results, 3);

    Ok(())
}

#[test]
fn test_transport_error_messages() {
    assert_eq!(TransportError::Timeout.to_string(), "Request timeout");
    assert!(TransportError::Timeout.is_timeout());
    assert!(TransportError::Connection("refused".into()).to_string().starts_with("Connection error"));
    assert!(TransportError::Tls("bad cert".into()).to_string().starts_with("SSL error"));
    assert!(!TransportError::Other("x".into()).is_timeout());
}

#[test]
fn test_cli_overrides_config() {
    let cli = Cli::parse_from([
        "rscan-rsc", "-l", "hosts.txt", "-t", "25", "-k", "--waf-bypass", "--windows",
        "-H", "Cookie: a=b", "--path", "api", "--path", "/_next", "--no-follow-redirects",
    ]);

    let mut config = ScanConfig::default();
    cli.apply_to(&mut config);

    assert_eq!(config.threads, 25);
    assert!(!config.verify_ssl);
    assert!(config.waf_bypass);
    assert_eq!(config.effective_timeout(), 20);
    assert_eq!(config.target_os, TargetOs::Windows);
    assert_eq!(config.custom_headers.get("Cookie").map(String::as_str), Some("a=b"));
    assert_eq!(config.paths, vec!["/api", "/_next"]);
    assert!(!config.follow_redirects);
    assert_eq!(config.technique, Technique::Rce);
}

#[test]
fn test_cli_technique_flags() {
    let safe = Cli::parse_from(["rscan-rsc", "-u", "example.com", "--safe-check"]);
    assert_eq!(safe.technique(), Some(Technique::Safe));

    let vercel = Cli::parse_from(["rscan-rsc", "-u", "example.com", "--vercel-waf-bypass"]);
    assert_eq!(vercel.technique(), Some(Technique::VercelWafBypass));

    assert!(Cli::try_parse_from(["rscan-rsc", "-u", "a", "--safe-check", "--vercel-waf-bypass"]).is_err());
    assert!(Cli::try_parse_from(["rscan-rsc"]).is_err());
    assert!(Cli::try_parse_from(["rscan-rsc", "-u", "a", "-l", "b"]).is_err());
}
