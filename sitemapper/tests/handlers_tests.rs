use sitemapper::handlers::*;
use sitemapper::command_argument_builder;
use sitemapper_core::{Config, ConfigError, ConfigOptions, MapType, OutputFormat};
use sitemapper_scanner::EvictionPolicy;
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

// ============================================================================
// Argument Parsing Tests
// ============================================================================

#[test]
fn test_cli_requires_target_url() {
    let result = command_argument_builder().try_get_matches_from(["sitemapper"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_defaults() {
    let matches = command_argument_builder()
        .try_get_matches_from(["sitemapper", "https://monzo.com"])
        .unwrap();
    let options = options_from_matches(&matches);

    assert_eq!(options.target, "https://monzo.com");
    assert_eq!(options.filename, None);
    assert_eq!(options.map_type, "hash");
    assert_eq!(options.format, "json");
    assert_eq!(options.timeout_secs, 10);
    assert_eq!(options.workers, None);
    assert_eq!(options.deadline_secs, None);
    assert!(!options.verbose);
    assert!(!options.parallel);
    assert!(!options.keep_evicted);
}

#[test]
fn test_cli_all_flags() {
    let matches = command_argument_builder()
        .try_get_matches_from([
            "sitemapper",
            "https://monzo.com",
            "--filename",
            "monzo",
            "--map-type",
            "tree",
            "--format",
            "xml",
            "--verbose",
            "--parallel",
            "--workers",
            "16",
            "--timeout",
            "3",
            "--deadline",
            "120",
            "--keep-evicted",
        ])
        .unwrap();
    let config = Config::new(options_from_matches(&matches)).unwrap();

    assert_eq!(config.filename, "monzo.xml");
    assert_eq!(config.map_type, MapType::Tree);
    assert_eq!(config.format, OutputFormat::Xml);
    assert_eq!(config.concurrency, 16);
    assert_eq!(config.timeout.as_secs(), 3);
    assert_eq!(config.deadline.map(|d| d.as_secs()), Some(120));
    assert_eq!(config.eviction, EvictionPolicy::Retain);
    assert!(config.verbose);
}

#[test]
fn test_cli_rejects_non_numeric_workers() {
    let result = command_argument_builder().try_get_matches_from([
        "sitemapper",
        "https://monzo.com",
        "--workers",
        "many",
    ]);
    assert!(result.is_err());
}

// ============================================================================
// Exit Code Tests
// ============================================================================

#[test]
fn test_exit_code_for_config_error() {
    let err = Config::new(ConfigOptions::new("not a url")).unwrap_err();
    let err = anyhow::Error::from(err);
    assert_eq!(exit_code(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_exit_code_for_config_error_with_context() {
    let err = anyhow::Error::from(ConfigError::UnknownFormat("yaml".into()))
        .context("while building config");
    assert_eq!(exit_code(&err), EXIT_CONFIG_ERROR);
}

#[test]
fn test_exit_code_for_other_errors() {
    let err = anyhow::anyhow!("disk full");
    assert_eq!(exit_code(&err), EXIT_FAILURE);
}

#[tokio::test]
async fn test_handle_crawl_unknown_format_is_config_error() {
    let matches = command_argument_builder()
        .try_get_matches_from(["sitemapper", "https://monzo.com", "--format", "yaml"])
        .unwrap();

    let err = handle_crawl(&matches).await.unwrap_err();
    assert_eq!(exit_code(&err), EXIT_CONFIG_ERROR);
}

// ============================================================================
// Display Helper Tests
// ============================================================================

#[test]
fn test_display_path() {
    assert_eq!(display_path("https://monzo.com/blog/post"), "/blog/post");
    assert_eq!(display_path("https://monzo.com"), "/");
    assert_eq!(display_path("not a url"), "not a url");
}

// ============================================================================
// End-to-End Tests
// ============================================================================

async fn mount_site(server: &MockServer) {
    let pages = [
        ("/", r#"<a href="/about">About</a><a href="/blog">Blog</a>"#),
        ("/about", r#"<a href="/">Home</a>"#),
        ("/blog", r#"<a href="/blog/first">First</a><a href="/brochure.pdf">PDF</a>"#),
        ("/blog/first", "<p>first post</p>"),
    ];
    for (route, body) in pages {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body, "text/html; charset=utf-8"),
            )
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/brochure.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(b"%PDF".to_vec(), "application/pdf"),
        )
        .mount(server)
        .await;
}

fn config_for(server: &MockServer, dir: &TempDir, map_type: &str, format: &str) -> Config {
    let mut options = ConfigOptions::new(server.uri());
    options.filename = Some(dir.path().join("sitemap").to_string_lossy().into_owned());
    options.map_type = map_type.to_string();
    options.format = format.to_string();
    options.workers = Some(4);
    Config::new(options).unwrap()
}

#[tokio::test]
async fn test_crawl_and_write_hash_json() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&server, &temp_dir, "hash", "json");

    let report = run_crawl(&config, CancellationToken::new(), true)
        .await
        .unwrap();
    let path = write_output(&config, &report).unwrap();

    assert_eq!(path, temp_dir.path().join("sitemap.json"));
    assert_eq!(report.total_pages(), 4);
    assert_eq!(report.evicted.len(), 1);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["url"], format!("{}/", server.uri()));
    assert_eq!(rows[0]["total_links"], 2);
}

#[tokio::test]
async fn test_crawl_and_write_tree_xml() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&server, &temp_dir, "tree", "xml");

    let report = run_crawl(&config, CancellationToken::new(), true)
        .await
        .unwrap();
    let path = write_output(&config, &report).unwrap();

    assert_eq!(path, temp_dir.path().join("sitemap.xml"));
    let xml = fs::read_to_string(&path).unwrap();
    assert!(xml.contains("<site>"));
    assert!(xml.contains("<total_pages>4</total_pages>"));
    assert!(xml.contains(&format!("<url>{}/blog/first</url>", server.uri())));
    assert!(!xml.contains("brochure.pdf"));
}

#[tokio::test]
async fn test_cancelled_crawl_still_writes_output() {
    let server = MockServer::start().await;
    mount_site(&server).await;
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(&server, &temp_dir, "hash", "json");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_crawl(&config, cancel, true).await.unwrap();
    let path = write_output(&config, &report).unwrap();

    assert!(report.cancelled);
    assert!(path.exists());
}
