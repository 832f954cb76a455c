//! Offline collect runs: feed dump on disk -> corpus files in a temp dir.
//!
//! No event here has a fetchable location, so no network access happens.

use std::fs;
use std::path::Path;

use rum_collector::{collect, CollectorConfig, FeedSource, Overrides};
use rum_resolver::persist::{
    load_corpus, FULL_FILE, UNIQUE_DESCRIPTION_FILE, WITHOUT_LOCATION_FILE, WITH_LOCATION_FILE,
};
use rum_resolver::{agent_inputs, MissingFieldAudit};

const FEED: &str = r#"{"rumBundles": [
  {"url": "https://site.test/page", "userAgent": "desktop:chrome", "events": [
    {"checkpoint": "error", "source": "https://site.test/app.js?x=pg_sleep(1):3:4", "target": "TypeError: a"},
    {"checkpoint": "error", "target": "Script error."},
    {"checkpoint": "error", "source": "https://site.test/app.js", "target": "script error."},
    {"checkpoint": "loadresource", "source": "https://site.test/img.png"}
  ]},
  {"url": "https://site.test/page?id=1 OR sleep(3)", "events": [
    {"checkpoint": "error", "target": "probe"}
  ]},
  {"url": "https://site.test/min", "events": [
    {"checkpoint": "error", "source": "https://site.test/vendor.min.js:1:1", "target": "x"}
  ]},
  {"events": [{"checkpoint": "error", "target": "orphan"}]}
]}"#;

fn write_feed(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("feed.json");
    fs::write(&path, FEED).unwrap();
    path
}

fn config_for(out: &Path) -> CollectorConfig {
    let mut config = CollectorConfig::default();
    config.apply_overrides(&Overrides {
        output_dir: Some(out.to_path_buf()),
        ..Default::default()
    });
    config
}

#[tokio::test]
async fn test_collect_from_feed_file_writes_all_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("corpus");
    let feed = write_feed(dir.path());

    let outcome = collect(&config_for(&out), &FeedSource::File(feed)).await.unwrap();

    for name in [FULL_FILE, WITH_LOCATION_FILE, WITHOUT_LOCATION_FILE, UNIQUE_DESCRIPTION_FILE] {
        assert!(out.join(name).exists(), "missing {}", name);
    }
    assert_eq!(outcome.stats.total_urls, 1);
    assert_eq!(outcome.stats.total_records, 3);
    assert_eq!(outcome.report.unsafe_sessions, 1);
    assert_eq!(outcome.report.sessions_without_url, 1);
    assert_eq!(outcome.report.minified_discarded, 1);
    assert_eq!(outcome.report.prefetched_links, 0);

    let full = load_corpus(&out.join(FULL_FILE)).unwrap();
    let records = full.get("https://site.test/page").unwrap();
    assert_eq!(records[0].line, Some(3));
    assert!(records[0]
        .snippet_text()
        .unwrap()
        .starts_with("Skipped code link"));
    assert_eq!(records[1].error_source, "");
    assert_eq!(records[2].code_link.as_deref(), Some("https://site.test/app.js"));
    assert_eq!(records[2].line, None);

    let unique = load_corpus(&out.join(UNIQUE_DESCRIPTION_FILE)).unwrap();
    assert_eq!(unique.record_count(), 2);
    let with = load_corpus(&out.join(WITH_LOCATION_FILE)).unwrap();
    assert_eq!(with.record_count(), 1);
    let without = load_corpus(&out.join(WITHOUT_LOCATION_FILE)).unwrap();
    assert_eq!(without.record_count(), 2);
}

#[tokio::test]
async fn test_written_corpus_feeds_reports_and_handoff() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("corpus");
    collect(&config_for(&out), &FeedSource::File(write_feed(dir.path())))
        .await
        .unwrap();

    let corpus = load_corpus(&out.join(FULL_FILE)).unwrap();
    let audit = MissingFieldAudit::of(&corpus);
    assert_eq!(audit.missing_location.len(), 2);
    assert_eq!(audit.missing_snippet, 2);

    let handoff = agent_inputs(&corpus, 1000);
    assert_eq!(handoff.len(), 1);
    assert_eq!(handoff.missing_location, 2);
    assert!(handoff.inputs[0].key.ends_with("_0"));
}

#[tokio::test]
async fn test_rerun_replaces_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("corpus");
    let feed = write_feed(dir.path());
    let config = config_for(&out);

    collect(&config, &FeedSource::File(feed.clone())).await.unwrap();
    let first = fs::read_to_string(out.join(FULL_FILE)).unwrap();
    collect(&config, &FeedSource::File(feed)).await.unwrap();
    let second = fs::read_to_string(out.join(FULL_FILE)).unwrap();

    assert_eq!(first, second);
    assert!(!out.join(format!("{}.tmp", FULL_FILE)).exists());
}

#[tokio::test]
async fn test_malformed_feed_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("corpus");
    let feed = dir.path().join("feed.json");
    fs::write(&feed, "{not json").unwrap();

    let err = collect(&config_for(&out), &FeedSource::File(feed)).await.unwrap_err();
    assert!(err.to_string().contains("RUM feed unavailable"));
    assert!(!out.exists());
}

#[tokio::test]
async fn test_malformed_events_do_not_abort_collect() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("corpus");
    let feed = dir.path().join("feed.json");
    fs::write(
        &feed,
        r#"{"rumBundles": [
  {"url": "https://site.test/page", "events": [
    "garbage",
    {"checkpoint": "error", "target": "Script error."}
  ]},
  {"url": "https://site.test/empty", "events": null}
]}"#,
    )
    .unwrap();

    let outcome = collect(&config_for(&out), &FeedSource::File(feed)).await.unwrap();
    assert_eq!(outcome.stats.total_records, 1);
    assert!(out.join(FULL_FILE).exists());
}

#[test]
fn test_config_file_layering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rum.toml");
    fs::write(
        &path,
        r#"
output_dir = "from-file"

[feed]
domain = "file.test"
domain_key = "k"
date = "2024-05-01"

[resolver]
minified_rule = "suffix"
fetch_concurrency = 2
"#,
    )
    .unwrap();

    let mut config = CollectorConfig::from_file(&path).unwrap();
    config.apply_vars(|key| (key == "RUM_OUTPUT_DIR").then(|| "from-env".to_string()));
    assert_eq!(config.output_dir, Path::new("from-env"));

    config.apply_overrides(&Overrides {
        date: chrono::NaiveDate::from_ymd_opt(2024, 5, 2),
        ..Default::default()
    });
    let request = config.feed_request().unwrap();
    assert_eq!(
        request.endpoint(),
        "https://bundles.aem.page/bundles/file.test/2024/05/02"
    );
    assert_eq!(config.resolver.fetch_concurrency, 2);
}
