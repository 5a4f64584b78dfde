use lattice::handlers::*;
use lattice_core::ScanOutcome;
use lattice_core::data::CrawlProgress;

#[test]
fn test_resolve_store_path_appends_db_file() {
    let path = resolve_store_path("/tmp/lattice-test/");
    assert_eq!(path.to_str().unwrap(), "/tmp/lattice-test/lattice.db");
}

#[test]
fn test_resolve_store_path_expands_tilde() {
    let path = resolve_store_path("~/.config/lattice/");
    let rendered = path.to_str().unwrap();
    assert!(!rendered.starts_with('~'));
    assert!(rendered.ends_with("/.config/lattice/lattice.db"));
}

#[test]
fn test_resolve_token_prefers_the_flag() {
    let flag = "flag-token".to_string();
    assert_eq!(resolve_token(Some(&flag)), Some("flag-token".to_string()));
}

#[test]
fn test_resolve_token_environment_fallback() {
    // All environment manipulation lives in this one test so the parallel
    // test runner cannot race on LATTICE_TOKEN.
    unsafe { std::env::remove_var("LATTICE_TOKEN") };
    assert_eq!(resolve_token(None), None);

    let empty = String::new();
    assert_eq!(resolve_token(Some(&empty)), None);

    unsafe { std::env::set_var("LATTICE_TOKEN", "env-token") };
    assert_eq!(resolve_token(None), Some("env-token".to_string()));

    // An explicit flag still wins over the environment.
    let flag = "flag-token".to_string();
    assert_eq!(resolve_token(Some(&flag)), Some("flag-token".to_string()));

    unsafe { std::env::remove_var("LATTICE_TOKEN") };
}

#[test]
fn test_format_outcome() {
    assert_eq!(
        format_outcome(&ScanOutcome::Completed {
            scanned: 5,
            skipped: 2
        }),
        "Scan complete: 5 scanned, 2 skipped"
    );
    assert_eq!(
        format_outcome(&ScanOutcome::Cancelled {
            scanned: 1,
            skipped: 0
        }),
        "Scan cancelled: 1 scanned, 0 skipped"
    );
}

#[test]
fn test_format_status_idle() {
    let status = format_status(12, None, false);
    assert!(status.contains("Connections mapped: 12"));
    assert!(status.contains("No scan in progress"));
    assert!(!status.contains("Stop requested"));
}

#[test]
fn test_format_status_scanning() {
    let progress = CrawlProgress {
        current: 3,
        total: Some(10),
    };
    let status = format_status(3, Some(progress), true);
    assert!(status.contains("Scan in progress: 3/10"));
    assert!(status.contains("Stop requested"));
}

#[test]
fn test_format_status_with_unknown_total() {
    let progress = CrawlProgress {
        current: 4,
        total: None,
    };
    let status = format_status(4, Some(progress), false);
    assert!(status.contains("Scan in progress: 4 so far"));
}
