//! Preference file persistence and the CLI paths that write it.
use std::fs;
use std::process::Command;
use std::sync::Mutex;

use vllmtop::prefs::{FilePrefs, PreferenceStore};

// Global lock to serialize tests that mutate process-wide environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn run_vllmtop(config_home: &std::path::Path, args: &[&str]) -> (bool, String) {
    let exe = env!("CARGO_BIN_EXE_vllmtop");
    let output = Command::new(exe)
        .env("XDG_CONFIG_HOME", config_home)
        .args(args)
        .output()
        .expect("run vllmtop");
    let ok = output.status.success();
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (ok, text)
}

#[test]
fn file_prefs_survive_reopen() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("nested").join("prefs.json");
    {
        let p = FilePrefs::open(path.clone());
        assert!(p.server_url().is_none());
        p.save_server_url("http://10.0.0.5:9090").unwrap();
        p.record_model_usage("qwen-32b", 1_700_000_000_000).unwrap();
        p.record_model_usage("llama-70b", 5).unwrap();
    }
    let p = FilePrefs::open(path.clone());
    assert_eq!(p.server_url().as_deref(), Some("http://10.0.0.5:9090"));
    let usage = p.model_usage();
    assert_eq!(usage.len(), 2);
    assert_eq!(usage["qwen-32b"], 1_700_000_000_000);

    // flat key layout on disk
    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\"server_url\""));
    assert!(raw.contains("\"model_usage_llama-70b\""));
}

#[test]
fn corrupt_prefs_read_as_empty() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("prefs.json");
    fs::write(&path, "{ not json").unwrap();
    let p = FilePrefs::open(path);
    assert!(p.server_url().is_none());
    assert!(p.model_usage().is_empty());
}

#[test]
fn default_location_follows_xdg_config_home() {
    let _guard = ENV_LOCK.lock().unwrap();
    let td = tempfile::tempdir().unwrap();
    std::env::set_var("XDG_CONFIG_HOME", td.path());
    assert_eq!(
        vllmtop::prefs::prefs_path(),
        td.path().join("vllmtop").join("prefs.json")
    );
    std::env::remove_var("XDG_CONFIG_HOME");
}

#[test]
fn dry_run_persists_normalized_url() {
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_vllmtop(td.path(), &["--dry-run", "  http://1.2.3.4:9090/ "]);
    assert!(ok, "dry run failed: {out}");
    assert!(out.contains("server: http://1.2.3.4:9090\n"), "{out}");

    let data = fs::read_to_string(td.path().join("vllmtop").join("prefs.json"))
        .expect("prefs.json created");
    assert!(data.contains("\"http://1.2.3.4:9090\""), "{data}");

    // a later run without a URL picks up the saved one
    let (ok, out) = run_vllmtop(td.path(), &["--dry-run"]);
    assert!(ok);
    assert!(out.contains("server: http://1.2.3.4:9090"), "{out}");
}

#[test]
fn invalid_url_is_rejected_and_not_saved() {
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_vllmtop(td.path(), &["--dry-run", "ftp://host"]);
    assert!(!ok);
    assert!(out.contains("scheme must be http or https"), "{out}");
    assert!(!td.path().join("vllmtop").join("prefs.json").exists());
}
