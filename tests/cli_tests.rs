//! End-to-End CLI Tests for agtok
//!
//! These tests run the binary against a temporary home and preset directory
//! and check both the output and the files left on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn home(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("home")
}

fn presets_dir(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("presets")
}

/// The binary with every path override cleared and color disabled.
fn bare_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("agtok").unwrap();
    cmd.env("NO_COLOR", "1")
        .env("XDG_CONFIG_HOME", temp_dir.path().join("xdg"))
        .env_remove("AGTOK_HOME")
        .env_remove("AGTOK_PRESETS_DIR")
        .env_remove("AGTOK_CONFIG");
    cmd
}

fn agtok_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = bare_cmd(temp_dir);
    cmd.arg("--home")
        .arg(home(temp_dir))
        .arg("--presets-dir")
        .arg(presets_dir(temp_dir));
    cmd
}

fn add_preset(temp_dir: &TempDir, agent: &str, alias: &str, url: &str, token: &str) {
    agtok_cmd(temp_dir)
        .args(["presets", "add", "--agent", agent, "--alias", alias])
        .args(["--url", url, "--token", token])
        .assert()
        .success();
}

fn write_home_file(temp_dir: &TempDir, rel: &str, content: &str) {
    let path = home(temp_dir).join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

// =============================================================================
// PRESETS COMMAND TESTS
// =============================================================================

#[test]
fn test_cli_presets_add_and_list_masks_token() {
    let temp_dir = TempDir::new().unwrap();

    agtok_cmd(&temp_dir)
        .args(["presets", "add", "--agent", "claude", "--alias", "work"])
        .args(["--url", "https://proxy.example.com", "--token", "sk-abcdef1234"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added preset 'work' for claude"));

    agtok_cmd(&temp_dir)
        .args(["presets", "list", "--agent", "claude-code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("work"))
        .stdout(predicate::str::contains("****1234"))
        .stdout(predicate::str::contains("sk-abcdef1234").not());

    assert!(presets_dir(&temp_dir).join("claude.json").exists());
}

#[test]
fn test_cli_presets_add_duplicate_fails() {
    let temp_dir = TempDir::new().unwrap();
    add_preset(&temp_dir, "gemini", "a", "https://a", "t");

    agtok_cmd(&temp_dir)
        .args(["presets", "add", "--agent", "gemini", "--alias", "a"])
        .args(["--url", "https://b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alias already exists: a"));
}

#[test]
fn test_cli_presets_add_rejects_invalid_url() {
    let temp_dir = TempDir::new().unwrap();

    agtok_cmd(&temp_dir)
        .args(["presets", "add", "--agent", "codex", "--url", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));

    assert!(!presets_dir(&temp_dir).join("codex.json").exists());
}

#[test]
fn test_cli_presets_rename_update_remove() {
    let temp_dir = TempDir::new().unwrap();
    add_preset(&temp_dir, "codex", "old", "https://a", "tok-1");

    agtok_cmd(&temp_dir)
        .args(["presets", "rename", "--agent", "codex", "--from", "old", "--to", "new"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Renamed preset 'old' -> 'new'"));

    agtok_cmd(&temp_dir)
        .args(["presets", "update", "--agent", "codex", "--alias", "new"])
        .args(["--model", "gpt-5", "--clear-token"])
        .assert()
        .success();

    let raw = fs::read_to_string(presets_dir(&temp_dir).join("codex.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["presets"][0]["alias"], "new");
    assert_eq!(json["presets"][0]["token"], "");
    assert_eq!(json["presets"][0]["model"], "gpt-5");
    assert_eq!(json["config_version"], env!("CARGO_PKG_VERSION"));

    agtok_cmd(&temp_dir)
        .args(["presets", "remove", "--agent", "codex", "--alias", "new"])
        .assert()
        .success();

    agtok_cmd(&temp_dir)
        .args(["presets", "remove", "--agent", "codex", "--alias", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("preset not found: new"));
}

// =============================================================================
// APPLY COMMAND TESTS
// =============================================================================

#[test]
fn test_cli_apply_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    add_preset(&temp_dir, "claude", "work", "https://proxy", "sk-000011112222");

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "claude", "--alias", "work", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://proxy"))
        .stdout(predicate::str::contains("****2222"))
        .stdout(predicate::str::contains("Dry run"));

    assert!(!home(&temp_dir).join(".claude/settings.json").exists());
}

#[test]
fn test_cli_apply_preset_writes_settings() {
    let temp_dir = TempDir::new().unwrap();
    write_home_file(&temp_dir, ".claude/settings.json", r#"{"theme": "dark"}"#);
    add_preset(&temp_dir, "claude", "work", "https://proxy", "sk-1");

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "claude", "--alias", "work"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("Applied"));

    let raw = fs::read_to_string(home(&temp_dir).join(".claude/settings.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["theme"], "dark");
    assert_eq!(json["env"]["ANTHROPIC_BASE_URL"], "https://proxy");
    assert_eq!(json["env"]["ANTHROPIC_AUTH_TOKEN"], "sk-1");
}

#[test]
fn test_cli_apply_url_and_clear_model() {
    let temp_dir = TempDir::new().unwrap();
    write_home_file(
        &temp_dir,
        ".gemini/.env",
        "GEMINI_API_KEY=keep\nGEMINI_MODEL=gemini-old\n",
    );

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "gemini", "--url", "https://g", "--clear-model"])
        .assert()
        .success();

    let content = fs::read_to_string(home(&temp_dir).join(".gemini/.env")).unwrap();
    assert_eq!(content, "GOOGLE_GEMINI_BASE_URL=https://g\nGEMINI_API_KEY=keep\n");
}

#[test]
fn test_cli_apply_errors() {
    let temp_dir = TempDir::new().unwrap();

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "cursor", "--url", "https://h"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no adapter available for agent: cursor"));

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "codex", "--alias", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("preset not found: missing"));

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "codex", "--url", "ftp-no-host:"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));

    agtok_cmd(&temp_dir)
        .args(["apply", "--agent", "codex"])
        .assert()
        .failure();

    assert!(!home(&temp_dir).join(".codex").exists());
}

// =============================================================================
// INIT / LIST / PATHS COMMAND TESTS
// =============================================================================

#[test]
fn test_cli_init_snapshots_and_dedupes() {
    let temp_dir = TempDir::new().unwrap();
    write_home_file(
        &temp_dir,
        ".gemini/.env",
        "GOOGLE_GEMINI_BASE_URL=https://g\nGEMINI_API_KEY=abc12345\nGEMINI_MODEL=gemini-2.5-pro\n",
    );

    agtok_cmd(&temp_dir)
        .args(["init", "--agent", "gemini"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added preset 'snap-default'"));

    agtok_cmd(&temp_dir)
        .args(["init", "--agent", "gemini"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "identical preset already exists (alias: snap-default)",
        ));

    let raw = fs::read_to_string(presets_dir(&temp_dir).join("gemini.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["presets"].as_array().unwrap().len(), 1);
    assert_eq!(json["presets"][0]["model"], "gemini-2.5-pro");
}

#[test]
fn test_cli_init_suffixes_colliding_alias() {
    let temp_dir = TempDir::new().unwrap();
    add_preset(&temp_dir, "claude", "snap-default", "https://other", "x");
    write_home_file(
        &temp_dir,
        ".claude/settings.json",
        r#"{"env": {"ANTHROPIC_BASE_URL": "https://current", "ANTHROPIC_API_KEY": "k"}}"#,
    );

    agtok_cmd(&temp_dir)
        .args(["init", "--agent", "claude"])
        .assert()
        .success()
        .stdout(predicate::str::contains("added preset 'snap-default-"));
}

#[test]
fn test_cli_init_all_agents_skips_unconfigured() {
    let temp_dir = TempDir::new().unwrap();

    agtok_cmd(&temp_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("[claude] skip"))
        .stdout(predicate::str::contains("[gemini] skip"))
        .stdout(predicate::str::contains("[codex] skip"));
}

#[test]
fn test_cli_init_reports_malformed_config() {
    let temp_dir = TempDir::new().unwrap();
    write_home_file(&temp_dir, ".claude/settings.json", "{ broken");

    agtok_cmd(&temp_dir)
        .args(["init", "--agent", "claude"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed config"));
}

#[test]
fn test_cli_list_json_marks_active_preset() {
    let temp_dir = TempDir::new().unwrap();
    write_home_file(
        &temp_dir,
        ".codex/config.toml",
        "model = \"gpt-5\"\n\n[model_providers.codex]\nbase_url = \"https://c\"\n",
    );
    write_home_file(&temp_dir, ".codex/auth.json", r#"{"OPENAI_API_KEY": "sk-codex-9999"}"#);
    add_preset(&temp_dir, "codex", "mine", "https://c", "sk-codex-9999");

    let output = agtok_cmd(&temp_dir)
        .args(["list", "--agent", "codex", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["agent"], "codex");
    assert_eq!(json[0]["status"], "OK");
    assert_eq!(json[0]["url"], "https://c");
    assert_eq!(json[0]["token"], "****9999");
    assert_eq!(json[0]["model"], "gpt-5");
    assert_eq!(json[0]["active_preset"], "mine");
}

#[test]
fn test_cli_list_reports_missing_files() {
    let temp_dir = TempDir::new().unwrap();

    agtok_cmd(&temp_dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("claude [MissingFile]"))
        .stdout(predicate::str::contains("codex [MissingFile]"));
}

#[test]
fn test_cli_paths_lists_agent_files() {
    let temp_dir = TempDir::new().unwrap();

    agtok_cmd(&temp_dir)
        .args(["paths", "--agent", "codex"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("auth.json"))
        .stdout(predicate::str::contains("codex.json"));
}

// =============================================================================
// CONFIGURATION TESTS
// =============================================================================

#[test]
fn test_cli_settings_file_supplies_paths() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("xdg/agtok/config.toml");
    fs::create_dir_all(settings.parent().unwrap()).unwrap();
    fs::write(
        &settings,
        format!(
            "home = {:?}\npresets_dir = {:?}\n",
            home(&temp_dir).display().to_string(),
            presets_dir(&temp_dir).display().to_string()
        ),
    )
    .unwrap();

    bare_cmd(&temp_dir)
        .args(["--config"])
        .arg(&settings)
        .args(["paths", "--agent", "gemini"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            home(&temp_dir).join(".gemini/.env").display().to_string(),
        ))
        .stdout(predicate::str::contains(
            presets_dir(&temp_dir).join("gemini.json").display().to_string(),
        ));
}

#[test]
fn test_cli_env_overrides_paths() {
    let temp_dir = TempDir::new().unwrap();

    bare_cmd(&temp_dir)
        .env("AGTOK_HOME", home(&temp_dir))
        .env("AGTOK_PRESETS_DIR", presets_dir(&temp_dir))
        .args(["presets", "add", "--agent", "gemini", "--alias", "e"])
        .args(["--url", "https://e"])
        .assert()
        .success();

    assert!(presets_dir(&temp_dir).join("gemini.json").exists());
}

#[test]
fn test_cli_invalid_settings_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("bad.toml");
    fs::write(&settings, "home = [").unwrap();

    bare_cmd(&temp_dir)
        .arg("--config")
        .arg(&settings)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load settings"));
}
