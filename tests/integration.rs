use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ops_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ops");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Test documents for kb import
    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("twr-manual.md"),
        "# Manual de Operações TWR\n\nCrosswind limit is 35kt for runway 17/35.\n",
    )
    .unwrap();
    fs::write(
        docs_dir.join("notam-2024-07.txt"),
        "Taxiway Bravo closed for maintenance until further notice.",
    )
    .unwrap();
    fs::write(docs_dir.join("roster.csv"), "name,shift\nana,morning\n").unwrap();

    // Generation stays disabled so tests run offline; `ask` exercises the
    // fixed error-reply path.
    let config_content = format!(
        r#"[store]
dir = "{}/data"

[generation]
provider = "disabled"

[assistant]
history_limit = 50
"#,
        root.display()
    );

    let config_path = config_dir.join("ops.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ops(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ops_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ops binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_seeds_state() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ops(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    // Fallback reference is seeded.
    let (stdout, _, success) = run_ops(&config_path, &["kb", "list"]);
    assert!(success);
    assert!(stdout.contains("International Standards (ICAO)"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ops(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ops(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_kb_add_show_rm() {
    let (_tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    let (stdout, stderr, success) = run_ops(
        &config_path,
        &[
            "kb",
            "add",
            "--title",
            "Fraseologia Padrão",
            "--category",
            "manual",
            "--content",
            "readback obrigatório para clearances de pista",
        ],
    );
    assert!(success, "add failed: {} {}", stdout, stderr);
    let id = stdout.trim().strip_prefix("added ").unwrap().to_string();

    let (stdout, _, success) = run_ops(&config_path, &["kb", "show", &id]);
    assert!(success);
    assert!(stdout.contains("Fraseologia Padrão"));
    assert!(stdout.contains("readback obrigatório"));

    let (stdout, _, success) = run_ops(&config_path, &["kb", "rm", &id]);
    assert!(success);
    assert!(stdout.contains("removed"));

    let (_, stderr, success) = run_ops(&config_path, &["kb", "show", &id]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_kb_import_respects_globs_and_dedups() {
    let (tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    let docs = tmp.path().join("docs");
    let (stdout, stderr, success) =
        run_ops(&config_path, &["kb", "import", docs.to_str().unwrap()]);
    assert!(success, "import failed: {} {}", stdout, stderr);
    assert!(stdout.contains("imported: 2"));

    let (stdout, _, _) = run_ops(&config_path, &["kb", "list"]);
    assert!(stdout.contains("twr-manual"));
    assert!(stdout.contains("notam-2024-07"));
    assert!(!stdout.contains("roster"));

    // Second import skips unchanged files.
    let (stdout, _, success) =
        run_ops(&config_path, &["kb", "import", docs.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("imported: 0"));
    assert!(stdout.contains("skipped (unchanged): 2"));
}

#[test]
fn test_history_starts_with_greeting() {
    let (_tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    let (stdout, _, success) = run_ops(&config_path, &["history"]);
    assert!(success);
    assert!(stdout.contains("assistant:"));
    assert!(stdout.contains("OpsDesk assistant"));
}

#[test]
fn test_history_without_init() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ops(&config_path, &["history"]);
    assert!(success);
    assert!(stdout.contains("No history."));
}

#[test]
fn test_ask_with_disabled_provider_contains_failure() {
    let (_tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    // The generation provider is disabled, so the reply is the fixed
    // connection-error message — and the exchange is still recorded.
    let (stdout, stderr, success) = run_ops(&config_path, &["ask", "qual o limite de crosswind?"]);
    assert!(success, "ask failed: {} {}", stdout, stderr);
    assert!(stdout.contains("could not reach the answer service"));

    let (stdout, _, _) = run_ops(&config_path, &["history"]);
    assert!(stdout.contains("you: qual o limite de crosswind?"));
    assert!(stdout.contains("could not reach the answer service"));

    // greeting + user + error reply
    let lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("you:") || l.starts_with("assistant:"))
        .collect();
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_ask_rejects_empty_question() {
    let (_tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    let (_, stderr, success) = run_ops(&config_path, &["ask", "   "]);
    assert!(!success);
    assert!(stderr.contains("question must not be empty"));
}

#[test]
fn test_transcript_persists_across_invocations() {
    let (_tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    run_ops(&config_path, &["ask", "primeira pergunta"]);
    run_ops(&config_path, &["ask", "segunda pergunta"]);

    let (stdout, _, _) = run_ops(&config_path, &["history"]);
    let lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("you:") || l.starts_with("assistant:"))
        .collect();
    // greeting + 2 user/assistant pairs
    assert_eq!(lines.len(), 5);
    assert!(lines[1].contains("primeira pergunta"));
    assert!(lines[3].contains("segunda pergunta"));
}

#[test]
fn test_reset_clears_history() {
    let (_tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);
    run_ops(&config_path, &["ask", "pergunta qualquer"]);

    let (stdout, _, success) = run_ops(&config_path, &["reset"]);
    assert!(success);
    assert!(stdout.contains("History cleared."));

    let (stdout, _, _) = run_ops(&config_path, &["history"]);
    let lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("you:") || l.starts_with("assistant:"))
        .collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("History cleared."));

    // Reset is idempotent.
    let (_, _, success) = run_ops(&config_path, &["reset"]);
    assert!(success);
    let (stdout, _, _) = run_ops(&config_path, &["history"]);
    assert_eq!(
        stdout
            .lines()
            .filter(|l| l.starts_with("assistant:"))
            .count(),
        1
    );
}

#[test]
fn test_corrupt_history_degrades_to_greeting() {
    let (tmp, config_path) = setup_test_env();
    run_ops(&config_path, &["init"]);

    fs::write(tmp.path().join("data/chat_history.json"), "][ garbage").unwrap();

    let (stdout, _, success) = run_ops(&config_path, &["ask", "ainda funciona?"]);
    assert!(success);
    assert!(stdout.contains("could not reach the answer service"));

    let (stdout, _, _) = run_ops(&config_path, &["history"]);
    // Reseeded greeting + the new exchange.
    assert!(stdout.contains("OpsDesk assistant"));
    assert!(stdout.contains("you: ainda funciona?"));
}

#[test]
fn test_unknown_provider_rejected() {
    let (tmp, config_path) = setup_test_env();
    let bad = format!(
        "[store]\ndir = \"{}/data\"\n[generation]\nprovider = \"mystery\"\n",
        tmp.path().display()
    );
    fs::write(&config_path, bad).unwrap();

    let (_, stderr, success) = run_ops(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Unknown generation provider"));
}
