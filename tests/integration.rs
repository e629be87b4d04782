use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn ans_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("ans");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let corpus_dir = root.join("corpus");
    fs::create_dir_all(&corpus_dir).unwrap();

    fs::write(
        corpus_dir.join("corpus.md"),
        "## Concurrency\n\
         goroutine lightweight thread managed by the runtime\n\
         channel sends values between goroutine workers\n\
         ## Collections\n\
         slice dynamic view into array\n\
         map unordered hash table\n",
    )
    .unwrap();
    fs::write(
        corpus_dir.join("entities.txt"),
        "Control Flow Keywords\n\
         defer - schedules a call to run when the function returns\n\
         Data Structure Keywords\n\
         map - built-in hash table type\n",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/answers.sqlite"

[corpus]
path = "{root}/corpus/corpus.md"
keyword_entities = "{root}/corpus/entities.txt"

[retrieval]
k = 1
keyword_top_n = 10

[intents]
promotion_threshold = 2

[server]
bind = "127.0.0.1:0"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("answers.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_ans(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = ans_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ans binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ans(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("answers.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_ans(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_ans(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_train_then_ask() {
    let (_tmp, config_path) = setup_test_env();
    run_ans(&config_path, &["init"]);

    let (stdout, stderr, success) = run_ans(
        &config_path,
        &[
            "train",
            "--query",
            "what is a goroutine",
            "--answer",
            "goroutine lightweight thread",
        ],
    );
    assert!(success, "train failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("accepted"));

    let (stdout, stderr, success) =
        run_ans(&config_path, &["ask", "goroutine lightweight thread"]);
    assert!(success, "ask failed: {}", stderr);
    assert!(
        stdout.starts_with("goroutine lightweight thread"),
        "unexpected answer: {}",
        stdout
    );
}

#[test]
fn test_ask_without_training_uses_topics() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ans(&config_path, &["ask", "explain defer please"]);
    assert!(success);
    assert!(
        stdout.contains("defer: schedules a call to run when the function returns"),
        "unexpected answer: {}",
        stdout
    );

    let (stdout, _, success) = run_ans(&config_path, &["ask", "qqq www"]);
    assert!(success);
    assert!(stdout.contains("Sorry, I couldn't find relevant information."));
}

#[test]
fn test_greeting_reply() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ans(&config_path, &["ask", "hello"]);
    assert!(success);
    assert_eq!(stdout.trim(), "Bot: Hello! How can I assist you today?");
    assert!(stderr.contains("greeting"));
}

#[test]
fn test_ask_empty_query_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_ans(&config_path, &["ask", "  "]);
    assert!(!success, "empty query should fail");
}

#[test]
fn test_train_rejects_blank_answer() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) =
        run_ans(&config_path, &["train", "--query", "q", "--answer", " "]);
    assert!(!success);
    assert!(stderr.contains("invalid training data"), "stderr: {}", stderr);
}

#[test]
fn test_keywords_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_ans(&config_path, &["keywords", "--limit", "3"]);
    assert!(success, "keywords failed: {}", stderr);
    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.starts_with("  1. "));
}

#[test]
fn test_discovery_persists_and_promotes() {
    let (_tmp, config_path) = setup_test_env();

    run_ans(&config_path, &["ask", "zzz yyy xxx one"]);
    run_ans(&config_path, &["ask", "zzz yyy xxx two"]);

    let (stdout, _, success) = run_ans(&config_path, &["intents"]);
    assert!(success);
    assert!(stdout.contains("zzz_yyy_xxx [2]"), "intents: {}", stdout);

    let (stdout, _, success) = run_ans(&config_path, &["promote"]);
    assert!(success);
    assert!(stdout.contains("Promoted zzz_yyy_xxx (2 phrases)"));

    let (stdout, _, _) = run_ans(&config_path, &["promote"]);
    assert!(stdout.contains("No clusters ready"));

    let (stdout, _, _) = run_ans(&config_path, &["intents"]);
    assert!(stdout.contains("Discovered (0)"));
    assert!(stdout.contains("zzz_yyy_xxx: zzz yyy xxx one | zzz yyy xxx two"));
}

#[test]
fn test_missing_config_errors() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_ans(&tmp.path().join("nope.toml"), &["intents"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
