// ABOUTME: Runs the built binary to check flag handling and the stdout/stderr split
// ABOUTME: Uses throwaway SQLite files so no server is needed

use std::process::Command;

use rusqlite::Connection;
use tempfile::tempdir;

fn bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mysql-cursor-dump"));
    // Keep the diagnostic channel predictable regardless of the caller's env.
    cmd.env_remove("RUST_LOG").arg("--log").arg("warn");
    cmd
}

#[test]
fn test_batch_below_one_rejected_before_connecting() {
    let temp_dir = tempdir().unwrap();
    // Never created: if the tool tried to open it we'd see a connection error.
    let db_path = temp_dir.path().join("missing.db");

    let output = bin()
        .arg("--sqlite")
        .arg(&db_path)
        .arg("--table")
        .arg("events")
        .arg("--fields")
        .arg("kind,note")
        .arg("--batch")
        .arg("0")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stdout.is_empty());
    assert!(stderr.contains("batch size must be at least 1"));
    assert!(!stderr.contains("Failed to open"));
}

#[test]
fn test_negative_batch_rejected() {
    let output = bin()
        .arg("--sqlite")
        .arg("/nonexistent/x.db")
        .arg("-t")
        .arg("events")
        .arg("--fields")
        .arg("id")
        .arg("--batch")
        .arg("-5")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("(got -5)"));
}

#[test]
fn test_missing_mysql_host_is_usage_error() {
    let output = bin()
        .env_remove("MYSQL_HOST")
        .env_remove("MYSQL_USER")
        .arg("-t")
        .arg("events")
        .arg("--fields")
        .arg("id")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--host"));
}

#[test]
fn test_missing_sqlite_file_fails() {
    let temp_dir = tempdir().unwrap();

    let output = bin()
        .arg("--sqlite")
        .arg(temp_dir.path().join("absent.db"))
        .arg("-t")
        .arg("events")
        .arg("--fields")
        .arg("id")
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open SQLite source"));
}

#[test]
fn test_sqlite_export_splits_data_and_diagnostics() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("events.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE events (id INTEGER PRIMARY KEY, kind TEXT, note TEXT);
         INSERT INTO events VALUES (10, 'a', 'x');
         INSERT INTO events VALUES (20, 'b', NULL);
         INSERT INTO events VALUES (30, 'c', 'z');",
    )
    .unwrap();
    drop(conn);

    let output = bin()
        .arg("--sqlite")
        .arg(&db_path)
        .arg("-t")
        .arg("events")
        .arg("--fields")
        .arg("kind,note")
        .arg("--incrfield")
        .arg("id")
        .arg("--incr")
        .arg("5")
        .arg("--batch")
        .arg("2")
        .arg("--delimiter")
        .arg(",")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "stderr: {}", stderr);
    assert_eq!(stdout, "10,a,x\n20,b,NULL\n30,c,z\n");

    let diag: Vec<&str> = stderr.lines().collect();
    assert_eq!(
        diag,
        vec![
            "SELECT `id`,`kind`,`note` FROM `events` WHERE `id`>5 ORDER BY `id` LIMIT 2",
            "SELECT `id`,`kind`,`note` FROM `events` WHERE `id`>20 ORDER BY `id` LIMIT 2",
            "3",
        ]
    );
}

#[test]
fn test_escaped_tab_delimiter() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("t.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch("CREATE TABLE t (a TEXT, b TEXT); INSERT INTO t VALUES ('x', 'y');")
        .unwrap();
    drop(conn);

    let output = bin()
        .arg("--sqlite")
        .arg(&db_path)
        .arg("-t")
        .arg("t")
        .arg("--fields")
        .arg("a,b")
        .arg("--delimiter")
        .arg("\\t")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x\ty\n");
}

#[test]
fn test_row_count_is_last_diagnostic_line_at_default_log_level() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("two.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch(
        "CREATE TABLE t (id INTEGER PRIMARY KEY, a TEXT);
         INSERT INTO t VALUES (1, 'x');
         INSERT INTO t VALUES (2, 'y');",
    )
    .unwrap();
    drop(conn);

    // No --log and no RUST_LOG: completion logs are on at info level.
    let output = Command::new(env!("CARGO_BIN_EXE_mysql-cursor-dump"))
        .env_remove("RUST_LOG")
        .arg("--sqlite")
        .arg(&db_path)
        .arg("-t")
        .arg("t")
        .arg("--fields")
        .arg("a")
        .arg("--incrfield")
        .arg("id")
        .arg("--incr")
        .arg("-1")
        .arg("--batch")
        .arg("5")
        .output()
        .expect("Failed to execute command");

    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "stderr: {}", stderr);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1\tx\n2\ty\n");
    assert!(stderr.contains("Extracted 2 rows"));
    assert!(!stderr.contains('\u{1b}'));
    assert_eq!(stderr.lines().last(), Some("2"));
}

#[test]
fn test_delmiter_alias_is_accepted() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("t.db");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch("CREATE TABLE t (a TEXT, b TEXT); INSERT INTO t VALUES ('x', 'y');")
        .unwrap();
    drop(conn);

    let output = bin()
        .arg("--sqlite")
        .arg(&db_path)
        .arg("-t")
        .arg("t")
        .arg("--fields")
        .arg("a,b")
        .arg("--delmiter")
        .arg(";")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "x;y\n");
}
