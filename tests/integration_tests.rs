//! Integration tests for forge-board
//!
//! These drive the `forge-board` binary end to end against a real SQLite file
//! and check that the library pieces agree with each other.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use board_common::{KeyGenerator, NoJitter, OrderKey};
use forge_board::board::db::BoardDb;
use forge_board::board::models::IssueColumn;
use forge_board::board::store::ItemOrderStore;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to create a forge-board Command with a clean environment
fn board() -> Command {
    let mut cmd = cargo_bin_cmd!("forge-board");
    cmd.env_remove("FORGE_BOARD_PORT")
        .env_remove("FORGE_BOARD_DB_PATH")
        .env_remove("FORGE_BOARD_MAX_KEY_LENGTH")
        .env_remove("FORGE_BOARD_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("board.db")
}

/// Project 1 with issues A, B, C in the backlog, in that order.
fn seed_board(path: &Path) -> [i64; 3] {
    let db = BoardDb::new(path).unwrap();
    let project = db.create_project("demo").unwrap();
    let mut keys = KeyGenerator::with_jitter(NoJitter);
    let mut ids = [0; 3];
    for (slot, title) in ids.iter_mut().zip(["A", "B", "C"]) {
        *slot = db
            .create_issue(project.id, title, "", IssueColumn::Backlog, &mut keys)
            .unwrap()
            .id;
    }
    ids
}

fn titles_in_output(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| line.split('\t').nth(2).unwrap().to_string())
        .collect()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        board()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("rebalance"))
            .stdout(predicate::str::contains("move"));
    }

    #[test]
    fn test_version() {
        board()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("forge-board"));
    }

    #[test]
    fn test_init_creates_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/board.db");
        board()
            .current_dir(dir.path())
            .args(["init", "--db-path"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Board database initialized"));
        assert!(path.exists());
    }

    #[test]
    fn test_init_defaults_to_forge_dir() {
        let dir = TempDir::new().unwrap();
        board()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success();
        assert!(dir.path().join(".forge/board.db").exists());
    }
}

// =============================================================================
// Key generation
// =============================================================================

mod key_command {
    use super::*;

    #[test]
    fn test_seed_key() {
        let dir = TempDir::new().unwrap();
        board()
            .current_dir(dir.path())
            .arg("key")
            .assert()
            .success()
            .stdout("i\n");
    }

    #[test]
    fn test_key_between_and_before() {
        let dir = TempDir::new().unwrap();
        board()
            .current_dir(dir.path())
            .args(["key", "--left", "a", "--right", "c"])
            .assert()
            .success()
            .stdout("b\n");
        board()
            .current_dir(dir.path())
            .args(["key", "--right", "a", "--no-jitter"])
            .assert()
            .success()
            .stdout("5\n");
        board()
            .current_dir(dir.path())
            .args(["key", "--left", "a", "--no-jitter"])
            .assert()
            .success()
            .stdout("ai\n");
    }

    #[test]
    fn test_jittered_key_still_sorts_after_left() {
        let dir = TempDir::new().unwrap();
        let output = board()
            .current_dir(dir.path())
            .args(["key", "--left", "m"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let key = String::from_utf8(output.stdout).unwrap();
        let key = key.trim();
        assert!(key > "m");
        assert!(!key.ends_with('0'));
    }

    #[test]
    fn test_key_rejects_bad_input() {
        let dir = TempDir::new().unwrap();
        board()
            .current_dir(dir.path())
            .args(["key", "--left", "c", "--right", "a"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid bounds"));
        board()
            .current_dir(dir.path())
            .args(["key", "--left", "A!"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid left bound"));
        board()
            .current_dir(dir.path())
            .args(["key", "--right", "000"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exhausted"));
    }

    #[test]
    fn test_config_file_limits_key_length() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".forge")).unwrap();
        std::fs::write(
            dir.path().join(".forge/board.toml"),
            "[ordering]\nmax_key_length = 1\n",
        )
        .unwrap();
        board()
            .current_dir(dir.path())
            .args(["key", "--left", "i"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exhausted"));
    }

    #[test]
    fn test_env_overrides_key_length() {
        let dir = TempDir::new().unwrap();
        board()
            .current_dir(dir.path())
            .env("FORGE_BOARD_MAX_KEY_LENGTH", "1")
            .args(["key", "--left", "i"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("exhausted"));
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        board()
            .current_dir(dir.path())
            .args(["--config", "missing.toml", "key"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read config file"));
    }
}

// =============================================================================
// Column maintenance
// =============================================================================

mod columns {
    use super::*;

    #[test]
    fn test_move_last_issue_to_front() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        let [a, _, c] = seed_board(&path);

        let output = board()
            .current_dir(dir.path())
            .args(["move", "--column", "backlog"])
            .args(["--issue", &c.to_string(), "--before", &a.to_string()])
            .arg("--db-path")
            .arg(&path)
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(titles_in_output(&output.stdout), vec!["C", "A", "B"]);
    }

    #[test]
    fn test_move_to_other_column() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        let [a, _, _] = seed_board(&path);

        board()
            .current_dir(dir.path())
            .args(["move", "--column", "done", "--issue", &a.to_string()])
            .arg("--db-path")
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::starts_with("i\t"));

        let db = BoardDb::new(&path).unwrap();
        let backlog: Vec<String> = db
            .list_column(1, IssueColumn::Backlog)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(backlog, vec!["B", "C"]);
    }

    #[test]
    fn test_move_rejects_self_and_unknown_column() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        let [a, _, _] = seed_board(&path);

        board()
            .current_dir(dir.path())
            .args(["move", "--column", "backlog"])
            .args(["--issue", &a.to_string(), "--before", &a.to_string()])
            .arg("--db-path")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("relative to itself"));

        board()
            .current_dir(dir.path())
            .args(["move", "--column", "archive", "--issue", &a.to_string()])
            .arg("--db-path")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid column 'archive'"));
    }

    #[test]
    fn test_rebalance_keeps_order() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        seed_board(&path);

        let output = board()
            .current_dir(dir.path())
            .args(["rebalance", "--project", "1", "--column", "backlog"])
            .arg("--db-path")
            .arg(&path)
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(titles_in_output(&output.stdout), vec!["A", "B", "C"]);

        let db = BoardDb::new(&path).unwrap();
        let keys: Vec<OrderKey> = db
            .list_column(1, IssueColumn::Backlog)
            .unwrap()
            .into_iter()
            .map(|i| i.order_key)
            .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(keys.iter().all(|k| k.len() == 1));
    }

    #[test]
    fn test_rebalance_unknown_project() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        board()
            .current_dir(dir.path())
            .args(["rebalance", "--project", "1", "--column", "ready"])
            .arg("--db-path")
            .arg(&path)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Project 1 not found"));
    }
}

// =============================================================================
// Library end to end
// =============================================================================

mod ordering {
    use super::*;
    use forge_board::board::models::MoveRequest;
    use forge_board::board::mover::MoveCoordinator;
    use forge_board::board::store::CommitError;

    #[test]
    fn test_repeated_moves_to_front_keep_order() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        let db = BoardDb::new(&path).unwrap();
        let project = db.create_project("stack").unwrap();
        let mut keys = KeyGenerator::with_jitter(NoJitter);
        let ids: Vec<i64> = (0..20)
            .map(|n| {
                db.create_issue(
                    project.id,
                    &n.to_string(),
                    "",
                    IssueColumn::Ready,
                    &mut keys,
                )
                .unwrap()
                .id
            })
            .collect();

        // Move each issue, last to first, in front of the current head.
        let mut mover = MoveCoordinator::new(&db, KeyGenerator::new());
        let mut head = ids[0];
        for &id in ids.iter().skip(1) {
            mover
                .move_item(&MoveRequest::before(id, head, IssueColumn::Ready))
                .unwrap();
            head = id;
        }

        let order: Vec<i64> = db
            .list_column(project.id, IssueColumn::Ready)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        let expected: Vec<i64> = ids.iter().rev().copied().collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_unique_index_rejects_duplicate_key() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir);
        let [a, b, _] = seed_board(&path);
        let db = BoardDb::new(&path).unwrap();
        let taken = db.get_issue(a).unwrap().unwrap().order_key;

        let err = db.commit(b, IssueColumn::Backlog, &taken).unwrap_err();
        assert!(matches!(err, CommitError::UniquenessViolation { .. }));

        // Same key in another column is fine.
        db.commit(b, IssueColumn::Done, &taken).unwrap();
    }
}
