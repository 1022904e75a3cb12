//! Hygiene: scans the walls source tree for antipatterns at test time.
//!
//! Every pattern has a budget of zero except `.ok()`, which `env_parse` uses
//! to fall back to defaults. The sync engine runs inside long-lived
//! clients and the server, so nothing here may crash the process or drop an
//! error without looking at it.

use std::fs;
use std::path::Path;

const MAX_DOT_OK: usize = 2;

struct SourceFile {
    path: String,
    content: String,
}

/// Production `.rs` files under `src/`, excluding `*_test.rs` siblings.
fn source_files() -> Vec<SourceFile> {
    let mut files = Vec::new();
    collect_rs_files(Path::new(env!("CARGO_MANIFEST_DIR")).join("src").as_path(), &mut files);
    files
}

fn collect_rs_files(dir: &Path, out: &mut Vec<SourceFile>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_rs_files(&path, out);
        } else if path.extension().is_some_and(|e| e == "rs") {
            let path_str = path.to_string_lossy().to_string();
            if path_str.ends_with("_test.rs") {
                continue;
            }
            if let Ok(content) = fs::read_to_string(&path) {
                out.push(SourceFile { path: path_str, content });
            }
        }
    }
}

fn hits(files: &[SourceFile], pattern: &str) -> Vec<(String, usize)> {
    files
        .iter()
        .filter_map(|file| {
            let count = file.content.lines().filter(|line| line.contains(pattern)).count();
            (count > 0).then(|| (file.path.clone(), count))
        })
        .collect()
}

fn assert_absent(pattern: &str) {
    assert_within(pattern, 0);
}

fn assert_within(pattern: &str, budget: usize) {
    let files = source_files();
    assert!(!files.is_empty(), "no source files found");
    let found = hits(&files, pattern);
    let count: usize = found.iter().map(|(_, count)| count).sum();
    assert!(
        count <= budget,
        "{pattern} budget exceeded: found {count}, max {budget}:\n{}",
        found
            .iter()
            .map(|(path, count)| format!("  {path}: {count}"))
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[test]
fn no_unwrap() {
    assert_absent(".unwrap()");
}

#[test]
fn no_expect() {
    assert_absent(".expect(");
}

#[test]
fn no_panic() {
    assert_absent("panic!(");
}

#[test]
fn no_unreachable() {
    assert_absent("unreachable!(");
}

#[test]
fn no_todo() {
    assert_absent("todo!(");
}

#[test]
fn no_unimplemented() {
    assert_absent("unimplemented!(");
}

#[test]
fn no_silent_discard() {
    assert_absent("let _ =");
}

#[test]
fn dot_ok_budget() {
    assert_within(".ok()", MAX_DOT_OK);
}

#[test]
fn no_allow_dead_code() {
    assert_absent("#[allow(dead_code)]");
}
