// End-to-end runs of the macroni binary
// Scripts live in a temp directory that also holds the caches

use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

fn run(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_macroni"))
        .args(args)
        .arg("--cache-dir")
        .arg(dir)
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_script_with_imports_runs() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("lib.macroni"),
        "fn total(items) {\n  sum = 0;\n  i = 0;\n  while i < @len(items) {\n    sum = sum + items[i];\n    i = i + 1;\n  }\n  return sum;\n}",
    )
    .unwrap();
    let script = dir.path().join("main.macroni");
    fs::write(&script, "import \"lib.macroni\";\n@print(\"total\", total([1, 2, 3]));").unwrap();

    let output = run(dir.path(), &["-f", script.to_str().unwrap()], "");

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "total 6\n");
}

#[test]
fn test_runtime_error_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("broken.macroni");
    fs::write(&script, "x = 1;\ny = x / 0;").unwrap();

    let output = run(dir.path(), &["-f", script.to_str().unwrap()], "");

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("macroni::runtime::division_by_zero"));
}

#[test]
fn test_parse_error_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("bad.macroni");
    fs::write(&script, "x = ;").unwrap();

    let output = run(dir.path(), &["-f", script.to_str().unwrap()], "");

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_prompted_coordinates_are_cached() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("where.macroni");
    fs::write(&script, "x, y = @get_coordinates(\"bank\", 0);\n@print(x, y);").unwrap();

    let first = run(dir.path(), &["-f", script.to_str().unwrap()], "120 340\n");
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert!(stdout(&first).ends_with("120 340\n"));

    let cache = fs::read_to_string(dir.path().join("coordinates_cache.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&cache).unwrap();
    assert_eq!(json["bank"], serde_json::json!([120, 340]));

    let cached_script = dir.path().join("cached.macroni");
    fs::write(&cached_script, "x, y = @get_coordinates(\"bank\", 1);\n@print(x, y);").unwrap();
    let second = run(dir.path(), &["-f", cached_script.to_str().unwrap()], "");
    assert!(second.status.success(), "stderr: {}", stderr(&second));
    assert_eq!(stdout(&second), "120 340\n");
}

#[test]
fn test_step_debugger_reads_commands_from_stdin() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("debug.macroni");
    fs::write(&script, "a = 2;\nb = a * 21;\n@print(b);").unwrap();

    let output = run(
        dir.path(),
        &["-f", script.to_str().unwrap(), "-d", "-b", "3"],
        "eval b\nc\n",
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Paused (breakpoint) at line 3"));
    assert!(text.contains("(dbg) 42"));
    assert!(text.ends_with("42\n"));
}
