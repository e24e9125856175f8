use std::path::PathBuf;
use std::process::Command;

fn jblocks_binary() -> &'static str {
    env!("CARGO_BIN_EXE_jblocks")
}

const SOURCE: &str = "\
public class Demo {
    public static void main(String[] args) {
        int x = 1;
        System.out.println(x);
    }
}
";

fn write_source(dir: &std::path::Path) -> PathBuf {
    let file = dir.join("Demo.java");
    std::fs::write(&file, SOURCE).unwrap();
    file
}

#[test]
fn inspect_prints_the_block_outline() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path());

    let output = Command::new(jblocks_binary())
        .arg("inspect")
        .arg(&file)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("start"), "missing start block:\n{stdout}");
    assert!(stdout.contains("print"), "missing print block:\n{stdout}");
    assert!(
        stdout.contains("declare-variable @3 int x"),
        "missing declaration:\n{stdout}"
    );
}

#[test]
fn inspect_json_is_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path());

    let output = Command::new(jblocks_binary())
        .args(["inspect", "--json"])
        .arg(&file)
        .output()
        .unwrap();

    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(parsed.get("roots").is_some());
}

#[test]
fn edit_insert_prints_the_new_source() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path());

    // Line 2 is the main method; insert a print at the top of its body.
    let output = Command::new(jblocks_binary())
        .args(["edit", "insert"])
        .arg(&file)
        .args(["--into", "2", "--kind", "print", "--index", "0"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("System.out.println(\"\");"));
    assert!(stdout.contains("int x = 1;"));
    // The file itself is untouched; the edit only prints.
    assert_eq!(std::fs::read_to_string(&file).unwrap(), SOURCE);
}

#[test]
fn edit_delete_removes_only_that_line() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path());

    let output = Command::new(jblocks_binary())
        .args(["edit", "delete"])
        .arg(&file)
        .args(["--line", "3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("int x = 1;"));
    assert!(stdout.contains("System.out.println(x);"));
}

#[test]
fn edit_on_an_empty_line_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(dir.path());

    let output = Command::new(jblocks_binary())
        .args(["edit", "delete"])
        .arg(&file)
        .args(["--line", "40"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no block on line 40"), "stderr: {stderr}");
}

#[test]
fn edit_set_type_preserves_leaf_values() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Demo.java");
    std::fs::write(
        &file,
        "\
public class Demo {
    public static void main(String[] args) {
        int[] x = { 1, 2, 3 };
    }
}
",
    )
    .unwrap();

    let output = Command::new(jblocks_binary())
        .args(["edit", "set-type"])
        .arg(&file)
        .args(["--line", "3", "int[][]"])
        .output()
        .unwrap();

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1, 2, 3"), "values lost:\n{stdout}");
    assert!(stdout.contains("int[][]"), "type unchanged:\n{stdout}");
}
