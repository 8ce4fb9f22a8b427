use std::process::Command;

#[test]
fn feedforward_runs_and_reports_generation_count() {
    let output = Command::new(env!("CARGO_BIN_EXE_feedforward"))
        .args(["--period", "3", "--phase", "1", "--delay", "1", "--duration", "8"])
        .output()
        .expect("run feedforward");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let done_line = stdout
        .lines()
        .find(|line| line.starts_with("done @"))
        .expect("summary line present");
    assert!(done_line.contains("generated=3"), "line: {done_line}");
}
