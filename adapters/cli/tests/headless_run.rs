use std::process::Command;

fn run(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_flotilla"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch the flotilla binary");
    assert!(
        output.status.success(),
        "flotilla {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8 output")
}

fn fingerprint(report: &str) -> &str {
    report
        .lines()
        .find_map(|line| line.strip_prefix("fingerprint "))
        .expect("report ends with a fingerprint")
}

#[test]
fn seeded_runs_report_the_same_fingerprint() {
    let first = run(&["run", "--seed", "5", "--ticks", "40"]);
    let second = run(&["run", "--seed", "5", "--ticks", "40"]);

    assert!(first.contains("level      Skirmish (seed 5)"));
    assert!(first.contains("over 40 steps"));
    assert_eq!(fingerprint(&first), fingerprint(&second));
}

#[test]
fn config_file_settings_yield_to_flags() {
    let path = std::env::temp_dir().join(format!("flotilla-run-{}.toml", std::process::id()));
    std::fs::write(&path, "seed = 9\nticks = 5\n").expect("writable temp dir");

    let report = run(&[
        "run",
        "--config",
        path.to_str().expect("utf-8 temp path"),
        "--ticks",
        "7",
    ]);
    let _ = std::fs::remove_file(&path);

    assert!(report.contains("(seed 9)"));
    assert!(report.contains("21 minor ticks over 7 steps"));
}

#[test]
fn fast_frames_run_four_major_ticks_each() {
    let report = run(&["run", "--seed", "4", "--ticks", "2", "--fast"]);

    assert!(report.contains("24 minor ticks over 2 steps (8 major ticks)"));
}
