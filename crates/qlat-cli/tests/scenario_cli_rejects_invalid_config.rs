use assert_cmd::Command;
use predicates::prelude::*;

fn qlat(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("qlat").unwrap();
    cmd.current_dir(dir)
        .env_remove("REDIS_URL")
        .env_remove("RUST_LOG")
        .env_remove("DEBUG");
    cmd
}

#[test]
fn measure_requires_obs_queue() {
    let tmp = tempfile::tempdir().unwrap();
    qlat(tmp.path())
        .args(["measure", "--source-dump", "dump.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: invalid measure config: obs queue is required"));
}

#[test]
fn measure_rejects_unknown_unit() {
    let tmp = tempfile::tempdir().unwrap();
    qlat(tmp.path())
        .args([
            "measure",
            "--obs",
            "results",
            "--source-dump",
            "dump.jsonl",
            "--result-sent-unit",
            "ns",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("result sent unit must be one of auto|s|ms|us"));
}

#[test]
fn measure_rejects_hold_equal_to_obs() {
    let tmp = tempfile::tempdir().unwrap();
    qlat(tmp.path())
        .args(["measure", "--obs", "q", "--hold", "q", "--source-dump", "d.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("hold queue must differ"));
}

#[test]
fn measure_rejects_oversized_duration_without_panicking() {
    let tmp = tempfile::tempdir().unwrap();
    qlat(tmp.path())
        .args(["measure", "--obs", "results", "--source-dump", "dump.jsonl"])
        .args(["--duration", "18446744073709551615"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duration must be <= 2592000 seconds"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn measure_with_unusable_dump_fails_before_connecting() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("dump.jsonl"), "garbage\n\n").unwrap();
    qlat(tmp.path())
        .args(["measure", "--obs", "results", "--source-dump", "dump.jsonl"])
        // Unroutable on purpose: reaching the connect step would fail differently.
        .args(["--redis-addr", "127.0.0.1:1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("contains no valid records"));
    assert!(!tmp.path().join("latency.jsonl").exists());
}

#[test]
fn restore_requires_obs_queue() {
    let tmp = tempfile::tempdir().unwrap();
    qlat(tmp.path())
        .args(["restore"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("obs queue is required"));
}

#[test]
fn load_dump_rejects_microseconds() {
    let tmp = tempfile::tempdir().unwrap();
    qlat(tmp.path())
        .args(["load-dump", "--in-dump", "a", "--out-dump", "b", "--epoch-unit", "us"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("epoch unit must be ms or s"));
}
