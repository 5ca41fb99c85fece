use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn jcm(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("jcm").unwrap();
    cmd.current_dir(dir.path()).args(&["-v", "warn"]);
    cmd
}

#[test]
fn dry_run_hipat_with_offset() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["run", "hipat", "3", "5", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running replicate 5 of the hipat scenario."))
        .stdout(predicate::str::contains(
            "[dry-run] ./jcm.jl -t 1000 -d 50 -f hipat_5.csv -p -i 200 | tee hipat_5.log",
        ))
        .stdout(predicate::str::contains("[dry-run] ./analyse.R hipat_7.csv"))
        .stdout(predicate::str::contains("hipat_8.csv").not())
        .stdout(predicate::str::contains("hipat_4.csv").not());
}

#[test]
fn dry_run_null_defaults() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["run", "null", "--dry-run", "--no-analyse", "--no-log"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[dry-run] ./jcm.jl -t 1000 -d 50 -f null_0.csv -n\n",
        ))
        .stdout(predicate::str::contains(
            "[dry-run] ./jcm.jl -t 1000 -d 50 -f null_9.csv -n\n",
        ))
        .stdout(predicate::str::contains("null_10.csv").not())
        .stdout(predicate::str::contains("10 replicate(s) run, 0 failed"));
}

#[test]
fn debug_verbosity_shows_resolved_config() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("jcm")
        .unwrap()
        .current_dir(dir.path())
        .args(&["-v", "debug", "run", "lopat", "1", "--runtime", "30", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("resolved config:"))
        .stdout(predicate::str::contains("runtime = 30"));
}

#[test]
fn bad_scenario_fails_before_launching() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["run", "hipath", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad scenario: hipath"))
        .stderr(predicate::str::contains("did you mean `hipat`?"))
        .stdout(predicate::str::contains("Running replicate").not());
}

#[test]
fn variance_variant_from_experiment_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("experiment.toml"),
        "variant = \"variance\"\nreplicates = 2\n",
    )
    .unwrap();
    jcm(&dir)
        .args(&["run", "pathogens", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[dry-run] ./jcm.jl -t 500 -d 10 -f pathogens_1 -p\n",
        ))
        .stdout(predicate::str::contains("pathogens_2").not());
}

#[test]
fn unknown_key_in_experiment_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("experiment.toml"), "datafreq = 10\n").unwrap();
    jcm(&dir)
        .args(&["run", "null", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed loading experiment file"));
}

#[cfg(unix)]
#[test]
fn real_run_writes_logs() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["run", "lopat", "2", "--sim", "echo", "--analysis", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-t 1000 -d 50 -f lopat_1.csv -p -i 40"));
    let log = fs::read_to_string(dir.path().join("lopat_0.log")).unwrap();
    assert_eq!(log, "-t 1000 -d 50 -f lopat_0.csv -p -i 40\n");
}

#[cfg(unix)]
#[test]
fn failing_simulation_does_not_stop_run() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["run", "nopat", "3", "--sim", "false", "--no-log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running replicate 2 of the nopat scenario."))
        .stdout(predicate::str::contains("3 replicate(s) run, 3 failed"));
}

#[cfg(unix)]
#[test]
fn fail_fast_stops_run() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["run", "nopat", "3", "--sim", "false", "--no-log", "--fail-fast"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Running replicate 1").not())
        .stderr(predicate::str::contains("replicate 0 of the nopat scenario failed"));
}

#[test]
fn scenarios_listing() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["scenarios", "--variant", "variance"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pathogens"))
        .stdout(predicate::str::contains("hipat").not());
}

#[test]
fn new_experiment_then_run() {
    let dir = tempfile::tempdir().unwrap();
    jcm(&dir)
        .args(&["new", "experiment", "batch", "--template", "variance"])
        .assert()
        .success();
    assert!(dir.path().join("batch").join("experiment.toml").is_file());

    let mut cmd = Command::cargo_bin("jcm").unwrap();
    cmd.current_dir(dir.path().join("batch"))
        .args(&["-v", "warn", "run", "null", "1", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("-t 500 -d 10 -f null_0 -n"));

    // second init on the same path is refused
    jcm(&dir)
        .args(&["new", "experiment", "batch"])
        .assert()
        .failure();
}
