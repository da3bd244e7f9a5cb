use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn sim85() -> Command {
    let mut cmd = Command::cargo_bin("sim85").unwrap();
    cmd.env_remove("SIM85_STRICT").env_remove("SIM85_MAX_STEPS");
    cmd
}

#[test]
fn runs_without_arguments() {
    sim85().assert().success().stdout(contains("sim85"));
}

#[test]
fn runs_counting_loop() {
    let mut cmd = sim85();
    cmd.arg("run").arg("tests/files/count.asm").arg("--minimal");

    cmd.assert()
        .success()
        .stdout(contains("A  05"))
        .stdout(contains("PC 8008"))
        .stdout(contains("FLAGS S=0 Z=1"))
        .stdout(contains("T-STATES 114"))
        .stdout(contains("Program Halted"));
}

#[test]
fn runs_path_directly() {
    sim85()
        .arg("tests/files/count.asm")
        .assert()
        .success()
        .stdout(contains("Program Halted"));
}

#[test]
fn dumps_memory() {
    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/store.asm")
        .arg("--minimal")
        .arg("--dump")
        .arg("9000H:2");

    cmd.assert().success().stdout(contains("9000: 38 83"));
}

#[test]
fn slow_run_halts() {
    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/count.asm")
        .arg("--minimal")
        .arg("--delay")
        .arg("1");

    cmd.assert()
        .success()
        .stdout(contains("A  05"))
        .stdout(contains("Program Halted after 17 steps"));
}

#[test]
fn stops_at_step_limit() {
    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/spin.asm")
        .arg("--minimal")
        .arg("--max-steps")
        .arg("50");

    cmd.assert()
        .success()
        .stdout(contains("Max Steps Reached (50)"))
        .stdout(contains("T-STATES 500"));
}

#[test]
fn step_limit_from_environment() {
    let mut cmd = sim85();
    cmd.env("SIM85_MAX_STEPS", "20")
        .arg("run")
        .arg("tests/files/spin.asm")
        .arg("--minimal");

    cmd.assert()
        .success()
        .stdout(contains("Max Steps Reached (20)"));
}

#[test]
fn rejects_bad_environment() {
    let mut cmd = sim85();
    cmd.env("SIM85_STRICT", "everything")
        .arg("check")
        .arg("tests/files/count.asm");

    cmd.assert()
        .failure()
        .stderr(contains("Unknown strictness 'everything'"));
}

#[test]
fn reports_unmapped_fetch() {
    let mut cmd = sim85();
    cmd.arg("run").arg("tests/files/fault.asm").arg("--minimal");

    cmd.assert()
        .failure()
        .stdout(contains("A  01"))
        .stdout(contains("Error"))
        .stderr(contains("no instruction at 9000H"));
}

#[test]
fn tolerates_unknown_lines() {
    let mut cmd = sim85();
    cmd.arg("run").arg("tests/files/bad.asm").arg("--minimal");

    cmd.assert()
        .success()
        .stdout(contains("A  05"))
        .stdout(contains("PC 8002"))
        .stderr(contains("Encountered an unknown instruction."));
}

#[test]
fn strict_rejects_unknown_lines() {
    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/bad.asm")
        .arg("--minimal")
        .arg("--strict")
        .arg("unresolved");

    cmd.assert()
        .failure()
        .stdout(contains("Running").not())
        .stderr(contains("Encountered an unknown instruction."));
}

#[test]
fn traces_steps() {
    let mut cmd = sim85();
    cmd.arg("step")
        .arg("tests/files/count.asm")
        .arg("--minimal")
        .arg("--count")
        .arg("3");

    cmd.assert()
        .success()
        .stdout(contains("8000H  line 2"))
        .stdout(contains("8002H  line 3"))
        .stdout(contains("8003H  line 4"))
        .stdout(contains("Program Halted").not());
}

#[test]
fn checks_files() {
    sim85()
        .arg("check")
        .arg("tests/files/count.asm")
        .assert()
        .success()
        .stdout(contains("no errors found!"));

    sim85()
        .arg("check")
        .arg("tests/files/bad.asm")
        .assert()
        .success()
        .stdout(contains("(1 warning)"));

    sim85()
        .arg("check")
        .arg("tests/files/bad.asm")
        .arg("--strict")
        .arg("all")
        .assert()
        .failure();
}

#[test]
fn empty_program_fails() {
    sim85()
        .arg("check")
        .arg("tests/files/empty.asm")
        .assert()
        .failure()
        .stderr(contains("No instructions assembled"));
}

#[test]
fn compiles_raw_image() {
    let dest = std::env::temp_dir().join(format!("sim85-count-{}.bin", std::process::id()));
    sim85()
        .arg("compile")
        .arg("tests/files/count.asm")
        .arg(&dest)
        .assert()
        .success()
        .stdout(contains("Saved"));

    let bytes = std::fs::read(&dest).unwrap();
    let _ = std::fs::remove_file(&dest);
    assert_eq!(
        bytes,
        [0x3E, 0x00, 0x3C, 0xFE, 0x05, 0xC2, 0x02, 0x80, 0x76]
    );
}

#[test]
fn lists_program() {
    sim85()
        .arg("list")
        .arg("tests/files/count.asm")
        .assert()
        .success()
        .stdout(contains("LOOP:"))
        .stdout(contains("C2 02 80"))
        .stdout(contains("; line 5"));
}

#[test]
fn presets_memory_before_run() {
    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/add.asm")
        .arg("--minimal")
        .arg("--set")
        .arg("2050H=05H")
        .arg("--set")
        .arg("2051H=7")
        .arg("--dump")
        .arg("2050H:3")
        .arg("--dump")
        .arg("2052H:1");

    cmd.assert()
        .success()
        .stdout(contains("A  0C"))
        .stdout(contains("2050: 05 07 0C"))
        .stdout(contains("2052: 0C"));
}

#[test]
fn rejects_out_of_range_preset() {
    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/add.asm")
        .arg("--set")
        .arg("2050H=300");

    cmd.assert().failure().stderr(contains("out of range"));
}

#[test]
fn stray_halt_counts_match() {
    let mut cmd = sim85();
    cmd.arg("run").arg("tests/files/stray.asm").arg("--minimal");
    cmd.assert()
        .success()
        .stdout(contains("Program Halted after 3 steps"));

    let mut cmd = sim85();
    cmd.arg("run")
        .arg("tests/files/stray.asm")
        .arg("--minimal")
        .arg("--delay")
        .arg("1");
    cmd.assert()
        .success()
        .stdout(contains("Program Halted after 3 steps"));
}
