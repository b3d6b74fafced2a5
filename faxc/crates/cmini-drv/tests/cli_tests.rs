//! End-to-end CLI tests (§8): spawn the compiled `cminic` binary and assert
//! on stdout/stderr/exit code, rather than calling `cmini_drv` in-process.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn cminic() -> Command {
    Command::cargo_bin("cminic").unwrap()
}

#[test]
fn compiles_a_well_formed_program_to_stdout() {
    cminic()
        .arg("int main() { return 0; }")
        .assert()
        .success()
        .stdout(predicate::str::contains(".intel_syntax noprefix"))
        .stdout(predicate::str::contains("main:"));
}

#[test]
fn arithmetic_program_compiles_cleanly() {
    cminic()
        .arg("int main() { return 3 + 5 * 2; }")
        .assert()
        .success()
        .stdout(predicate::str::contains("imul"));
}

#[test]
fn wrong_argument_count_prints_usage_and_exits_nonzero() {
    cminic()
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("usage"));
}

#[test]
fn too_many_arguments_prints_usage_and_exits_nonzero() {
    cminic()
        .arg("int main() { return 0; }")
        .arg("extra")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("usage"));
}

#[test]
fn undefined_variable_reports_caret_diagnostic_on_stderr() {
    cminic()
        .arg("int main() { return a; }")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("int main() { return a; }"))
        .stderr(predicate::str::contains("^ "));
}

#[test]
fn duplicate_declaration_is_fatal() {
    cminic()
        .arg("int main() { int a; int a; return 0; }")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn non_lvalue_assignment_is_fatal() {
    cminic()
        .arg("int main() { 1 = 2; return 0; }")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn pointer_plus_pointer_is_fatal() {
    cminic()
        .arg("int main() { int *p; int *q; return p + q; }")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn function_with_more_than_six_parameters_is_fatal() {
    cminic()
        .arg("int f(int a,int b,int c,int d,int e,int g,int h){return 0;}")
        .assert()
        .failure()
        .code(1);
}

#[test]
fn logging_is_silent_at_default_verbosity() {
    cminic()
        .arg("int main() { return 0; }")
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
}

#[test]
fn emitted_assembly_round_trips_through_a_scratch_file() {
    // Stands in for the external assemble/link step (§1): writing stdout to
    // a scratch file and reading it back needs no `as`/`ld` toolchain.
    let output = cminic()
        .arg("int main() { return 42; }")
        .assert()
        .success();
    let asm = &output.get_output().stdout;

    let mut scratch = NamedTempFile::new().expect("failed to create scratch file");
    scratch
        .write_all(asm)
        .expect("failed to write emitted assembly to scratch file");

    let contents =
        std::fs::read_to_string(scratch.path()).expect("failed to read back scratch file");
    assert!(contents.contains(".intel_syntax noprefix"));
    assert!(contents.contains("main:"));
}

#[test]
fn function_call_and_for_loop_program_compiles() {
    cminic()
        .arg("int add(int a, int b) { return a + b; } int main() { int i; int s; s = 0; for (i = 1; i <= 10; i = i + 1) s = s + i; return add(s, 0); }")
        .assert()
        .success()
        .stdout(predicate::str::contains("call add"));
}
