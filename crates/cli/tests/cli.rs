//! End-to-end exit-code tests for the `genc` binary (spec §6).

use std::io::Write;
use std::process::Command;

fn genc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_genc"))
}

fn write_source(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".gen")
        .tempfile()
        .expect("failed to create temp source file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp source file");
    file
}

#[test]
fn successful_run_exits_zero_and_prints_to_stdout() {
    let file = write_source("func main(){ print 1+2; return 0; }");
    let output = genc().arg(file.path()).output().expect("failed to run genc");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "3");
}

#[test]
fn compile_error_exits_one() {
    let file = write_source("func main(){ print 1 + ; return 0; }");
    let output = genc().arg(file.path()).output().expect("failed to run genc");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn runtime_error_exits_one() {
    let file = write_source("func main(){ print 1/0; return 0; }");
    let output = genc().arg(file.path()).output().expect("failed to run genc");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_source_file_exits_74() {
    let output = genc()
        .arg("/nonexistent/path/does-not-exist.gen")
        .output()
        .expect("failed to run genc");
    assert_eq!(output.status.code(), Some(74));
}

#[test]
fn missing_positional_argument_exits_64() {
    let output = genc().output().expect("failed to run genc");
    assert_eq!(output.status.code(), Some(64));
}
