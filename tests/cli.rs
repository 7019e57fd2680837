use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;

#[test]
fn expands_stdin_to_stdout() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.write_stdin(r"\define{greet who}{Hello, \who!}\greet{World}");
    cmd.assert().success().stdout("Hello, World!");
}

#[test]
fn expands_file_with_include_paths() {
    let dir = tempfile::tempdir().unwrap();
    let inc = dir.path().join("inc");
    fs::create_dir(&inc).unwrap();
    fs::write(inc.join("defs.mx"), r"\define{name}{mx}").unwrap();
    let main = dir.path().join("main.mx");
    fs::write(&main, "\\include{defs.mx}This is \\name.\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mx");
    cmd.arg("-I").arg(&inc).arg(&main);
    cmd.assert().success().stdout("This is mx. ");
}

#[test]
fn recovered_errors_go_to_stderr() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.write_stdin(r"a\nope b");
    cmd.assert()
        .success()
        .stdout("a b")
        .stderr(predicate::str::contains("<stdin>:1: warning [undefined-macro]"));
}

#[test]
fn json_diagnostics() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.arg("--diagnostics").arg("json").write_stdin(r"\include{missing.mx}");
    cmd.assert().success().stderr(
        predicate::str::contains("\"code\": \"include-not-found\"")
            .and(predicate::str::contains("\"severity\": \"error\"")),
    );
}

#[test]
fn custom_characters_from_flags() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.args(["--escape", "@", "--group-open", "(", "--group-close", ")"])
        .write_stdin(r"@define(x)(y)@x \x");
    cmd.assert().success().stdout(r"y \x");
}

#[test]
fn duplicate_characters_are_rejected_before_reading() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.args(["--quote", "{"]).write_stdin("text");
    cmd.assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::starts_with("! ").and(predicate::str::contains("group-open")));
}

#[test]
fn config_file_is_layered() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("mx.toml");
    fs::write(&config, "[characters]\nescape = \"%\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("mx");
    cmd.arg("--config").arg(&config).write_stdin(r"%define{x}{y}%x");
    cmd.assert().success().stdout("y");
}

#[test]
fn missing_input_file_fails() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.arg("does-not-exist.mx");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("does-not-exist.mx"));
}

#[test]
fn fatal_expansion_error_exits_with_two() {
    let mut cmd = cargo_bin_cmd!("mx");
    cmd.write_stdin(r"\define{x}{unterminated");
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("unterminated argument group for 'define'"));
}
