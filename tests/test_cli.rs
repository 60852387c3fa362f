
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn it_respects_directory_output() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("out").join("test.out");
    let sample = write_sample(&d, "tone.wav", &minimal_wav());

    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.args(["-f", &f.to_string_lossy(), sample.to_str().unwrap()]);

    assert!(
        cmd.output().unwrap().stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let mut expected = vec![];

    File::open(&f).unwrap().read_to_end(&mut expected).unwrap();
    assert!(
        !expected.is_empty(),
        "Expected output to be printed to file"
    )
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();
    let sample = write_sample(&d, "tone.wav", &minimal_wav());

    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.args(["-f", &d.path().to_string_lossy(), sample.to_str().unwrap()]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_it_overwrites_file_anyways_if_passed_flag() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");

    let mut file = File::create(&f).unwrap();
    file.write_all(b"I'm a file!").unwrap();

    let sample = write_sample(&d, "tone.wav", &minimal_wav());
    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.args([
        "-f",
        &f.to_string_lossy(),
        "--no-confirm-overwrite",
        sample.to_str().unwrap(),
    ]);

    cmd.assert().success();

    let mut written = String::new();
    File::open(&f)
        .unwrap()
        .read_to_string(&mut written)
        .unwrap();
    assert!(written.contains("<WAV>"));
    assert!(!written.contains("I'm a file!"));
}

#[test]
fn test_failed_files_are_reported_and_do_not_change_exit_code() {
    let d = tempdir().unwrap();
    let mut short = minimal_wav();
    short.truncate(30);
    let good = write_sample(&d, "good.wav", &minimal_wav());
    let bad = write_sample(&d, "bad.wav", &short);

    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.args([
        "-o",
        "json",
        "--no-indent",
        good.to_str().unwrap(),
        bad.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""channels":1"#))
        .stdout(predicate::str::contains(
            r#""adapter":"Microsoft WAV Audio Adapter","outcome":"Failed","kind":"Truncated""#,
        ))
        .stderr(predicate::str::contains(format!(
            "error: {} [Microsoft WAV Audio Adapter] Truncated:",
            bad.display()
        )));
}

#[test]
fn test_failed_files_are_left_out_of_xml_output() {
    let d = tempdir().unwrap();
    let mut short = minimal_wav();
    short.truncate(30);
    let bad = write_sample(&d, "bad.wav", &short);

    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.args(["--no-indent", bad.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Truncated"));
}

#[test]
fn test_unrecognized_files_still_produce_output() {
    let d = tempdir().unwrap();
    let text = write_sample(&d, "readme.txt", b"hello");

    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.args(["--no-indent", text.to_str().unwrap()]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "<unrecognized><file><name>readme.txt</name>",
        ));
}

#[test]
fn test_list_adapters() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.arg("--list-adapters");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Microsoft WAV Audio Adapter 2.0 (audio/wav)"))
        .stdout(predicate::str::contains("application/warc"))
        .stdout(predicate::str::contains("Internet Archive ARC File Adapter 1.0"));
}

#[test]
fn test_input_is_required() {
    let mut cmd = Command::new(assert_cmd::cargo_bin!("meta_dump"));
    cmd.assert().failure();
}
