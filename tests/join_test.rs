use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn esops() -> Command {
    Command::cargo_bin("esops").expect("binary")
}

#[test]
fn join_concatenates_sorts_and_adds_header() {
    let tmp = tempdir().expect("tempdir");
    let a = tmp.path().join("a.fsdb");
    let b = tmp.path().join("b.fsdb");
    fs::write(&a, "#fsdb -F t key val\n2\tbeta\n").expect("write a");
    fs::write(&b, "#fsdb -F t key val\n1\talpha\n").expect("write b");

    esops()
        .current_dir(tmp.path())
        .env("ESOPS_CONFIG_PATH", tmp.path().join("none.toml"))
        .args(["join", "-i"])
        .arg(&a)
        .arg("-i")
        .arg(&b)
        .args(["-s", "key", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#fsdb -F t key val"))
        .stdout(predicate::str::contains("1\talpha\n2\tbeta"));
}

#[test]
fn join_splits_domain_columns_on_the_public_suffix_list() {
    let tmp = tempdir().expect("tempdir");
    let input = tmp.path().join("hosts.fsdb");
    fs::write(
        &input,
        "#fsdb -F t host\nmail.example.co.uk\n10.9.8.7\n",
    )
    .expect("write input");
    let output = tmp.path().join("out.fsdb");

    esops()
        .current_dir(tmp.path())
        .env("ESOPS_CONFIG_PATH", tmp.path().join("none.toml"))
        .args(["join", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["-p", "host", "-H"])
        .assert()
        .success();

    let written = fs::read_to_string(&output).expect("read output");
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("#fsdb -F t host host_pslpfx host_psldom host_pslpub")
    );
    assert_eq!(
        lines.next(),
        Some("mail.example.co.uk\tmail\texample.co.uk\tco.uk")
    );
    // The bare IP has no public suffix and gets empty cells.
    assert_eq!(lines.next(), Some("10.9.8.7\t\t\t"));
}

#[test]
fn join_rejects_input_without_header() {
    let tmp = tempdir().expect("tempdir");
    let bad = tmp.path().join("bad.fsdb");
    fs::write(&bad, "key\tval\n1\ta\n").expect("write bad");

    esops()
        .current_dir(tmp.path())
        .env("ESOPS_CONFIG_PATH", tmp.path().join("none.toml"))
        .args(["join", "-i"])
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing #fsdb header"));
}
