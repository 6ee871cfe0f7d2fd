use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_fake_bin(path: &Path, script: &str) {
    fs::write(path, script).expect("write fake bin");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("chmod");
    }
}

fn write_fake_ssh(dir: &Path) {
    write_fake_bin(&dir.join("ssh"), "#!/usr/bin/env bash\nexit 0\n");
}

fn write_fake_curl(dir: &Path) {
    let script = concat!(
        "#!/usr/bin/env bash\n",
        "for a in \"$@\"; do\n",
        "  case \"$a\" in\n",
        "    *_cat/indices*)\n",
        "      echo 'yellow open logstash-2024.01.01 uuid 1 1 100 0 1mb 1mb'\n",
        "      echo 'yellow open users uuid 1 1 1 0 1kb 1kb'\n",
        "      echo 'yellow open filebeat-7.0 uuid 1 1 1 0 1kb 1kb'\n",
        "      exit 0;;\n",
        "    *_count*) echo '{\"count\":42}'; exit 0;;\n",
        "  esac\n",
        "done\n",
        "echo '{}'\n",
    );
    write_fake_bin(&dir.join("curl"), script);
}

fn path_with(dir: &Path) -> String {
    format!(
        "{}:{}",
        dir.display(),
        std::env::var("PATH").unwrap_or_default()
    )
}

fn esops() -> Command {
    Command::cargo_bin("esops").expect("binary")
}

#[test]
fn mirror_skips_indices_with_matching_counts() {
    let tmp = tempdir().expect("tempdir");
    write_fake_ssh(tmp.path());
    write_fake_curl(tmp.path());

    esops()
        .current_dir(tmp.path())
        .env("PATH", path_with(tmp.path()))
        .env("ESOPS_CONFIG_PATH", tmp.path().join("none.toml"))
        .args(["mirror", "-s", "fakehost", "--lport", "19200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Connecting to: fakehost"))
        .stdout(predicate::str::contains(
            "fakehost: logstash-2024.01.01  to localhost: fakehost-logstash-2024.01.01",
        ))
        .stdout(predicate::str::contains("Exists already"))
        // Default excludes drop users and filebeat.
        .stdout(predicate::str::contains("users").not());
}

#[test]
fn mirror_list_only_prints_filtered_indices() {
    let tmp = tempdir().expect("tempdir");
    write_fake_ssh(tmp.path());
    write_fake_curl(tmp.path());

    esops()
        .current_dir(tmp.path())
        .env("PATH", path_with(tmp.path()))
        .env("ESOPS_CONFIG_PATH", tmp.path().join("none.toml"))
        .args(["mirror", "-s", "fakehost", "--lport", "19200", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("logstash-2024.01.01"))
        .stdout(predicate::str::contains("filebeat").not());
}

#[test]
fn mirror_reports_issue_when_tunnel_fails() {
    let tmp = tempdir().expect("tempdir");
    write_fake_bin(&tmp.path().join("ssh"), "#!/usr/bin/env bash\nexit 255\n");
    write_fake_curl(tmp.path());

    esops()
        .current_dir(tmp.path())
        .env("PATH", path_with(tmp.path()))
        .env("ESOPS_CONFIG_PATH", tmp.path().join("none.toml"))
        .args(["mirror", "-s", "fakehost", "--lport", "19200"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tunnel to fakehost failed"));
}
