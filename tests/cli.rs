use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn fails_without_bucket_name() {
    let mut cmd = Command::cargo_bin("gcs-mirror").expect("binary exists");
    cmd.env_remove("GCS_BUCKET_NAME");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--bucket-name"));
}

#[test]
fn help_lists_configuration_flags() {
    let mut cmd = Command::cargo_bin("gcs-mirror").expect("binary exists");
    cmd.arg("--help");

    cmd.assert().success().stdout(
        predicate::str::contains("--bucket-name")
            .and(predicate::str::contains("--bucket-prefix"))
            .and(predicate::str::contains("--dest-dir"))
            .and(predicate::str::contains("--parallelism"))
            .and(predicate::str::contains("--read-interval"))
            .and(predicate::str::contains("--read-timeout"))
            .and(predicate::str::contains("--log-level"))
            .and(predicate::str::contains("--log-format"))
            .and(predicate::str::contains("--server-addr")),
    );
}

#[test]
fn rejects_unparseable_interval() {
    let mut cmd = Command::cargo_bin("gcs-mirror").expect("binary exists");
    cmd.args(["--bucket-name", "b", "--read-interval", "soon"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--read-interval"));
}
