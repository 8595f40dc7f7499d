mod data_fixture;

use predicates::prelude::*;

#[test]
fn sources_lists_players_handbook_first() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    data_fixture::write_data_dir(dir.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shapedify");
    cmd.arg("sources")
        .arg("--data")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(
            "PHB\tPlayer's Handbook\nMM\tMonster Manual\nXGE\tXanathar's Guide to Everything\n",
        );
    Ok(())
}

#[test]
fn convert_writes_json_to_stdout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    data_fixture::write_data_dir(dir.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shapedify");
    let output = cmd
        .arg("convert")
        .arg("--data")
        .arg(dir.path())
        .args(["--source", "MM", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value[0]["name"], "Monster Manual");
    assert_eq!(value[0]["dependencies"][0], "Player’s Handbook");
    Ok(())
}

#[test]
fn convert_refuses_to_overwrite_without_force() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    data_fixture::write_data_dir(dir.path())?;
    let out = dir.path().join("shaped.js");
    std::fs::write(&out, "existing")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shapedify");
    cmd.arg("convert")
        .arg("--data")
        .arg(dir.path())
        .args(["--source", "PHB", "--out"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output already exists"));

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shapedify");
    cmd.arg("convert")
        .arg("--data")
        .arg(dir.path())
        .args(["--source", "PHB", "--force", "--out"])
        .arg(&out)
        .assert()
        .success();
    assert!(std::fs::read_to_string(&out)?.starts_with("on('ready', function() {"));
    Ok(())
}

#[test]
fn unknown_source_fails_with_context() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    data_fixture::write_data_dir(dir.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shapedify");
    cmd.arg("convert")
        .arg("--data")
        .arg(dir.path())
        .args(["--source", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("convert: unknown source: NOPE"));
    Ok(())
}

#[test]
fn rust_log_debug_emits_parsed_cli_to_stderr() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    data_fixture::write_data_dir(dir.path())?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("shapedify");
    cmd.env("RUST_LOG", "debug")
        .arg("sources")
        .arg("--data")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}
