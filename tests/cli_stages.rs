use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::{Builder, TempDir};

const GEO: &str = "\
id,ALLSKY_SFC_SW_DWN,T2M,FLAT
A,0,0,7.5
B,1,4,7.5
C,2,1,7.5
D,3,3,7.5
E,4,2,7.5
";

fn geo_file() -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = Builder::new().suffix(".csv").tempfile()?;
    write!(file, "{}", GEO)?;
    Ok(file)
}

#[test]
fn command_config() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("phylogeo")?;
    cmd.arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("bootstrap_amount = 100"))
        .stdout(predicate::str::contains("names = [\"id\", \"ALLSKY_SFC_SW_DWN\", \"T2M\"]"));

    Ok(())
}

#[test]
fn command_config_check() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let good = temp.path().join("good.toml");
    std::fs::write(&good, "names = [\"id\", \"T2M\"]\nbootstrapAmount = 10\n")?;
    let bad = temp.path().join("bad.toml");
    std::fs::write(&bad, "names = [\"id\", \"T2M\"]\nls_threshold = -1\n")?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    cmd.arg("config")
        .arg("--check")
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 variables, 0 alignments"));

    let mut cmd = Command::cargo_bin("phylogeo")?;
    cmd.arg("config")
        .arg("--check")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("ls_threshold"));

    Ok(())
}

#[test]
fn command_matrix() -> anyhow::Result<()> {
    let geo = geo_file()?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    let output = cmd
        .arg("matrix")
        .arg(geo.path())
        .arg("--names")
        .arg("id,T2M")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "5");
    assert_eq!(lines[1], "A\t0\t1\t0.25\t0.75\t0.5");
    assert_eq!(lines[2], "B\t1\t0\t0.75\t0.25\t0.5");

    Ok(())
}

#[test]
fn command_matrix_degenerate() -> anyhow::Result<()> {
    let geo = geo_file()?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    let output = cmd
        .arg("matrix")
        .arg(geo.path())
        .arg("--names")
        .arg("id,FLAT")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("C\t0\t0\t0\t0\t0"));

    let mut cmd = Command::cargo_bin("phylogeo")?;
    cmd.arg("matrix")
        .arg(geo.path())
        .arg("--names")
        .arg("id,FLAT")
        .arg("--degenerate")
        .arg("error")
        .assert()
        .failure()
        .stderr(predicate::str::contains("FLAT has zero variance"));

    Ok(())
}

#[test]
fn command_matrix_missing_column() -> anyhow::Result<()> {
    let geo = geo_file()?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    cmd.arg("matrix")
        .arg(geo.path())
        .arg("--names")
        .arg("id,WS10M")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Column WS10M not found"));

    Ok(())
}

#[test]
fn command_climatic() -> anyhow::Result<()> {
    let geo = geo_file()?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    let output = cmd
        .arg("climatic")
        .arg(geo.path())
        .arg("--names")
        .arg("id,ALLSKY_SFC_SW_DWN,T2M")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ALLSKY_SFC_SW_DWN\t("));
    assert!(lines[1].starts_with("T2M\t("));
    for line in lines {
        assert!(line.ends_with(';'));
        for leaf in ["A:", "B:", "C:", "D:", "E:"] {
            assert!(line.contains(leaf));
        }
    }

    Ok(())
}

#[test]
fn command_climatic_too_few_specimens() -> anyhow::Result<()> {
    let mut geo = Builder::new().suffix(".csv").tempfile()?;
    write!(geo, "id,T2M\nA,1\nB,2\n")?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    cmd.arg("climatic")
        .arg(geo.path())
        .arg("--names")
        .arg("id,T2M")
        .assert()
        .failure()
        .stderr(predicate::str::contains("climatic stage failed for T2M"));

    Ok(())
}

#[test]
fn command_bootstrap() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let good = temp.path().join("1_35.fasta");
    std::fs::write(
        &good,
        ">a\nAAAAAAAAAAAAAAAAAAAA\n>b\nAAAAAAAAAAAAAAAAAAAT\n>c\nCCCCCCCCCCAAAAAAAAAA\n>d\nCCCCCCCCCCAAAAAAAAAG\n>e\nGGGGGGGGGGGGGGGGGGGG\n",
    )?;
    let small = temp.path().join("36_70.fasta");
    std::fs::write(&small, ">a\nACGT\n>b\nACGA\n")?;

    let mut cmd = Command::cargo_bin("phylogeo")?;
    let output = cmd
        .arg("bootstrap")
        .arg(&good)
        .arg(&small)
        .arg("--reps")
        .arg("20")
        .arg("-p")
        .arg("2")
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 1);
    let fields: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(fields[0], "1_35");
    assert!(fields[1].parse::<f64>()? > 50.0);
    assert!(fields[2].ends_with(';'));
    assert!(stderr.contains("36_70"));

    Ok(())
}
