use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn round_trip(test_data: &[u8]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("original.dat");
    let packed_path = temp_dir.path().join("packed.huf");
    let out_path = temp_dir.path().join("restored.dat");
    std::fs::write(&in_path,test_data)?;
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("compressed"));
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("expand")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("expanded"));
    assert_eq!(std::fs::read(&out_path)?,test_data);
    Ok(())
}

#[test]
fn text_round_trip() -> STDRESULT {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".repeat(40);
    round_trip(test_data.as_bytes())
}

#[test]
fn binary_round_trip() -> STDRESULT {
    let test_data: Vec<u8> = (0..4096u32).map(|i| (i*i % 251) as u8).collect();
    round_trip(&test_data)
}

#[test]
fn empty_round_trip() -> STDRESULT {
    // an empty file compresses to the all zero table plus a zero trailer
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("empty.dat");
    let packed_path = temp_dir.path().join("empty.huf");
    let out_path = temp_dir.path().join("restored.dat");
    std::fs::write(&in_path,b"")?;
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&packed_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(&packed_path)?,vec![0u8;1025]);
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("expand")
        .arg("-i").arg(&packed_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();
    assert_eq!(std::fs::read(&out_path)?.len(),0);
    Ok(())
}

#[test]
fn table_dumps_do_not_change_output() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("original.dat");
    let quiet_path = temp_dir.path().join("quiet.huf");
    let noisy_path = temp_dir.path().join("noisy.huf");
    std::fs::write(&in_path,"mississippi river".as_bytes())?;
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&quiet_path)
        .assert()
        .success();
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("compress")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&noisy_path)
        .arg("--freq-table")
        .arg("--code-table")
        .arg("--progress")
        .assert()
        .success()
        .stderr(predicate::str::contains("Frequency Table"))
        .stderr(predicate::str::contains("Code Table"));
    assert_eq!(std::fs::read(&quiet_path)?,std::fs::read(&noisy_path)?);
    Ok(())
}

#[test]
fn rejects_garbage() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = temp_dir.path().join("garbage.huf");
    let out_path = temp_dir.path().join("restored.dat");
    std::fs::write(&in_path,[0u8;10])?;
    let mut cmd = Command::cargo_bin("huffpack")?;
    cmd.arg("expand")
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("MalformedHeader"));
    Ok(())
}
