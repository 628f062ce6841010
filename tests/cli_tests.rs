use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn row(order_number: u64, side: &str, activity: u8, original: u64, price: &str, mkt: &str) -> String {
    format!(
        "2,FUTIDX,{order_number},01/01/2020,09:15:00,{side},{activity},AXISBANK,EQ,,0,,{disclosed},{original},{price},0,{mkt},N,N,,0,C",
        disclosed = original
    )
}

#[test]
fn replay_writes_both_tapes_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("orders.csv");
    fs::write(
        &input,
        [
            row(1, "S", 1, 100, "50.00", "N"),
            row(2, "B", 1, 100, "50.00", "N"),
        ]
        .join("\n"),
    )
    .unwrap();
    let trades = dir.path().join("trades.csv");
    let events = dir.path().join("events.csv");

    Command::cargo_bin("lob-engine")
        .unwrap()
        .arg("replay")
        .arg(&input)
        .arg("--trades")
        .arg(&trades)
        .arg("--events")
        .arg(&events)
        .assert()
        .success();

    let tape = fs::read_to_string(&trades).unwrap();
    assert_eq!(tape, "1,01/01/2020,09:15:00,50.00,100,2,1\n");
    let events = fs::read_to_string(&events).unwrap();
    assert_eq!(events.lines().count(), 2);
}

#[test]
fn unknown_activity_exits_nonzero_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("orders.csv");
    fs::write(&input, row(7, "B", 9, 100, "50.00", "N")).unwrap();

    Command::cargo_bin("lob-engine")
        .unwrap()
        .arg("replay")
        .arg(&input)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized activity type 9"));
}

#[test]
fn malformed_row_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("orders.csv");
    fs::write(&input, "2,FUTIDX,1,01/01/2020,truncated").unwrap();

    Command::cargo_bin("lob-engine")
        .unwrap()
        .arg("replay")
        .arg(&input)
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed input row 1"));
}

#[test]
fn missing_input_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("lob-engine")
        .unwrap()
        .arg("replay")
        .arg(dir.path().join("nope.csv"))
        .current_dir(dir.path())
        .assert()
        .failure();
}
