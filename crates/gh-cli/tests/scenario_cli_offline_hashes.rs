//! `geohash` runs offline with a pinned DJIA value.

use assert_cmd::Command;
use predicates::prelude::*;

fn geohash() -> Command {
    let mut cmd = Command::cargo_bin("geohash").expect("binary built");
    // Keep the test independent of any developer environment.
    cmd.env_remove("GEOHASHING_DJIA_URLS")
        .env_remove("GEOHASHING_FETCH_TIMEOUT_SECS");
    cmd
}

fn json_stdout(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("stdout is not JSON")
}

fn near(v: &serde_json::Value, expected: f64) -> bool {
    v.as_f64().is_some_and(|x| (x - expected).abs() < 1e-6)
}

#[test]
fn cell_matches_the_comic() {
    let json = json_stdout(geohash().args([
        "cell",
        "--lat",
        "37",
        "--lon=-122",
        "--date",
        "2005-05-26",
        "--djia",
        "10458.68",
    ]));

    assert_eq!(json["date"], "2005-05-26");
    assert!(near(&json["lat"], 37.857713), "{json}");
    assert!(near(&json["lon"], -122.544543), "{json}");
}

#[test]
fn global_for_the_day_after() {
    let json = json_stdout(geohash().args([
        "global",
        "--date",
        "2005-05-27",
        "--djia",
        "10458.68",
    ]));

    assert!(near(&json["lat"], 25.672287), "{json}");
    assert!(near(&json["lon"], 37.297606), "{json}");
}

#[test]
fn next_on_saturday_lists_three_days() {
    let json = json_stdout(geohash().args([
        "next",
        "--lat",
        "52",
        "--lon",
        "13",
        "--date",
        "2022-01-08",
        "--time",
        "12:00",
        "--tz",
        "Europe/Berlin",
        "--djia",
        "36231.66",
    ]));

    let days = json.as_array().expect("array");
    assert_eq!(days.len(), 3);
    assert_eq!(days[0]["date"], "2022-01-08");
    assert_eq!(days[2]["date"], "2022-01-10");
}

#[test]
fn thirty_west_before_opening_bell_fails() {
    geohash()
        .args([
            "cell",
            "--lat",
            "40",
            "--lon=-74",
            "--date",
            "2022-07-15",
            "--time",
            "09:00",
            "--tz",
            "America/New_York",
            "--djia",
            "31288.26",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("30W rule"));
}

#[test]
fn unknown_time_zone_is_a_usage_error() {
    geohash()
        .args(["global", "--tz", "Mars/Olympus", "--djia", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tz"));
}
