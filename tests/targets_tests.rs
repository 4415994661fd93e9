use parashu_rs::targets::{expand_targets, read_target_file};
use std::fs;

#[test]
fn cidr_and_plain_targets_mix() {
    let out = expand_targets(&["10.0.0.0/30", "db.internal", "10.0.0.9"]).unwrap();
    assert_eq!(out, vec!["10.0.0.1", "10.0.0.2", "db.internal", "10.0.0.9"]);
}

#[test]
fn target_file_skips_blanks_and_comments() {
    let path = std::env::temp_dir().join(format!("parashu-targets-{}.txt", std::process::id()));
    fs::write(&path, "# lab\n127.0.0.1\n\n  host.lan  # printer\n").unwrap();
    let targets = read_target_file(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(targets, vec!["127.0.0.1", "host.lan"]);
}

#[test]
fn missing_target_file_is_an_error() {
    assert!(read_target_file("/nonexistent/parashu/targets.txt").is_err());
}
