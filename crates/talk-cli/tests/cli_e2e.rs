use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn talk_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_talk"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(talk_bin())
        .current_dir(dir)
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("run talk")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn corpus() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let defs = dir.path().join("defs");
    fs::create_dir_all(defs.join("net")).expect("mkdir");
    fs::write(
        defs.join("shapes.talk"),
        "@class geo.Point a location\n@field real x\n@field real y\n@end\n",
    )
    .expect("write shapes");
    fs::write(
        defs.join("net/chat.talk"),
        "@protocol Chat\n@method send\n@request geo.Point\n@response none\n@end\n@end\n\
         @enumeration Color\n@constant RED\n@constant GREEN\n@end\n",
    )
    .expect("write chat");
    fs::write(defs.join("README.md"), "not a talk file\n").expect("write readme");
    dir
}

#[test]
fn check_reports_counts() {
    let dir = corpus();
    let output = run(dir.path(), &["check", "defs"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = stdout(&output);
    assert!(text.contains("Checking 2 source file(s)"), "{text}");
    assert!(text.contains("class: 1"), "{text}");
    assert!(text.contains("protocol: 1"), "{text}");
    assert!(text.contains("Valid."), "{text}");
}

#[test]
fn check_fails_with_location() {
    let dir = corpus();
    fs::write(dir.path().join("bad.talk"), "@class Broken\n@field Missing link\n@end\n")
        .expect("write bad");

    let output = run(dir.path(), &["check", "bad.talk"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(
        err.contains("bad.talk:2  parse error near @field: cross-reference failed: no symbol Missing in classes"),
        "{err}"
    );
}

#[test]
fn dump_writes_json() {
    let dir = corpus();
    let output = run(dir.path(), &["dump", "defs", "--out", "out.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let text = fs::read_to_string(dir.path().join("out.json")).expect("read out.json");
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(json["class"][0]["name"], "geo.Point");
    assert_eq!(json["enumeration"][0]["constant"][1]["value"], 1);
    assert_eq!(json["protocol"][0]["method"][0]["request"], "geo.Point");
}

#[test]
fn dump_honours_config_file() {
    let dir = corpus();
    fs::write(dir.path().join("talk.json"), r#"{ "pretty": false, "recursive": false }"#)
        .expect("write config");

    let output = run(dir.path(), &["dump", "defs"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 1, "{text}");

    let json: serde_json::Value = serde_json::from_str(text.trim()).expect("valid json");
    assert_eq!(json["protocol"], serde_json::json!([]));
}

#[test]
fn symbols_tree_and_json() {
    let dir = corpus();
    let output = run(dir.path(), &["symbols", "defs"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("Namespace classes:"), "{text}");
    assert!(text.contains("    geo\n        Point (entry from"), "{text}");

    let output = run(dir.path(), &["symbols", "--json", "defs"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid json");
    assert_eq!(json["classes"][0]["name"], "geo.Point");
    assert_eq!(json["classes"][0]["line"], 1);
    assert_eq!(json["enumerations"][0]["name"], "Color");
    assert_eq!(json["glossaries"], serde_json::json!([]));
}

#[test]
fn missing_path_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = run(dir.path(), &["check", "nowhere"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("no such file or directory"));
}
