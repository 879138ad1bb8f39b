use assert_cmd::Command;
use predicates::str::contains;
use serde_json::Value;

mod support;

use support::TestData;

fn taskmirror(data: &TestData) -> Command {
    let mut cmd = Command::cargo_bin("taskmirror").expect("binary");
    cmd.env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(data.path().join("data"))
        .arg("--config")
        .arg(data.path().join("taskmirror.toml"));
    cmd
}

fn json_output(cmd: &mut Command) -> Value {
    let output = cmd.arg("--json").output().expect("run");
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn taskmirror_help_works() {
    Command::cargo_bin("taskmirror")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("taskwarrior"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "list",
        "add",
        "show",
        "modify",
        "done",
        "delete",
        "sync",
        "import",
        "export",
        "autocomplete",
        "filter",
    ];

    for cmd in subcommands {
        Command::cargo_bin("taskmirror")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn add_list_done_flow() {
    let data = TestData::new();

    let added = json_output(
        taskmirror(&data)
            .args(["add", "Buy milk", "--project", "home", "--tags", "errand, store"]),
    );
    assert_eq!(added["status"], "success");
    assert_eq!(added["data"]["task"]["description"], "Buy milk");
    assert_eq!(added["data"]["task"]["dirty"], true);
    let id = added["data"]["task"]["uuid"]
        .as_str()
        .expect("uuid")
        .to_string();

    let listed = json_output(taskmirror(&data).arg("list"));
    assert_eq!(listed["data"]["total"], 1);
    assert_eq!(listed["data"]["tasks"][0]["project"], "home");

    taskmirror(&data)
        .args(["done", &id[..8]])
        .assert()
        .success()
        .stdout(contains("Task completed"));

    let listed = json_output(taskmirror(&data).arg("list"));
    assert_eq!(listed["data"]["total"], 0);
    assert_eq!(listed["data"]["dirty"], 1);
}

#[test]
fn unknown_task_is_a_user_error() {
    let data = TestData::new();
    taskmirror(&data)
        .args(["show", "deadbeef"])
        .assert()
        .code(2)
        .stderr(contains("Task not found"));
}

#[test]
fn json_errors_name_the_command() {
    let data = TestData::new();
    let output = taskmirror(&data)
        .args(["--json", "show", "deadbeef"])
        .output()
        .expect("run");
    assert_eq!(output.status.code(), Some(2));

    let body: Value = serde_json::from_slice(&output.stdout).expect("json error");
    assert_eq!(body["status"], "error");
    assert_eq!(body["command"], "show");
    assert_eq!(body["error"]["kind"], "user_error");
    assert_eq!(body["next_steps"][0], "taskmirror list --all");
}

#[test]
fn blank_name_is_rejected() {
    let data = TestData::new();
    taskmirror(&data).args(["add", "   "]).assert().code(2);
}

#[test]
fn failing_store_command_reports_operation_failure() {
    let data = TestData::new();
    data.write_file(
        "taskmirror.toml",
        "[sync]\ncommand = \"taskmirror-test-no-such-binary\"\n",
    )
    .expect("config");

    taskmirror(&data).args(["add", "pending work"]).assert().success();
    taskmirror(&data)
        .arg("sync")
        .assert()
        .code(4)
        .stderr(contains("sync failed"));

    let listed = json_output(taskmirror(&data).arg("list"));
    assert_eq!(listed["data"]["dirty"], 1);
}

#[cfg(unix)]
#[test]
fn sync_adopts_store_export() {
    let data = TestData::new();
    data.write_file(
        "taskmirror.toml",
        r#"[sync]
command = "sh"
args = ['-c', 'cat >/dev/null; if [ "$0" = export ]; then echo "[]"; fi']
"#,
    )
    .expect("config");

    taskmirror(&data).args(["add", "pushed away"]).assert().success();
    let synced = json_output(taskmirror(&data).arg("sync"));
    assert_eq!(synced["data"]["outcome"], "success");
    assert_eq!(synced["data"]["pushed"], 1);
    assert_eq!(synced["data"]["received"], 0);

    let listed = json_output(taskmirror(&data).args(["list", "--all"]));
    assert_eq!(listed["data"]["total"], 0);
    assert_eq!(listed["data"]["dirty"], 0);
}

#[test]
fn import_then_export_keeps_records() {
    let data = TestData::new();
    let export = r#"[
{"uuid":"5a1c0f4e-3c5e-4d5b-9c8a-1b2c3d4e5f60","description":"Renew passport","status":"pending","created":"20250105T120000Z","recur":"yearly"},
{"uuid":"not-a-uuid","description":"broken"}
]"#;
    let file = data.write_file("export.json", export).expect("export file");

    let imported = json_output(taskmirror(&data).arg("import").arg(&file));
    assert_eq!(imported["data"]["imported"], 1);
    assert_eq!(imported["data"]["skipped"][0]["index"], 1);

    let output = taskmirror(&data).arg("export").output().expect("export");
    assert!(output.status.success());
    let records: Value = serde_json::from_slice(&output.stdout).expect("records");
    assert_eq!(records[0]["uuid"], "5a1c0f4e-3c5e-4d5b-9c8a-1b2c3d4e5f60");
    assert_eq!(records[0]["recur"], "yearly");
}

#[test]
fn filter_commands_manage_persistent_filters() {
    let data = TestData::new();
    taskmirror(&data)
        .args(["add", "office task", "--project", "work"])
        .assert()
        .success();
    taskmirror(&data)
        .args(["add", "garden task", "--project", "home"])
        .assert()
        .success();

    taskmirror(&data)
        .args(["filter", "add", "project", "work", "--exclude"])
        .assert()
        .success()
        .stdout(contains("Exclude tasks in project 'work'"));
    taskmirror(&data)
        .args(["filter", "add", "project", "work", "--exclude"])
        .assert()
        .code(2);

    let listed = json_output(taskmirror(&data).arg("list"));
    assert_eq!(listed["data"]["total"], 1);
    assert_eq!(listed["data"]["tasks"][0]["project"], "home");

    taskmirror(&data).args(["filter", "toggle", "0"]).assert().success();
    let listed = json_output(taskmirror(&data).arg("list"));
    assert_eq!(listed["data"]["total"], 2);

    taskmirror(&data).args(["filter", "remove", "0"]).assert().success();
    let filters = json_output(taskmirror(&data).args(["filter", "list"]));
    assert_eq!(filters["data"]["total"], 0);
}

#[test]
fn autocomplete_lists_known_values() {
    let data = TestData::new();
    taskmirror(&data)
        .args(["add", "one", "--tags", "errand,email"])
        .assert()
        .success();

    let values = json_output(taskmirror(&data).args(["autocomplete", "tag", "e"]));
    assert_eq!(values["data"]["values"], serde_json::json!(["email", "errand"]));
}
