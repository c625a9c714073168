use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
}

impl Sidecar {
    fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_ongd");
        let mut child = Command::new(exe)
            .env("ONGD_OFFLINE", "1")
            .env_remove("ONGD_API_BASE")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn ongd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
        }
    }

    fn line(&mut self) -> serde_json::Value {
        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read line");
        assert!(!line.trim().is_empty(), "sidecar closed stdout");
        serde_json::from_str(line.trim()).expect("parse json line")
    }

    fn call(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let payload = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");
        let value = self.line();
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
        value
    }

    fn ok(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.call(id, method, params);
        assert!(
            value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_else(|| json!({}))
    }

    fn fail(&mut self, id: &str, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.call(id, method, params);
        assert_eq!(value["ok"], false, "{} unexpectedly succeeded", method);
        value["error"].clone()
    }

    fn select(&mut self, workspace: &PathBuf) {
        self.ok(
            "select",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
    }

    fn close(self) {
        let Sidecar {
            mut child, stdin, ..
        } = self;
        drop(stdin);
        let _ = child.wait();
    }
}

#[test]
fn login_register_logout_cycle() {
    let workspace = temp_dir("ongd-auth");
    let mut s = Sidecar::spawn();
    s.select(&workspace);

    let anon = s.ok("1", "auth.session", json!({}));
    assert_eq!(anon["isAuthenticated"], false);

    let err = s.fail(
        "2",
        "auth.login",
        json!({ "email": "admin@ong.com", "password": "wrong" }),
    );
    assert_eq!(err["code"], "invalid_credentials");

    let session = s.ok(
        "3",
        "auth.login",
        json!({ "email": "  ADMIN@ong.com ", "password": "admin123" }),
    );
    assert_eq!(session["isAuthenticated"], true);
    assert_eq!(session["user"]["role"], "admin");
    assert!(session["user"].get("password").is_none());
    assert!(session["token"]
        .as_str()
        .is_some_and(|t| t.starts_with("fake-jwt-1-")));

    let same = s.ok("4", "auth.session", json!({}));
    assert_eq!(same["user"]["email"], "admin@ong.com");

    let out = s.ok("5", "auth.logout", json!({}));
    assert_eq!(out["isAuthenticated"], false);

    let err = s.fail(
        "6",
        "auth.register",
        json!({ "name": "Jo", "email": "x", "password": "short" }),
    );
    assert_eq!(err["code"], "validation_failed");

    let err = s.fail(
        "7",
        "auth.register",
        json!({ "name": "João Silva", "email": "joao@ong.com", "password": "Segura@123" }),
    );
    assert_eq!(err["code"], "email_taken");

    let fresh = s.ok(
        "8",
        "auth.register",
        json!({ "name": "Beatriz Lima", "email": "bia@ong.com", "password": "Segura@123" }),
    );
    assert_eq!(fresh["isAuthenticated"], true);
    assert_eq!(fresh["user"]["role"], "user");

    let users = s.ok("9", "users.list", json!({}));
    assert_eq!(users["items"].as_array().map(|a| a.len()), Some(3));

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn draft_then_submit_creates_an_evaluation() {
    let workspace = temp_dir("ongd-submit");
    let mut s = Sidecar::spawn();
    s.select(&workspace);

    s.ok(
        "1",
        "auth.login",
        json!({ "email": "admin@ong.com", "password": "admin123" }),
    );

    let suggestion = s.ok(
        "2",
        "evaluations.suggestion",
        json!({ "answers": { "1": "nao", "2": "nao" } }),
    );
    assert_eq!(suggestion["code"], "support");

    s.ok(
        "3",
        "evaluations.draft.save",
        json!({ "selectedStudent": "1729876543210", "page": 1 }),
    );
    s.ok(
        "4",
        "evaluations.draft.save",
        json!({ "answer": { "index": 1, "value": "sim" } }),
    );
    let draft = s.ok(
        "5",
        "evaluations.draft.save",
        json!({ "answer": { "index": "2", "value": "sim" } }),
    );
    assert_eq!(draft["draft"]["page"], 1);
    assert_eq!(draft["draft"]["answers"]["1"], "sim");
    assert_eq!(draft["draft"]["answers"]["2"], "sim");

    let done = s.ok("6", "evaluations.submit", json!({}));
    assert_eq!(done["suggestion"]["code"], "ok");
    assert_eq!(done["evaluation"]["studentId"], "1729876543210");
    assert_eq!(done["evaluation"]["studentName"], "Ana Clara Santos");
    assert_eq!(done["evaluation"]["evaluatedBy"], 1);

    let draft = s.ok("7", "evaluations.draft.get", json!({}));
    assert!(draft["draft"]["answers"]
        .as_object()
        .is_some_and(|a| a.is_empty()));

    let evaluations = s.ok("8", "evaluations.list", json!({}));
    assert_eq!(evaluations["items"].as_array().map(|a| a.len()), Some(3));

    let err = s.fail("9", "evaluations.submit", json!({}));
    assert_eq!(err["code"], "validation_failed");

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn notifications_add_toggle_and_weekly() {
    let workspace = temp_dir("ongd-notifications");
    let mut s = Sidecar::spawn();
    s.select(&workspace);

    let weekly = s.ok("1", "notifications.weekly", json!({}));
    assert!(weekly["weekStart"].as_str().is_some());
    assert_eq!(weekly["thisWeek"].as_array().map(|a| a.len()), Some(0));
    let upcoming = weekly["upcoming"].as_array().expect("upcoming");
    assert_eq!(upcoming.len(), 3);
    assert_eq!(upcoming[0]["when"], "2024-10-15");

    let err = s.fail("2", "notifications.add", json!({ "title": "" }));
    assert_eq!(err["code"], "validation_failed");

    let added = s.ok(
        "3",
        "notifications.add",
        json!({ "title": "Reunião com a empresa parceira" }),
    );
    assert_eq!(added["record"]["read"], false);
    let when = added["record"]["when"].as_str().expect("when").to_string();
    assert_eq!(when.len(), 10, "when is normalized to a calendar date");

    let weekly = s.ok("4", "notifications.weekly", json!({}));
    let this_week = weekly["thisWeek"].as_array().expect("thisWeek");
    assert_eq!(this_week.len(), 1);
    assert_eq!(this_week[0]["title"], "Reunião com a empresa parceira");
    assert_eq!(weekly["upcoming"].as_array().map(|a| a.len()), Some(0));

    let toggled = s.ok("5", "notifications.toggle", json!({ "id": 1 }));
    assert_eq!(toggled["record"]["read"], true);
    let err = s.fail("6", "notifications.toggle", json!({ "id": 999 }));
    assert_eq!(err["code"], "not_found");

    let marked = s.ok("7", "notifications.markAllRead", json!({}));
    assert_eq!(marked["updated"], 2);

    let cleared = s.ok("8", "notifications.clearAll", json!({}));
    assert_eq!(cleared["removed"], 4);
    let list = s.ok("9", "notifications.list", json!({}));
    assert_eq!(list["items"].as_array().map(|a| a.len()), Some(0));

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn subscribed_clients_receive_store_changed_lines() {
    let workspace = temp_dir("ongd-events");
    let mut s = Sidecar::spawn();
    s.select(&workspace);

    let sub = s.ok("1", "events.subscribe", json!({}));
    assert_eq!(sub["subscribed"], true);

    s.ok(
        "2",
        "students.create",
        json!({ "record": { "name": "Rafael Souza" } }),
    );
    let event = s.line();
    assert_eq!(event["event"], "store.changed");
    assert_eq!(event["key"], "alunos-cadastrados-v1");
    assert_eq!(event["change"], "written");

    s.ok("3", "auth.logout", json!({}));
    s.ok("4", "events.unsubscribe", json!({}));

    // No event line may sit between these two responses.
    s.ok(
        "5",
        "students.create",
        json!({ "record": { "name": "Camila Rocha" } }),
    );
    let health = s.ok("6", "health", json!({}));
    assert!(health["version"].as_str().is_some());

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn workspace_bundle_export_import_restores_cache() {
    let workspace = temp_dir("ongd-bundle-ws");
    let out_dir = temp_dir("ongd-bundle-out");
    let bundle = out_dir.join("ong.zip");
    let mut s = Sidecar::spawn();
    s.select(&workspace);

    let exported = s.ok(
        "1",
        "workspace.exportBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(exported["bundleFormat"], "ong-workspace-v1");
    assert!(bundle.is_file());

    s.ok(
        "2",
        "students.delete",
        json!({ "id": "1729876543210" }),
    );
    let list = s.ok("3", "students.list", json!({}));
    assert_eq!(list["items"].as_array().map(|a| a.len()), Some(2));

    let imported = s.ok(
        "4",
        "workspace.importBundle",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(imported["verified"], true);

    let list = s.ok("5", "students.list", json!({}));
    assert_eq!(list["items"].as_array().map(|a| a.len()), Some(3));

    let err = s.fail(
        "6",
        "workspace.importBundle",
        json!({ "inPath": out_dir.join("missing.zip").to_string_lossy() }),
    );
    assert_eq!(err["code"], "not_found");

    s.ok("7", "students.delete", json!({ "id": "1729876543210" }));
    let reset = s.ok("8", "workspace.reset", json!({}));
    assert_eq!(reset["collections"], 7);
    let list = s.ok("9", "students.list", json!({}));
    assert_eq!(list["items"].as_array().map(|a| a.len()), Some(3));

    s.close();
    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}
