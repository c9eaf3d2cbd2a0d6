use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

/// One daemon process driven over its stdin/stdout JSON-lines protocol.
struct Sidecar {
    child: Child,
    input: ChildStdin,
    output: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    fn start() -> Self {
        let mut child = Command::new(env!("CARGO_BIN_EXE_classroomd"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn classroomd");
        let input = child.stdin.take().expect("child stdin");
        let output = BufReader::new(child.stdout.take().expect("child stdout"));
        Sidecar {
            child,
            input,
            output,
            next_id: 0,
        }
    }

    /// Sends one request and returns the raw response envelope.
    fn raw(&mut self, method: &str, params: Value) -> Value {
        self.next_id += 1;
        let id = format!("r{}", self.next_id);
        let line = json!({ "id": id, "method": method, "params": params });
        writeln!(self.input, "{}", line).expect("write request");
        self.input.flush().expect("flush request");

        let mut reply = String::new();
        self.output.read_line(&mut reply).expect("read response");
        let reply: Value = serde_json::from_str(reply.trim()).expect("response json");
        assert_eq!(reply["id"].as_str(), Some(id.as_str()), "response id for {}", method);
        reply
    }

    /// Sends one request and unwraps its `result`, failing the test on error.
    fn call(&mut self, method: &str, params: Value) -> Value {
        let reply = self.raw(method, params);
        assert_eq!(reply["ok"].as_bool(), Some(true), "{} failed: {}", method, reply);
        reply["result"].clone()
    }

    /// Sends one request that must fail and returns its error code.
    fn call_err(&mut self, method: &str, params: Value) -> String {
        let reply = self.raw(method, params);
        assert_eq!(
            reply["ok"].as_bool(),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            reply
        );
        reply["error"]["code"].as_str().expect("error code").to_string()
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn temp_workspace(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{}-{}", tag, nanos));
    std::fs::create_dir_all(&dir).expect("create workspace dir");
    dir
}

#[test]
fn bundle_round_trips_the_workspace() {
    let workspace_a = temp_workspace("classroomd-bundle-a");
    let workspace_b = temp_workspace("classroomd-bundle-b");
    let bundle_path = temp_workspace("classroomd-bundle-out").join("class.zip");

    let mut sc = Sidecar::start();
    sc.call(
        "workspace.select",
        json!({ "path": workspace_a.to_string_lossy() }),
    );
    sc.call(
        "students.create",
        json!({ "firstName": "Ada", "lastName": "Byron" }),
    );
    sc.call(
        "assignments.create",
        json!({ "title": "Quiz 1", "category": "Quiz", "points": 100, "dueDate": "2024-01-12" }),
    );
    sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 92 }),
    );

    let export = sc.call(
        "backup.export",
        json!({ "outPath": bundle_path.to_string_lossy() }),
    );
    assert_eq!(
        export["bundleFormat"].as_str(),
        Some("classroom-workspace-v1")
    );
    assert_eq!(export["entryCount"].as_i64(), Some(4));

    let mut sig = [0u8; 4];
    std::fs::File::open(&bundle_path)
        .expect("open bundle")
        .read_exact(&mut sig)
        .expect("read signature");
    assert_eq!(sig, [0x50, 0x4B, 0x03, 0x04], "bundle is a zip");

    // Restore into a fresh workspace and read the data back.
    let imported = sc.call(
        "backup.import",
        json!({
            "inPath": bundle_path.to_string_lossy(),
            "workspacePath": workspace_b.to_string_lossy()
        }),
    );
    assert_eq!(
        imported["bundleFormatDetected"].as_str(),
        Some("classroom-workspace-v1")
    );

    let listed = sc.call("students.list", json!({}));
    let students = listed["students"].as_array().expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["lastName"].as_str(), Some("Byron"));

    let book = sc.call("gradebook.open", json!({}));
    assert_eq!(
        book["rows"][0]["cells"][0]["score"].as_f64(),
        Some(92.0)
    );
}

#[test]
fn import_rejects_non_bundles() {
    let workspace = temp_workspace("classroomd-bundle-reject");
    let not_a_bundle = temp_workspace("classroomd-bundle-junk").join("notes.txt");
    std::fs::write(&not_a_bundle, "just some text").expect("write junk file");

    let mut sc = Sidecar::start();
    sc.call(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    assert_eq!(
        sc.call_err(
            "backup.import",
            json!({ "inPath": not_a_bundle.to_string_lossy() }),
        ),
        "io_failed"
    );

    // The daemon stays usable after a failed import.
    let listed = sc.call("students.list", json!({}));
    assert!(listed["students"].as_array().is_some());
}
