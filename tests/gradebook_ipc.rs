use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
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

/// Workspace with two students and two assignments (Quiz 1: 100 pts,
/// Homework 1: 50 pts).
fn seed_class(sc: &mut Sidecar, workspace: &PathBuf) {
    sc.call(
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    sc.call(
        "students.create",
        json!({ "firstName": "Ada", "lastName": "Byron" }),
    );
    sc.call(
        "students.create",
        json!({ "firstName": "Grace", "lastName": "Hopper" }),
    );
    sc.call(
        "assignments.create",
        json!({ "title": "Quiz 1", "category": "Quiz", "points": 100, "dueDate": "2024-01-12" }),
    );
    sc.call(
        "assignments.create",
        json!({ "title": "Homework 1", "category": "Homework", "points": 50, "dueDate": "2024-01-15" }),
    );
}

fn row_for(book: &Value, student_id: i64) -> Value {
    book["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|r| r["studentId"].as_i64() == Some(student_id))
        .cloned()
        .expect("row for student")
}

#[test]
fn cell_edits_feed_averages_and_letters() {
    let workspace = temp_workspace("classroomd-gradebook");
    let mut sc = Sidecar::start();
    seed_class(&mut sc, &workspace);

    let updated = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 92 }),
    );
    assert_eq!(updated["grade"]["id"].as_i64(), Some(1));
    assert_eq!(updated["letter"].as_str(), Some("A"));
    // 92 of 150 total points.
    assert_eq!(updated["studentAverage"].as_f64(), Some(61.3));

    let book = sc.call("gradebook.open", json!({}));
    let ada = row_for(&book, 1);
    assert_eq!(ada["cells"][0]["score"].as_f64(), Some(92.0));
    assert_eq!(ada["cells"][0]["letter"].as_str(), Some("A"));
    assert!(ada["cells"][1]["score"].is_null());
    assert_eq!(ada["average"].as_f64(), Some(61.3));

    let grace = row_for(&book, 2);
    assert_eq!(grace["average"].as_f64(), Some(0.0));

    assert_eq!(book["classAverages"][0]["avgPercent"].as_f64(), Some(92.0));
    assert_eq!(book["classAverages"][1]["avgPercent"].as_f64(), Some(0.0));

    // A second graded student moves the assignment's class average.
    sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 2, "assignmentId": 1, "score": 46 }),
    );
    let book = sc.call("gradebook.open", json!({}));
    assert_eq!(book["classAverages"][0]["avgPercent"].as_f64(), Some(69.0));
}

#[test]
fn re_editing_a_cell_replaces_instead_of_duplicating() {
    let workspace = temp_workspace("classroomd-gradebook-upsert");
    let mut sc = Sidecar::start();
    seed_class(&mut sc, &workspace);

    let first = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 70 }),
    );
    let second = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 70 }),
    );
    let first_id = first["grade"]["id"].as_i64();
    assert_eq!(first_id, second["grade"]["id"].as_i64());
    assert_eq!(second["grade"]["score"].as_f64(), Some(70.0));

    let dash = sc.call("dashboard.open", json!({ "today": "2024-01-08" }));
    assert_eq!(dash["gradeCount"].as_i64(), Some(1));

    // Re-editing with a new score replaces the old one in place.
    let third = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 95 }),
    );
    assert_eq!(first_id, third["grade"]["id"].as_i64());
    assert_eq!(third["grade"]["score"].as_f64(), Some(95.0));
}

#[test]
fn malformed_scores_degrade_to_zero() {
    let workspace = temp_workspace("classroomd-gradebook-coerce");
    let mut sc = Sidecar::start();
    seed_class(&mut sc, &workspace);

    let negative = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": -10 }),
    );
    assert_eq!(negative["grade"]["score"].as_f64(), Some(0.0));
    assert_eq!(negative["letter"].as_str(), Some("F"));

    let non_numeric = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 2, "score": "ninety" }),
    );
    assert_eq!(non_numeric["grade"]["score"].as_f64(), Some(0.0));
}

#[test]
fn letter_boundaries_are_inclusive() {
    let workspace = temp_workspace("classroomd-gradebook-letters");
    let mut sc = Sidecar::start();
    seed_class(&mut sc, &workspace);

    let b = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 89.9 }),
    );
    assert_eq!(b["letter"].as_str(), Some("B"));

    let a = sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 1, "score": 90 }),
    );
    assert_eq!(a["letter"].as_str(), Some("A"));
}

#[test]
fn unknown_references_surface_not_found() {
    let workspace = temp_workspace("classroomd-gradebook-missing");
    let mut sc = Sidecar::start();
    seed_class(&mut sc, &workspace);

    assert_eq!(
        sc.call_err(
            "gradebook.updateCell",
            json!({ "studentId": 1, "assignmentId": 99, "score": 50 }),
        ),
        "not_found"
    );
}

#[test]
fn category_filter_narrows_the_grid() {
    let workspace = temp_workspace("classroomd-gradebook-filter");
    let mut sc = Sidecar::start();
    seed_class(&mut sc, &workspace);

    sc.call(
        "gradebook.updateCell",
        json!({ "studentId": 1, "assignmentId": 2, "score": 50 }),
    );

    let filtered = sc.call("gradebook.open", json!({ "category": "Homework" }));
    let assignments = filtered["assignments"].as_array().expect("assignments");
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0]["title"].as_str(), Some("Homework 1"));
    // Averages follow the visible columns: 50 of 50 points.
    assert_eq!(row_for(&filtered, 1)["average"].as_f64(), Some(100.0));

    let all = sc.call("gradebook.open", json!({ "category": "all" }));
    assert_eq!(all["assignments"].as_array().map(|a| a.len()), Some(2));
}
