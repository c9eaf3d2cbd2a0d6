mod backup;
mod calc;
mod calendar;
mod db;
mod ipc;
mod model;
mod store;
mod summary;

use serde_json::json;
use std::io::{self, BufRead, Write};

fn main() -> io::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(stdin.lock(), stdout.lock())
}

/// One request per input line, one response line per request, flushed so an
/// interactive client never waits on a buffer.
fn serve(input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    let mut state = ipc::AppState::default();

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // No parseable request id to echo back.
            Err(e) => json!({
                "ok": false,
                "error": { "code": "bad_json", "message": e.to_string() }
            }),
        };

        serde_json::to_writer(&mut output, &reply).map_err(io::Error::from)?;
        output.write_all(b"\n")?;
        output.flush()?;
    }

    Ok(())
}
