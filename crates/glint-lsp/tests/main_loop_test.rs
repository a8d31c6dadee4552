//! Integration tests for the event loop state machine.
//!
//! The loop is driven by feeding messages and advancing a manual clock, so
//! no test waits on a real timer.

use crossbeam_channel::{Receiver, unbounded};
use glint_core::{CompileError, CompiledProgram, Compiler, FormatOptions, IncludeResolver, Source};
use glint_frontend::Frontend;
use glint_lsp::MainLoopState;
use glint_lsp::config::ServerConfig;
use glint_lsp::resolve::MemoryFileSystem;
use glint_lsp::scheduler::ManualClock;
use lsp_server::{Message, Notification, Request, RequestId, Response};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Wraps the real front-end, recording every compile and failing on demand.
#[derive(Default)]
struct RecordingCompiler {
    inner: Frontend,
    compiled: Mutex<Vec<Source>>,
    fail_compile: AtomicBool,
    panic_on_format: AtomicBool,
}

impl RecordingCompiler {
    fn take_compiled(&self) -> Vec<Source> {
        std::mem::take(&mut *self.compiled.lock())
    }
}

impl Compiler for RecordingCompiler {
    fn compile(
        &self,
        primary: Source,
        resolver: &dyn IncludeResolver,
    ) -> Result<Arc<dyn CompiledProgram>, CompileError> {
        self.compiled.lock().push(primary.clone());
        if self.fail_compile.load(Ordering::SeqCst) {
            return Err(CompileError::Internal("backend unavailable".to_string()));
        }
        self.inner.compile(primary, resolver)
    }

    fn format(&self, text: &str, options: &FormatOptions) -> Result<String, CompileError> {
        if self.panic_on_format.load(Ordering::SeqCst) {
            panic!("formatter blew up");
        }
        self.inner.format(text, options)
    }
}

struct Harness {
    state: MainLoopState,
    output: Receiver<Message>,
    clock: ManualClock,
    compiler: Arc<RecordingCompiler>,
    fs: Arc<MemoryFileSystem>,
    next_id: i32,
}

impl Harness {
    fn new() -> Self {
        let (sender, output) = unbounded();
        let clock = ManualClock::new();
        let compiler = Arc::new(RecordingCompiler::default());
        let fs = Arc::new(MemoryFileSystem::new());
        let config = ServerConfig {
            debounce_ms: DEBOUNCE.as_millis() as u64,
            ..ServerConfig::default()
        };
        let state = MainLoopState::with_parts(
            sender,
            config,
            compiler.clone(),
            fs.clone(),
            Arc::new(clock.clone()),
        );
        Self {
            state,
            output,
            clock,
            compiler,
            fs,
            next_id: 0,
        }
    }

    fn notify(&mut self, method: &str, params: Value) {
        self.state
            .handle_message(Message::Notification(Notification::new(
                method.to_string(),
                params,
            )));
    }

    fn open(&mut self, uri: &str, text: &str, version: i32) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": uri,
                    "languageId": "glsl",
                    "version": version,
                    "text": text,
                }
            }),
        );
    }

    fn change(&mut self, uri: &str, text: &str, version: i32) {
        self.notify(
            "textDocument/didChange",
            json!({
                "textDocument": { "uri": uri, "version": version },
                "contentChanges": [{ "text": text }],
            }),
        );
    }

    fn request(&mut self, method: &str, params: Value) -> Response {
        self.next_id += 1;
        let id = RequestId::from(self.next_id);
        self.state.handle_message(Message::Request(Request::new(
            id.clone(),
            method.to_string(),
            params,
        )));
        self.drain()
            .into_iter()
            .find_map(|msg| match msg {
                Message::Response(resp) if resp.id == id => Some(resp),
                _ => None,
            })
            .expect("no response sent")
    }

    fn hover(&mut self, uri: &str, line: u32, character: u32) -> Value {
        let resp = self.request(
            "textDocument/hover",
            json!({
                "textDocument": { "uri": uri },
                "position": { "line": line, "character": character },
            }),
        );
        resp.result.expect("hover failed")
    }

    /// Let the debounce deadline pass and run the due build.
    fn settle(&mut self) -> bool {
        self.clock.advance(DEBOUNCE);
        self.state.run_build_if_due()
    }

    fn drain(&self) -> Vec<Message> {
        self.output.try_iter().collect()
    }
}

fn published(messages: &[Message]) -> Vec<(String, Vec<Value>, Option<i64>)> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            Message::Notification(n) if n.method == "textDocument/publishDiagnostics" => Some((
                n.params["uri"].as_str().unwrap_or_default().to_string(),
                n.params["diagnostics"].as_array().cloned().unwrap_or_default(),
                n.params["version"].as_i64(),
            )),
            _ => None,
        })
        .collect()
}

fn shown_messages(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .filter_map(|msg| match msg {
            Message::Notification(n) if n.method == "window/showMessage" => {
                n.params["message"].as_str().map(str::to_string)
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_rapid_edits_coalesce_into_one_compile() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "void main() {}", 1);
    assert!(h.settle());
    h.compiler.take_compiled();

    h.change("file:///p/a.glsl", "void main() { float a; }", 2);
    h.clock.advance(Duration::from_millis(10));
    assert!(!h.state.run_build_if_due());
    h.change("file:///p/a.glsl", "void main() { float b; }", 3);

    // The second edit re-armed the timer, so the first deadline is gone.
    h.clock.advance(Duration::from_millis(99));
    assert!(!h.state.run_build_if_due());
    h.clock.advance(Duration::from_millis(1));
    assert!(h.state.run_build_if_due());

    let compiled = h.compiler.take_compiled();
    assert_eq!(compiled.len(), 1);
    assert_eq!(compiled[0].contents, "void main() { float b; }");
    assert_eq!(h.state.snapshot().generation(), 2);
}

#[test]
fn test_query_before_first_build_returns_null() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "float x = 1.0;\nvoid main() { x; }", 1);

    assert_eq!(h.hover("file:///p/a.glsl", 1, 14), Value::Null);
    let symbols = h.request(
        "textDocument/documentSymbol",
        json!({ "textDocument": { "uri": "file:///p/a.glsl" } }),
    );
    assert_eq!(symbols.result, Some(Value::Null));
    assert!(symbols.error.is_none());
}

#[test]
fn test_every_open_document_gets_a_replacing_publish() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "void main() { y = 1.0; }", 4);
    h.open("file:///p/b.glsl", "void main() {}", 1);
    assert!(h.settle());

    let first = published(&h.drain());
    assert_eq!(first.len(), 2);
    let (uri, diagnostics, version) = &first[0];
    assert_eq!(uri, "file:///p/a.glsl");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0]["severity"], json!(1));
    assert_eq!(diagnostics[0]["source"], json!("glint"));
    assert_eq!(*version, Some(4));
    assert_eq!(first[1].0, "file:///p/b.glsl");
    assert!(first[1].1.is_empty());

    h.change("file:///p/a.glsl", "void main() { float y = 1.0; }", 5);
    assert!(h.settle());
    let second = published(&h.drain());
    let a = second
        .iter()
        .find(|(uri, _, _)| uri == "file:///p/a.glsl")
        .unwrap();
    // Fixed error is cleared; only the unused-local hint remains, if any.
    assert!(a.1.iter().all(|d| d["severity"] == json!(4)));
    assert_eq!(a.2, Some(5));
}

#[test]
fn test_close_clears_diagnostics_immediately() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "void main() { y; }", 1);
    assert!(h.settle());
    h.drain();

    h.notify(
        "textDocument/didClose",
        json!({ "textDocument": { "uri": "file:///p/a.glsl" } }),
    );
    let cleared = published(&h.drain());
    assert_eq!(cleared.len(), 1);
    assert!(cleared[0].1.is_empty());
    assert!(!h.state.vfs().is_open("file:///p/a.glsl"));
}

#[test]
fn test_failed_build_keeps_previous_snapshot() {
    let mut h = Harness::new();
    h.open(
        "file:///p/a.glsl",
        "// Brightness.\nfloat gain = 2.0;\nvoid main() { gain; }",
        1,
    );
    assert!(h.settle());
    h.drain();
    assert_eq!(h.state.snapshot().generation(), 1);

    h.compiler.fail_compile.store(true, Ordering::SeqCst);
    h.change("file:///p/a.glsl", "void main() {}", 2);
    assert!(h.settle());

    let messages = h.drain();
    assert!(published(&messages).is_empty());
    let shown = shown_messages(&messages);
    assert_eq!(shown.len(), 1);
    assert!(shown[0].contains("backend unavailable"));
    assert_eq!(h.state.snapshot().generation(), 1);
    assert_eq!(h.state.scheduler().generation(), 2);

    // Queries still answer from the last good build.
    let hover = h.hover("file:///p/a.glsl", 2, 15);
    assert!(hover["contents"]["value"].as_str().unwrap().contains("Brightness."));

    // The next edit retries.
    h.compiler.fail_compile.store(false, Ordering::SeqCst);
    h.change("file:///p/a.glsl", "void main() { }", 3);
    assert!(h.settle());
    assert_eq!(h.state.snapshot().generation(), 3);
}

#[test]
fn test_watched_files_event_schedules_build() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "void main() {}", 1);
    assert!(h.settle());
    assert!(h.state.scheduler().deadline().is_none());

    h.notify(
        "workspace/didChangeWatchedFiles",
        json!({ "changes": [{ "uri": "file:///p/lib.glsl", "type": 2 }] }),
    );
    assert!(h.state.scheduler().deadline().is_some());
    assert!(h.settle());
    assert_eq!(h.compiler.take_compiled().len(), 2);
}

#[test]
fn test_watched_file_change_rebuilds_from_disk() {
    let mut h = Harness::new();
    h.fs.insert("/p/lib.glsl", "// Old.\nfloat level = 1.0;");
    h.open(
        "file:///p/main.glsl",
        "#include \"lib.glsl\"\nvoid main() { level; }",
        1,
    );
    assert!(h.settle());
    let before = h.hover("file:///p/main.glsl", 1, 15);
    assert!(before["contents"]["value"].as_str().unwrap().contains("Old."));

    h.fs.insert("/p/lib.glsl", "// New.\nfloat level = 1.0;");
    h.notify(
        "workspace/didChangeWatchedFiles",
        json!({ "changes": [{ "uri": "file:///p/lib.glsl", "type": 2 }] }),
    );
    assert!(h.settle());
    let after = h.hover("file:///p/main.glsl", 1, 15);
    assert!(after["contents"]["value"].as_str().unwrap().contains("New."));
}

#[test]
fn test_open_document_shadows_disk_include() {
    let mut h = Harness::new();
    h.fs.insert("/p/b.glsl", "// Tint from disk.\nfloat tint = 1.0;");
    h.open(
        "file:///p/a.glsl",
        "#include \"b.glsl\"\nvoid main() { float v = tint; }",
        1,
    );
    assert!(h.settle());
    let from_disk = h.hover("file:///p/a.glsl", 1, 25);
    assert!(
        from_disk["contents"]["value"]
            .as_str()
            .unwrap()
            .contains("Tint from disk.")
    );

    h.open(
        "file:///p/b.glsl",
        "// Tint from editor.\nfloat tint = 2.0;",
        1,
    );
    h.change(
        "file:///p/a.glsl",
        "#include \"b.glsl\"\nvoid main() { float v = tint; } ",
        2,
    );
    assert!(h.settle());
    let from_editor = h.hover("file:///p/a.glsl", 1, 25);
    let value = from_editor["contents"]["value"].as_str().unwrap();
    assert!(value.contains("Tint from editor."));
    assert!(!value.contains("Tint from disk."));
}

#[test]
fn test_rename_batches_carry_document_versions() {
    let mut h = Harness::new();
    h.open(
        "file:///p/lib.glsl",
        "float helper(float x) { return x; }",
        3,
    );
    h.open(
        "file:///p/main.glsl",
        "#include \"lib.glsl\"\nvoid main() { float y = helper(1.0); }",
        7,
    );
    assert!(h.settle());

    let resp = h.request(
        "textDocument/rename",
        json!({
            "textDocument": { "uri": "file:///p/main.glsl" },
            "position": { "line": 1, "character": 25 },
            "newName": "boost",
        }),
    );
    let changes = resp.result.unwrap()["documentChanges"]
        .as_array()
        .cloned()
        .unwrap();
    assert_eq!(changes.len(), 2);

    for change in &changes {
        let uri = change["textDocument"]["uri"].as_str().unwrap();
        let edits = change["edits"].as_array().unwrap();
        assert!(edits.iter().all(|e| e["newText"] == json!("boost")));
        match uri {
            "file:///p/lib.glsl" => {
                assert_eq!(change["textDocument"]["version"], json!(3));
                assert_eq!(edits.len(), 1);
                assert_eq!(edits[0]["range"]["start"], json!({"line": 0, "character": 6}));
            }
            "file:///p/main.glsl" => {
                assert_eq!(change["textDocument"]["version"], json!(7));
                assert_eq!(edits.len(), 1);
                assert_eq!(edits[0]["range"]["start"], json!({"line": 1, "character": 24}));
            }
            other => panic!("unexpected document {other}"),
        }
    }
}

#[test]
fn test_rename_into_disk_include_is_unversioned() {
    let mut h = Harness::new();
    h.fs.insert("/p/lib.glsl", "float helper(float x) { return x; }");
    h.open(
        "file:///p/main.glsl",
        "#include \"lib.glsl\"\nvoid main() { float y = helper(1.0); }",
        7,
    );
    assert!(h.settle());

    let resp = h.request(
        "textDocument/rename",
        json!({
            "textDocument": { "uri": "file:///p/main.glsl" },
            "position": { "line": 1, "character": 25 },
            "newName": "boost",
        }),
    );
    let changes = resp.result.unwrap()["documentChanges"]
        .as_array()
        .cloned()
        .unwrap();
    assert_eq!(changes.len(), 2);

    let lib = changes
        .iter()
        .find(|c| c["textDocument"]["uri"] == json!("file:///p/lib.glsl"))
        .expect("no batch for the include");
    assert_eq!(lib["textDocument"]["version"], Value::Null);
    assert_eq!(lib["edits"][0]["range"]["start"], json!({"line": 0, "character": 6}));

    let main = changes
        .iter()
        .find(|c| c["textDocument"]["uri"] == json!("file:///p/main.glsl"))
        .expect("no batch for the open document");
    assert_eq!(main["textDocument"]["version"], json!(7));
}

#[test]
fn test_rename_on_unopened_document_is_null() {
    let mut h = Harness::new();
    let resp = h.request(
        "textDocument/rename",
        json!({
            "textDocument": { "uri": "file:///p/nowhere.glsl" },
            "position": { "line": 0, "character": 0 },
            "newName": "x",
        }),
    );
    assert_eq!(resp.result, Some(Value::Null));
}

#[test]
fn test_formatting_clean_document_returns_no_edits() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "void main() {\n  float x = 1.0;\n}\n", 1);
    let resp = h.request(
        "textDocument/formatting",
        json!({
            "textDocument": { "uri": "file:///p/a.glsl" },
            "options": { "tabSize": 2, "insertSpaces": true },
        }),
    );
    assert_eq!(resp.result, Some(json!([])));

    let reindent = h.request(
        "textDocument/formatting",
        json!({
            "textDocument": { "uri": "file:///p/a.glsl" },
            "options": { "tabSize": 4, "insertSpaces": true },
        }),
    );
    let edits = reindent.result.unwrap();
    assert_eq!(edits.as_array().unwrap().len(), 1);
    assert_eq!(edits[0]["newText"], json!("void main() {\n    float x = 1.0;\n}\n"));
}

#[test]
fn test_handler_panic_is_isolated() {
    let mut h = Harness::new();
    h.open("file:///p/a.glsl", "void main() {}", 1);
    assert!(h.settle());
    h.drain();

    h.compiler.panic_on_format.store(true, Ordering::SeqCst);
    h.next_id += 1;
    let id = RequestId::from(h.next_id);
    h.state.handle_message(Message::Request(Request::new(
        id.clone(),
        "textDocument/formatting".to_string(),
        json!({
            "textDocument": { "uri": "file:///p/a.glsl" },
            "options": { "tabSize": 2, "insertSpaces": true },
        }),
    )));
    let messages = h.drain();
    let resp = messages
        .iter()
        .find_map(|msg| match msg {
            Message::Response(resp) if resp.id == id => Some(resp.clone()),
            _ => None,
        })
        .unwrap();
    let error = resp.error.unwrap();
    assert_eq!(error.code, lsp_server::ErrorCode::InternalError as i32);
    assert!(error.message.contains("formatter blew up"));
    assert_eq!(shown_messages(&messages).len(), 1);

    // The server keeps answering.
    let symbols = h.request(
        "textDocument/documentSymbol",
        json!({ "textDocument": { "uri": "file:///p/a.glsl" } }),
    );
    assert!(symbols.error.is_none());
}

#[test]
fn test_unknown_method_and_shutdown() {
    let mut h = Harness::new();
    let resp = h.request("textDocument/references", json!({}));
    assert_eq!(
        resp.error.unwrap().code,
        lsp_server::ErrorCode::MethodNotFound as i32
    );

    let malformed = h.request("textDocument/hover", json!({ "bogus": true }));
    assert_eq!(
        malformed.error.unwrap().code,
        lsp_server::ErrorCode::InternalError as i32
    );

    let shutdown = h.request("shutdown", Value::Null);
    assert_eq!(shutdown.result, Some(Value::Null));
    assert!(h.state.shutdown_requested());

    let late = h.request("textDocument/hover", json!({}));
    assert_eq!(
        late.error.unwrap().code,
        lsp_server::ErrorCode::InvalidRequest as i32
    );

    h.notify("exit", Value::Null);
    assert!(h.state.exit_requested());
}

#[test]
fn test_initialized_registers_watchers() {
    let mut h = Harness::new();
    h.notify("initialized", json!({}));
    let messages = h.drain();
    let registration = messages
        .iter()
        .find_map(|msg| match msg {
            Message::Request(req) if req.method == "client/registerCapability" => Some(req),
            _ => None,
        })
        .unwrap();
    let watchers = &registration.params["registrations"][0]["registerOptions"]["watchers"];
    assert_eq!(watchers.as_array().unwrap().len(), 4);
    assert_eq!(watchers[0]["globPattern"], json!("**/*.glsl"));
}
