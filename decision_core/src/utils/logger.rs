// decision_core/src/utils/logger.rs

use log::{Log, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::{json, Value};
use std::cell::RefCell;

// Request id correlating every line one analysis emits.
thread_local! {
    static CURRENT_REQUEST_ID: RefCell<Option<String>> = RefCell::new(None);
}

pub fn set_current_request_id(request_id: String) {
    CURRENT_REQUEST_ID.with(|id_cell| {
        *id_cell.borrow_mut() = Some(request_id);
    });
}

pub fn clear_current_request_id() {
    CURRENT_REQUEST_ID.with(|id_cell| {
        *id_cell.borrow_mut() = None;
    });
}

pub fn current_request_id() -> Option<String> {
    CURRENT_REQUEST_ID.with(|id_cell| id_cell.borrow().clone())
}

/// # NDOC
/// component: `utils::logger`
/// purpose: The three events this pipeline emits, typed so every call site
///          logs the same shape every time.
/// invariants:
///   - `event` tags are stable; log consumers key on them.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum PipelineEvent<'a> {
    Stage {
        stage: &'a str,
        status: &'a str,
        details: &'a Value,
    },
    Capture {
        url: &'a str,
        viewport: &'a str,
        outcome: &'a str,
    },
    LlmCall {
        purpose: &'a str,
        model: &'a str,
        outcome: &'a str,
    },
}

impl PipelineEvent<'_> {
    fn emit(&self, component: &str) {
        match serde_json::to_string(self) {
            Ok(payload) => log::info!(target: component, "{}", payload),
            Err(e) => log::warn!(target: component, "unserializable pipeline event: {}", e),
        }
    }
}

/// Logs one pipeline stage transition.
pub fn log_stage_event(stage: &str, status: &str, details: &Value) {
    PipelineEvent::Stage {
        stage,
        status,
        details,
    }
    .emit("orchestrator");
}

/// Logs a capture attempt for one viewport.
pub fn log_capture_event(url: &str, viewport: &str, outcome: &str) {
    PipelineEvent::Capture {
        url,
        viewport,
        outcome,
    }
    .emit("capture");
}

/// Logs an LLM call.
pub fn log_llm_call(purpose: &str, model: &str, outcome: &str) {
    PipelineEvent::LlmCall {
        purpose,
        model,
        outcome,
    }
    .emit("llm_client");
}

// One JSON line per record: timestamp, level, component, request id, payload.
// Pipeline events arrive with their fields already serialized in the payload;
// plain log macro calls elsewhere in the crate pass through as-is.
struct JsonLineLogger;

impl Log for JsonLineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": record.level().to_string(),
            "component": record.target(),
            "request_id": current_request_id(),
            "payload": format!("{}", record.args()),
        });
        println!("{}", line);
    }

    fn flush(&self) {}
}

static LOGGER: JsonLineLogger = JsonLineLogger;
static INIT_LOGGER_ONCE: OnceCell<()> = OnceCell::new();

/// Installs the JSON line logger. Call once at process start; repeat calls
/// are no-ops.
pub fn init_logger() -> Result<(), SetLoggerError> {
    INIT_LOGGER_ONCE
        .get_or_try_init(|| {
            log::set_logger(&LOGGER)?;
            log::set_max_level(log::LevelFilter::Info);
            Ok(())
        })
        .map(|_| ())
}
