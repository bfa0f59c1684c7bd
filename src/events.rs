//! Append-only session log.
//!
//! One compact JSON object per line in the session directory's
//! `events.jsonl`: stage transitions, per-step outcomes, failures. The
//! log is for post-hoc inspection; nothing in the app reads it back.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct SessionLog {
    inner: Arc<SessionLogInner>,
}

#[derive(Debug)]
struct SessionLogInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SessionLogInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Append one event line. `type`, `session`, and `ts` are filled in
    /// first; `payload` (a JSON object) is merged over them.
    pub fn emit(&self, event_type: &str, payload: Value) -> anyhow::Result<()> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "session".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert(
            "ts".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Value::Object(fields) = payload {
            for (key, value) in fields {
                event.insert(key, value);
            }
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&Value::Object(event))?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_emit_writes_one_line_per_event() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let log = SessionLog::new(&path, "sess-42");

        log.emit("plan_ready", json!({"steps": 7})).unwrap();
        log.emit("step_image", json!({"step": 1, "source": "studio"}))
            .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["type"], "plan_ready");
        assert_eq!(first["session"], "sess-42");
        assert_eq!(first["steps"], 7);
        assert!(chrono::DateTime::parse_from_rfc3339(first["ts"].as_str().unwrap()).is_ok());

        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["step"], 1);
        assert_eq!(second["source"], "studio");
    }

    #[test]
    fn test_payload_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let log = SessionLog::new(&path, "sess-42");

        log.emit("anything", json!({"type": "override"})).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["type"], "override");
    }

    #[test]
    fn test_non_object_payload_is_ignored() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let log = SessionLog::new(&path, "sess-42");

        log.emit("bare", json!("just a string")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["type"], "bare");
        assert_eq!(parsed["session"], "sess-42");
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("deep").join("nested").join("events.jsonl");
        let log = SessionLog::new(&path, "sess-42");

        log.emit("first", json!({})).unwrap();
        assert!(path.exists());
    }
}
