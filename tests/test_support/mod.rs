#![allow(dead_code)]

use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
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

pub struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    pub fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_linguistikad");
        let mut child = Command::new(exe)
            .env_remove("LINGUISTIKA_WORKSPACE")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn linguistikad");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        }
    }

    /// Spawn and select a fresh workspace directory.
    pub fn with_workspace(prefix: &str) -> (Self, PathBuf) {
        let workspace = temp_dir(prefix);
        let mut sidecar = Self::spawn();
        sidecar.ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        (sidecar, workspace)
    }

    pub fn write_line(&mut self, line: &str) -> serde_json::Value {
        writeln!(self.stdin, "{}", line).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut resp = String::new();
        self.reader.read_line(&mut resp).expect("read response line");
        assert!(!resp.trim().is_empty(), "empty response for {}", line);
        serde_json::from_str(resp.trim()).expect("parse response json")
    }

    pub fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({
            "id": id,
            "method": method,
            "params": params,
        });
        let value = self.write_line(&payload.to_string());
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    /// Request that must succeed; returns `result`.
    pub fn ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or(serde_json::Value::Null)
    }

    /// Request that must fail; returns `error`.
    pub fn fail(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(false),
            "{} unexpectedly succeeded: {}",
            method,
            value
        );
        value.get("error").cloned().unwrap_or(serde_json::Value::Null)
    }
}

impl Drop for Sidecar {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn id_of(result: &serde_json::Value, key: &str) -> i64 {
    result
        .get(key)
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_i64())
        .unwrap_or_else(|| panic!("{}.id missing in {}", key, result))
}

pub fn code_of(error: &serde_json::Value) -> &str {
    error.get("code").and_then(|v| v.as_str()).unwrap_or("")
}

/// Tutor, course and student plus an enrollment tying them together.
pub struct Seed {
    pub tutor_id: i64,
    pub curso_id: i64,
    pub estudiante_id: i64,
    pub matricula_id: i64,
}

pub fn seed_enrollment(s: &mut Sidecar, tutor: &str, curso: &str, estudiante: &str) -> Seed {
    let tutor_id = id_of(
        &s.ok(
            "tutores.create",
            json!({ "input": { "nombre": tutor, "tarifa_por_hora": 20.0 } }),
        ),
        "tutor",
    );
    let curso_id = id_of(
        &s.ok(
            "cursos.create",
            json!({ "input": { "nombre": curso, "nivel": "B1" } }),
        ),
        "curso",
    );
    let estudiante_id = id_of(
        &s.ok(
            "estudiantes.create",
            json!({ "input": { "nombre": estudiante } }),
        ),
        "estudiante",
    );
    let matricula_id = id_of(
        &s.ok(
            "matriculas.create",
            json!({ "input": {
                "estudiante_id": estudiante_id,
                "curso_id": curso_id,
                "tutor_id": tutor_id,
            } }),
        ),
        "matricula",
    );
    Seed {
        tutor_id,
        curso_id,
        estudiante_id,
        matricula_id,
    }
}
