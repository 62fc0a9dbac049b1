use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use linguistikad::config::{Config, DEFAULT_LOG_FILTER};
use linguistikad::ipc;

#[derive(Parser, Debug)]
#[command(name = "linguistikad")]
#[command(about = "Language academy backend speaking line-delimited JSON on stdin/stdout")]
struct Args {
    /// Workspace directory to open at startup
    #[arg(long, env = "LINGUISTIKA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// How long SQLite waits on a locked database, in milliseconds
    #[arg(long, default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// tracing filter directives; logs go to stderr
    #[arg(long, env = "LINGUISTIKA_LOG", default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

fn main() {
    let args = Args::parse();

    let config = Config {
        workspace: args.workspace,
        busy_timeout: Duration::from_millis(args.busy_timeout_ms),
        log_filter: args.log_filter,
    };

    // stdout carries the protocol, so logs must stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "linguistikad starting");

    let mut state = ipc::AppState::new(config);
    if let Some(path) = state.config.workspace.clone() {
        if let Err(e) = ipc::open_workspace(&mut state, &path) {
            tracing::warn!(path = %path.display(), error = %e, "startup workspace not opened");
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                tracing::warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    tracing::info!("stdin closed, exiting");
}
