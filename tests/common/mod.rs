#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Variables that would leak the developer's own setup into a test run.
const ISOLATED_ENV: [&str; 8] = [
    "GEMINI_API_KEY",
    "GEMINI_API_BASE",
    "USE_MODEL",
    "GENERATIVE_MODEL",
    "COMMIT_STYLE",
    "ENABLE_COMMIT_ASSISTANT",
    "COMMIT_ASSISTANT_RELEASES_URL",
    "RUST_LOG",
];

/// A temporary git repository plus an isolated user data directory.
pub struct TestProject {
    pub dir: TempDir,
    pub home: TempDir,
}

impl TestProject {
    /// Create a new temp directory with a git repo initialized.
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            home: TempDir::new().expect("failed to create home dir"),
        };
        project.git(&["init", "--initial-branch=main"]);
        project.git(&["config", "user.email", "test@commit-assistant.dev"]);
        project.git(&["config", "user.name", "Commit Assistant Test"]);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    /// Run git in the project and return stdout.
    pub fn git(&self, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("failed to run git");
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Write a file relative to the project root, creating parent dirs as needed.
    pub fn write_file(&self, relative_path: &str, content: &str) {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write file");
    }

    pub fn read_file(&self, relative_path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(relative_path)).expect("failed to read file")
    }

    /// Stage a file so `commit` has something to describe.
    pub fn stage_file(&self, relative_path: &str, content: &str) {
        self.write_file(relative_path, content);
        self.git(&["add", relative_path]);
    }

    /// Add all files and make a commit so git history exists.
    pub fn git_commit(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-m", message, "--allow-empty", "--no-verify"]);
    }

    pub fn git_hook_path(&self) -> PathBuf {
        self.path().join(".git/hooks/prepare-commit-msg")
    }

    pub fn husky_hook_path(&self) -> PathBuf {
        self.path().join(".husky/prepare-commit-msg")
    }

    /// Backup files created next to `hook`.
    pub fn backups_of(hook: &Path) -> Vec<PathBuf> {
        let Some(dir) = hook.parent() else {
            return Vec::new();
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.to_string_lossy().contains(".backup_"))
            .collect()
    }

    /// The binary, run inside the project with an isolated environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(Self::bin());
        cmd.current_dir(self.path())
            .env("COMMIT_ASSISTANT_HOME", self.home())
            .env("NO_COLOR", "1");
        for key in ISOLATED_ENV {
            cmd.env_remove(key);
        }
        cmd
    }

    /// Return the path to the binary (built via cargo).
    pub fn bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_commit-assistant"))
    }
}

/// A project with the hook and config installed.
pub fn installed_project() -> TestProject {
    let project = TestProject::new();
    project.cmd().arg("install").assert().success();
    project
}

/// Local stand-in for the generative API. Every request is answered with a
/// single candidate carrying `text`; raw requests are kept for assertions.
pub struct StubApi {
    _runtime: tokio::runtime::Runtime,
    base: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubApi {
    pub fn answering(text: &str) -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("failed to build runtime");
        let listener = runtime
            .block_on(TcpListener::bind("127.0.0.1:0"))
            .expect("failed to bind stub api");
        let addr = listener.local_addr().expect("stub api has no address");

        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
        .to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        runtime.spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let body = body.clone();
                let seen = Arc::clone(&seen);
                tokio::spawn(async move {
                    let _ = answer(stream, &body, &seen).await;
                });
            }
        });

        Self {
            _runtime: runtime,
            base: format!("http://{addr}/v1beta"),
            requests,
        }
    }

    /// Value for `GEMINI_API_BASE`.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Raw requests received so far, headers and body.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

async fn answer(mut stream: TcpStream, body: &str, seen: &Mutex<Vec<String>>) -> std::io::Result<()> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);
        if let Some(head_end) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&raw[..head_end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= head_end + 4 + length {
                break;
            }
        }
    }
    seen.lock()
        .expect("request log poisoned")
        .push(String::from_utf8_lossy(&raw).into_owned());

    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
