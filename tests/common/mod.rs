//! Shared helpers for integration tests.
//!
//! - `log_capture`: scoped tracing capture with assertions
//! - [`StateFixture`]: a state directory pointed at a mock server
//! - [`TestLogger`]: phase markers on stderr for long end-to-end tests

#![allow(dead_code)]

pub mod log_capture;

use std::time::Instant;

use assert_cmd::Command;
use uncle::test_utils::{TestDir, write_state_dir};

/// Conversation id the fixture credentials are bound to.
pub const CONVERSATION: &str = "c1";

/// Completion path for the fixture organization and conversation.
pub const COMPLETION_PATH: &str = "/organizations/o1/chat_conversations/c1/completion";

/// Listing and creation path for the fixture organization.
pub const CONVERSATIONS_PATH: &str = "/organizations/o1/chat_conversations";

/// A populated state directory plus a private history file.
pub struct StateFixture {
    pub dir: TestDir,
}

impl StateFixture {
    /// State bound to conversation `c1`, talking to `base_url`.
    pub fn bound(base_url: &str) -> Self {
        let dir = TestDir::new();
        write_state_dir(dir.path(), base_url, Some(CONVERSATION));
        Self { dir }
    }

    /// State with no active conversation.
    pub fn unbound(base_url: &str) -> Self {
        let dir = TestDir::new();
        write_state_dir(dir.path(), base_url, None);
        Self { dir }
    }

    /// The binary, aimed at this state directory, with `words` as the command.
    #[allow(deprecated)]
    pub fn command(&self, words: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("uncle").expect("uncle binary");
        cmd.env("HISTFILE", self.dir.file_path("history"))
            .env("NO_COLOR", "1")
            .env_remove("UNCLE_LOG")
            .env_remove("UNCLE_LOG_FILE")
            .env_remove("RUST_LOG")
            .arg(self.dir.path())
            .args(words);
        cmd
    }

    /// Run the binary off the async runtime so a mock server can answer.
    pub async fn run(&self, words: &[&str]) -> std::process::Output {
        let mut cmd = self.command(words);
        tokio::task::spawn_blocking(move || cmd.output().expect("run uncle"))
            .await
            .expect("join uncle run")
    }

    pub fn history(&self) -> String {
        self.dir.read_file("history").unwrap_or_default()
    }
}

/// Minimal phase logger for end-to-end tests.
pub struct TestLogger {
    name: String,
    started: Instant,
}

impl TestLogger {
    pub fn new(name: &str) -> Self {
        eprintln!("[{name}] start");
        Self {
            name: name.to_string(),
            started: Instant::now(),
        }
    }

    pub fn phase(&self, phase: &str) {
        eprintln!("[{}] phase: {phase}", self.name);
    }

    pub fn finish_ok(self) {
        eprintln!("[{}] ok in {:?}", self.name, self.started.elapsed());
    }
}
