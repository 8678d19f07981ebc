//! Test utilities for uncle.
//!
//! Provides an in-memory [`StateStore`], state-directory fixtures, and
//! assertion macros for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use uncle::test_utils::*;
//!
//! let dir = TestDir::new();
//! write_state_dir(dir.path(), "https://host", Some("c1"));
//! let store = MemoryStore::new().with_parent(uuid::Uuid::new_v4());
//! ```

use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::settings::{Credentials, Prompts, Target};
use crate::storage::state::StateStore;

/// Organization id used by fixtures.
pub const TEST_ORG: &str = "o1";

// =============================================================================
// Test Data Factories
// =============================================================================

/// Credentials bound to conversation `c1` of organization `o1`.
#[must_use]
pub fn make_test_credentials() -> Credentials {
    Credentials {
        cookies: "sessionKey=sk-test; theme=dark".to_string(),
        org: TEST_ORG.to_string(),
        conversation: Some("c1".to_string()),
        conversation_name: Some("scratch".to_string()),
        ..Credentials::default()
    }
}

/// `target.json` contents pointing at `base_url`.
#[must_use]
pub fn make_test_target_json(base_url: &str) -> Value {
    json!({
        "user_agent": "uncle-test/1.0",
        "timezone": "Europe/Paris",
        "query_llm": format!("{base_url}/organizations/ORG/chat_conversations/CONV/completion"),
        "create_conversation": format!("{base_url}/organizations/ORG/chat_conversations"),
        "list_conversations": format!("{base_url}/organizations/ORG/chat_conversations"),
    })
}

/// Typed target pointing at `base_url`.
///
/// # Panics
///
/// Panics if the fixture does not deserialize.
#[must_use]
pub fn make_test_target(base_url: &str) -> Target {
    serde_json::from_value(make_test_target_json(base_url)).expect("target fixture")
}

/// `prompts.json` contents with one placeholder preset and one prefix preset.
#[must_use]
pub fn make_test_prompts_json() -> Value {
    json!({
        "prompts": {
            "sh": "Reply with a single bash command that will PROMPT",
            "tldr": "Summarise in one sentence:"
        }
    })
}

/// Server-sent completion body built from fragments.
#[must_use]
pub fn make_completion_stream(fragments: &[&str]) -> String {
    let mut body = String::from("event: completion\n");
    for fragment in fragments {
        let payload = json!({"type": "completion", "completion": fragment});
        body.push_str(&format!("data: {payload}\n\n"));
    }
    body.push_str("data: {\"type\":\"message_limit\"}\n\n");
    body
}

/// Populate a state directory with target, credentials, and prompts.
///
/// # Panics
///
/// Panics if a file cannot be written.
pub fn write_state_dir(dir: &Path, base_url: &str, conversation: Option<&str>) {
    let mut creds = json!({
        "cookies": "sessionKey=sk-test; theme=dark",
        "org": TEST_ORG,
        "editor": "vim",
    });
    if let Some(conversation) = conversation {
        creds["conversation"] = json!(conversation);
        creds["conversation_name"] = json!("scratch");
    }
    let files = [
        ("target.json", make_test_target_json(base_url)),
        ("creds.json", creds),
        ("prompts.json", make_test_prompts_json()),
    ];
    for (name, value) in files {
        fs::write(dir.join(name), value.to_string()).expect("write state fixture");
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// [`StateStore`] that keeps everything in memory.
///
/// `credentials` is `None` until something saves credentials, which lets tests
/// assert that a failed operation never wrote them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub target: Option<Target>,
    pub initial_credentials: Credentials,
    pub credentials: Option<Credentials>,
    pub prompts: Prompts,
    pub parent: Option<Uuid>,
    pub listing: Option<Vec<Value>>,
    pub fail_parent_writes: bool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initial_credentials: make_test_credentials(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: Uuid) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_listing(mut self, listing: Vec<Value>) -> Self {
        self.listing = Some(listing);
        self
    }

    /// Make every parent pointer write fail.
    #[must_use]
    pub fn with_failing_parent_writes(mut self) -> Self {
        self.fail_parent_writes = true;
        self
    }

    fn parent_write(&self) -> Result<()> {
        if self.fail_parent_writes {
            return Err(io::Error::other("parent_uuid is read-only").into());
        }
        Ok(())
    }
}

impl StateStore for MemoryStore {
    fn load_target(&self) -> Result<Target> {
        Ok(self
            .target
            .clone()
            .unwrap_or_else(|| make_test_target("http://127.0.0.1:9")))
    }

    fn load_credentials(&self) -> Result<Credentials> {
        Ok(self
            .credentials
            .clone()
            .unwrap_or_else(|| self.initial_credentials.clone()))
    }

    fn save_credentials(&mut self, creds: &Credentials) -> Result<()> {
        self.credentials = Some(creds.clone());
        Ok(())
    }

    fn load_prompts(&self) -> Result<Prompts> {
        Ok(self.prompts.clone())
    }

    fn load_parent(&self) -> Result<Option<Uuid>> {
        Ok(self.parent)
    }

    fn save_parent(&mut self, parent: Uuid) -> Result<()> {
        self.parent_write()?;
        self.parent = Some(parent);
        Ok(())
    }

    fn clear_parent(&mut self) -> Result<()> {
        self.parent_write()?;
        self.parent = None;
        Ok(())
    }

    fn load_listing(&self) -> Result<Option<Vec<Value>>> {
        Ok(self.listing.clone())
    }

    fn save_listing(&mut self, listing: &[Value]) -> Result<()> {
        self.listing = Some(listing.to_vec());
        Ok(())
    }
}

// =============================================================================
// Temp Directory Utilities
// =============================================================================

/// A temporary directory for tests with automatic cleanup.
///
/// # Examples
///
/// ```rust,ignore
/// use uncle::test_utils::TestDir;
///
/// let dir = TestDir::new();
/// dir.create_file("parent_uuid", "0f8fad5b-d9cb-469f-a165-70867728950e");
/// assert!(dir.file_exists("parent_uuid"));
/// ```
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// Create a new isolated temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Create a file in the temporary directory with the given content.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be created or written.
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        let mut file = fs::File::create(&path).expect("Failed to create test file");
        file.write_all(content.as_bytes())
            .expect("Failed to write test file");
    }

    /// Read a file from the temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn read_file(&self, name: &str) -> io::Result<String> {
        fs::read_to_string(self.inner.path().join(name))
    }

    /// Read and parse a JSON file from the temporary directory.
    ///
    /// # Panics
    ///
    /// Panics if the file is missing or not JSON.
    #[must_use]
    pub fn read_json(&self, name: &str) -> Value {
        let content = self.read_file(name).expect("read test file");
        serde_json::from_str(&content).expect("test file is JSON")
    }

    /// Check if a file exists in the temporary directory.
    #[must_use]
    pub fn file_exists(&self, name: &str) -> bool {
        self.inner.path().join(name).exists()
    }

    /// Get the full path to a file in the temporary directory.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

// =============================================================================
// Test Helpers
// =============================================================================

/// Check if a string contains ANSI escape sequences.
#[must_use]
pub fn has_ansi_codes(text: &str) -> bool {
    text.contains('\x1b')
}

/// Strip ANSI escape codes from a string.
#[must_use]
pub fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if chars.peek() == Some(&'[') {
                chars.next();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}
