//! Command harvesting into shell history.
//!
//! Code blocks from an answer are appended to the shell history file as zsh
//! extended-history entries, last block first, so the most recent suggestion
//! is one keypress away.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::{Result, UncleError};
use crate::render::markdown::Document;

/// Joins continuation lines inside one history entry.
pub const CONTINUATION: &str = "\\\n";

/// Non-empty code blocks in reverse document order.
#[must_use]
pub fn harvest_commands(document: &Document) -> Vec<String> {
    let mut commands: Vec<String> = document
        .code_blocks()
        .filter(|block| !block.trim().is_empty())
        .map(str::to_string)
        .collect();
    commands.reverse();
    commands
}

/// Format one zsh extended-history entry.
#[must_use]
pub fn history_entry(command: &str, epoch: i64, index: usize) -> String {
    let body = command.trim_end_matches('\n').lines().collect::<Vec<_>>().join(CONTINUATION);
    format!(": {epoch}:{index};{body}\n")
}

/// Format all entries for one run, indices starting at 0.
#[must_use]
pub fn history_entries(commands: &[String], epoch: i64) -> String {
    commands
        .iter()
        .enumerate()
        .map(|(index, command)| history_entry(command, epoch, index))
        .collect()
}

/// Append entries to the history file, returning how many were written.
///
/// # Errors
/// Returns error if the file cannot be opened or written.
pub fn append_history(path: &Path, commands: &[String], epoch: i64) -> Result<usize> {
    if commands.is_empty() {
        return Ok(0);
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(history_entries(commands, epoch).as_bytes())?;
    tracing::info!(path = %path.display(), count = commands.len(), "Appended commands to history");
    Ok(commands.len())
}

// =============================================================================
// Clipboard
// =============================================================================

/// The command worth copying: the last non-empty block in document order.
#[must_use]
pub fn clipboard_choice(commands: &[String]) -> Option<&str> {
    commands.first().map(String::as_str)
}

/// Put text on the system clipboard.
///
/// # Errors
/// Returns error if no clipboard is reachable or it rejects the text.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().map_err(clipboard_error)?;
    clipboard.set_text(text.to_owned()).map_err(clipboard_error)?;
    tracing::debug!(chars = text.chars().count(), "Copied to clipboard");
    Ok(())
}

fn clipboard_error(err: arboard::Error) -> UncleError {
    UncleError::Other(anyhow::anyhow!("clipboard unavailable: {err}"))
}
