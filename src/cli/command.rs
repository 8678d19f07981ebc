//! The compound command grammar.
//!
//! A command is a run of leading flag tokens followed by free text:
//!
//! - `-p<name>`: expand preset `<name>` around the prompt
//! - `-n`: create a conversation named by the text
//! - `-l`: list conversations, or select when the text is a conversation id
//! - `-s`: select the conversation whose id is the text
//!
//! Scanning stops at the first token that is not a flag. Only the first mode
//! flag counts.

use uuid::Uuid;

use crate::core::conversation::parse_conversation_id;
use crate::error::{Result, UncleError};
use crate::storage::settings::Prompts;

/// What one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a conversation with this display name.
    Create(String),
    /// List conversations.
    List,
    /// Switch to a conversation from the cached listing.
    Select(Uuid),
    /// Send a prompt.
    Query(String),
}

/// Mode-selecting flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlag {
    Create,
    List,
    Select,
}

/// One recognised leading token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    Preset(String),
    Mode(ModeFlag),
}

impl Flag {
    /// Recognise a flag token.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "-n" => Some(Self::Mode(ModeFlag::Create)),
            "-l" => Some(Self::Mode(ModeFlag::List)),
            "-s" => Some(Self::Mode(ModeFlag::Select)),
            _ => token
                .strip_prefix("-p")
                .filter(|name| !name.is_empty())
                .map(|name| Self::Preset(name.to_string())),
        }
    }
}

/// Result of scanning the leading flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scan {
    /// First mode flag seen.
    pub mode: Option<ModeFlag>,
    /// Last preset named.
    pub preset: Option<String>,
    /// Remaining words joined by single spaces.
    pub rest: String,
}

impl Scan {
    /// Scan a compound command string.
    #[must_use]
    pub fn new(input: &str) -> Self {
        let mut scan = Self::default();
        let mut tokens = input.split_whitespace().peekable();

        while let Some(flag) = tokens.peek().and_then(|t| Flag::parse(t)) {
            tokens.next();
            match flag {
                Flag::Preset(name) => {
                    if let Some(previous) = scan.preset.replace(name) {
                        tracing::warn!(%previous, "Preset overridden by a later -p flag");
                    }
                }
                Flag::Mode(mode) => match scan.mode {
                    None => scan.mode = Some(mode),
                    Some(first) => {
                        tracing::warn!(?first, ignored = ?mode, "Only the first mode flag applies");
                    }
                },
            }
        }

        scan.rest = tokens.collect::<Vec<_>>().join(" ");
        scan
    }

    /// Whether resolving needs the preset file.
    #[must_use]
    pub const fn needs_prompts(&self) -> bool {
        self.mode.is_none() && self.preset.is_some()
    }

    /// Resolve the scan into a command.
    ///
    /// `prompts` is only consulted when [`Self::needs_prompts`] is true.
    ///
    /// # Errors
    /// `PresetNotFound`, `InvalidConversationId`, or `EmptyPrompt`.
    pub fn resolve(self, prompts: Option<&Prompts>) -> Result<Command> {
        match self.mode {
            Some(mode) => {
                if let Some(preset) = &self.preset {
                    tracing::warn!(%preset, "Presets only apply to prompts; ignoring");
                }
                Ok(match mode {
                    ModeFlag::Create => Command::Create(self.rest),
                    ModeFlag::List => {
                        parse_conversation_id(&self.rest).map_or(Command::List, Command::Select)
                    }
                    ModeFlag::Select => Command::Select(
                        parse_conversation_id(&self.rest)
                            .ok_or(UncleError::InvalidConversationId(self.rest))?,
                    ),
                })
            }
            None => {
                let prompt = match &self.preset {
                    Some(name) => prompts
                        .ok_or_else(|| UncleError::PresetNotFound(name.clone()))?
                        .expand(name, &self.rest)?,
                    None => self.rest,
                };
                if prompt.trim().is_empty() {
                    return Err(UncleError::EmptyPrompt);
                }
                Ok(Command::Query(prompt))
            }
        }
    }
}

/// Scan and resolve in one step, loading presets only when needed.
///
/// # Errors
/// As [`Scan::resolve`], plus whatever `load_prompts` returns.
pub fn interpret<F>(input: &str, load_prompts: F) -> Result<Command>
where
    F: FnOnce() -> Result<Prompts>,
{
    let scan = Scan::new(input);
    if scan.needs_prompts() {
        let prompts = load_prompts()?;
        scan.resolve(Some(&prompts))
    } else {
        scan.resolve(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    fn prompts() -> Prompts {
        Prompts {
            prompts: BTreeMap::from([
                ("sh".to_string(), "Give a bash command to PROMPT".to_string()),
                ("fr".to_string(), "Translate to French:".to_string()),
            ]),
            ..Prompts::default()
        }
    }

    fn run(input: &str) -> Result<Command> {
        interpret(input, || Ok(prompts()))
    }

    #[test]
    fn plain_text_is_a_query() {
        assert_eq!(run("what   is rust").unwrap(), Command::Query("what is rust".to_string()));
    }

    #[test]
    fn preset_with_placeholder() {
        assert_eq!(
            run("-psh list open ports").unwrap(),
            Command::Query("Give a bash command to list open ports".to_string())
        );
    }

    #[test]
    fn preset_without_placeholder_appends() {
        assert_eq!(
            run("-pfr good morning").unwrap(),
            Command::Query("Translate to French: good morning".to_string())
        );
    }

    #[test]
    fn unknown_preset_fails() {
        assert!(matches!(run("-pnope hi"), Err(UncleError::PresetNotFound(ref n)) if n == "nope"));
    }

    #[test]
    fn bare_dash_p_is_prompt_text() {
        assert_eq!(run("-p hi").unwrap(), Command::Query("-p hi".to_string()));
    }

    #[test]
    fn create_takes_remaining_words_as_name() {
        assert_eq!(run("-n release notes").unwrap(), Command::Create("release notes".to_string()));
    }

    #[test]
    fn list_without_id() {
        assert_eq!(run("-l").unwrap(), Command::List);
        assert_eq!(run("-l recent ones").unwrap(), Command::List);
    }

    #[test]
    fn list_with_id_selects() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(run(&format!("-l {ID}")).unwrap(), Command::Select(id));
    }

    #[test]
    fn select_requires_uuid() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(run(&format!("-s {ID}")).unwrap(), Command::Select(id));
        assert!(matches!(
            run("-s abc"),
            Err(UncleError::InvalidConversationId(ref s)) if s == "abc"
        ));
        assert!(matches!(run("-s"), Err(UncleError::InvalidConversationId(_))));
    }

    #[test]
    fn first_mode_flag_wins() {
        assert_eq!(run("-l -n name").unwrap(), Command::List);
        assert_eq!(run("-n -l name").unwrap(), Command::Create("name".to_string()));
    }

    #[test]
    #[tracing_test::traced_test]
    fn ignored_mode_flag_is_logged() {
        assert_eq!(run("-l -n x").unwrap(), Command::List);
        assert!(logs_contain("Only the first mode flag applies"));
    }

    #[test]
    fn scanning_stops_at_first_plain_word() {
        assert_eq!(run("explain -n flag").unwrap(), Command::Query("explain -n flag".to_string()));
    }

    #[test]
    fn preset_ignored_outside_query_mode() {
        let mut loaded = false;
        let command = interpret("-psh -n notes", || {
            loaded = true;
            Ok(prompts())
        })
        .unwrap();
        assert_eq!(command, Command::Create("notes".to_string()));
        assert!(!loaded);
    }

    #[test]
    fn empty_prompt_is_rejected() {
        assert!(matches!(run(""), Err(UncleError::EmptyPrompt)));
        assert!(matches!(run("   "), Err(UncleError::EmptyPrompt)));
    }

    #[test]
    fn prompts_not_loaded_without_preset() {
        let command = interpret("hello", || panic!("prompts should not be loaded")).unwrap();
        assert_eq!(command, Command::Query("hello".to_string()));
    }
}
