//! One invocation against a state directory.
//!
//! Loads the settings, resolves the compound command, and dispatches it.
//! After a query, history, clipboard and parent refresh run best-effort.

use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Client;
use uuid::Uuid;

use crate::cli::args::Cli;
use crate::cli::command::{Command, interpret};
use crate::core::conversation::{self, ConversationState, SelectOutcome};
use crate::core::harvest::{append_history, clipboard_choice, copy_to_clipboard, harvest_commands};
use crate::core::http::build_client;
use crate::core::stream::read_completion;
use crate::error::{Result, UncleError};
use crate::render::Document;
use crate::storage::paths::{StatePaths, history_file};
use crate::storage::settings::{Credentials, Target};
use crate::storage::state::{FileStore, StateStore};
use crate::util::env::{should_use_color, terminal_width};
use crate::util::unix_seconds;

/// Output and post-query behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub color: bool,
    pub width: usize,
    pub clipboard: bool,
    /// Where harvested commands go; `None` disables harvesting.
    pub history_file: Option<PathBuf>,
}

impl Options {
    /// Options for a command-line run.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let history_file = if cli.no_history {
            None
        } else {
            let path = history_file();
            if path.is_none() {
                tracing::warn!("No history file found; set HISTFILE or HOME");
            }
            path
        };
        Self {
            color: should_use_color(cli.no_color),
            width: terminal_width(),
            clipboard: cli.clipboard,
            history_file,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            color: false,
            width: crate::util::env::DEFAULT_WIDTH,
            clipboard: false,
            history_file: None,
        }
    }
}

/// Loaded state plus an HTTP client bound to the credentials.
pub struct Session<S: StateStore> {
    store: S,
    target: Target,
    creds: Credentials,
    client: Client,
    options: Options,
}

impl Session<FileStore> {
    /// Open a session on a state directory.
    ///
    /// # Errors
    /// Returns error if `target.json` or `creds.json` is missing or invalid.
    pub fn open(state_dir: &Path, options: Options) -> Result<Self> {
        Self::with_store(FileStore::new(StatePaths::new(state_dir)), options)
    }
}

impl<S: StateStore> Session<S> {
    /// Open a session on any store.
    ///
    /// # Errors
    /// Returns error if the settings cannot be loaded or the client cannot be built.
    pub fn with_store(store: S, options: Options) -> Result<Self> {
        let target = store.load_target()?;
        let creds = store.load_credentials()?;
        let client = build_client(&target.user_agent, &creds.cookie_header())?;
        Ok(Self {
            store,
            target,
            creds,
            client,
            options,
        })
    }

    /// The store backing this session.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a compound command, reading presets only when one is named.
    ///
    /// # Errors
    /// As [`interpret`].
    pub fn interpret(&self, line: &str) -> Result<Command> {
        interpret(line, || self.store.load_prompts())
    }

    /// Run one command, writing user-facing output to `out`.
    ///
    /// # Errors
    /// Returns error if the command fails. Post-query steps never fail the run.
    pub async fn run<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        tracing::debug!(?command, "Dispatching");
        match command {
            Command::Create(name) => self.create(&name, out).await,
            Command::List => self.list(out).await,
            Command::Select(id) => self.select(id, out),
            Command::Query(prompt) => self.query(&prompt, out).await,
        }
    }

    async fn create<W: Write>(&mut self, name: &str, out: &mut W) -> Result<()> {
        let (uuid, name) = conversation::create(
            &self.client,
            &self.target,
            &mut self.store,
            &mut self.creds,
            name,
        )
        .await?;
        writeln!(out, "Created conversation {name} ({uuid})")?;
        Ok(())
    }

    async fn list<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let records =
            conversation::list(&self.client, &self.target, &mut self.store, &self.creds).await?;
        if records.is_empty() {
            writeln!(out, "No conversations.")?;
            return Ok(());
        }
        let active = self.creds.active_conversation();
        for record in &records {
            let marker = if active == Some(record.uuid.as_str()) { '*' } else { ' ' };
            writeln!(out, "{marker} {}  {}", record.name, record.uuid)?;
        }
        Ok(())
    }

    fn select<W: Write>(&mut self, id: Uuid, out: &mut W) -> Result<()> {
        match conversation::select(&mut self.store, &mut self.creds, id)? {
            SelectOutcome::Selected { name, parent } => {
                let thread = if parent.is_some() {
                    "continuing from its latest message"
                } else {
                    "starting a new thread"
                };
                writeln!(out, "Switched to {name} ({id}), {thread}")?;
            }
            SelectOutcome::NotFound => {
                writeln!(out, "Conversation {id} is not in the last listing; run -l first")?;
            }
        }
        Ok(())
    }

    async fn query<W: Write>(&mut self, prompt: &str, out: &mut W) -> Result<()> {
        let parent = self.store.load_parent()?;
        let state = ConversationState::from_parts(&self.creds, parent);
        let response =
            conversation::query(&self.client, &self.target, &self.creds, &state, prompt).await?;

        let answer = read_completion(response, out).await?;
        out.write_all(b"\n\n")?;
        let document = Document::parse(&answer);
        writeln!(out, "{}", document.render(self.options.color, self.options.width))?;
        out.flush()?;

        self.reconcile(&document).await;
        Ok(())
    }

    async fn reconcile(&mut self, document: &Document) {
        let commands = harvest_commands(document);

        if let Some(path) = &self.options.history_file {
            if let Err(e) = append_history(path, &commands, unix_seconds()) {
                notice("could not append to the history file", &e);
            }
        }

        if self.options.clipboard {
            match clipboard_choice(&commands) {
                Some(latest) => {
                    if let Err(e) = copy_to_clipboard(latest) {
                        notice("could not copy to the clipboard", &e);
                    }
                }
                None => tracing::debug!("No code block to copy"),
            }
        }

        if let Err(e) =
            conversation::refresh_parent(&self.client, &self.target, &mut self.store, &self.creds)
                .await
        {
            notice("could not refresh the parent message", &e);
        }
    }
}

fn notice(what: &str, error: &UncleError) {
    tracing::warn!(error = %error, "{what}");
    eprintln!("uncle: {what}: {error}");
}

/// Execute the command line.
///
/// # Errors
/// Returns error if loading state, resolving the command, or running it fails.
pub async fn execute(cli: &Cli) -> Result<()> {
    let mut session = Session::open(&cli.state_dir, Options::from_cli(cli))?;
    let command = session.interpret(&cli.command_line())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    session.run(command, &mut out).await
}
