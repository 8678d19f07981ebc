//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::Parser;

/// Talk to a hosted chat assistant from the shell, one prompt per call.
#[derive(Parser, Debug)]
#[command(name = "uncle")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "COMMAND forms:\n  \
    [-p<preset>] <prompt...>   send a prompt (optionally through a preset)\n  \
    -n <name...>               create a conversation and switch to it\n  \
    -l [<id>]                  list conversations (or select <id>)\n  \
    -s <id>                    select a conversation from the last listing")]
pub struct Cli {
    /// Directory holding target.json, creds.json, prompts.json and state
    #[arg(value_name = "STATE_DIR")]
    pub state_dir: PathBuf,

    /// Compound command; words are joined with single spaces
    #[arg(value_name = "COMMAND", trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Copy the last code block of the answer to the clipboard
    #[arg(long)]
    pub clipboard: bool,

    /// Do not append code blocks to the shell history file
    #[arg(long)]
    pub no_history: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// The compound command string.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_after_state_dir_belong_to_the_command() {
        let cli = Cli::try_parse_from(["uncle", "/tmp/s", "-psh", "list", "files"]).unwrap();
        assert_eq!(cli.state_dir, PathBuf::from("/tmp/s"));
        assert_eq!(cli.command_line(), "-psh list files");
    }

    #[test]
    fn quoted_command_is_kept_whole() {
        let cli = Cli::try_parse_from(["uncle", "--no-color", "/tmp/s", "-n my chat"]).unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.command_line(), "-n my chat");
    }

    #[test]
    fn state_dir_is_required() {
        assert!(Cli::try_parse_from(["uncle"]).is_err());
    }
}
