//! Console command parser.
//!
//! Input format: `[:]command[!] [args...]`. The leading colon is optional. A trailing `!` forces
//! commands that would otherwise refuse to drop unsaved work (`open!`, `quit!`).

use artifact_core::ArtifactKind;

/// Parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Print the command summary.
    Help,
    /// Print the artifact tree.
    List,
    /// Select the artifact at `path`.
    Open {
        /// Artifact path.
        path: String,
        /// Discard pending changes without asking.
        force: bool,
    },
    /// Print the buffer.
    Show,
    /// Replace the buffer.
    Set {
        /// New content (escapes already expanded).
        text: String,
    },
    /// Append a line to the buffer.
    Append {
        /// Line to append (escapes already expanded).
        text: String,
    },
    /// Replace the buffer with a local file's content.
    Load {
        /// Local file path.
        file: String,
    },
    /// Manual save.
    Save,
    /// Return to the baseline.
    Discard,
    /// Print session status.
    Status,
    /// Load and print history.
    History,
    /// Load a history version into the buffer.
    Restore {
        /// Version number.
        version: u64,
    },
    /// Pull remote reference content into the buffer.
    Pull {
        /// Remote path; defaults to the artifact path.
        path: Option<String>,
    },
    /// Create an artifact.
    New {
        /// Artifact path.
        path: String,
        /// Explicit kind; inferred from the extension when absent.
        kind: Option<ArtifactKind>,
    },
    /// Delete the artifact at `path`.
    Remove {
        /// Artifact path.
        path: String,
    },
    /// Reload the artifact list.
    Refresh,
    /// Leave the console.
    Quit {
        /// Quit even with pending changes.
        force: bool,
    },
    /// Blank line.
    Empty,
    /// A known command with bad arguments.
    Invalid {
        /// What is wrong.
        message: String,
    },
    /// Not a command.
    Unknown {
        /// The word that was typed.
        name: String,
    },
}

/// One-line summaries printed by `help`.
pub const HELP: &[(&str, &str)] = &[
    ("ls", "list artifacts"),
    ("open[!] <path>", "edit an artifact (! discards pending changes)"),
    ("show", "print the buffer"),
    ("set <text>", "replace the buffer (\\n, \\t and \\\\ are expanded)"),
    ("append <text>", "append a line to the buffer"),
    ("load <file>", "replace the buffer with a local file"),
    ("save", "validate and save now"),
    ("discard", "drop buffer changes"),
    ("status", "show session state"),
    ("history", "list previous versions"),
    ("restore <version>", "load a previous version into the buffer"),
    ("pull [path]", "load the remote reference copy into the buffer"),
    ("new <path> [kind]", "create an artifact"),
    ("rm <path>", "delete an artifact"),
    ("refresh", "reload the artifact list"),
    ("quit[!]", "leave (! ignores pending changes)"),
];

/// Parse one input line.
pub fn parse(input: &str) -> ParsedCommand {
    let input = input.trim_end_matches(['\r', '\n']).trim_start();
    let input = input.strip_prefix(':').unwrap_or(input);
    if input.trim().is_empty() {
        return ParsedCommand::Empty;
    }

    let (word, rest) = match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (input, ""),
    };
    let (name, force) = match word.strip_suffix('!') {
        Some(name) => (name, true),
        None => (word, false),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    if force && !matches!(name, "open" | "o" | "edit" | "e" | "quit" | "q") {
        return invalid(format!("'{name}' does not take '!'"));
    }

    match name {
        "help" | "h" | "?" => no_args(&args, ParsedCommand::Help),
        "ls" | "list" => no_args(&args, ParsedCommand::List),
        "open" | "o" | "edit" | "e" => match args.as_slice() {
            [path] => ParsedCommand::Open {
                path: (*path).to_string(),
                force,
            },
            _ => invalid("usage: open[!] <path>"),
        },
        "show" | "cat" => no_args(&args, ParsedCommand::Show),
        "set" => ParsedCommand::Set {
            text: unescape(rest),
        },
        "append" | "a" => ParsedCommand::Append {
            text: unescape(rest),
        },
        "load" => match args.as_slice() {
            [file] => ParsedCommand::Load {
                file: (*file).to_string(),
            },
            _ => invalid("usage: load <file>"),
        },
        "save" | "w" => no_args(&args, ParsedCommand::Save),
        "discard" => no_args(&args, ParsedCommand::Discard),
        "status" | "st" => no_args(&args, ParsedCommand::Status),
        "history" | "hist" => no_args(&args, ParsedCommand::History),
        "restore" => match args.as_slice() {
            [version] => match version.trim_start_matches('v').parse::<u64>() {
                Ok(version) => ParsedCommand::Restore { version },
                Err(_) => invalid(format!("not a version number: '{version}'")),
            },
            _ => invalid("usage: restore <version>"),
        },
        "pull" => match args.as_slice() {
            [] => ParsedCommand::Pull { path: None },
            [path] => ParsedCommand::Pull {
                path: Some((*path).to_string()),
            },
            _ => invalid("usage: pull [path]"),
        },
        "new" | "create" => match args.as_slice() {
            [path] => ParsedCommand::New {
                path: (*path).to_string(),
                kind: None,
            },
            [path, kind] => match kind.parse::<ArtifactKind>() {
                Ok(kind) => ParsedCommand::New {
                    path: (*path).to_string(),
                    kind: Some(kind),
                },
                Err(message) => invalid(message),
            },
            _ => invalid("usage: new <path> [kind]"),
        },
        "rm" | "delete" => match args.as_slice() {
            [path] => ParsedCommand::Remove {
                path: (*path).to_string(),
            },
            _ => invalid("usage: rm <path>"),
        },
        "refresh" => no_args(&args, ParsedCommand::Refresh),
        "quit" | "q" | "exit" => no_args(&args, ParsedCommand::Quit { force }),
        _ => ParsedCommand::Unknown {
            name: name.to_string(),
        },
    }
}

fn invalid(message: impl Into<String>) -> ParsedCommand {
    ParsedCommand::Invalid {
        message: message.into(),
    }
}

fn no_args(args: &[&str], command: ParsedCommand) -> ParsedCommand {
    if args.is_empty() {
        command
    } else {
        invalid("this command takes no arguments")
    }
}

/// Expand `\n`, `\t` and `\\`. Other backslashes are kept as typed.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
