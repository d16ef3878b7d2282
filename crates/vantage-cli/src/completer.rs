//! Line editing helpers: tab completion and masked secret entry.

use rustyline::completion::{Completer, Pair};
use rustyline::config::ColorMode;
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Context, Editor, Helper};
use std::borrow::Cow;
use vantage_core::Secret;

/// Dot-commands for completion.
const DOT_COMMANDS: &[&str] = &[
    ".register",
    ".login",
    ".logout",
    ".whoami",
    ".domain",
    ".audit",
    ".report",
    ".format",
    ".clear",
    ".help",
    ".exit",
    ".quit",
];

/// Action keywords.
const ACTIONS: &[&str] = &["analyze", "portfolio", "scan", "whois", "webscan"];

/// Arguments completed after specific commands.
fn arguments_for(command: &str) -> &'static [&'static str] {
    match command {
        ".domain" => &["financial", "security"],
        ".report" => &["financial", "security"],
        ".audit" => &["clear"],
        ".format" => &["table", "json"],
        _ => &[],
    }
}

/// REPL helper with completion support.
#[derive(Default)]
pub struct VantageHelper;

impl VantageHelper {
    pub fn new() -> Self {
        Self
    }
}

fn pairs<'a>(candidates: impl IntoIterator<Item = &'a &'a str>, prefix: &str) -> Vec<Pair> {
    let prefix = prefix.to_lowercase();
    candidates
        .into_iter()
        .filter(|c| c.starts_with(&prefix))
        .map(|c| Pair {
            display: c.to_string(),
            replacement: c.to_string(),
        })
        .collect()
}

impl Completer for VantageHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        let word_start = line_to_cursor
            .rfind(char::is_whitespace)
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line_to_cursor[word_start..];
        let leading = line_to_cursor.len() - line_to_cursor.trim_start().len();

        // First word: a command or an action
        if word_start <= leading {
            let candidates = if word.starts_with('.') { DOT_COMMANDS } else { ACTIONS };
            return Ok((word_start, pairs(candidates, word)));
        }

        // Second word: a fixed argument of the command
        let mut words = line_to_cursor.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        if words.count() <= 1 {
            return Ok((word_start, pairs(arguments_for(&command), word)));
        }

        Ok((word_start, Vec::new()))
    }
}

impl Hinter for VantageHelper {
    type Hint = String;
}

impl Highlighter for VantageHelper {}

impl Validator for VantageHelper {}

impl Helper for VantageHelper {}

/// Helper that draws every typed character as `*`.
#[derive(Default)]
pub struct MaskingHelper;

impl Completer for MaskingHelper {
    type Candidate = String;
}

impl Hinter for MaskingHelper {
    type Hint = String;
}

impl Highlighter for MaskingHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned("*".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl Validator for MaskingHelper {}

impl Helper for MaskingHelper {}

/// Read a secret with a masked, history-free editor.
pub fn read_secret(prompt: &str) -> Result<Secret, ReadlineError> {
    let config = Config::builder()
        .auto_add_history(false)
        .color_mode(ColorMode::Forced)
        .build();
    let mut editor: Editor<MaskingHelper, DefaultHistory> = Editor::with_config(config)?;
    editor.set_helper(Some(MaskingHelper));
    editor.readline(prompt).map(Secret::new)
}
