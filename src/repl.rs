// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL (Read-Eval-Print Loop) for Chimp.
//!
//! Every entry is compiled as a new unit against one persistent
//! [`Engine`], so globals defined on earlier lines stay visible.

use chimp_core::builtins::{self, BUILTINS};
use chimp_core::lexer::TokenKind;
use chimp_core::{Engine, Value};
use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

use crate::config::Config;

const HISTORY_FILE: &str = ".chimp_history";

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Bytecode,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|arg| !arg.is_empty());

        let cmd = match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "bytecode" | "b" => ReplCommand::Bytecode,
            _ => return None,
        };
        Some((cmd, arg))
    }

    /// Get all available commands for help/completion
    pub fn all_commands() -> &'static [(&'static str, &'static str)] {
        &[
            (".help", "Show this help message"),
            (".exit", "Exit the REPL"),
            (".clear", "Clear the screen"),
            (".version", "Show version information"),
            (".load <file>", "Load and execute a Chimp file"),
            (".bytecode", "Toggle printing the disassembly of each entry"),
        ]
    }
}

/// Completion, hints, highlighting and validation for rustyline.
#[derive(Default)]
struct ChimpHelper {
    /// Keywords, builtins, REPL commands and known globals
    words: Vec<String>,
}

impl ChimpHelper {
    fn new() -> Self {
        let mut helper = Self::default();
        helper.set_globals(Vec::new());
        helper
    }

    /// Rebuilds the completion list with the session's global names.
    fn set_globals(&mut self, globals: Vec<String>) {
        let mut words: Vec<String> = TokenKind::KEYWORDS
            .iter()
            .copied()
            .chain(BUILTINS.iter().map(|builtin| builtin.name))
            .chain(
                ReplCommand::all_commands()
                    .iter()
                    .map(|&(cmd, _)| cmd.split(' ').next().unwrap_or(cmd)),
            )
            .map(String::from)
            .chain(globals)
            .collect();
        words.sort();
        words.dedup();
        self.words = words;
    }
}

/// Start of the word ending at `pos`.
fn word_start(line: &str, pos: usize) -> usize {
    line[..pos]
        .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '.')
        .map(|i| i + 1)
        .unwrap_or(0)
}

impl Completer for ChimpHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let word = &line[word_start(line, pos)..pos];
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches: Vec<Pair> = self
            .words
            .iter()
            .filter(|candidate| candidate.starts_with(word))
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for ChimpHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let word = &line[word_start(line, pos)..];
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|candidate| candidate.starts_with(word) && candidate.len() > word.len())
            .map(|candidate| (&candidate[word.len()..]).dimmed().to_string())
    }
}

impl Highlighter for ChimpHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.trim_start().starts_with('.') {
            return Cow::Owned(line.magenta().to_string());
        }

        let mut result = String::with_capacity(line.len() * 2);
        let mut chars = line.chars();
        let mut current_word = String::new();

        while let Some(c) = chars.next() {
            if c.is_alphanumeric() || c == '_' {
                current_word.push(c);
                continue;
            }
            if !current_word.is_empty() {
                result.push_str(&highlight_word(&current_word));
                current_word.clear();
            }

            if c == '"' {
                let mut literal = String::from('"');
                let mut escaped = false;
                for next in chars.by_ref() {
                    literal.push(next);
                    match next {
                        '\\' if !escaped => escaped = true,
                        '"' if !escaped => break,
                        _ => escaped = false,
                    }
                }
                result.push_str(&literal.green().to_string());
                continue;
            }

            let colored = match c {
                '(' | ')' | '[' | ']' | '{' | '}' => c.yellow().to_string(),
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' => {
                    c.cyan().to_string()
                }
                _ => c.to_string(),
            };
            result.push_str(&colored);
        }

        if !current_word.is_empty() {
            result.push_str(&highlight_word(&current_word));
        }

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    match word {
        "true" | "false" | "null" => word.blue().to_string(),
        _ if TokenKind::keyword(word).is_some() => word.magenta().bold().to_string(),
        _ if builtins::lookup(word).is_some() => word.cyan().to_string(),
        _ if word.chars().all(|c| c.is_ascii_digit()) => word.yellow().to_string(),
        _ => word.to_string(),
    }
}

impl Validator for ChimpHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        // A trailing operator expects more input.
        let trimmed = input.trim_end();
        if trimmed.ends_with(['\\', '+', '-', '*', '/', '%', '=', ',', '&', '|']) {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            match c {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.pop() != Some(c) {
                    // Let the parser report the mismatch.
                    return true;
                }
            }
            _ => {}
        }
    }

    stack.is_empty() && !in_string
}

impl Helper for ChimpHelper {}

/// The interactive Chimp REPL
pub struct Repl {
    engine: Engine,
    editor: Editor<ChimpHelper, DefaultHistory>,
    history_path: PathBuf,
    show_bytecode: bool,
}

impl Repl {
    /// Create a new REPL instance
    pub fn new(config: &Config) -> rustyline::Result<Self> {
        let editor_config = rustyline::Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(config.history_size)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(editor_config)?;
        editor.set_helper(Some(ChimpHelper::new()));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chimp")
            .join(HISTORY_FILE);

        if let Some(parent) = history_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!(%err, "cannot create history directory");
            }
        }

        // No history file yet on first start.
        if let Err(err) = editor.load_history(&history_path) {
            tracing::debug!(%err, "no history loaded");
        }

        Ok(Self {
            engine: Engine::with_limits(config.limits()),
            editor,
            history_path,
            show_bytecode: config.show_bytecode,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        self.print_banner();

        loop {
            let prompt = format!("{} ", "chimp>".bright_green().bold());

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some((cmd, arg)) = ReplCommand::parse(trimmed) {
                        match self.execute_command(cmd, arg) {
                            CommandResult::Continue => continue,
                            CommandResult::Exit => break,
                        }
                    }

                    self.eval_and_print(trimmed);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "^D".dimmed());
                    break;
                }
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        if let Err(err) = self.editor.save_history(&self.history_path) {
            tracing::warn!(%err, path = %self.history_path.display(), "cannot save history");
        }

        println!();
        Ok(())
    }

    fn print_banner(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let logo = [
            r#"       _     _                 "#,
            r#"   ___| |__ (_)_ __ ___  _ __  "#,
            r#"  / __| '_ \| | '_ ` _ \| '_ \ "#,
            r#" | (__| | | | | | | | | | |_) |"#,
            r#"  \___|_| |_|_|_| |_| |_| .__/ "#,
            r#"                        |_|    "#,
        ];

        println!();
        for line in logo {
            println!("{}", line.bright_cyan().bold());
        }
        println!();
        println!(
            "  {} {} {}",
            "Chimp".white().bold(),
            "v".dimmed(),
            version.bright_yellow()
        );
        println!(
            "  {} {} {}",
            "Type".dimmed(),
            ".help".cyan(),
            "for available commands".dimmed()
        );
        println!();
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => self.print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!(
                    "{}: {}",
                    "Chimp".bright_cyan().bold(),
                    env!("CARGO_PKG_VERSION").yellow()
                );
            }
            ReplCommand::Load => match arg {
                Some(path) => self.load_file(path),
                None => eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    ".load".cyan(),
                    "requires a file path".dimmed()
                ),
            },
            ReplCommand::Bytecode => {
                self.show_bytecode = !self.show_bytecode;
                let state = if self.show_bytecode { "on" } else { "off" };
                println!("{} {}", "bytecode display".dimmed(), state.cyan());
            }
        }
        CommandResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "REPL Commands:".white().bold());
        println!();

        for (cmd, desc) in ReplCommand::all_commands() {
            println!("  {:16} {}", cmd.cyan(), desc.dimmed());
        }

        println!();
        println!("{}", "Keyboard Shortcuts:".white().bold());
        println!();
        println!("  {:16} {}", "Ctrl+C".yellow(), "Cancel current input".dimmed());
        println!("  {:16} {}", "Ctrl+D".yellow(), "Exit REPL".dimmed());
        println!("  {:16} {}", "Tab".yellow(), "Autocomplete".dimmed());
        println!();
    }

    fn load_file(&mut self, path: &str) {
        match std::fs::read_to_string(path) {
            Ok(source) => self.eval_and_print(&source),
            Err(err) => print_error(&chimp_core::Error::from(err)),
        }
    }

    fn eval_and_print(&mut self, input: &str) {
        let result = self.engine.compile(input).and_then(|bytecode| {
            if self.show_bytecode {
                print!("{}", bytecode.disassemble().dimmed());
            }
            self.engine.run(&bytecode)
        });

        match result {
            Ok(value) => println!("{}", format_value(&value)),
            Err(err) => print_error(&err),
        }

        let globals = self.engine.global_names();
        if let Some(helper) = self.editor.helper_mut() {
            helper.set_globals(globals);
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

/// Format a value for display with syntax coloring
fn format_value(value: &Value) -> String {
    let text = value.inspect();
    match value {
        Value::Null => text.blue().dimmed().to_string(),
        Value::Integer(_) | Value::Boolean(_) => text.yellow().to_string(),
        Value::String(_) => format!("\"{text}\"").green().to_string(),
        Value::Array(_) | Value::Hash(_) => text,
        Value::Function(_) | Value::Closure(_) | Value::Builtin(_) => text.magenta().to_string(),
    }
}

/// Print an error with its kind highlighted.
pub fn print_error(error: &chimp_core::Error) {
    eprintln!("{}", format_error(error));
}

/// Renders an error with its kind highlighted. Fatal VM conditions point
/// at the engine rather than the script.
fn format_error(error: &chimp_core::Error) -> String {
    let error_str = error.to_string();

    let mut formatted = match error_str.find(':') {
        Some(colon_pos) => {
            let (error_type, message) = error_str.split_at(colon_pos);
            format!("{}{}", error_type.red().bold(), message)
        }
        None => error_str.red().to_string(),
    };

    if let chimp_core::Error::Runtime(err) = error {
        if err.is_fatal() {
            formatted.push_str(&format!(
                "\n{}",
                "internal error: the VM hit a resource limit or corrupt bytecode".dimmed()
            ));
        }
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert_eq!(ReplCommand::parse(".help"), Some((ReplCommand::Help, None)));
        assert_eq!(ReplCommand::parse(".exit"), Some((ReplCommand::Exit, None)));
        assert_eq!(
            ReplCommand::parse(".load test.chimp"),
            Some((ReplCommand::Load, Some("test.chimp")))
        );
        assert_eq!(ReplCommand::parse(".bytecode"), Some((ReplCommand::Bytecode, None)));
        assert!(ReplCommand::parse(".nope").is_none());
        assert!(ReplCommand::parse("not a command").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("(1 + 2)"));
        assert!(is_balanced("let h = {\"a\": 1}"));
        assert!(is_balanced("func() { return 1; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("if (x) {"));
        assert!(is_balanced("\"string with (unbalanced\""));
        assert!(is_balanced("\"escaped \\\" quote\""));
        assert!(!is_balanced("\"unterminated"));
    }

    #[test]
    fn test_completion_words() {
        let mut helper = ChimpHelper::new();
        assert!(helper.words.iter().any(|w| w == "func"));
        assert!(helper.words.iter().any(|w| w == "puts"));
        assert!(helper.words.iter().any(|w| w == ".load"));

        helper.set_globals(vec!["counter".to_string(), "len".to_string()]);
        assert!(helper.words.iter().any(|w| w == "counter"));
        assert_eq!(helper.words.iter().filter(|w| *w == "len").count(), 1);
    }

    #[test]
    fn test_format_error_marks_fatal_conditions() {
        use chimp_core::RuntimeError;

        let fatal = format_error(&chimp_core::Error::from(RuntimeError::FrameOverflow));
        assert!(fatal.contains("frame stack overflow"));
        assert!(fatal.contains("internal error"));

        let ordinary = format_error(&chimp_core::Error::from(RuntimeError::DivisionByZero(4)));
        assert!(ordinary.contains("divided 4 by 0"));
        assert!(!ordinary.contains("internal error"));
    }

    #[test]
    fn test_builtins_highlighted() {
        assert_ne!(highlight_word("len"), "len");
        assert_eq!(highlight_word("counter"), "counter");
    }

    #[test]
    fn test_word_start() {
        assert_eq!(word_start("let x = pu", 10), 8);
        assert_eq!(word_start(".lo", 3), 0);
        assert_eq!(word_start("", 0), 0);
    }
}
