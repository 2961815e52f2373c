// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Interactive REPL on top of a [`ModuleRuntime`].

use owo_colors::OwoColorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Config, Editor, Helper};
use std::borrow::Cow;
use std::path::PathBuf;
use strand_cjs::boa_engine::{Context, JsValue};
use strand_cjs::{CjsError, ModuleRuntime, VERSION};

const HISTORY_FILE: &str = ".strand_history";
const MAX_HISTORY_SIZE: usize = 1000;

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "delete", "do", "else",
    "extends", "finally", "for", "function", "if", "in", "instanceof", "let", "new", "return",
    "switch", "throw", "try", "typeof", "var", "void", "while",
];

const LITERALS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity", "this"];

/// Names the module system puts in scope
const MODULE_GLOBALS: &[&str] = &["require", "require.resolve", "module", "exports", "print"];

/// REPL commands that can be executed with a dot prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    Exit,
    Clear,
    Version,
    Load,
    Modules,
}

impl ReplCommand {
    /// Parse a REPL command from input string
    pub fn parse(input: &str) -> Option<(Self, Option<&str>)> {
        let rest = input.trim().strip_prefix('.')?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

        let cmd = match cmd.as_str() {
            "help" | "h" | "?" => ReplCommand::Help,
            "exit" | "quit" | "q" => ReplCommand::Exit,
            "clear" | "cls" => ReplCommand::Clear,
            "version" | "v" => ReplCommand::Version,
            "load" | "l" => ReplCommand::Load,
            "modules" | "m" => ReplCommand::Modules,
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
            (".load <module>", "Run a module as the main module"),
            (".modules", "List cached modules"),
        ]
    }
}

/// Completion, hints and multi-line validation for rustyline
struct StrandHelper {
    words: Vec<&'static str>,
}

impl StrandHelper {
    fn new() -> Self {
        let commands = [".help", ".exit", ".clear", ".version", ".load", ".modules"];
        let words = KEYWORDS
            .iter()
            .chain(LITERALS)
            .chain(MODULE_GLOBALS)
            .chain(commands.iter())
            .copied()
            .collect();
        Self { words }
    }

    fn current_word(line: &str) -> (usize, &str) {
        let start = line
            .char_indices()
            .rev()
            .find(|&(_, c)| !c.is_alphanumeric() && c != '_' && c != '.')
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        (start, &line[start..])
    }
}

impl Completer for StrandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let (_, word) = Self::current_word(&line[..pos]);
        if word.is_empty() {
            return Ok((pos, vec![]));
        }

        let matches = self
            .words
            .iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Pair {
                display: w.to_string(),
                replacement: w[word.len()..].to_string(),
            })
            .collect();

        Ok((pos, matches))
    }
}

impl Hinter for StrandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<Self::Hint> {
        if pos < line.len() {
            return None;
        }

        let (_, word) = Self::current_word(line);
        if word.len() < 2 {
            return None;
        }

        self.words
            .iter()
            .find(|w| w.starts_with(word) && w.len() > word.len())
            .map(|w| w[word.len()..].to_string().dimmed().to_string())
    }
}

impl Highlighter for StrandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let mut result = String::with_capacity(line.len() * 2);
        let mut word = String::new();

        for c in line.chars() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                continue;
            }
            result.push_str(&highlight_word(&word));
            word.clear();
            match c {
                '(' | ')' | '[' | ']' | '{' | '}' => result.push_str(&c.yellow().to_string()),
                '"' | '\'' | '`' => result.push_str(&c.green().to_string()),
                _ => result.push(c),
            }
        }
        result.push_str(&highlight_word(&word));

        Cow::Owned(result)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn highlight_word(word: &str) -> String {
    if KEYWORDS.contains(&word) {
        word.magenta().bold().to_string()
    } else if LITERALS.contains(&word) {
        word.blue().to_string()
    } else if MODULE_GLOBALS.contains(&word) {
        word.cyan().to_string()
    } else if !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()) {
        word.yellow().to_string()
    } else {
        word.to_string()
    }
}

impl Validator for StrandHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();

        if ReplCommand::parse(input).is_some() {
            return Ok(ValidationResult::Valid(None));
        }
        if !is_balanced(input) {
            return Ok(ValidationResult::Incomplete);
        }

        let trimmed = input.trim_end();
        if trimmed.ends_with('\\') || trimmed.ends_with(',') || trimmed.ends_with('=') {
            return Ok(ValidationResult::Incomplete);
        }

        Ok(ValidationResult::Valid(None))
    }
}

impl Helper for StrandHelper {}

/// Check if brackets, braces, and parentheses are balanced
fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut in_string = None;
    let mut escape_next = false;

    for c in input.chars() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match in_string {
            Some(_) if c == '\\' => escape_next = true,
            Some(quote) if c == quote => in_string = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' | '`' => in_string = Some(c),
                '(' => stack.push(')'),
                '[' => stack.push(']'),
                '{' => stack.push('}'),
                // A stray closer is a syntax error; let the engine report it
                ')' | ']' | '}' if stack.pop() != Some(c) => return true,
                _ => {}
            },
        }
    }

    stack.is_empty() && in_string.is_none()
}

/// The interactive REPL
pub struct Repl {
    runtime: ModuleRuntime,
    editor: Editor<StrandHelper, DefaultHistory>,
    history_path: PathBuf,
}

impl Repl {
    /// Create a REPL evaluating in `runtime`
    pub fn new(runtime: ModuleRuntime) -> rustyline::Result<Self> {
        let config = Config::builder()
            .history_ignore_dups(true)?
            .history_ignore_space(true)
            .max_history_size(MAX_HISTORY_SIZE)?
            .auto_add_history(true)
            .build();

        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(StrandHelper::new()));

        let history_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("strand")
            .join(HISTORY_FILE);
        if let Some(parent) = history_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = editor.load_history(&history_path);

        Ok(Self {
            runtime,
            editor,
            history_path,
        })
    }

    /// Run the REPL main loop
    pub fn run(&mut self) -> rustyline::Result<()> {
        println!(
            "{} {}",
            "strand".bright_cyan().bold(),
            VERSION.yellow()
        );
        println!("Type {} for help, {} to exit", ".help".green(), ".exit".green());
        println!();

        let prompt = format!("{} ", "strand>".bright_green().bold());

        loop {
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

                    let result = self.runtime.eval(trimmed);
                    self.print_result(result);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "^C".dimmed());
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{}: {:?}", "Error".red().bold(), err);
                    break;
                }
            }
        }

        let _ = self.editor.save_history(&self.history_path);
        Ok(())
    }

    fn execute_command(&mut self, cmd: ReplCommand, arg: Option<&str>) -> CommandResult {
        match cmd {
            ReplCommand::Help => print_help(),
            ReplCommand::Exit => return CommandResult::Exit,
            ReplCommand::Clear => print!("\x1B[2J\x1B[H"),
            ReplCommand::Version => {
                println!("{}: {}", "strand".bright_cyan().bold(), VERSION.yellow());
            }
            ReplCommand::Load => match arg {
                Some(specifier) => {
                    let result = self.runtime.run_main(specifier);
                    self.print_result(result);
                }
                None => eprintln!(
                    "{}: {} {}",
                    "Error".red().bold(),
                    ".load".cyan(),
                    "requires a module specifier".dimmed()
                ),
            },
            ReplCommand::Modules => self.print_modules(),
        }
        CommandResult::Continue
    }

    fn print_result(&mut self, result: Result<JsValue, CjsError>) {
        match result {
            Ok(value) if value.is_undefined() => {}
            Ok(value) => {
                let text = format_value(&value, self.runtime.context_mut());
                println!("{} {}", "=>".dimmed(), text);
            }
            Err(e) => eprintln!("{}: {}", "Error".red().bold(), e),
        }
    }

    fn print_modules(&self) {
        let ids = self.runtime.module_ids();
        if ids.is_empty() {
            println!("{}", "no modules loaded".dimmed());
            return;
        }

        for id in ids {
            let Some(info) = self.runtime.module(&id) else {
                continue;
            };
            let location = info
                .location
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<internal>".to_string());
            println!(
                "  {:24} {:10} {}",
                info.id.cyan(),
                info.state.to_string().yellow(),
                location.dimmed()
            );
        }
    }
}

/// Result of executing a REPL command
enum CommandResult {
    Continue,
    Exit,
}

fn print_help() {
    println!();
    println!("{}", "REPL Commands:".white().bold());
    for (cmd, desc) in ReplCommand::all_commands() {
        println!("  {:16} {}", cmd.cyan(), desc.dimmed());
    }
    println!();
}

/// Format a value for display with syntax coloring.
///
/// Plain objects and arrays print as indented JSON.
fn format_value(value: &JsValue, ctx: &mut Context) -> String {
    if value.is_object() && !value.is_callable() {
        if let Ok(json) = value.to_json(ctx) {
            if let Ok(text) = serde_json::to_string_pretty(&json) {
                return text;
            }
        }
    }

    let text = value.display().to_string();
    if value.is_null() {
        text.blue().to_string()
    } else if value.is_boolean() || value.is_number() || value.is_bigint() {
        text.yellow().to_string()
    } else if value.is_string() {
        text.green().to_string()
    } else if value.is_callable() {
        text.magenta().to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repl_command_parse() {
        assert!(matches!(
            ReplCommand::parse(".help"),
            Some((ReplCommand::Help, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".exit"),
            Some((ReplCommand::Exit, None))
        ));
        assert!(matches!(
            ReplCommand::parse(".load ./app"),
            Some((ReplCommand::Load, Some("./app")))
        ));
        assert!(matches!(
            ReplCommand::parse(".modules"),
            Some((ReplCommand::Modules, None))
        ));
        assert!(ReplCommand::parse("require('./app')").is_none());
        assert!(ReplCommand::parse(".unknown").is_none());
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("require('./a')"));
        assert!(is_balanced("{ a: 1 }"));
        assert!(is_balanced("function() { return 1; }"));
        assert!(!is_balanced("(1 + 2"));
        assert!(!is_balanced("module.exports = {"));
        assert!(is_balanced("'string with (unbalanced'"));
        assert!(is_balanced(r#""escaped \" quote""#));
    }

    #[test]
    fn test_current_word() {
        assert_eq!(StrandHelper::current_word("x = requ"), (4, "requ"));
        assert_eq!(StrandHelper::current_word(".mod"), (0, ".mod"));
    }

    #[test]
    fn test_current_word_after_multibyte_char() {
        assert_eq!(StrandHelper::current_word("x = \"€"), (8, ""));
        assert_eq!(StrandHelper::current_word("a→req"), (4, "req"));
        assert_eq!(StrandHelper::current_word("…"), (3, ""));
    }

    #[test]
    fn test_format_value_prints_objects_as_json() {
        let mut ctx = Context::default();
        let value = ctx
            .eval(strand_cjs::boa_engine::Source::from_bytes("({ a: [1, 2] })"))
            .unwrap();
        assert_eq!(
            format_value(&value, &mut ctx),
            "{\n  \"a\": [\n    1,\n    2\n  ]\n}"
        );
    }
}
