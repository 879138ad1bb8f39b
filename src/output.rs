//! What commands print: a versioned JSON envelope for scripts, or a short
//! sectioned text block for people.

use std::fmt;

use serde::Serialize;

use crate::error::{exit_codes, Error, Result};

pub const SCHEMA_VERSION: &str = "taskmirror.v1";

/// Global flags that consume the following argument.
const VALUE_FLAGS: &[&str] = &["--data-dir", "--config"];

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Details,
    Warnings,
    NextSteps,
}

impl Section {
    const ORDER: [Section; 4] = [
        Section::Summary,
        Section::Details,
        Section::Warnings,
        Section::NextSteps,
    ];

    fn title(self) -> &'static str {
        match self {
            Section::Summary => "Summary",
            Section::Details => "Details",
            Section::Warnings => "Warnings",
            Section::NextSteps => "Next steps",
        }
    }
}

/// Text for the terminal. Warnings and next steps also travel in the JSON
/// envelope.
#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    lines: Vec<(Section, String)>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
        }
    }

    /// `key: value`, or just `key` when the value is empty.
    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let (key, value) = (key.into(), value.into());
        let line = if value.is_empty() {
            key
        } else {
            format!("{key}: {value}")
        };
        self.lines.push((Section::Summary, line));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.lines.push((Section::Details, value.into()));
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.lines.push((Section::Warnings, value.into()));
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.lines.push((Section::NextSteps, value.into()));
    }

    fn section(&self, section: Section) -> impl Iterator<Item = &str> + '_ {
        self.lines
            .iter()
            .filter(move |(kind, _)| *kind == section)
            .map(|(_, line)| line.as_str())
    }
}

impl fmt::Display for HumanOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.header)?;
        for section in Section::ORDER {
            let mut lines = self.section(section).peekable();
            if lines.peek().is_none() {
                continue;
            }
            write!(f, "\n\n{}:", section.title())?;
            for line in lines {
                write!(f, "\n- {line}")?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    schema_version: &'static str,
    command: &'a str,
    #[serde(flatten)]
    outcome: Outcome<'a, T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    next_steps: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome<'a, T> {
    Success { data: &'a T },
    Error { error: ErrorBody },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    code: i32,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

fn section_lines(human: Option<&HumanOutput>, section: Section) -> Vec<&str> {
    human
        .map(|h| h.section(section).collect())
        .unwrap_or_default()
}

fn print_envelope<T: Serialize>(envelope: &Envelope<'_, T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(envelope)?);
    Ok(())
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        return print_envelope(&Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            outcome: Outcome::Success { data },
            warnings: section_lines(human, Section::Warnings),
            next_steps: section_lines(human, Section::NextSteps),
        });
    }

    match human {
        Some(human) if !options.quiet => println!("{human}"),
        _ => {}
    }
    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = recovery_hint(err);
    if !json {
        eprintln!("error: {err}");
        if let Some(hint) = hint {
            eprintln!("hint: {hint}");
        }
        return Ok(());
    }

    print_envelope::<()>(&Envelope {
        schema_version: SCHEMA_VERSION,
        command,
        outcome: Outcome::Error {
            error: ErrorBody {
                message: err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
        },
        warnings: Vec::new(),
        next_steps: hint.into_iter().collect(),
    })
}

/// Command name for the envelope, read from the raw arguments so it is
/// known even when clap rejects them.
pub fn infer_command_name_from_args() -> String {
    command_name(std::env::args().skip(1))
}

fn command_name(args: impl IntoIterator<Item = String>) -> String {
    let mut args = args.into_iter();
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            args.next();
        } else if !arg.starts_with('-') {
            words.push(arg);
            if words.len() == 2 {
                break;
            }
        }
    }

    match words.as_slice() {
        [] => "taskmirror".to_string(),
        [command, sub] if command == "filter" => format!("{command} {sub}"),
        [command, ..] => command.clone(),
    }
}

fn error_kind(err: &Error) -> &'static str {
    if err.exit_code() == exit_codes::USER_ERROR {
        "user_error"
    } else {
        "operation_failed"
    }
}

fn recovery_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::TaskNotFound(_) => Some("taskmirror list --all"),
        Error::AmbiguousTask { .. } => Some("use a longer task id prefix"),
        Error::InvalidConfig(_) => Some("fix taskmirror.toml then retry"),
        Error::Remote(_) => Some("check sync.command in taskmirror.toml"),
        Error::LockFailed(_) => Some("wait for the other taskmirror process, then retry"),
        _ => None,
    }
}
