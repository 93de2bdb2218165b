//! Line-oriented command scripts.
//!
//! One command per line; blank lines and lines starting with `#` are
//! skipped. Each command produces exactly one output line.
//!
//! ```text
//! create A root
//! create B root,A      # multi-parent create
//! cite B root
//! children root        # -> A B
//! remove A             # -> released A
//! verify               # -> ok
//! ```
//!
//! Graph errors are part of the output (`error E2001 ...`), not failures of
//! the script. Only malformed lines abort the run.

use std::fmt;

use citegraph_core::verify_graph;
use thiserror::Error;

use crate::SimGraph;
use crate::workload::Op;

/// A parsed script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A mutation, shared with the simulator's op type.
    Apply(Op),
    Parents(String),
    Children(String),
    Exists(String),
    Root,
    Verify,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: '{command}' expects {expected}")]
    WrongArity {
        line: usize,
        command: String,
        expected: &'static str,
    },

    #[error("line {line}: empty identifier in parent list '{list}'")]
    EmptyIdentifier { line: usize, list: String },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply(op) => write!(f, "{op}"),
            Self::Parents(id) => write!(f, "parents {id}"),
            Self::Children(id) => write!(f, "children {id}"),
            Self::Exists(id) => write!(f, "exists {id}"),
            Self::Root => f.write_str("root"),
            Self::Verify => f.write_str("verify"),
        }
    }
}

/// Parse one line. Returns `Ok(None)` for blank and comment lines.
///
/// `line` is the 1-based line number used in error messages.
///
/// # Errors
///
/// Returns a [`ScriptError`] for unknown commands or wrong argument counts.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Command>, ScriptError> {
    let text = text.split_once('#').map_or(text, |(code, _)| code);
    let words: Vec<&str> = text.split_whitespace().collect();
    let Some((&command, args)) = words.split_first() else {
        return Ok(None);
    };

    let arity = |expected: &'static str| ScriptError::WrongArity {
        line,
        command: command.to_string(),
        expected,
    };

    let parsed = match (command, args) {
        ("create", [id, list]) => {
            let parents: Vec<String> = list.split(',').map(str::to_string).collect();
            if parents.iter().any(String::is_empty) {
                return Err(ScriptError::EmptyIdentifier {
                    line,
                    list: (*list).to_string(),
                });
            }
            Command::Apply(Op::Create {
                id: (*id).to_string(),
                parents,
            })
        }
        ("create", [id]) => Command::Apply(Op::Create {
            id: (*id).to_string(),
            parents: Vec::new(),
        }),
        ("create", _) => return Err(arity("an id and a comma-separated parent list")),
        ("cite", [child, parent]) => Command::Apply(Op::Cite {
            child: (*child).to_string(),
            parent: (*parent).to_string(),
        }),
        ("cite", _) => return Err(arity("a child and a parent")),
        ("remove" | "touch" | "parents" | "children" | "exists", [id]) => {
            let id = (*id).to_string();
            match command {
                "remove" => Command::Apply(Op::Remove { id }),
                "touch" => Command::Apply(Op::Touch { id }),
                "parents" => Command::Parents(id),
                "children" => Command::Children(id),
                _ => Command::Exists(id),
            }
        }
        ("remove" | "touch" | "parents" | "children" | "exists", _) => {
            return Err(arity("exactly one id"));
        }
        ("root", []) => Command::Root,
        ("verify", []) => Command::Verify,
        ("root" | "verify", _) => return Err(arity("no arguments")),
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: command.to_string(),
            });
        }
    };
    Ok(Some(parsed))
}

/// Execute one command and render its output line.
pub fn execute(graph: &mut SimGraph, command: &Command) -> String {
    let rendered = match command {
        Command::Apply(op @ Op::Remove { .. }) => op
            .apply(graph)
            .map(|released| format!("released {}", released.join(" "))),
        Command::Apply(op) => op.apply(graph).map(|_| String::from("ok")),
        Command::Parents(id) => graph.parents(id).map(|ids| ids.join(" ")),
        Command::Children(id) => graph.children(id).map(|ids| ids.join(" ")),
        Command::Exists(id) => Ok(graph.exists(id).to_string()),
        Command::Root => Ok(graph.root_id().clone()),
        Command::Verify => {
            let report = verify_graph(graph);
            if report.is_ok() {
                Ok(String::from("ok"))
            } else {
                Ok(format!("{} violations: {:?}", report.violations.len(), report.violations))
            }
        }
    };

    rendered.unwrap_or_else(|err| format!("error {} {err}", err.code().code()))
}

/// Parse and run a whole script, returning one output line per command.
///
/// Parsing happens up front, so a malformed line leaves the graph untouched.
///
/// # Errors
///
/// Returns the first [`ScriptError`] found.
pub fn run_script(graph: &mut SimGraph, source: &str) -> Result<Vec<String>, ScriptError> {
    let mut commands = Vec::new();
    for (index, text) in source.lines().enumerate() {
        if let Some(command) = parse_line(index + 1, text)? {
            commands.push(command);
        }
    }

    Ok(commands
        .iter()
        .map(|command| {
            let output = execute(graph, command);
            tracing::debug!(command = %command, output = %output, "script");
            output
        })
        .collect())
}
