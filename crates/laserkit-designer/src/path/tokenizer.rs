//! Regex-free scanner for path data.
//!
//! Splits path data into command letters and numeric tokens, then groups the
//! numbers into commands by arity. Extra operand groups repeat the previous
//! command (a moveto continues as lineto). Malformed numbers read as `0` so a
//! corrupt path degrades instead of failing the build.

use laserkit_core::GeometryError;
use smallvec::SmallVec;
use tracing::trace;

use super::command::{CommandKind, PathCommand};

/// Tokenizer output: the commands plus anything that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct Tokenized {
    pub commands: Vec<PathCommand>,
    pub diagnostics: Vec<GeometryError>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Command(CommandKind),
    Number(String),
}

/// Tokenizes path data, discarding diagnostics.
pub fn tokenize(path_data: &str) -> Vec<PathCommand> {
    tokenize_with_diagnostics(path_data).commands
}

/// Tokenizes path data and reports every degradation applied.
pub fn tokenize_with_diagnostics(path_data: &str) -> Tokenized {
    let mut out = Tokenized::default();
    let mut current: Option<CommandKind> = None;
    let mut operands: SmallVec<[f64; 7]> = SmallVec::new();
    let mut emitted_for_current = false;

    for token in scan(path_data) {
        match token {
            Token::Command(kind) => {
                finish_command(current, &operands, emitted_for_current, &mut out);
                operands.clear();
                emitted_for_current = false;
                if kind == CommandKind::Close {
                    out.commands.push(PathCommand::close());
                    emitted_for_current = true;
                }
                current = Some(kind);
            }
            Token::Number(text) => {
                let value = parse_number(&text, &mut out.diagnostics);
                let kind = match current {
                    None => {
                        out.diagnostics.push(GeometryError::parse(format!(
                            "operand '{}' before the first command ignored",
                            text
                        )));
                        continue;
                    }
                    Some(CommandKind::Close) => {
                        out.diagnostics.push(GeometryError::parse(format!(
                            "operand '{}' after closepath ignored",
                            text
                        )));
                        continue;
                    }
                    Some(kind) => kind,
                };

                operands.push(value);
                if operands.len() == kind.arity() {
                    out.commands.push(PathCommand::new(kind, &operands));
                    operands.clear();
                    emitted_for_current = true;
                    current = Some(kind.repeated());
                }
            }
        }
    }
    finish_command(current, &operands, emitted_for_current, &mut out);

    trace!(
        "Tokenized {} commands ({} diagnostics)",
        out.commands.len(),
        out.diagnostics.len()
    );
    out
}

fn finish_command(
    current: Option<CommandKind>,
    operands: &[f64],
    emitted: bool,
    out: &mut Tokenized,
) {
    let Some(kind) = current else {
        return;
    };
    if !operands.is_empty() {
        out.diagnostics.push(GeometryError::parse(format!(
            "incomplete '{}' operand group ({} of {}) dropped",
            kind.letter(),
            operands.len(),
            kind.arity()
        )));
    } else if !emitted {
        out.diagnostics.push(GeometryError::parse(format!(
            "'{}' without operands ignored",
            kind.letter()
        )));
    }
}

fn parse_number(text: &str, diagnostics: &mut Vec<GeometryError>) -> f64 {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            diagnostics.push(GeometryError::parse(format!(
                "malformed number '{}' read as 0",
                text
            )));
            0.0
        }
    }
}

/// Splits path data into command and number tokens.
///
/// Handles commas/whitespace and also splits on `+`/`-` when they begin a
/// new number (e.g. `10-5` -> `10`, `-5`), while preserving scientific
/// notation. A second decimal point starts a new number (`1.5.5`). The two
/// arc flags are single characters and need no separator (`0110` reads as
/// `0 1 10` in flag position).
fn scan(path_data: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    // Operands seen since the last arc command letter
    let mut arc_operands: Option<usize> = None;

    fn flush(current: &mut String, tokens: &mut Vec<Token>, arc_operands: &mut Option<usize>) {
        if !current.is_empty() {
            tokens.push(Token::Number(std::mem::take(current)));
            if let Some(count) = arc_operands {
                *count += 1;
            }
        }
    }

    for ch in path_data.chars() {
        if let Some(kind) = CommandKind::from_letter(ch) {
            flush(&mut current, &mut tokens, &mut arc_operands);
            tokens.push(Token::Command(kind));
            arc_operands = matches!(kind, CommandKind::ArcAbs | CommandKind::ArcRel).then_some(0);
            continue;
        }
        let at_flag = matches!(arc_operands, Some(count) if matches!(count % 7, 3 | 4));
        if at_flag && current.is_empty() && matches!(ch, '0' | '1') {
            current.push(ch);
            flush(&mut current, &mut tokens, &mut arc_operands);
            continue;
        }
        match ch {
            ' ' | ',' | '\n' | '\r' | '\t' => flush(&mut current, &mut tokens, &mut arc_operands),
            '-' | '+' => {
                if !matches!(current.chars().last(), Some('e' | 'E')) {
                    flush(&mut current, &mut tokens, &mut arc_operands);
                }
                current.push(ch);
            }
            '.' => {
                let has_exponent = current.contains(['e', 'E']);
                if current.contains('.') || has_exponent {
                    flush(&mut current, &mut tokens, &mut arc_operands);
                }
                current.push(ch);
            }
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut tokens, &mut arc_operands);
    tokens
}
