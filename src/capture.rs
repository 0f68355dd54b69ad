//! §4.3 VarScraper and §4.8 CaptureDSL parser.

use crate::error::{CaptureError, MorcError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a JSON-path traversal (spec.md §4.3/§4.8).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraversalStep {
    Key(String),
    Index(usize),
}

/// A capture rule: extracts a value from a response body and names the
/// variable it is stored under (spec.md §3/§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VarScraper {
    Offset { name: String, start: usize, end: usize },
    Path { name: String, steps: Vec<TraversalStep> },
}

impl VarScraper {
    pub fn name(&self) -> &str {
        match self {
            VarScraper::Offset { name, .. } => name,
            VarScraper::Path { name, .. } => name,
        }
    }

    /// Extracts the value from `body`. Does not write it anywhere; callers
    /// (the Sender pipeline) are responsible for storing the result.
    pub fn extract(&self, body: &[u8]) -> Result<String, CaptureError> {
        match self {
            VarScraper::Offset { start, end, .. } => {
                if *start > *end || *end > body.len() {
                    return Err(CaptureError::OutOfRange {
                        start: *start,
                        end: *end,
                        len: body.len(),
                    });
                }
                Ok(String::from_utf8_lossy(&body[*start..*end]).into_owned())
            }
            VarScraper::Path { steps, .. } => {
                let root: Value = serde_json::from_slice(body)?;
                let mut node = &root;
                let mut path_so_far = String::new();

                for step in steps {
                    match step {
                        TraversalStep::Key(key) => {
                            path_so_far.push('.');
                            path_so_far.push_str(key);
                            node = match node {
                                Value::Object(map) => map
                                    .get(key)
                                    .ok_or_else(|| CaptureError::MissingKey(key.clone()))?,
                                other => {
                                    return Err(CaptureError::WrongType {
                                        expected: "object",
                                        found: json_type_name(other),
                                        at: path_so_far,
                                    });
                                }
                            };
                        }
                        TraversalStep::Index(idx) => {
                            path_so_far.push_str(&format!("[{idx}]"));
                            node = match node {
                                Value::Array(items) => items.get(*idx).ok_or_else(|| {
                                    CaptureError::OutOfRange {
                                        start: *idx,
                                        end: *idx + 1,
                                        len: items.len(),
                                    }
                                })?,
                                other => {
                                    return Err(CaptureError::WrongType {
                                        expected: "array",
                                        found: json_type_name(other),
                                        at: path_so_far,
                                    });
                                }
                            };
                        }
                    }
                }

                Ok(stringify_terminal(node))
            }
        }
    }

    /// Canonical display form used by `caps` listing output.
    pub fn display_form(&self) -> String {
        match self {
            VarScraper::Offset { start, end, .. } => format!("offset {start},{end}"),
            VarScraper::Path { steps, .. } => {
                let mut out = String::new();
                for step in steps {
                    match step {
                        TraversalStep::Key(k) => {
                            out.push('.');
                            out.push_str(k);
                        }
                        TraversalStep::Index(i) => out.push_str(&format!("[{i}]")),
                    }
                }
                out
            }
        }
    }

    /// Canonical capture-spec form (as accepted by [`parse`]).
    pub fn spec_form(&self) -> String {
        match self {
            VarScraper::Offset { start, end, .. } => format!(":{start},{end}"),
            VarScraper::Path { .. } => self.display_form(),
        }
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn stringify_terminal(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(v).unwrap_or_default(),
    }
}

/// Parses a capture spec string into a [`VarScraper`], per the
/// CaptureDSL grammar (spec.md §4.8).
///
/// Offset form: `:START,END`. Anything else is parsed as a dot/index path
/// chain: `segment ('.' segment | '[' INT ']')*`, with an optional leading
/// `.` that is ignored.
pub fn parse(name: &str, spec: &str) -> Result<VarScraper, MorcError> {
    let name = name.to_uppercase();
    if let Some(rest) = spec.strip_prefix(':') {
        return parse_offset(&name, rest);
    }
    parse_path(&name, spec)
}

fn parse_offset(name: &str, rest: &str) -> Result<VarScraper, MorcError> {
    let (start_str, end_str) = rest
        .split_once(',')
        .ok_or_else(|| MorcError::BadInput(format!("offset spec ':{rest}' is missing a comma")))?;
    let start: usize = start_str
        .parse()
        .map_err(|_| MorcError::BadInput(format!("invalid offset start '{start_str}'")))?;
    let end: usize = end_str
        .parse()
        .map_err(|_| MorcError::BadInput(format!("invalid offset end '{end_str}'")))?;
    if start > end {
        return Err(MorcError::BadInput(format!(
            "offset start {start} must be <= end {end}"
        )));
    }
    Ok(VarScraper::Offset {
        name: name.to_string(),
        start,
        end,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectSegmentOrBracket,
    InSegment,
    InBracket,
    ExpectSeparator,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_path(name: &str, input: &str) -> Result<VarScraper, MorcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut steps = Vec::new();
    let mut state = State::ExpectSegmentOrBracket;
    let mut buf = String::new();
    let mut i = 0usize;

    macro_rules! syntax_err {
        ($pos:expr) => {
            return Err(MorcError::BadInput(format!(
                "capture path syntax error at offset {}",
                $pos + 1
            )))
        };
    }

    while i < chars.len() {
        let c = chars[i];
        match state {
            State::ExpectSegmentOrBracket => {
                if c == '.' {
                    // A leading '.' is permitted and ignored.
                    i += 1;
                } else if c == '[' {
                    state = State::InBracket;
                    buf.clear();
                    i += 1;
                } else if is_ident_start(c) {
                    buf.clear();
                    buf.push(c);
                    state = State::InSegment;
                    i += 1;
                } else {
                    syntax_err!(i);
                }
            }
            State::InSegment => {
                if is_ident_continue(c) {
                    buf.push(c);
                    i += 1;
                } else if c == '.' || c == '[' {
                    steps.push(TraversalStep::Key(std::mem::take(&mut buf)));
                    state = State::ExpectSegmentOrBracket;
                    // do not consume; re-dispatch through ExpectSegmentOrBracket
                } else {
                    syntax_err!(i);
                }
            }
            State::InBracket => {
                if c.is_ascii_digit() {
                    buf.push(c);
                    i += 1;
                } else if c == ']' {
                    if buf.is_empty() {
                        syntax_err!(i);
                    }
                    let idx: usize = buf
                        .parse()
                        .map_err(|_| MorcError::BadInput(format!("invalid index '{buf}'")))?;
                    steps.push(TraversalStep::Index(idx));
                    buf.clear();
                    state = State::ExpectSeparator;
                    i += 1;
                } else if c == '-' {
                    syntax_err!(i);
                } else {
                    syntax_err!(i);
                }
            }
            State::ExpectSeparator => {
                if c == '.' {
                    state = State::ExpectSegmentOrBracket;
                    i += 1;
                } else if c == '[' {
                    state = State::InBracket;
                    i += 1;
                } else {
                    syntax_err!(i);
                }
            }
        }
    }

    match state {
        State::InSegment => {
            if buf.is_empty() {
                return Err(MorcError::BadInput(
                    "capture path syntax error: empty key".to_string(),
                ));
            }
            steps.push(TraversalStep::Key(buf));
        }
        State::ExpectSeparator | State::ExpectSegmentOrBracket => {}
        State::InBracket => {
            return Err(MorcError::BadInput(
                "capture path syntax error: unterminated '['".to_string(),
            ));
        }
    }

    if steps.is_empty() {
        return Err(MorcError::BadInput(
            "capture path must not be empty".to_string(),
        ));
    }

    Ok(VarScraper::Path {
        name: name.to_string(),
        steps,
    })
}
