//! Sample line tokenizer and tag block parser.
//!
//! A sample line is `name{k="v",...} value [timestamp]` or `name value
//! [timestamp]`. The tokenizer walks the line once with the following
//! transition table:
//!
//! | state          | input        | next state     | effect                 |
//! |----------------|--------------|----------------|------------------------|
//! | `Name`         | `{`          | `Tags`         | name ends              |
//! | `Name`         | whitespace   | `AfterName`    | name ends              |
//! | `Name`         | other        | `Name`         |                        |
//! | `AfterName`    | whitespace   | `AfterName`    |                        |
//! | `AfterName`    | `{`          | `Tags`         |                        |
//! | `AfterName`    | other        | done           | value starts here      |
//! | `Tags`         | `"`          | `Quoted`       |                        |
//! | `Tags`         | `}`          | done           | tag block ends         |
//! | `Tags`         | other        | `Tags`         |                        |
//! | `Quoted`       | `\`          | `Escaped`      |                        |
//! | `Quoted`       | `"`          | `Tags`         |                        |
//! | `Quoted`       | other        | `Quoted`       |                        |
//! | `Escaped`      | any          | `Quoted`       |                        |
//!
//! Reaching the end of the line inside `Tags`, `Quoted` or `Escaped` is an
//! unclosed tag block. Commas and braces inside quoted values are literal.

use super::ErrorKind;
use crate::metric::Tags;

/// A tokenized sample line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Sample<'a> {
    pub(crate) name: &'a str,
    pub(crate) tags: Tags,
    pub(crate) value: &'a str,
    pub(crate) timestamp: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    AfterName,
    Tags,
    Quoted,
    Escaped,
}

/// Split a sample line into name, tags, value token and optional timestamp
/// token. `line` must already be trimmed.
pub(crate) fn tokenize(line: &str) -> Result<Sample<'_>, ErrorKind> {
    let mut state = State::Name;
    let mut name_end = line.len();
    let mut block_start = None;
    let mut block = None;
    let mut rest_start = line.len();

    for (idx, c) in line.char_indices() {
        state = match (state, c) {
            (State::Name, '{') => {
                name_end = idx;
                block_start = Some(idx + 1);
                State::Tags
            }
            (State::Name, c) if c.is_whitespace() => {
                name_end = idx;
                State::AfterName
            }
            (State::Name, _) => State::Name,
            (State::AfterName, '{') => {
                block_start = Some(idx + 1);
                State::Tags
            }
            (State::AfterName, c) if c.is_whitespace() => State::AfterName,
            (State::AfterName, _) => {
                rest_start = idx;
                break;
            }
            (State::Tags, '"') => State::Quoted,
            (State::Tags, '}') => {
                block = block_start.map(|start| &line[start..idx]);
                rest_start = idx + 1;
                break;
            }
            (State::Tags, _) => State::Tags,
            (State::Quoted, '\\') => State::Escaped,
            (State::Quoted, '"') => State::Tags,
            (State::Quoted, _) | (State::Escaped, _) => State::Quoted,
        };
    }

    if block.is_none() && matches!(state, State::Tags | State::Quoted | State::Escaped) {
        return Err(ErrorKind::MalformedSampleLine(format!(
            "unclosed tag block: {line}"
        )));
    }

    let name = &line[..name_end];
    if name.is_empty() {
        return Err(ErrorKind::MalformedSampleLine(format!(
            "missing metric name: {line}"
        )));
    }

    let tags = match block {
        Some(block) => parse_tags(block)?,
        None => Vec::new(),
    };

    let mut rest = line[rest_start..].split_whitespace();
    let value = rest.next().unwrap_or("");
    let timestamp = rest.next();
    if let Some(extra) = rest.next() {
        return Err(ErrorKind::NumberFormat(extra.to_string()));
    }

    Ok(Sample {
        name,
        tags,
        value,
        timestamp,
    })
}

/// Split a tag block on the commas that sit outside quoted values.
fn segments(block: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (idx, c) in block.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ',' if !quoted => {
                segments.push(&block[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    segments.push(&block[start..]);
    segments
}

/// Parse the inside of a `{...}` tag block into ordered key/value pairs.
///
/// Whitespace around keys and either side of `=` is ignored. Duplicate keys
/// are kept as given. Empty segments, as left by a trailing comma, are
/// skipped.
pub(crate) fn parse_tags(block: &str) -> Result<Tags, ErrorKind> {
    let mut tags = Vec::new();

    for segment in segments(block) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| ErrorKind::MalformedTag(format!("missing '=': {segment}")))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ErrorKind::MalformedTag(format!("empty key: {segment}")));
        }

        tags.push((key.to_string(), unquote(value.trim())?));
    }

    Ok(tags)
}

/// Strip one pair of surrounding double quotes and decode `\\`, `\"` and
/// `\n` escapes.
fn unquote(value: &str) -> Result<String, ErrorKind> {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .ok_or_else(|| ErrorKind::MalformedTag(format!("value must be quoted: {value}")))?;

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('n') => result.push('\n'),
                Some(other) => {
                    return Err(ErrorKind::MalformedTag(format!(
                        "invalid escape sequence \\{other} in {value}"
                    )));
                }
                None => {
                    return Err(ErrorKind::MalformedTag(format!(
                        "dangling backslash in {value}"
                    )));
                }
            },
            '"' => {
                return Err(ErrorKind::MalformedTag(format!(
                    "unescaped quote in {value}"
                )));
            }
            c => result.push(c),
        }
    }

    Ok(result)
}
