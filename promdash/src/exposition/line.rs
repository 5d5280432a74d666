//! Line splitting and classification.

use super::ErrorKind;
use crate::metric::MetricType;

const HELP: &str = "# HELP";
const TYPE: &str = "# TYPE";

/// Iterator over the lines of a payload, numbered from 1.
///
/// `\n`, `\r\n` and a bare `\r` each terminate a line.
#[derive(Debug, Clone)]
pub(crate) struct Lines<'a> {
    rest: Option<&'a str>,
    number: usize,
}

pub(crate) fn lines(text: &str) -> Lines<'_> {
    Lines {
        rest: Some(text),
        number: 0,
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        self.number += 1;

        match rest.find(['\r', '\n']) {
            Some(idx) => {
                let skip = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                self.rest = Some(&rest[idx + skip..]);
                Some((self.number, &rest[..idx]))
            }
            None => {
                self.rest = None;
                Some((self.number, rest))
            }
        }
    }
}

/// A classified line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Line<'a> {
    /// Empty or whitespace only.
    Blank,
    /// A `#` line that is neither HELP nor TYPE.
    Comment,
    /// `# HELP <name> <text>`
    Help { name: &'a str, text: &'a str },
    /// `# TYPE <name> <type>`
    Type {
        name: &'a str,
        metric_type: MetricType,
    },
    /// Anything else, handed to the sample tokenizer as is.
    Sample(&'a str),
}

/// Split the body of a metadata line into the metric name and the payload
/// following it. The payload may be empty but the separating whitespace may
/// not.
fn metadata<'a>(keyword: &str, body: &'a str) -> Result<(&'a str, &'a str), ErrorKind> {
    let body = body.trim_start();
    if body.is_empty() {
        return Err(ErrorKind::MalformedMetadataLine(format!(
            "{keyword} line without name"
        )));
    }
    let (name, rest) = body.split_once(char::is_whitespace).ok_or_else(|| {
        ErrorKind::MalformedMetadataLine(format!("{keyword} {body} has nothing after the name"))
    })?;
    Ok((name, rest.trim()))
}

/// Whether `body`, what follows `# HELP` or `# TYPE`, makes this a metadata
/// line rather than a comment such as `# HELPER`.
fn is_metadata(body: &str) -> bool {
    body.is_empty() || body.starts_with(char::is_whitespace)
}

/// Classify one line of a payload.
pub(crate) fn classify(line: &str) -> Result<Line<'_>, ErrorKind> {
    // The trailing end is kept so an empty HELP text still has its separator.
    let line = line.trim_start();

    if line.trim_end().is_empty() {
        return Ok(Line::Blank);
    }

    if let Some(body) = line.strip_prefix(HELP).filter(|b| is_metadata(b)) {
        let (name, text) = metadata(HELP, body)?;
        return Ok(Line::Help { name, text });
    }

    if let Some(body) = line.strip_prefix(TYPE).filter(|b| is_metadata(b)) {
        let (name, word) = metadata(TYPE, body)?;
        if word.is_empty() {
            return Err(ErrorKind::MalformedMetadataLine(format!(
                "{TYPE} {name} has no type"
            )));
        }
        let metric_type = word.parse::<MetricType>()?;
        return Ok(Line::Type { name, metric_type });
    }

    if line.starts_with('#') {
        return Ok(Line::Comment);
    }

    Ok(Line::Sample(line.trim_end()))
}
