//! Condition Parser
//!
//! A condition is a flat list of `<expr> <comparator> <expr>` segments
//! joined by `Y` / `O`. There is no precedence and no grouping.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// A connective only splits when the next segment opens with `{{`.
static CONNECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s(Y|O)\s+\{\{").unwrap());

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let comparators = Comparator::ALL
        .iter()
        .flat_map(|c| c.keywords())
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(
        r#"\{{\{{\s*(?P<placeholder>.*?)\s*\}}\}}|(?P<literal>'[^']*'|"[^"]*"|-?\b\d+(?:\.\d+)?\b|\b(?:VERDADERO|FALSO)\b)|(?P<comparator>{comparators})"#
    );
    Regex::new(&pattern).unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    ChangedTo,
    ChangedIs,
    BlankIs,
    Contains,
    StartsWith,
    EndsWith,
}

impl Comparator {
    pub const ALL: [Comparator; 8] = [
        Comparator::Equal,
        Comparator::NotEqual,
        Comparator::ChangedTo,
        Comparator::ChangedIs,
        Comparator::BlankIs,
        Comparator::Contains,
        Comparator::StartsWith,
        Comparator::EndsWith,
    ];

    /// Accepted spellings, canonical first.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Comparator::Equal => &["ES IGUAL QUE"],
            Comparator::NotEqual => &["ES DIFERENTE DE", "NO ES IGUAL QUE"],
            Comparator::ChangedTo => &["CAMBIÓ A", "CAMBIO A"],
            Comparator::ChangedIs => &["CAMBIÓ ES", "CAMBIO ES"],
            Comparator::BlankIs => &["VACÍO ES", "VACIO ES"],
            Comparator::Contains => &["CONTIENE"],
            Comparator::StartsWith => &["EMPIEZA CON"],
            Comparator::EndsWith => &["TERMINA CON"],
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.keywords().contains(&keyword))
    }

    /// Comparators that look at the previous ticket snapshot.
    pub fn is_change_detection(&self) -> bool {
        matches!(self, Comparator::ChangedTo | Comparator::ChangedIs)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keywords()[0])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "Y" => Some(Connective::And),
            "O" => Some(Connective::Or),
            _ => None,
        }
    }
}

/// One atomic comparison. `connective` is `None` only for the first
/// operation of a condition; it joins this result to everything before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub left: String,
    pub comparator: Comparator,
    pub right: String,
    pub connective: Option<Connective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("Condition segment '{segment}' is not <expr> <comparator> <expr>")]
    MalformedSegment { segment: String },
}

enum Token<'a> {
    Expr(&'a str),
    Comparator(Comparator),
}

/// Parse the condition text of an `SI` / `SINO PERO` tag.
///
/// A leading block keyword is stripped if present. Blank text yields an
/// empty operation list.
pub fn parse_condition(text: &str) -> Result<Vec<Operation>, GrammarError> {
    let text = strip_block_keyword(text.trim());
    if text.is_empty() {
        return Ok(vec![]);
    }

    split_segments(text)
        .into_iter()
        .map(|(connective, segment)| parse_segment(segment, connective))
        .collect()
}

fn strip_block_keyword(text: &str) -> &str {
    for keyword in ["SINO PERO", "SI"] {
        if let Some(rest) = text.strip_prefix(keyword) {
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
    }
    text
}

fn split_segments(text: &str) -> Vec<(Option<Connective>, &str)> {
    let mut segments = vec![];
    let mut start = 0;
    let mut pending = None;

    for caps in CONNECTIVE_RE.captures_iter(text) {
        let (Some(whole), Some(keyword)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        segments.push((pending, &text[start..whole.start()]));
        pending = Connective::from_keyword(keyword.as_str());
        // next segment starts at its opening `{{`
        start = whole.end() - 2;
    }
    segments.push((pending, &text[start..]));
    segments
}

fn parse_segment(segment: &str, connective: Option<Connective>) -> Result<Operation, GrammarError> {
    let tokens: Vec<Token> = TOKEN_RE
        .captures_iter(segment)
        .filter_map(|caps| {
            if let Some(m) = caps.name("placeholder") {
                Some(Token::Expr(m.as_str()))
            } else if let Some(m) = caps.name("literal") {
                Some(Token::Expr(m.as_str()))
            } else {
                caps.name("comparator")
                    .and_then(|m| Comparator::from_keyword(m.as_str()))
                    .map(Token::Comparator)
            }
        })
        .collect();

    match tokens.as_slice() {
        [Token::Expr(left), Token::Comparator(comparator), Token::Expr(right)] => Ok(Operation {
            left: left.to_string(),
            comparator: *comparator,
            right: right.to_string(),
            connective,
        }),
        _ => Err(GrammarError::MalformedSegment {
            segment: segment.trim().to_string(),
        }),
    }
}
