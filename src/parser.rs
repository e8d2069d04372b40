//! Loader for L-system description files.
//!
//! A description is a sequence of whitespace-separated keyword/value pairs:
//!
//! ```text
//! name 'Koch curve'
//! axiom F
//! rule F -> F+F--F+F
//! line-length 10
//! initial-angle 0
//! left-angle 60
//! right-angle -60
//! ```
//!
//! `name`, `axiom` and at least one `rule` are required. Numeric fields that are
//! absent are zero. Any error aborts the load; no partially-built definition is ever
//! returned.

use crate::generation::Generation;
use crate::grammar::{Grammar, GrammarError, Rule};
use crate::turtle::TurtleParams;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read L-system file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unexpected token '{token}' on line {line}")]
    UnexpectedToken { token: String, line: usize },
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("Expected '->' but got '{token}' on line {line}")]
    ExpectedArrow { token: String, line: usize },
    #[error("Expected a quoted string on line {line}")]
    ExpectedQuote { line: usize },
    #[error("Unterminated string starting on line {line}")]
    UnterminatedString { line: usize },
    #[error("Unexpected character '{ch}' in string on line {line}")]
    InvalidStringChar { ch: char, line: usize },
    #[error("Malformed number '{token}' for {field} on line {line}")]
    MalformedNumber {
        token: String,
        field: &'static str,
        line: usize,
    },
    #[error("Rule predecessor must be a single symbol, got '{token}' on line {line}")]
    InvalidPredecessor { token: String, line: usize },
    #[error("Symbols must be single-byte ASCII, got '{token}' on line {line}")]
    NonAsciiSymbol { token: String, line: usize },
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Everything a description file defines, validated and ready for production.
#[derive(Clone, Debug)]
pub struct LSystemDefinition {
    pub name: String,
    pub axiom: Generation,
    pub grammar: Grammar,
    pub params: TurtleParams,
}

/// Reads and parses the description at `path`.
pub fn parse_file(path: &Path) -> Result<LSystemDefinition, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content)
}

/// Parses a description from memory.
pub fn parse_str(src: &str) -> Result<LSystemDefinition, LoadError> {
    let mut scanner = Scanner::new(src);
    let mut name = None;
    let mut axiom = None;
    let mut rules = Vec::new();
    let mut params = TurtleParams::default();

    while let Some(keyword) = scanner.token() {
        let line = scanner.line();
        match keyword {
            "name" => name = Some(scanner.quoted()?.to_string()),
            "axiom" => {
                let token = scanner.expect_token("an axiom")?;
                axiom = Some(Generation::from(symbols(token, scanner.line())?));
            }
            "rule" => rules.push(parse_rule(&mut scanner)?),
            "line-length" => params.step_length = scanner.number("line-length", false)?,
            "initial-angle" => params.initial_angle = scanner.number("initial-angle", true)?,
            "left-angle" => params.left_angle = scanner.number("left-angle", true)?,
            "right-angle" => params.right_angle = scanner.number("right-angle", true)?,
            other => {
                return Err(LoadError::UnexpectedToken {
                    token: other.to_string(),
                    line,
                });
            }
        }
    }

    let name = name.ok_or(LoadError::MissingField("name"))?;
    let axiom = axiom.ok_or(LoadError::MissingField("axiom"))?;
    if rules.is_empty() {
        return Err(LoadError::MissingField("rule"));
    }
    let grammar = Grammar::new(rules)?;

    log::debug!(
        "Loaded L-system '{}': axiom of {} symbols, {} rule(s)",
        name,
        axiom.len(),
        grammar.len()
    );

    Ok(LSystemDefinition {
        name,
        axiom,
        grammar,
        params,
    })
}

fn parse_rule(scanner: &mut Scanner<'_>) -> Result<Rule, LoadError> {
    let pred = scanner.expect_token("a rule predecessor")?;
    let line = scanner.line();
    let pred = symbols(pred, line)?;
    if pred.len() != 1 {
        return Err(LoadError::InvalidPredecessor {
            token: String::from_utf8_lossy(pred).into_owned(),
            line,
        });
    }

    let arrow = scanner.expect_token("'->'")?;
    if arrow != "->" {
        return Err(LoadError::ExpectedArrow {
            token: arrow.to_string(),
            line: scanner.line(),
        });
    }

    let succ = scanner.expect_token("a rule successor")?;
    let succ = symbols(succ, scanner.line())?;
    Ok(Rule::new(pred[0], succ))
}

fn symbols(token: &str, line: usize) -> Result<&[u8], LoadError> {
    if token.is_ascii() {
        Ok(token.as_bytes())
    } else {
        Err(LoadError::NonAsciiSymbol {
            token: token.to_string(),
            line,
        })
    }
}

/// Whitespace-delimited cursor over the source text.
struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// 1-based line of the cursor.
    fn line(&self) -> usize {
        self.line
    }

    /// Newlines only ever appear in whitespace, so this is the one place the line advances.
    fn skip_ws(&mut self) {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start().len();
        self.line += rest[..skipped].matches('\n').count();
        self.pos += skipped;
    }

    fn token(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        if rest.is_empty() {
            return None;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.pos += end;
        Some(&rest[..end])
    }

    fn expect_token(&mut self, expected: &'static str) -> Result<&'a str, LoadError> {
        self.token().ok_or(LoadError::UnexpectedEof { expected })
    }

    /// A `'...'` string of alphanumerics and spaces.
    fn quoted(&mut self) -> Result<&'a str, LoadError> {
        self.skip_ws();
        let line = self.line();
        let rest = self.rest();
        let Some(body) = rest.strip_prefix('\'') else {
            return if rest.is_empty() {
                Err(LoadError::UnexpectedEof {
                    expected: "a quoted string",
                })
            } else {
                Err(LoadError::ExpectedQuote { line })
            };
        };

        for (i, ch) in body.char_indices() {
            if ch == '\'' {
                self.pos += 1 + i + 1;
                return Ok(&body[..i]);
            }
            if !ch.is_ascii_alphanumeric() && ch != ' ' {
                return Err(LoadError::InvalidStringChar { ch, line });
            }
        }
        Err(LoadError::UnterminatedString { line })
    }

    /// An optionally signed decimal; `real` allows a single `.`.
    fn number(&mut self, field: &'static str, real: bool) -> Result<f64, LoadError> {
        let token = self.expect_token("a number")?;
        let line = self.line();
        let malformed = || LoadError::MalformedNumber {
            token: token.to_string(),
            field,
            line,
        };

        let digits = token.strip_prefix(['+', '-']).unwrap_or(token);
        let dots = digits.matches('.').count();
        let well_formed = digits.chars().any(|c| c.is_ascii_digit())
            && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
            && dots <= usize::from(real);
        if !well_formed {
            return Err(malformed());
        }
        token.parse::<f64>().map_err(|_| malformed())
    }
}
