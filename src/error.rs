use crate::tokenizer::Token;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
    #[error("parser error:\n{}", render_diagnostics(.diagnostics))]
    Parser { diagnostics: Vec<ParseError> },
    #[error("runtime error: {message}")]
    Runtime { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A malformed construct: what the parser was looking for and the token it
/// got instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {}: expected {expected}, found {found}", .found.line)]
pub struct ParseError {
    pub expected: String,
    pub found: Token,
}

impl ParseError {
    pub fn new(expected: impl Into<String>, found: &Token) -> Self {
        Self {
            expected: expected.into(),
            found: found.clone(),
        }
    }
}

fn render_diagnostics(diagnostics: &[ParseError]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}
