use nu_ansi_term::{Color, Style};
use reedline::{
    Highlighter, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    StyledText, ValidationResult, Validator,
};
use std::borrow::Cow;

use crate::tokenizer::{Lexer, Token, TokenType};

#[derive(Clone)]
pub struct REPLPrompt;

impl Prompt for REPLPrompt {
    fn render_prompt_left(&self) -> Cow<str> {
        Cow::Borrowed("rmonkey")
    }

    fn render_prompt_right(&self) -> Cow<str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<str> {
        Cow::Borrowed(" >> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<str> {
        Cow::Borrowed("  ... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse-search: {}) ",
            prefix, history_search.term
        ))
    }
}

/// Keeps reading lines while a `(`, `[` or `{` is left open.
pub struct REPLValidator;

impl Validator for REPLValidator {
    fn validate(&self, line: &str) -> ValidationResult {
        if line.trim_end().is_empty() {
            return ValidationResult::Complete;
        }

        let mut delimiters = Vec::new();
        let mut in_string = false;

        for c in line.chars() {
            match c {
                // Strings end at the closing quote or the end of the line.
                '"' => in_string = !in_string,
                '\n' => in_string = false,
                _ if in_string => continue,

                '{' | '(' | '[' => delimiters.push(c),
                '}' | ')' | ']' => {
                    let open = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    // A stray closer will never balance; let the parser report it.
                    if delimiters.pop() != Some(open) {
                        return ValidationResult::Complete;
                    }
                }
                _ => (),
            }
        }

        if delimiters.is_empty() {
            ValidationResult::Complete
        } else {
            ValidationResult::Incomplete
        }
    }
}

pub static KEYWORD_COLOR: Color = Color::LightBlue;
pub static LITERAL_COLOR: Color = Color::Yellow;
pub static DEFAULT_COLOR: Color = Color::White;
pub static OPERATOR_COLOR: Color = Color::DarkGray;
pub static ILLEGAL_COLOR: Color = Color::Red;

fn token_color(token: &Token) -> Color {
    match token.token_type {
        TokenType::Fn
        | TokenType::Let
        | TokenType::If
        | TokenType::Else
        | TokenType::Return
        | TokenType::True
        | TokenType::False => KEYWORD_COLOR,
        TokenType::Integer | TokenType::String => LITERAL_COLOR,
        TokenType::Identifier | TokenType::EOF => DEFAULT_COLOR,
        TokenType::Illegal => ILLEGAL_COLOR,
        _ => OPERATOR_COLOR,
    }
}

// Source text of a token as it appears in the line.
fn token_text(token: &Token) -> String {
    match token.token_type {
        TokenType::String => format!("\"{}\"", token.literal),
        _ => token.literal.clone(),
    }
}

pub struct SyntaxHighlighter;

impl Highlighter for SyntaxHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled_text = StyledText::new();
        let mut remaining = line;

        for token in Lexer::new(line) {
            let text = token_text(&token);

            if let Some(pos) = remaining.find(&text) {
                if pos > 0 {
                    styled_text
                        .push((Style::new().fg(DEFAULT_COLOR), remaining[..pos].to_string()));
                }

                styled_text.push((Style::new().fg(token_color(&token)), text.clone()));
                remaining = &remaining[pos + text.len()..];
            }
        }

        if !remaining.is_empty() {
            styled_text.push((Style::new().fg(DEFAULT_COLOR), remaining.to_string()));
        }

        styled_text
    }
}
