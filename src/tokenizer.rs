use log::debug;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Illegal,
    EOF,

    Identifier,
    Integer,
    String,

    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftSquare,
    RightSquare,

    Comma,
    Colon,
    Semicolon,

    Equal,
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    Greater,
    Less,

    EqualEqual,
    BangEqual,

    Fn,
    Let,
    True,
    False,
    If,
    Else,
    Return,
}

impl Display for TokenType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenType::Illegal => "ILLEGAL",
            TokenType::EOF => "EOF",
            TokenType::Identifier => "IDENT",
            TokenType::Integer => "INT",
            TokenType::String => "STRING",
            TokenType::LeftParen => "(",
            TokenType::RightParen => ")",
            TokenType::LeftBrace => "{",
            TokenType::RightBrace => "}",
            TokenType::LeftSquare => "[",
            TokenType::RightSquare => "]",
            TokenType::Comma => ",",
            TokenType::Colon => ":",
            TokenType::Semicolon => ";",
            TokenType::Equal => "=",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Bang => "!",
            TokenType::Greater => ">",
            TokenType::Less => "<",
            TokenType::EqualEqual => "==",
            TokenType::BangEqual => "!=",
            TokenType::Fn => "fn",
            TokenType::Let => "let",
            TokenType::True => "true",
            TokenType::False => "false",
            TokenType::If => "if",
            TokenType::Else => "else",
            TokenType::Return => "return",
        };
        write!(f, "{}", text)
    }
}

/// Classifies a word as one of the reserved keywords, defaulting to an identifier.
pub fn lookup_ident(ident: &str) -> TokenType {
    match ident {
        "fn" => TokenType::Fn,
        "let" => TokenType::Let,
        "true" => TokenType::True,
        "false" => TokenType::False,
        "if" => TokenType::If,
        "else" => TokenType::Else,
        "return" => TokenType::Return,
        _ => TokenType::Identifier,
    }
}

/// A lexical unit: its category, the exact source text it was read from, and
/// the 1-based line it started on.
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, line: usize) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            line,
        }
    }
}

// Positions are diagnostic metadata only.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.token_type == other.token_type && self.literal == other.literal
    }
}

impl Eq for Token {}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::EOF => write!(f, "end of input"),
            TokenType::Identifier | TokenType::Integer | TokenType::Illegal => {
                write!(f, "{} '{}'", self.token_type, self.literal)
            }
            TokenType::String => write!(f, "STRING \"{}\"", self.literal),
            _ => write!(f, "'{}'", self.literal),
        }
    }
}

pub struct Lexer {
    chars: Vec<char>,
    cursor: usize,
    line: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            cursor: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.cursor + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '\n' => self.line += 1,
                ' ' | '\t' | '\r' => (),
                _ => break,
            }
            self.cursor += 1;
        }
    }

    /// Reads while `pred` holds, never crossing a line boundary.
    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.cursor;
        while let Some(c) = self.peek() {
            if c == '\n' || !pred(c) {
                break;
            }
            self.cursor += 1;
        }
        self.chars[start..self.cursor].iter().collect()
    }

    /// Consumes and returns the next token. Once the input is exhausted every
    /// further call returns EOF.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let line = self.line;

        let Some(c) = self.peek() else {
            return Token::new(TokenType::EOF, "", line);
        };

        let double = match (c, self.peek_next()) {
            ('=', Some('=')) => Some(TokenType::EqualEqual),
            ('!', Some('=')) => Some(TokenType::BangEqual),
            _ => None,
        };

        if let Some(token_type) = double {
            self.cursor += 2;
            return Token::new(token_type, token_type.to_string(), line);
        }

        let single = match c {
            '(' => Some(TokenType::LeftParen),
            ')' => Some(TokenType::RightParen),
            '{' => Some(TokenType::LeftBrace),
            '}' => Some(TokenType::RightBrace),
            '[' => Some(TokenType::LeftSquare),
            ']' => Some(TokenType::RightSquare),
            ',' => Some(TokenType::Comma),
            ':' => Some(TokenType::Colon),
            ';' => Some(TokenType::Semicolon),
            '=' => Some(TokenType::Equal),
            '+' => Some(TokenType::Plus),
            '-' => Some(TokenType::Minus),
            '*' => Some(TokenType::Star),
            '/' => Some(TokenType::Slash),
            '!' => Some(TokenType::Bang),
            '>' => Some(TokenType::Greater),
            '<' => Some(TokenType::Less),
            _ => None,
        };

        if let Some(token_type) = single {
            self.cursor += 1;
            return Token::new(token_type, c, line);
        }

        if c == '"' {
            self.cursor += 1;
            let content = self.read_while(|c| c != '"');

            if self.peek() == Some('"') {
                self.cursor += 1;
                return Token::new(TokenType::String, content, line);
            }

            debug!("unterminated string on line {}", line);
            return Token::new(TokenType::Illegal, format!("\"{}", content), line);
        }

        if c.is_ascii_digit() {
            let digits = self.read_while(|c| c.is_ascii_digit());
            return Token::new(TokenType::Integer, digits, line);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let word = self.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
            return Token::new(lookup_ident(&word), word, line);
        }

        debug!("illegal character {:?} on line {}", c, line);
        self.cursor += 1;
        Token::new(TokenType::Illegal, c, line)
    }
}

impl Iterator for Lexer {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token();
        (token.token_type != TokenType::EOF).then_some(token)
    }
}

/// Lexes all of `source`, including the terminating EOF token.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();

    loop {
        let token = lexer.next_token();
        let done = token.token_type == TokenType::EOF;
        tokens.push(token);

        if done {
            return tokens;
        }
    }
}
