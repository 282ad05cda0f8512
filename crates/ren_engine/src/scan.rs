//! Source scanner.
//!
//! Turns UTF-8 text into a tree of [`Item`]s without touching the heap. The
//! loader (`Engine::load`) materializes items into cells and binds words.
//!
//! Lexical forms:
//! - numbers: `12`, `-3`, `+4`, `1.5`, `2e10`
//! - text: `"quoted ^"escapes^""`, `{braced {nested} text}`
//! - chars: `#"a"`, `#"^/"`
//! - construction: `#[true]`, `#[false]`, `#[none]`, `#[void]`
//! - words: `x`, `x:`, `:x`, `'x`, `/x`, paths `a/b/1`, `_` (blank)
//! - series: `[...]` blocks, `(...)` groups
//! - `;` comments to end of line

use std::iter::Peekable;
use std::str::Chars;

use ren_cell::Kind;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Blank,
    Void,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    Char(char),
    Datatype(Kind),
    Text(String),
    /// A word of the given word kind and spelling.
    Word(Kind, String),
    Path(Vec<Item>),
    Block(Vec<Item>),
    Group(Vec<Item>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub token: Token,
    /// A line break preceded this item.
    pub newline_before: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

/// Scan a whole source fragment into top-level items.
pub fn scan(source: &str) -> Result<Vec<Item>, ScanError> {
    let mut scanner = Scanner {
        chars: source.chars().peekable(),
        line: 1,
    };
    scanner.series(None)
}

struct Scanner<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | '"' | '{' | '}' | ';')
}

impl Scanner<'_> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ScanError> {
        Err(ScanError {
            line: self.line,
            message: message.into(),
        })
    }

    /// Skip whitespace and comments; report whether a newline was crossed.
    fn skip_space(&mut self) -> bool {
        let mut newline = false;
        while let Some(c) = self.peek() {
            if c == ';' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else if c.is_whitespace() {
                newline |= c == '\n';
                self.bump();
            } else {
                break;
            }
        }
        newline
    }

    fn series(&mut self, close: Option<char>) -> Result<Vec<Item>, ScanError> {
        let mut items = Vec::new();
        let mut newline = false;
        loop {
            newline |= self.skip_space();
            match self.peek() {
                None => {
                    return match close {
                        None => Ok(items),
                        Some(c) => self.error(format!("missing {c}")),
                    };
                }
                Some(c) if Some(c) == close => {
                    self.bump();
                    return Ok(items);
                }
                Some(c @ (']' | ')' | '}')) => return self.error(format!("unexpected {c}")),
                Some(_) => {
                    let token = self.value()?;
                    items.push(Item {
                        token,
                        newline_before: newline,
                    });
                    newline = false;
                }
            }
        }
    }

    fn value(&mut self) -> Result<Token, ScanError> {
        match self.peek() {
            Some('[') => {
                self.bump();
                Ok(Token::Block(self.series(Some(']'))?))
            }
            Some('(') => {
                self.bump();
                Ok(Token::Group(self.series(Some(')'))?))
            }
            Some('"') => {
                self.bump();
                self.quoted_text()
            }
            Some('{') => {
                self.bump();
                self.braced_text()
            }
            Some('#') => {
                self.bump();
                self.hash()
            }
            _ => {
                let mut lexeme = String::new();
                while let Some(c) = self.peek().filter(|&c| !is_delimiter(c)) {
                    lexeme.push(c);
                    self.bump();
                }
                self.classify(&lexeme)
            }
        }
    }

    fn escape(&mut self) -> Result<char, ScanError> {
        match self.bump() {
            Some('"') => Ok('"'),
            Some('^') => Ok('^'),
            Some('/') => Ok('\n'),
            Some('-') => Ok('\t'),
            Some('{') => Ok('{'),
            Some('}') => Ok('}'),
            Some(c) => self.error(format!("invalid escape ^{c}")),
            None => self.error("unterminated escape"),
        }
    }

    fn quoted_text(&mut self) -> Result<Token, ScanError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(Token::Text(text)),
                Some('^') => text.push(self.escape()?),
                Some('\n') | None => return self.error("missing \" in text"),
                Some(c) => text.push(c),
            }
        }
    }

    fn braced_text(&mut self) -> Result<Token, ScanError> {
        let mut text = String::new();
        let mut depth = 1usize;
        loop {
            match self.bump() {
                Some('{') => {
                    depth += 1;
                    text.push('{');
                }
                Some('}') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Token::Text(text));
                    }
                    text.push('}');
                }
                Some('^') => text.push(self.escape()?),
                Some(c) => text.push(c),
                None => return self.error("missing } in text"),
            }
        }
    }

    fn hash(&mut self) -> Result<Token, ScanError> {
        match self.bump() {
            Some('"') => {
                let c = match self.bump() {
                    Some('^') => self.escape()?,
                    Some('"') | None => return self.error("empty char"),
                    Some(c) => c,
                };
                if self.bump() != Some('"') {
                    return self.error("char must hold exactly one character");
                }
                Ok(Token::Char(c))
            }
            Some('[') => {
                let mut name = String::new();
                loop {
                    match self.bump() {
                        Some(']') => break,
                        Some(c) => name.push(c),
                        None => return self.error("missing ] in construction"),
                    }
                }
                let name = name.trim();
                if let Some(spelling) = name.strip_prefix("datatype!") {
                    return match Kind::from_name(spelling.trim()) {
                        Some(kind) => Ok(Token::Datatype(kind)),
                        None => self.error(format!("unknown datatype #[{name}]")),
                    };
                }
                match name {
                    "true" => Ok(Token::Logic(true)),
                    "false" => Ok(Token::Logic(false)),
                    "none" => Ok(Token::Blank),
                    "void" => Ok(Token::Void),
                    other => self.error(format!("unknown construction #[{other}]")),
                }
            }
            _ => self.error("invalid # syntax"),
        }
    }

    fn classify(&self, lexeme: &str) -> Result<Token, ScanError> {
        if starts_number(lexeme) {
            return self.number(lexeme);
        }
        if lexeme == "_" {
            return Ok(Token::Blank);
        }
        if let Some(rest) = lexeme.strip_prefix('/') {
            if rest.is_empty() || rest.chars().all(|c| c == '/') {
                return Ok(Token::Word(Kind::Word, lexeme.to_string()));
            }
            return self.word(Kind::Refinement, rest);
        }
        if lexeme.contains('/') {
            return self.path(lexeme);
        }
        if let Some(rest) = lexeme.strip_prefix(':') {
            return self.word(Kind::GetWord, rest);
        }
        if let Some(rest) = lexeme.strip_prefix('\'') {
            return self.word(Kind::LitWord, rest);
        }
        if let Some(head) = lexeme.strip_suffix(':') {
            return self.word(Kind::SetWord, head);
        }
        self.word(Kind::Word, lexeme)
    }

    fn word(&self, kind: Kind, spelling: &str) -> Result<Token, ScanError> {
        let valid = spelling
            .chars()
            .next()
            .is_some_and(|c| !c.is_ascii_digit() && c != '\'' && c != ':')
            && !spelling.contains(':')
            && !spelling.contains('/');
        if !valid {
            return self.error(format!("invalid word {spelling:?}"));
        }
        Ok(Token::Word(kind, spelling.to_string()))
    }

    fn number(&self, lexeme: &str) -> Result<Token, ScanError> {
        let is_decimal = lexeme.contains(['.', 'e', 'E']);
        let parsed = if is_decimal {
            lexeme.parse::<f64>().ok().filter(|d| d.is_finite()).map(Token::Decimal)
        } else {
            lexeme.parse::<i64>().ok().map(Token::Integer)
        };
        match parsed {
            Some(token) => Ok(token),
            None => self.error(format!("invalid number {lexeme}")),
        }
    }

    fn path(&self, lexeme: &str) -> Result<Token, ScanError> {
        let mut elements = Vec::new();
        for part in lexeme.split('/') {
            let token = if part.is_empty() {
                return self.error(format!("invalid path {lexeme}"));
            } else if part.starts_with(|c: char| c.is_ascii_digit()) {
                self.number(part)?
            } else {
                self.word(Kind::Word, part)?
            };
            if matches!(token, Token::Decimal(_)) {
                return self.error(format!("invalid path {lexeme}"));
            }
            elements.push(Item {
                token,
                newline_before: false,
            });
        }
        Ok(Token::Path(elements))
    }
}

fn starts_number(lexeme: &str) -> bool {
    let mut chars = lexeme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

#[cfg(test)]
mod tests;
