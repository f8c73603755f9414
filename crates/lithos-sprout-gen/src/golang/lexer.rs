// SPDX-License-Identifier: Apache-2.0 OR MIT
use crate::error::ExtractError;

/// Byte range of a token plus the lines it starts and ends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// Interpreted or raw string literal, quotes included.
    String(String),
    /// Number or rune literal.
    Literal(String),
    /// `// text`, marker and one following space removed.
    LineComment(String),
    /// `/* text */`, markers removed.
    BlockComment(String),
    Ellipsis,
    Punct(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LineComment(_) | TokenKind::BlockComment(_)
        )
    }

    pub fn is_punct(&self, expected: char) -> bool {
        self.kind == TokenKind::Punct(expected)
    }

    pub fn is_ident(&self, expected: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(name) if name == expected)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::String(text) | TokenKind::Literal(text) => text.clone(),
            TokenKind::LineComment(_) | TokenKind::BlockComment(_) => "comment".to_string(),
            TokenKind::Ellipsis => "`...`".to_string(),
            TokenKind::Punct(c) => format!("`{c}`"),
        }
    }
}

/// Splits Go source into tokens, comments included.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExtractError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let chr = self.peek_char()?;
        self.pos += chr.len_utf8();
        if chr == '\n' {
            self.line += 1;
        }
        Some(chr)
    }

    fn bump_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while let Some(chr) = self.peek_char() {
            if !predicate(chr) {
                break;
            }
            self.bump_char();
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ExtractError> {
        self.bump_while(char::is_whitespace);

        let start = self.pos;
        let line = self.line;
        let Some(chr) = self.bump_char() else {
            return Ok(None);
        };

        let kind = match chr {
            '/' if self.peek_char() == Some('/') => {
                self.bump_while(|c| c != '\n');
                let text = self.source[start + 2..self.pos].trim_end_matches('\r');
                TokenKind::LineComment(text.strip_prefix(' ').unwrap_or(text).to_string())
            }
            '/' if self.peek_char() == Some('*') => {
                self.bump_char();
                let body_start = self.pos;
                loop {
                    match self.bump_char() {
                        Some('*') if self.peek_char() == Some('/') => {
                            self.bump_char();
                            break;
                        }
                        Some(_) => {}
                        None => {
                            return Err(ExtractError::Unterminated {
                                what: "comment",
                                line,
                            })
                        }
                    }
                }
                TokenKind::BlockComment(self.source[body_start..self.pos - 2].to_string())
            }
            '"' => {
                self.quoted('"', "string", line)?;
                TokenKind::String(self.source[start..self.pos].to_string())
            }
            '\'' => {
                self.quoted('\'', "rune literal", line)?;
                TokenKind::Literal(self.source[start..self.pos].to_string())
            }
            '`' => {
                self.bump_while(|c| c != '`');
                if self.bump_char().is_none() {
                    return Err(ExtractError::Unterminated {
                        what: "raw string",
                        line,
                    });
                }
                TokenKind::String(self.source[start..self.pos].to_string())
            }
            '.' if self.peek_char() == Some('.') && self.peek_second() == Some('.') => {
                self.bump_char();
                self.bump_char();
                TokenKind::Ellipsis
            }
            c if c.is_ascii_digit()
                || (c == '.' && self.peek_char().is_some_and(|n| n.is_ascii_digit())) =>
            {
                let mut previous = c;
                self.bump_while(|c| {
                    let accept = c.is_ascii_alphanumeric()
                        || c == '.'
                        || c == '_'
                        || (matches!(c, '+' | '-') && matches!(previous, 'e' | 'E' | 'p' | 'P'));
                    previous = c;
                    accept
                });
                TokenKind::Literal(self.source[start..self.pos].to_string())
            }
            c if c.is_alphabetic() || c == '_' => {
                self.bump_while(|c| c.is_alphanumeric() || c == '_');
                TokenKind::Ident(self.source[start..self.pos].to_string())
            }
            other => TokenKind::Punct(other),
        };

        Ok(Some(Token {
            kind,
            span: Span {
                start,
                end: self.pos,
                line,
                end_line: self.line,
            },
        }))
    }

    fn quoted(&mut self, quote: char, what: &'static str, line: usize) -> Result<(), ExtractError> {
        loop {
            match self.bump_char() {
                Some('\\') => {
                    self.bump_char();
                }
                Some(c) if c == quote => return Ok(()),
                Some('\n') | None => return Err(ExtractError::Unterminated { what, line }),
                Some(_) => {}
            }
        }
    }
}
