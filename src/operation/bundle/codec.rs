//! Reader and writer for `bundles.php` registration files.
//!
//! The writer always produces the canonical layout:
//!
//! ```text
//! <?php
//!
//! return [
//!     Acme\WidgetBundle::class => ['all' => true],
//! ];
//! ```
//!
//! The reader accepts what people write by hand on top of that: comments,
//! `array(...)`, quoted class names, a leading backslash, trailing commas
//! and a missing `return`.

use anyhow::{Result, bail};
use std::fmt::Write;

/// One registered bundle and the environments it is enabled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub class: String,
    pub environments: Vec<(String, bool)>,
}

/// An ordered bundle mapping, keyed by class name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bundles {
    entries: Vec<BundleEntry>,
}

impl Bundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        Parser { tokens, pos: 0 }.parse_file()
    }

    pub fn encode(&self) -> String {
        let mut out = String::from("<?php\n\nreturn [\n");
        for entry in &self.entries {
            let environments: Vec<String> = entry
                .environments
                .iter()
                .map(|(env, enabled)| format!("'{}' => {}", escape(env), enabled))
                .collect();
            // Writing to a String cannot fail
            let _ = writeln!(
                out,
                "    {}::class => [{}],",
                entry.class,
                environments.join(", ")
            );
        }
        out.push_str("];\n");
        out
    }

    /// Insert a bundle. An existing class keeps its position and gets the new environments.
    pub fn insert(&mut self, entry: BundleEntry) {
        match self.entries.iter_mut().find(|e| e.class == entry.class) {
            Some(existing) => existing.environments = entry.environments,
            None => self.entries.push(entry),
        }
    }

    /// Merge `other` into `self`, entries of `other` winning on conflict.
    pub fn merge(&mut self, other: &Bundles) {
        for entry in &other.entries {
            self.insert(entry.clone());
        }
    }

    /// Remove every class that `other` declares.
    pub fn remove_all(&mut self, other: &Bundles) {
        self.entries
            .retain(|entry| other.get(&entry.class).is_none());
    }

    pub fn get(&self, class: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|entry| entry.class == class)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn normalize_class(name: &str) -> String {
    name.trim_start_matches('\\').to_string()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    OpenTag,
    CloseTag,
    Ident(String),
    Str(String),
    LBracket,
    RBracket,
    LParen,
    RParen,
    Arrow,
    Comma,
    Semicolon,
    DoubleColon,
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'#' => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => match source[i + 2..].find("*/") {
                Some(end) => i += 2 + end + 2,
                None => bail!("Unterminated comment at offset {}", start),
            },
            b'<' if source[i..].starts_with("<?php") => {
                tokens.push((Token::OpenTag, start));
                i += 5;
            }
            b'?' if source[i..].starts_with("?>") => {
                tokens.push((Token::CloseTag, start));
                i += 2;
            }
            b'=' if bytes.get(i + 1) == Some(&b'>') => {
                tokens.push((Token::Arrow, start));
                i += 2;
            }
            b':' if bytes.get(i + 1) == Some(&b':') => {
                tokens.push((Token::DoubleColon, start));
                i += 2;
            }
            b'[' | b']' | b'(' | b')' | b',' | b';' => {
                let token = match c {
                    b'[' => Token::LBracket,
                    b']' => Token::RBracket,
                    b'(' => Token::LParen,
                    b')' => Token::RParen,
                    b',' => Token::Comma,
                    _ => Token::Semicolon,
                };
                tokens.push((token, start));
                i += 1;
            }
            b'\'' | b'"' => {
                let (value, next) = read_string(source, i)?;
                tokens.push((Token::Str(value), start));
                i = next;
            }
            c if c == b'\\' || c == b'_' || c.is_ascii_alphabetic() => {
                while i < bytes.len()
                    && (bytes[i] == b'\\' || bytes[i] == b'_' || bytes[i].is_ascii_alphanumeric())
                {
                    i += 1;
                }
                tokens.push((Token::Ident(source[start..i].to_string()), start));
            }
            _ => bail!(
                "Unexpected character '{}' at offset {}",
                source[i..].chars().next().unwrap_or_default(),
                start
            ),
        }
    }

    Ok(tokens)
}

fn skip_line(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

/// Read a quoted string starting at `start`, returning its value and the offset after it.
fn read_string(source: &str, start: usize) -> Result<(String, usize)> {
    let quote = source.as_bytes()[start] as char;
    let mut value = String::new();
    let mut chars = source[start + 1..].char_indices();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, next)) if next == quote || next == '\\' => value.push(next),
                Some((_, next)) => {
                    value.push('\\');
                    value.push(next);
                }
                None => break,
            },
            c if c == quote => return Ok((value, start + 1 + offset + 1)),
            c => value.push(c),
        }
    }
    bail!("Unterminated string at offset {}", start)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(name)) if name.eq_ignore_ascii_case(keyword))
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, offset)| *offset)
            .unwrap_or_else(|| self.tokens.last().map(|(_, o)| *o).unwrap_or(0))
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        let offset = self.offset();
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => bail!("Expected {} at offset {}, found {:?}", what, offset, token),
            None => bail!("Expected {} but reached the end of input", what),
        }
    }

    fn parse_file(mut self) -> Result<Bundles> {
        if self.peek() == Some(&Token::OpenTag) {
            self.pos += 1;
        }
        if self.peek_keyword("return") {
            self.pos += 1;
        }

        let mut bundles = Bundles::new();
        let close = self.open_array()?;
        while !self.at_array_end(&close) {
            let class = self.parse_class_key()?;
            self.expect(Token::Arrow, "'=>'")?;
            let environments = self.parse_environments()?;
            bundles.insert(BundleEntry {
                class,
                environments,
            });
            self.after_item(&close)?;
        }

        if self.peek() == Some(&Token::Semicolon) {
            self.pos += 1;
        }
        if self.peek() == Some(&Token::CloseTag) {
            self.pos += 1;
        }
        if let Some(token) = self.peek() {
            bail!(
                "Unexpected {:?} after the bundle list at offset {}",
                token,
                self.offset()
            );
        }
        Ok(bundles)
    }

    /// Consume `[` or `array(` and return the token that closes it.
    fn open_array(&mut self) -> Result<Token> {
        if self.peek_keyword("array") {
            self.pos += 1;
            self.expect(Token::LParen, "'('")?;
            return Ok(Token::RParen);
        }
        self.expect(Token::LBracket, "an array")?;
        Ok(Token::RBracket)
    }

    /// Consume the closing token if it comes next.
    fn at_array_end(&mut self, close: &Token) -> bool {
        if self.peek() == Some(close) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Consume the comma after an item. Trailing commas are accepted.
    fn after_item(&mut self, close: &Token) -> Result<()> {
        match self.peek() {
            Some(Token::Comma) => {
                self.pos += 1;
                Ok(())
            }
            Some(token) if token == close => Ok(()),
            Some(token) => bail!("Expected ',' at offset {}, found {:?}", self.offset(), token),
            None => bail!("Unterminated array"),
        }
    }

    fn parse_class_key(&mut self) -> Result<String> {
        let offset = self.offset();
        match self.next() {
            Some(Token::Str(name)) => Ok(normalize_class(&name)),
            Some(Token::Ident(name)) => {
                self.expect(Token::DoubleColon, "'::class'")?;
                if !self.peek_keyword("class") {
                    bail!("Expected '::class' at offset {}", self.offset());
                }
                self.pos += 1;
                Ok(normalize_class(&name))
            }
            Some(token) => bail!("Expected a bundle class at offset {}, found {:?}", offset, token),
            None => bail!("Expected a bundle class but reached the end of input"),
        }
    }

    fn parse_environments(&mut self) -> Result<Vec<(String, bool)>> {
        let close = self.open_array()?;
        let mut environments: Vec<(String, bool)> = Vec::new();

        while !self.at_array_end(&close) {
            let offset = self.offset();
            let env = match self.next() {
                Some(Token::Str(env)) => env,
                Some(token) => bail!(
                    "Expected an environment name at offset {}, found {:?}",
                    offset,
                    token
                ),
                None => bail!("Unterminated environment list"),
            };
            self.expect(Token::Arrow, "'=>'")?;
            let offset = self.offset();
            let enabled = match self.next() {
                Some(Token::Ident(value)) if value.eq_ignore_ascii_case("true") => true,
                Some(Token::Ident(value)) if value.eq_ignore_ascii_case("false") => false,
                Some(token) => bail!(
                    "Expected true or false at offset {}, found {:?}",
                    offset,
                    token
                ),
                None => bail!("Unterminated environment list"),
            };
            match environments.iter_mut().find(|(name, _)| *name == env) {
                Some(existing) => existing.1 = enabled,
                None => environments.push((env, enabled)),
            }
            self.after_item(&close)?;
        }

        Ok(environments)
    }
}
