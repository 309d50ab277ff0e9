//! Splits an input line into a command name and raw JSON value tokens.
//!
//! Two forms are accepted: whitespace separated values (`name v1 v2`) and
//! call syntax (`name(v1, v2)`). Values keep their exact source text so the
//! codec can decode them against the parameter types later.

use thiserror::Error;

/// Command name and the raw text of each value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedLine {
    pub(crate) command: String,
    pub(crate) values: Vec<String>,
}

/// Malformed input with its position, counted from one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line} column {column}")]
pub struct SyntaxError {
    message: String,
    line: usize,
    column: usize,
}

/// Outcomes other than a complete line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum TokenizeError {
    /// Input ended inside a value; more lines may complete it.
    #[error("input ends inside a value")]
    Incomplete,
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}

type Scan<T> = Result<T, TokenizeError>;

pub(crate) fn tokenize(input: &str) -> Result<ParsedLine, TokenizeError> {
    let mut cursor = Cursor::new(input);
    cursor.skip_whitespace();
    let command = cursor.identifier();
    cursor.skip_whitespace();
    let values = if cursor.peek() == Some('(') {
        cursor.bump();
        let values = cursor.call_arguments()?;
        cursor.skip_whitespace();
        if let Some(found) = cursor.peek() {
            return Err(cursor.syntax(format!("unexpected '{found}' after ')'")));
        }
        values
    } else {
        cursor.spaced_values()?
    };
    Ok(ParsedLine { command, values })
}

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let next = self.peek();
        if next.is_some() {
            self.pos += 1;
        }
        next
    }

    /// Consumes the next character or reports that the input ran out.
    fn next_or_incomplete(&mut self) -> Scan<char> {
        self.bump().ok_or(TokenizeError::Incomplete)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn text_from(&self, start: usize) -> String {
        self.chars.get(start..self.pos).unwrap_or_default().iter().collect()
    }

    fn syntax(&self, message: String) -> TokenizeError {
        let before = self.chars.get(..self.pos).unwrap_or_default();
        let line = before.iter().filter(|ch| **ch == '\n').count() + 1;
        let column = before.iter().rev().take_while(|ch| **ch != '\n').count() + 1;
        TokenizeError::Syntax(SyntaxError {
            message,
            line,
            column,
        })
    }

    fn unexpected(&self, found: char) -> TokenizeError {
        self.syntax(format!("unexpected '{found}'"))
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        if self.peek().is_some_and(is_identifier_start) {
            while self.peek().is_some_and(is_identifier_part) {
                self.pos += 1;
            }
        }
        self.text_from(start)
    }

    fn spaced_values(&mut self) -> Scan<Vec<String>> {
        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Ok(values);
            }
            values.push(self.value()?);
        }
    }

    fn call_arguments(&mut self) -> Scan<Vec<String>> {
        let mut values = Vec::new();
        loop {
            while self.peek().is_some_and(|ch| ch == ',' || ch.is_whitespace()) {
                self.pos += 1;
            }
            match self.peek() {
                None => return Err(TokenizeError::Incomplete),
                Some(')') => {
                    self.pos += 1;
                    return Ok(values);
                }
                Some(_) => values.push(self.value()?),
            }
        }
    }

    fn value(&mut self) -> Scan<String> {
        let start = self.pos;
        match self.peek() {
            None => return Err(TokenizeError::Incomplete),
            Some('"') => self.string()?,
            Some('{') => self.object()?,
            Some('[') => self.array()?,
            Some(ch) if ch == '-' || ch.is_ascii_digit() => self.number()?,
            Some(ch) if ch.is_alphabetic() => self.bare_word(),
            Some(found) => return Err(self.unexpected(found)),
        }
        Ok(self.text_from(start))
    }

    fn string(&mut self) -> Scan<()> {
        self.bump();
        loop {
            match self.next_or_incomplete()? {
                '"' => return Ok(()),
                '\\' => self.escape()?,
                _ => {}
            }
        }
    }

    fn escape(&mut self) -> Scan<()> {
        match self.next_or_incomplete()? {
            '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => Ok(()),
            'u' => {
                for _ in 0..4 {
                    let digit = self.next_or_incomplete()?;
                    if !digit.is_ascii_hexdigit() {
                        return Err(self.syntax(format!("invalid unicode escape digit '{digit}'")));
                    }
                }
                Ok(())
            }
            other => Err(self.syntax(format!("invalid escape '\\{other}'"))),
        }
    }

    fn object(&mut self) -> Scan<()> {
        self.bump();
        self.skip_whitespace();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(TokenizeError::Incomplete),
                Some('"') => self.string()?,
                Some(found) => return Err(self.syntax(format!("expected a key but found '{found}'"))),
            }
            self.skip_whitespace();
            match self.next_or_incomplete()? {
                ':' => {}
                found => return Err(self.syntax(format!("expected ':' but found '{found}'"))),
            }
            self.skip_whitespace();
            self.value()?;
            self.skip_whitespace();
            match self.next_or_incomplete()? {
                ',' => {}
                '}' => return Ok(()),
                found => {
                    return Err(self.syntax(format!("expected ',' or '}}' but found '{found}'")));
                }
            }
        }
    }

    fn array(&mut self) -> Scan<()> {
        self.bump();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(());
        }
        loop {
            self.skip_whitespace();
            self.value()?;
            self.skip_whitespace();
            match self.next_or_incomplete()? {
                ',' => {}
                ']' => return Ok(()),
                found => return Err(self.syntax(format!("expected ',' or ']' but found '{found}'"))),
            }
        }
    }

    fn number(&mut self) -> Scan<()> {
        if self.peek() == Some('-') {
            self.bump();
        }
        self.digits()?;
        if self.peek() == Some('.') {
            self.bump();
            self.digits()?;
        }
        if self.peek().is_some_and(|ch| ch == 'e' || ch == 'E') {
            self.bump();
            if self.peek().is_some_and(|ch| ch == '+' || ch == '-') {
                self.bump();
            }
            self.digits()?;
        }
        Ok(())
    }

    fn digits(&mut self) -> Scan<()> {
        match self.peek() {
            None => return Err(TokenizeError::Incomplete),
            Some(ch) if ch.is_ascii_digit() => {}
            Some(found) => return Err(self.syntax(format!("expected a digit but found '{found}'"))),
        }
        while self.peek().is_some_and(|ch| ch.is_ascii_digit()) {
            self.pos += 1;
        }
        Ok(())
    }

    /// Keywords, or a bare word the codec may still read as a string.
    fn bare_word(&mut self) {
        while self
            .peek()
            .is_some_and(|ch| !ch.is_whitespace() && !is_delimiter(ch))
        {
            self.pos += 1;
        }
    }
}

fn is_delimiter(ch: char) -> bool {
    matches!(ch, ',' | '(' | ')' | '[' | ']' | '{' | '}' | '"' | ':')
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    is_identifier_start(ch) || ch.is_ascii_digit()
}
