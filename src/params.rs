//! Parser for the `Parameters: {...}` payload.
//!
//! The payload is Ruby's `Hash#inspect` output, for example
//! `{"user" => {"name" => "Ann", "tags" => ["a", "b"]}, "page" => 2}` or
//! `{id: 1, :q => nil}`. Only that literal grammar is accepted: string and
//! symbol keys, `=>` and `key:` separators, nested hashes, arrays, strings,
//! numbers, symbols, `true`, `false` and `nil`. Anything else (object dumps
//! such as `#<ActionDispatch::Http::UploadedFile ...>`) is a parse error and
//! callers fall back to the raw text.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Deepest hash/array nesting accepted before the payload is rejected.
pub const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
    #[error("trailing input at offset {0}")]
    Trailing(usize),
    #[error("nesting deeper than {MAX_DEPTH} levels at offset {0}")]
    TooDeep(usize),
}

/// Parses a parameter payload into a JSON value.
pub fn parse_params(input: &str) -> Result<Value, ParamsError> {
    let mut parser = Parser {
        src: input,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos < input.len() {
        return Err(ParamsError::Trailing(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn unexpected(&self) -> ParamsError {
        match self.peek() {
            Some(found) => ParamsError::Unexpected {
                found,
                offset: self.pos,
            },
            None => ParamsError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParamsError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> Result<Value, ParamsError>,
    ) -> Result<Value, ParamsError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParamsError::TooDeep(self.pos));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn value(&mut self) -> Result<Value, ParamsError> {
        match self.peek() {
            Some('{') => self.nested(Self::hash),
            Some('[') => self.nested(Self::array),
            Some('"') => self.string().map(Value::String),
            Some(':') => self.symbol().map(Value::String),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.identifier();
                match word.as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "nil" => Ok(Value::Null),
                    _ => Err(ParamsError::Unexpected {
                        found: c,
                        offset: self.pos - word.len(),
                    }),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn hash(&mut self) -> Result<Value, ParamsError> {
        self.expect('{')?;
        let mut map = Map::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Object(map));
        }

        loop {
            self.skip_ws();
            let key = self.key()?;
            self.skip_ws();
            let value = self.value()?;
            map.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Object(map)),
                Some(found) => {
                    return Err(ParamsError::Unexpected {
                        found,
                        offset: self.pos - found.len_utf8(),
                    });
                }
                None => return Err(ParamsError::UnexpectedEnd),
            }
        }
    }

    /// Reads a key and its separator (`=>` or a trailing `:`).
    fn key(&mut self) -> Result<String, ParamsError> {
        let key = match self.peek() {
            Some('"') => self.string()?,
            Some(':') => self.symbol()?,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let word = self.identifier();
                if self.peek() == Some(':') {
                    self.bump();
                    return Ok(word);
                }
                word
            }
            Some(c) if c == '-' || c.is_ascii_digit() => self.number()?.to_string(),
            _ => return Err(self.unexpected()),
        };

        // Ruby 3.4 prints `"quoted-key": value` for symbols that need quoting.
        if self.peek() == Some(':') {
            self.bump();
            return Ok(key);
        }
        self.skip_ws();
        if self.rest().starts_with("=>") {
            self.pos += 2;
            Ok(key)
        } else {
            Err(self.unexpected())
        }
    }

    fn array(&mut self) -> Result<Value, ParamsError> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(']') {
            self.bump();
            return Ok(Value::Array(items));
        }

        loop {
            self.skip_ws();
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(Value::Array(items)),
                Some(found) => {
                    return Err(ParamsError::Unexpected {
                        found,
                        offset: self.pos - found.len_utf8(),
                    });
                }
                None => return Err(ParamsError::UnexpectedEnd),
            }
        }
    }

    fn string(&mut self) -> Result<String, ParamsError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump().ok_or(ParamsError::UnexpectedEnd)? {
                '"' => return Ok(out),
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Result<(), ParamsError> {
        let c = self.bump().ok_or(ParamsError::UnexpectedEnd)?;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'e' => out.push('\u{1b}'),
            's' => out.push(' '),
            '0' => out.push('\0'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.bump();
                    let hex = self.take_while(|c| c.is_ascii_hexdigit());
                    self.expect('}')?;
                    hex
                } else {
                    self.take_n_hex(4)
                };
                out.push(hex_char(&code).ok_or_else(|| self.unexpected())?);
            }
            'x' => {
                let code = self.take_n_hex(2);
                out.push(hex_char(&code).ok_or_else(|| self.unexpected())?);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn symbol(&mut self) -> Result<String, ParamsError> {
        self.expect(':')?;
        if self.peek() == Some('"') {
            return self.string();
        }
        let name = self.identifier();
        if name.is_empty() {
            return Err(self.unexpected());
        }
        Ok(name)
    }

    fn identifier(&mut self) -> String {
        let mut name = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if let Some(suffix @ ('?' | '!')) = self.peek() {
            self.bump();
            name.push(suffix);
        }
        name
    }

    fn number(&mut self) -> Result<Value, ParamsError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        self.take_while(|c| c.is_ascii_digit() || c == '_');
        let mut is_float = false;
        if self.peek() == Some('.') && self.rest()[1..].starts_with(|c: char| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            self.take_while(|c| c.is_ascii_digit());
        }

        let literal = self.src[start..self.pos].replace('_', "");
        let invalid = || ParamsError::InvalidNumber(literal.clone());
        if is_float {
            let parsed: f64 = literal.parse().map_err(|_| invalid())?;
            return Number::from_f64(parsed).map(Value::Number).ok_or_else(invalid);
        }
        if let Ok(int) = literal.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        if let Ok(int) = literal.parse::<u64>() {
            return Ok(Value::Number(int.into()));
        }
        let parsed: f64 = literal.parse().map_err(|_| invalid())?;
        Number::from_f64(parsed).map(Value::Number).ok_or_else(invalid)
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn take_n_hex(&mut self, n: usize) -> String {
        let mut out = String::new();
        while out.len() < n {
            match self.peek() {
                Some(c) if c.is_ascii_hexdigit() => {
                    out.push(c);
                    self.bump();
                }
                _ => break,
            }
        }
        out
    }
}

fn hex_char(hex: &str) -> Option<char> {
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}
