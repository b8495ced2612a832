//! Lua table literal parser
//!
//! KOReader stores book metadata as a Lua chunk returning a table literal.
//! Only the data subset is understood; anything executable is rejected.
//!
//! Grammar:
//! ```text
//! chunk  = "return" value
//! value  = "nil" | "true" | "false" | number | string | table | "-" number
//! table  = "{" [field {sep field} [sep]] "}"
//! field  = "[" value "]" "=" value | name "=" value | value
//! sep    = "," | ";"
//! string = '"' ... '"' | "'" ... "'" | "[" "="* "[" ... "]" "="* "]"
//! ```
//!
//! Comments (`-- line` and `--[[ block ]]`) may appear between tokens.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LuaParseError {
    #[error("Expected 'return' at position {0}")]
    ExpectedReturn(usize),

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("Invalid number '{0}' at position {1}")]
    InvalidNumber(String, usize),

    #[error("Invalid escape sequence at position {0}")]
    InvalidEscape(usize),

    #[error("Unclosed long bracket at position {0}")]
    UnclosedLongBracket(usize),

    #[error("Trailing input at position {0}")]
    TrailingInput(usize),
}

/// A Lua table key; integral numbers become `Index`
#[derive(Debug, Clone, PartialEq)]
pub enum LuaKey {
    Index(i64),
    Name(String),
    Bool(bool),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LuaValue {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Table(LuaTable),
}

impl LuaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            LuaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LuaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LuaValue::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            LuaValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&LuaTable> {
        match self {
            LuaValue::Table(t) => Some(t),
            _ => None,
        }
    }
}

/// Table entries in source order. Later duplicates shadow earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LuaTable {
    entries: Vec<(LuaKey, LuaValue)>,
}

impl LuaTable {
    pub fn get(&self, name: &str) -> Option<&LuaValue> {
        self.find(|key| matches!(key, LuaKey::Name(n) if n == name))
    }

    fn find(&self, matches: impl Fn(&LuaKey) -> bool) -> Option<&LuaValue> {
        self.entries
            .iter()
            .rev()
            .find(|(key, _)| matches(key))
            .map(|(_, value)| value)
            .filter(|value| **value != LuaValue::Nil)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(LuaValue::as_str)
    }

    pub fn table(&self, name: &str) -> Option<&LuaTable> {
        self.get(name).and_then(LuaValue::as_table)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LuaKey, &LuaValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Values of the integer keys in ascending order
    pub fn sequence(&self) -> Vec<(i64, &LuaValue)> {
        let mut items: Vec<(i64, &LuaValue)> = self
            .entries
            .iter()
            .rev()
            .filter_map(|(key, value)| match key {
                LuaKey::Index(i) => Some((*i, value)),
                _ => None,
            })
            .collect();
        items.sort_by_key(|(i, _)| *i);
        items.dedup_by_key(|(i, _)| *i);
        items
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a `return { ... }` chunk
pub fn parse_chunk(input: &str) -> Result<LuaValue, LuaParseError> {
    let mut parser = Parser::new(input);
    parser.skip_trivia()?;
    if !parser.skip_keyword("return") {
        return Err(LuaParseError::ExpectedReturn(parser.pos));
    }
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    parser.skip_if(';');
    parser.skip_trivia()?;
    if !parser.at_end() {
        return Err(LuaParseError::TrailingInput(parser.pos));
    }
    Ok(value)
}

/// Parse a bare value such as `{ a = 1 }`
pub fn parse_value(input: &str) -> Result<LuaValue, LuaParseError> {
    let mut parser = Parser::new(input);
    let value = parser.parse_value()?;
    parser.skip_trivia()?;
    if !parser.at_end() {
        return Err(LuaParseError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), LuaParseError> {
        self.skip_trivia()?;
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> LuaParseError {
        match self.peek() {
            Some(ch) => LuaParseError::UnexpectedChar(ch, self.pos),
            None => LuaParseError::UnexpectedEof,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Keyword followed by a non-identifier character
    fn skip_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.remaining();
        if !rest.starts_with(keyword) {
            return false;
        }
        let boundary = rest[keyword.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_name_char(c));
        if boundary {
            self.pos += keyword.len();
        }
        boundary
    }

    /// Whitespace and comments
    fn skip_trivia(&mut self) -> Result<(), LuaParseError> {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            if !self.remaining().starts_with("--") {
                return Ok(());
            }
            self.pos += 2;
            if let Some(level) = self.long_bracket_level() {
                self.read_long_bracket(level)?;
            } else {
                while let Some(ch) = self.advance() {
                    if ch == '\n' {
                        break;
                    }
                }
            }
        }
    }

    fn parse_value(&mut self) -> Result<LuaValue, LuaParseError> {
        self.skip_trivia()?;
        match self.peek() {
            None => Err(LuaParseError::UnexpectedEof),
            Some('{') => self.parse_table().map(LuaValue::Table),
            Some('"') | Some('\'') => self.parse_quoted().map(LuaValue::String),
            Some('[') => match self.long_bracket_level() {
                Some(level) => self.read_long_bracket(level).map(LuaValue::String),
                None => Err(self.unexpected()),
            },
            Some('-') => {
                self.advance();
                self.skip_trivia()?;
                match self.parse_value()? {
                    LuaValue::Number(n) => Ok(LuaValue::Number(-n)),
                    _ => Err(LuaParseError::InvalidNumber("-".to_string(), self.pos)),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number().map(LuaValue::Number),
            Some(_) => {
                if self.skip_keyword("nil") {
                    Ok(LuaValue::Nil)
                } else if self.skip_keyword("true") {
                    Ok(LuaValue::Bool(true))
                } else if self.skip_keyword("false") {
                    Ok(LuaValue::Bool(false))
                } else {
                    Err(self.unexpected())
                }
            }
        }
    }

    fn parse_table(&mut self) -> Result<LuaTable, LuaParseError> {
        self.expect('{')?;
        let mut table = LuaTable::default();
        let mut next_index = 1;

        loop {
            self.skip_trivia()?;
            if self.skip_if('}') {
                return Ok(table);
            }

            let (key, value) = if self.peek() == Some('[') && self.long_bracket_level().is_none() {
                self.advance();
                let key = self.parse_value()?;
                self.expect(']')?;
                self.expect('=')?;
                (to_key(key, self.pos)?, self.parse_value()?)
            } else if let Some(name) = self.peek_assignment() {
                self.pos += name.len();
                self.expect('=')?;
                (LuaKey::Name(name.to_string()), self.parse_value()?)
            } else {
                let key = LuaKey::Index(next_index);
                next_index += 1;
                (key, self.parse_value()?)
            };
            table.entries.push((key, value));

            self.skip_trivia()?;
            if self.skip_if(',') || self.skip_if(';') {
                continue;
            }
            if self.skip_if('}') {
                return Ok(table);
            }
            return Err(self.unexpected());
        }
    }

    /// Identifier at the cursor if it is followed by `=` (but not `==`)
    fn peek_assignment(&self) -> Option<&'a str> {
        let rest = self.remaining();
        let first = rest.chars().next()?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        let name = &rest[..len];
        let after = rest[len..].trim_start();
        if after.starts_with('=') && !after.starts_with("==") {
            Some(name)
        } else {
            None
        }
    }

    fn parse_number(&mut self) -> Result<f64, LuaParseError> {
        let start = self.pos;
        let rest = self.remaining();

        if rest.starts_with("0x") || rest.starts_with("0X") {
            let digits: String = rest[2..].chars().take_while(|c| c.is_ascii_hexdigit()).collect();
            self.pos += 2 + digits.len();
            return i64::from_str_radix(&digits, 16)
                .map(|n| n as f64)
                .map_err(|_| LuaParseError::InvalidNumber(digits, start));
        }

        let mut prev = '\0';
        while let Some(ch) = self.peek() {
            let exponent_sign = (ch == '-' || ch == '+') && (prev == 'e' || prev == 'E');
            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                prev = ch;
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map_err(|_| LuaParseError::InvalidNumber(text.to_string(), start))
    }

    fn parse_quoted(&mut self) -> Result<String, LuaParseError> {
        let quote = self.advance().ok_or(LuaParseError::UnexpectedEof)?;
        let mut value = String::new();

        loop {
            let ch = self.advance().ok_or(LuaParseError::UnexpectedEof)?;
            match ch {
                c if c == quote => return Ok(value),
                '\\' => self.parse_escape(&mut value)?,
                '\n' => return Err(LuaParseError::UnexpectedChar('\n', self.pos - 1)),
                c => value.push(c),
            }
        }
    }

    fn parse_escape(&mut self, value: &mut String) -> Result<(), LuaParseError> {
        let at = self.pos - 1;
        let ch = self.advance().ok_or(LuaParseError::UnexpectedEof)?;
        match ch {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'a' => value.push('\u{7}'),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'v' => value.push('\u{b}'),
            '\\' | '"' | '\'' => value.push(ch),
            '\n' => value.push('\n'),
            'z' => {
                while self.peek().is_some_and(char::is_whitespace) {
                    self.advance();
                }
            }
            'x' => {
                let hex: String = self.remaining().chars().take(2).collect();
                let byte = u8::from_str_radix(&hex, 16).map_err(|_| LuaParseError::InvalidEscape(at))?;
                self.pos += 2;
                value.push(char::from(byte));
            }
            d if d.is_ascii_digit() => {
                let mut code = d.to_digit(10).unwrap_or(0);
                for _ in 0..2 {
                    match self.peek().and_then(|c| c.to_digit(10)) {
                        Some(digit) => {
                            code = code * 10 + digit;
                            self.advance();
                        }
                        None => break,
                    }
                }
                let ch = char::from_u32(code).filter(|_| code <= 255).ok_or(LuaParseError::InvalidEscape(at))?;
                value.push(ch);
            }
            _ => return Err(LuaParseError::InvalidEscape(at)),
        }
        Ok(())
    }

    /// Level of a long bracket opening at the cursor (`[[` is 0, `[=[` is 1)
    fn long_bracket_level(&self) -> Option<usize> {
        let rest = self.remaining();
        let inner = rest.strip_prefix('[')?;
        let level = inner.chars().take_while(|&c| c == '=').count();
        (inner[level..].starts_with('[')).then_some(level)
    }

    fn read_long_bracket(&mut self, level: usize) -> Result<String, LuaParseError> {
        let start = self.pos;
        self.pos += level + 2;
        let close = format!("]{}]", "=".repeat(level));
        let rest = self.remaining();
        let end = rest.find(&close).ok_or(LuaParseError::UnclosedLongBracket(start))?;

        // A newline right after the opening bracket is not part of the string
        let body = &rest[..end];
        let body = body
            .strip_prefix("\r\n")
            .or_else(|| body.strip_prefix('\n'))
            .unwrap_or(body);
        let value = body.to_string();
        self.pos += end + close.len();
        Ok(value)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn to_key(value: LuaValue, pos: usize) -> Result<LuaKey, LuaParseError> {
    match value {
        LuaValue::Number(n) if n.fract() == 0.0 => Ok(LuaKey::Index(n as i64)),
        LuaValue::Number(n) => Ok(LuaKey::Number(n)),
        LuaValue::String(s) => Ok(LuaKey::Name(s)),
        LuaValue::Bool(b) => Ok(LuaKey::Bool(b)),
        LuaValue::Nil | LuaValue::Table(_) => Err(LuaParseError::UnexpectedChar(']', pos)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_value("nil"), Ok(LuaValue::Nil));
        assert_eq!(parse_value("true"), Ok(LuaValue::Bool(true)));
        assert_eq!(parse_value("false"), Ok(LuaValue::Bool(false)));
        assert_eq!(parse_value("42"), Ok(LuaValue::Number(42.0)));
        assert_eq!(parse_value("-3.5"), Ok(LuaValue::Number(-3.5)));
        assert_eq!(parse_value("1e3"), Ok(LuaValue::Number(1000.0)));
        assert_eq!(parse_value("0x1F"), Ok(LuaValue::Number(31.0)));
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(parse_value(r#""say \"hi\"\n""#), Ok(LuaValue::String("say \"hi\"\n".to_string())));
        assert_eq!(parse_value(r"'it\'s'"), Ok(LuaValue::String("it's".to_string())));
        assert_eq!(parse_value(r#""\65\066\x43""#), Ok(LuaValue::String("ABC".to_string())));
        assert_eq!(parse_value("[[\nline one\nline two]]"), Ok(LuaValue::String("line one\nline two".to_string())));
        assert_eq!(parse_value("[==[a]]b]==]"), Ok(LuaValue::String("a]]b".to_string())));
        assert_eq!(parse_value("\"Ünïcødé\""), Ok(LuaValue::String("Ünïcødé".to_string())));
    }

    #[test]
    fn test_parse_table_keys() {
        let value = parse_value(r#"{ "first", ["page"] = 12, [3] = "three", name = 'x'; "second", }"#).unwrap();
        let table = value.as_table().unwrap();

        let items: Vec<(i64, Option<&str>)> = table.sequence().into_iter().map(|(i, v)| (i, v.as_str())).collect();
        assert_eq!(items, vec![(1, Some("first")), (2, Some("second")), (3, Some("three"))]);
        assert_eq!(table.get("page").and_then(LuaValue::as_i64), Some(12));
        assert_eq!(table.str("name"), Some("x"));
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_parse_nested_tables_and_comments() {
        let input = r#"-- we can read Lua syntax here!
return {
    --[[ block
         comment ]]
    ["bookmarks"] = {
        [1] = {
            ["highlighted"] = true, -- trailing
            ["pos0"] = "/body/DocFragment[9]/body/p[3]/text().0",
        },
    },
    ["doc_props"] = {},
}
"#;
        let value = parse_chunk(input).unwrap();
        let root = value.as_table().unwrap();
        let bookmarks = root.table("bookmarks").unwrap().sequence();
        let bookmark = bookmarks[0].1.as_table().unwrap();

        assert_eq!(bookmark.get("highlighted").and_then(LuaValue::as_bool), Some(true));
        assert_eq!(bookmark.str("pos0"), Some("/body/DocFragment[9]/body/p[3]/text().0"));
        assert!(root.table("doc_props").unwrap().is_empty());
    }

    #[test]
    fn test_sequence_sorted_by_index() {
        let value = parse_value(r#"{ [3] = "c", [1] = "a", [2] = "b", x = 1 }"#).unwrap();
        let items: Vec<(i64, &str)> = value
            .as_table()
            .unwrap()
            .sequence()
            .into_iter()
            .map(|(i, v)| (i, v.as_str().unwrap()))
            .collect();
        assert_eq!(items, vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    #[test]
    fn test_nil_values_are_absent() {
        let value = parse_value("{ a = nil, b = 1 }").unwrap();
        let table = value.as_table().unwrap();
        assert!(table.get("a").is_none());
        assert!(table.get("b").is_some());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_chunk("{ }"), Err(LuaParseError::ExpectedReturn(0)));
        assert_eq!(parse_chunk("return"), Err(LuaParseError::UnexpectedEof));
        assert_eq!(parse_value("{ a = 1"), Err(LuaParseError::UnexpectedEof));
        assert!(matches!(parse_value("\"open"), Err(LuaParseError::UnexpectedEof)));
        assert!(matches!(parse_value("\"\\q\""), Err(LuaParseError::InvalidEscape(_))));
        assert!(matches!(parse_value("{ a = b }"), Err(LuaParseError::UnexpectedChar('b', _))));
        assert!(matches!(parse_value("[[never closed"), Err(LuaParseError::UnclosedLongBracket(0))));
        assert!(matches!(parse_chunk("return {} extra"), Err(LuaParseError::TrailingInput(_))));
        assert!(matches!(parse_value("os.exit()"), Err(LuaParseError::UnexpectedChar('o', 0))));
    }
}
