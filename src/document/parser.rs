//! Reader for the subset of Lua that mission documents are written in: a
//! sequence of `target = expression` statements whose expressions are
//! literals and table constructors.

use super::{DocumentError, Table, Value};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Number(f64),
    Str(String),
    Assign,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    Minus,
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Name(name) => format!("'{name}'"),
            Token::Number(n) => format!("number {n}"),
            Token::Str(_) => String::from("string"),
            Token::Assign => String::from("'='"),
            Token::LBrace => String::from("'{'"),
            Token::RBrace => String::from("'}'"),
            Token::LBracket => String::from("'['"),
            Token::RBracket => String::from("']'"),
            Token::Comma => String::from("','"),
            Token::Semi => String::from("';'"),
            Token::Dot => String::from("'.'"),
            Token::Minus => String::from("'-'"),
            Token::Eof => String::from("end of input"),
        }
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    line: usize,
    column: usize,
}

const RESERVED: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Where an assignment stores its value: a global name followed by any
/// number of table keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub root: String,
    pub keys: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Target,
    pub value: Value,
}

pub fn parse_chunk(source: &str) -> Result<Vec<Assignment>, DocumentError> {
    let mut parser = Parser::new(source)?;
    let mut statements = Vec::new();
    loop {
        match parser.peek() {
            Token::Eof => break,
            Token::Semi => {
                parser.next();
            }
            _ => statements.push(parser.assignment()?),
        }
    }
    Ok(statements)
}

/// Parses a standalone path expression such as `mission.weather["qnh"]`.
pub fn parse_target(source: &str) -> Result<Target, DocumentError> {
    let mut parser = Parser::new(source)?;
    let target = parser.target()?;
    parser.expect(Token::Eof)?;
    Ok(target)
}

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        let src = source.as_bytes();
        let pos = if src.starts_with(b"\xEF\xBB\xBF") { 3 } else { 0 };
        Self {
            src,
            pos,
            line: 1,
            column: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> DocumentError {
        DocumentError::Parse {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, DocumentError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let Some(byte) = self.peek() else {
                tokens.push(Spanned {
                    token: Token::Eof,
                    line,
                    column,
                });
                return Ok(tokens);
            };

            let token = match byte {
                b'=' => self.single(Token::Assign),
                b'{' => self.single(Token::LBrace),
                b'}' => self.single(Token::RBrace),
                b']' => self.single(Token::RBracket),
                b',' => self.single(Token::Comma),
                b';' => self.single(Token::Semi),
                b'-' => self.single(Token::Minus),
                b'[' => match self.long_bracket_level() {
                    Some(level) => Token::Str(self.long_string(level)?),
                    None => self.single(Token::LBracket),
                },
                b'.' if self.peek_at(1).is_some_and(|b| b.is_ascii_digit()) => {
                    Token::Number(self.number()?)
                }
                b'.' => self.single(Token::Dot),
                b'"' | b'\'' => Token::Str(self.quoted_string()?),
                b'0'..=b'9' => Token::Number(self.number()?),
                b if b == b'_' || b.is_ascii_alphabetic() => Token::Name(self.name()),
                other => {
                    return Err(self.error(format!("unexpected character '{}'", other as char)))
                }
            };
            tokens.push(Spanned {
                token,
                line,
                column,
            });
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn skip_trivia(&mut self) -> Result<(), DocumentError> {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | 0x0b | 0x0c) => {
                    self.bump();
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    self.bump();
                    self.bump();
                    if let Some(level) = self.long_bracket_level() {
                        self.long_string(level)?;
                    } else {
                        while !matches!(self.peek(), None | Some(b'\n')) {
                            self.bump();
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// At a `[`, returns the level of a long bracket opener (`[[`, `[==[`)
    /// if one starts here.
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    fn long_string(&mut self, level: usize) -> Result<String, DocumentError> {
        for _ in 0..level + 2 {
            self.bump();
        }
        // a newline right after the opener is not part of the string
        if self.peek() == Some(b'\r') {
            self.bump();
        }
        if self.peek() == Some(b'\n') {
            self.bump();
        }

        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unfinished long string")),
                Some(b']') => {
                    let closes = (1..=level).all(|i| self.peek_at(i) == Some(b'='))
                        && self.peek_at(level + 1) == Some(b']');
                    if closes {
                        let content = self.src[start..self.pos].to_vec();
                        for _ in 0..level + 2 {
                            self.bump();
                        }
                        return String::from_utf8(content)
                            .map_err(|_| self.error("string is not valid UTF-8"));
                    }
                    self.bump();
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn quoted_string(&mut self) -> Result<String, DocumentError> {
        let quote = self.bump();
        let mut buf = Vec::new();
        loop {
            match self.bump() {
                None | Some(b'\n' | b'\r') => return Err(self.error("unfinished string")),
                Some(b'\\') => self.escape(&mut buf)?,
                Some(byte) if Some(byte) == quote => break,
                Some(byte) => buf.push(byte),
            }
        }
        String::from_utf8(buf).map_err(|_| self.error("string is not valid UTF-8"))
    }

    fn escape(&mut self, buf: &mut Vec<u8>) -> Result<(), DocumentError> {
        match self.bump() {
            Some(b'n') => buf.push(b'\n'),
            Some(b't') => buf.push(b'\t'),
            Some(b'r') => buf.push(b'\r'),
            Some(b'a') => buf.push(0x07),
            Some(b'b') => buf.push(0x08),
            Some(b'f') => buf.push(0x0c),
            Some(b'v') => buf.push(0x0b),
            Some(b @ (b'\\' | b'"' | b'\'')) => buf.push(b),
            Some(b'\n') => {
                buf.push(b'\n');
                if self.peek() == Some(b'\r') {
                    self.bump();
                }
            }
            Some(b'\r') => {
                buf.push(b'\n');
                if self.peek() == Some(b'\n') {
                    self.bump();
                }
            }
            Some(b'x') => {
                let mut byte = 0u8;
                for _ in 0..2 {
                    let digit = self
                        .bump()
                        .and_then(|b| (b as char).to_digit(16))
                        .ok_or_else(|| self.error("hexadecimal digit expected"))?;
                    byte = byte * 16 + digit as u8;
                }
                buf.push(byte);
            }
            Some(b'z') => {
                while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
                    self.bump();
                }
            }
            Some(b'u') => {
                if self.bump() != Some(b'{') {
                    return Err(self.error("missing '{' in \\u{xxxx}"));
                }
                let mut code = 0u32;
                loop {
                    match self.bump() {
                        Some(b'}') => break,
                        Some(b) => {
                            let digit = (b as char)
                                .to_digit(16)
                                .ok_or_else(|| self.error("hexadecimal digit expected"))?;
                            code = code
                                .checked_mul(16)
                                .and_then(|c| c.checked_add(digit))
                                .ok_or_else(|| self.error("UTF-8 value too large"))?;
                        }
                        None => return Err(self.error("unfinished string")),
                    }
                }
                let ch = char::from_u32(code).ok_or_else(|| self.error("invalid code point"))?;
                let mut encoded = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut encoded).as_bytes());
            }
            Some(first @ b'0'..=b'9') => {
                let mut code = u32::from(first - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'9') => {
                            self.bump();
                            code = code * 10 + u32::from(d - b'0');
                        }
                        _ => break,
                    }
                }
                let byte = u8::try_from(code).map_err(|_| self.error("decimal escape too large"))?;
                buf.push(byte);
            }
            _ => return Err(self.error("invalid escape sequence")),
        }
        Ok(())
    }

    fn number(&mut self) -> Result<f64, DocumentError> {
        let start = self.pos;

        let value = if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = std::str::from_utf8(&self.src[digits_start..self.pos]).unwrap_or("");
            u64::from_str_radix(digits, 16)
                .map(|n| n as f64)
                .map_err(|_| self.error("malformed number"))?
        } else {
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.bump();
            }
            if self.peek() == Some(b'.') {
                self.bump();
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.bump();
                }
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                self.bump();
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.bump();
                }
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.bump();
                }
            }
            std::str::from_utf8(&self.src[start..self.pos])
                .ok()
                .and_then(|text| text.parse::<f64>().ok())
                .ok_or_else(|| self.error("malformed number"))?
        };

        if self
            .peek()
            .is_some_and(|b| b == b'_' || b == b'.' || b.is_ascii_alphanumeric())
        {
            return Err(self.error("malformed number"));
        }
        Ok(value)
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b == b'_' || b.is_ascii_alphanumeric())
        {
            self.bump();
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, DocumentError> {
        Ok(Self {
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
        })
    }

    fn current(&self) -> &Spanned {
        // the token stream always ends with Eof, which is never consumed
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn next(&mut self) -> Token {
        let token = self.current().token.clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> DocumentError {
        let Spanned { line, column, .. } = *self.current();
        DocumentError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), DocumentError> {
        if *self.peek() == expected {
            self.next();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {} near {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    fn name(&mut self) -> Result<String, DocumentError> {
        match self.peek() {
            Token::Name(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.next();
                Ok(name)
            }
            other => Err(self.error(format!("expected name near {}", other.describe()))),
        }
    }

    fn assignment(&mut self) -> Result<Assignment, DocumentError> {
        let target = self.target()?;
        self.expect(Token::Assign)?;
        let value = self.expression()?;
        Ok(Assignment { target, value })
    }

    fn target(&mut self) -> Result<Target, DocumentError> {
        let root = self.name()?;
        let mut keys = Vec::new();
        loop {
            match self.peek() {
                Token::Dot => {
                    self.next();
                    keys.push(Value::String(self.name()?));
                }
                Token::LBracket => {
                    self.next();
                    let key = self.key()?;
                    self.expect(Token::RBracket)?;
                    keys.push(key);
                }
                _ => return Ok(Target { root, keys }),
            }
        }
    }

    fn key(&mut self) -> Result<Value, DocumentError> {
        match self.expression()? {
            Value::Nil => Err(self.error("table index is nil")),
            Value::Number(n) if n.is_nan() => Err(self.error("table index is NaN")),
            key => Ok(key),
        }
    }

    fn expression(&mut self) -> Result<Value, DocumentError> {
        if *self.peek() == Token::LBrace {
            self.next();
            return self.table();
        }
        let value = match self.peek().clone() {
            Token::Name(name) => match name.as_str() {
                "nil" => Value::Nil,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return Err(self.error(format!("unsupported expression '{name}'"))),
            },
            Token::Number(n) => Value::Number(n),
            Token::Str(s) => Value::String(s),
            Token::Minus => {
                self.next();
                return match self.expression()? {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(self.error(format!(
                        "attempt to perform arithmetic on a {} value",
                        other.type_name()
                    ))),
                };
            }
            other => return Err(self.error(format!("unexpected {}", other.describe()))),
        };
        self.next();
        Ok(value)
    }

    fn table(&mut self) -> Result<Value, DocumentError> {
        let mut table = Table::new();
        let mut index = 1.0;
        loop {
            match self.peek() {
                Token::RBrace => {
                    self.next();
                    return Ok(Value::Table(table));
                }
                Token::LBracket => {
                    self.next();
                    let key = self.key()?;
                    self.expect(Token::RBracket)?;
                    self.expect(Token::Assign)?;
                    let value = self.expression()?;
                    table.set(key, value);
                }
                Token::Name(_) if *self.peek_at(1) == Token::Assign => {
                    let name = self.name()?;
                    self.next();
                    let value = self.expression()?;
                    table.set(Value::String(name), value);
                }
                _ => {
                    let value = self.expression()?;
                    table.set(Value::Number(index), value);
                    index += 1.0;
                }
            }

            match self.peek() {
                Token::Comma | Token::Semi => {
                    self.next();
                }
                Token::RBrace => {}
                other => {
                    return Err(self.error(format!("expected '}}' near {}", other.describe())))
                }
            }
        }
    }
}
