//! Hand-written scanner turning query text into tokens.

use super::{Keyword, LexErrorKind, Span, Token, TokenKind};

/// A lexer over query text.
pub struct Lexer<'a> {
    /// The input source text.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position where the current token started.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace, `-- …` line comments, and `/* … */` block
    /// comments.
    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    fn error_token(&self, kind: LexErrorKind) -> Token {
        self.make_token(TokenKind::Error(kind))
    }

    /// Scans an identifier or keyword.
    fn scan_word(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    /// Scans an integer or decimal literal.
    fn scan_number(&mut self) -> Token {
        let mut is_decimal = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_decimal = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            is_decimal = true;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.error_token(LexErrorKind::InvalidNumber);
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if is_decimal {
            match text.parse::<f64>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(_) => self.error_token(LexErrorKind::InvalidNumber),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(_) => self.error_token(LexErrorKind::InvalidNumber),
            }
        }
    }

    /// Scans a single-quoted string literal.
    ///
    /// Both `''` and backslash escapes are recognized. An unrecognized
    /// backslash sequence is kept verbatim, backslash included, so
    /// LIKE patterns such as `'100\%'` reach the matcher intact.
    fn scan_string(&mut self) -> Token {
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.peek() {
                Some('\'') => {
                    if self.peek_next() == Some('\'') {
                        value.push('\'');
                        self.advance();
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\'') => value.push('\''),
                        Some('\\') => value.push('\\'),
                        Some(c) => {
                            value.push('\\');
                            value.push(c);
                        }
                        None => return self.error_token(LexErrorKind::UnterminatedString),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => return self.error_token(LexErrorKind::UnterminatedString),
            }
        }

        self.advance(); // closing quote
        self.make_token(TokenKind::Str(value))
    }

    /// Scans a blob literal (`X'…'` with hex digit pairs).
    fn scan_blob(&mut self) -> Token {
        self.advance(); // X or x
        self.advance(); // opening quote

        let mut bytes = Vec::new();
        let mut pending = String::new();

        loop {
            match self.peek() {
                Some('\'') => break,
                Some(c) if c.is_ascii_hexdigit() => {
                    pending.push(c);
                    self.advance();
                    if pending.len() == 2 {
                        match u8::from_str_radix(&pending, 16) {
                            Ok(byte) => bytes.push(byte),
                            Err(_) => return self.error_token(LexErrorKind::InvalidBlob),
                        }
                        pending.clear();
                    }
                }
                Some(_) => return self.error_token(LexErrorKind::InvalidBlob),
                None => return self.error_token(LexErrorKind::UnterminatedString),
            }
        }

        self.advance(); // closing quote
        if !pending.is_empty() {
            return self.error_token(LexErrorKind::InvalidBlob);
        }
        self.make_token(TokenKind::Blob(bytes))
    }

    /// Scans the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '.' => self.single(TokenKind::Dot),
            '+' => self.single(TokenKind::Plus),
            '-' => self.single(TokenKind::Minus),
            '*' => self.single(TokenKind::Star),
            '/' => self.single(TokenKind::Slash),
            '%' => self.single(TokenKind::Percent),
            '=' => self.single(TokenKind::Eq),
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::LtEq)
                } else if self.peek() == Some('>') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.make_token(TokenKind::Lt)
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.error_token(LexErrorKind::UnexpectedChar('!'))
                }
            }
            '\'' => self.scan_string(),
            'X' | 'x' if self.peek_next() == Some('\'') => self.scan_blob(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => self.scan_word(),
            c => {
                self.advance();
                self.error_token(LexErrorKind::UnexpectedChar(c))
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.make_token(kind)
    }

    /// Tokenizes the entire input, ending with an EOF token.
    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("  \t\n "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_comments_are_discarded() {
        assert_eq!(
            kinds("SELECT -- trailing\n1"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("SELECT /* block\ncomment */ 1"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Integer(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("select Users _tmp"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier("Users".to_string()),
                TokenKind::Identifier("_tmp".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("7 3.25 1e3"),
            vec![
                TokenKind::Integer(7),
                TokenKind::Float(3.25),
                TokenKind::Float(1e3),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_integer_overflow_is_an_error_token() {
        let toks = kinds("99999999999999999999");
        assert_eq!(
            toks[0],
            TokenKind::Error(LexErrorKind::InvalidNumber),
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r"'it''s' 'a\'b' 'x\\y'"),
            vec![
                TokenKind::Str("it's".to_string()),
                TokenKind::Str("a'b".to_string()),
                TokenKind::Str(r"x\y".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_escape_keeps_backslash() {
        // LIKE escape sequences must survive the lexer.
        assert_eq!(
            kinds(r"'100\%'"),
            vec![TokenKind::Str(r"100\%".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let toks = Lexer::new("SELECT 'oops").tokenize();
        assert_eq!(
            toks[1].kind,
            TokenKind::Error(LexErrorKind::UnterminatedString)
        );
        // The error token carries the opening quote's position.
        assert_eq!(toks[1].span.start, 7);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= != <> < <= > >= + - * / %"),
            vec![
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blob_literal() {
        assert_eq!(
            kinds("X'CAFE'"),
            vec![TokenKind::Blob(vec![0xCA, 0xFE]), TokenKind::Eof]
        );
        assert_eq!(
            kinds("x'F'"),
            vec![TokenKind::Error(LexErrorKind::InvalidBlob), TokenKind::Eof]
        );
    }

    #[test]
    fn test_qualified_column_tokens() {
        assert_eq!(
            kinds("users.name"),
            vec![
                TokenKind::Identifier("users".to_string()),
                TokenKind::Dot,
                TokenKind::Identifier("name".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_full_statement() {
        assert_eq!(
            kinds("SELECT name FROM users WHERE age >= 30;"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Identifier("name".to_string()),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Identifier("users".to_string()),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Identifier("age".to_string()),
                TokenKind::GtEq,
                TokenKind::Integer(30),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }
}
