//! Structured parse diagnostics.

use crate::lexer::{LexErrorKind, Span, TokenKind};

/// Machine-readable category of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorCode {
    /// A token appeared where a different construct was required.
    UnexpectedToken,
    /// A required token is absent (e.g. a closing parenthesis).
    MissingToken,
    /// The statement is structurally invalid.
    InvalidSyntax,
    /// A string literal was not closed.
    UnterminatedString,
    /// A numeric literal did not scan.
    InvalidNumber,
    /// Input ended in the middle of a statement.
    UnexpectedEnd,
    /// A CREATE TABLE declared more columns than a table may hold.
    TooManyColumns,
    /// A statement referenced a table that does not exist.
    ///
    /// Name resolution lives in the executor; the code is defined here
    /// so boundary consumers see one diagnostic vocabulary.
    TableNotFound,
}

impl ParseErrorCode {
    /// Returns the stable name of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnexpectedToken => "UNEXPECTED_TOKEN",
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidSyntax => "INVALID_SYNTAX",
            Self::UnterminatedString => "UNTERMINATED_STRING",
            Self::InvalidNumber => "INVALID_NUMBER",
            Self::UnexpectedEnd => "UNEXPECTED_END",
            Self::TooManyColumns => "TOO_MANY_COLUMNS",
            Self::TableNotFound => "TABLE_NOT_FOUND",
        }
    }
}

/// A parse failure with enough structure for a caller to render a
/// useful message without re-lexing the input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// The error category.
    pub code: ParseErrorCode,
    /// Human-readable description.
    pub message: String,
    /// What the parser was looking for, if applicable.
    pub expected: Option<String>,
    /// A description of the token actually found.
    pub found: Option<String>,
    /// Zero-based source line of the offending token.
    pub line: usize,
    /// Zero-based source column of the offending token.
    pub column: usize,
    /// Index of the offending token in the token vector.
    pub token_index: usize,
    /// An optional hint (e.g. a close keyword spelling).
    pub suggestion: Option<String>,
}

impl ParseError {
    /// Creates a diagnostic positioned at `span` within `source`.
    #[must_use]
    pub fn new(
        code: ParseErrorCode,
        message: impl Into<String>,
        source: &str,
        span: Span,
        token_index: usize,
    ) -> Self {
        let (line, column) = span.line_col(source);
        Self {
            code,
            message: message.into(),
            expected: None,
            found: None,
            line,
            column,
            token_index,
            suggestion: None,
        }
    }

    /// Attaches the expected construct.
    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Attaches the found token description.
    #[must_use]
    pub fn with_found(mut self, found: &TokenKind) -> Self {
        self.found = Some(found.describe());
        self
    }

    /// Attaches a hint.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Maps a lexer error token to the matching diagnostic code.
    #[must_use]
    pub const fn code_for_lex_error(kind: LexErrorKind) -> ParseErrorCode {
        match kind {
            LexErrorKind::UnterminatedString => ParseErrorCode::UnterminatedString,
            LexErrorKind::InvalidNumber => ParseErrorCode::InvalidNumber,
            LexErrorKind::InvalidBlob | LexErrorKind::UnexpectedChar(_) => {
                ParseErrorCode::InvalidSyntax
            }
        }
    }
}
