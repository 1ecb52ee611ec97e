//! Operator binding powers for Pratt expression parsing.

use crate::ast::{BinaryOp, UnaryOp};
use crate::lexer::{Keyword, TokenKind};

/// Returns the infix binding power of a token.
///
/// `(left_bp, right_bp)` with `left_bp < right_bp` for
/// left-associative operators; higher numbers bind tighter.
/// Returns `None` if the token is not an infix operator.
#[must_use]
pub const fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        // OR, the loosest binding.
        TokenKind::Keyword(Keyword::Or) => Some((1, 2)),

        // AND.
        TokenKind::Keyword(Keyword::And) => Some((3, 4)),

        // Comparisons and comparison-shaped predicates.
        TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq => Some((7, 8)),
        TokenKind::Keyword(Keyword::Is | Keyword::In | Keyword::Like | Keyword::Not) => {
            Some((7, 8))
        }

        // Additive.
        TokenKind::Plus | TokenKind::Minus => Some((9, 10)),

        // Multiplicative.
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((11, 12)),

        _ => None,
    }
}

/// Binding power of prefix operators (unary minus, NOT).
#[must_use]
pub const fn prefix_binding_power(kind: &TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Minus => Some(13),
        // NOT binds looser than comparisons so `NOT a = b`
        // reads as `NOT (a = b)`.
        TokenKind::Keyword(Keyword::Not) => Some(5),
        _ => None,
    }
}

/// Maps a token to its binary operator, if it is one.
#[must_use]
pub const fn token_to_binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        TokenKind::Percent => Some(BinaryOp::Mod),
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::NotEq => Some(BinaryOp::NotEq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::LtEq => Some(BinaryOp::LtEq),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::GtEq => Some(BinaryOp::GtEq),
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        _ => None,
    }
}

/// Maps a token to its unary operator, if it is one.
#[must_use]
pub const fn token_to_unary_op(kind: &TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Keyword(Keyword::Not) => Some(UnaryOp::Not),
        _ => None,
    }
}
