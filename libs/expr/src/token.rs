//! Token types for the expression lexer

/// Token types for the expression lexer
#[derive(Debug, PartialEq, Clone, Eq)]
pub enum TokenType {
    // Literals
    StringLiteral,
    IntegerLiteral,
    FloatLiteral,

    // Identifiers
    Identifier,

    // Keywords
    True,
    False,
    Null,
    In,

    // Root escape
    Dollar, // $

    // Operators
    Dot,                // .
    Plus,               // +
    Minus,              // -
    Multiply,           // *
    Power,              // **
    Divide,             // /
    Modulo,             // %
    Ampersand,          // &
    AndNot,             // &^
    LogicalAnd,         // &&
    Pipe,               // |
    LogicalOr,          // ||
    PipeForward,        // |>
    Caret,              // ^
    Tilde,              // ~
    Bang,               // !
    ShiftLeft,          // <<
    ShiftRight,         // >>
    Equal,              // ==
    NotEqual,           // !=
    LessThan,           // <
    LessThanOrEqual,    // <=
    GreaterThan,        // >
    GreaterThanOrEqual, // >=
    Match,              // =~
    NotMatch,           // !~
    Question,           // ?
    Coalesce,           // ??
    Colon,              // :

    // Delimiters
    OpenParen,    // (
    CloseParen,   // )
    OpenBracket,  // [
    CloseBracket, // ]
    OpenBrace,    // {
    CloseBrace,   // }
    Comma,        // ,

    // End of input
    Eof,

    // Error
    Error, // For syntax errors
}

/// A token in an expression
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: String,
        position: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            token_type,
            value,
            position,
            line,
            column,
        }
    }

    pub fn eof(position: usize, line: usize, column: usize) -> Self {
        Self::new(TokenType::Eof, String::new(), position, line, column)
    }

    pub fn error(message: String, position: usize, line: usize, column: usize) -> Self {
        Self::new(TokenType::Error, message, position, line, column)
    }

    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::True | TokenType::False | TokenType::Null | TokenType::In
        )
    }
}
