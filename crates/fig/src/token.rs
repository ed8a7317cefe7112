//! Tokens produced by the lexer.

use std::rc::Rc;

use crate::ast::CodeLoc;

/// Every token kind the lexer can produce.
///
/// The strum derive provides the names used in "Expected `X`, but got `Y`"
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
pub enum TokenKind {
    Eof,

    Identifier,

    // Keywords.
    And,
    Or,
    Not,
    Import,
    Func,
    Var,
    Const,
    Final,
    While,
    For,
    If,
    Else,
    Struct,
    Interface,
    Impl,
    Is,
    Public,
    Return,
    Break,
    Continue,
    Try,
    Catch,
    Throw,
    Finally,

    // Literals. For `Str` the lexeme holds the processed (unescaped) text.
    Number,
    Str,
    Bool,
    Null,

    // Punctuation and operators.
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Percent,      // %
    Caret,        // ^
    Amp,          // &
    Pipe,         // |
    Tilde,        // ~
    Bang,         // !
    Question,     // ?
    Assign,       // =
    Less,         // <
    Greater,      // >
    Dot,          // .
    Comma,        // ,
    Colon,        // :
    Semicolon,    // ;
    LParen,       // (
    RParen,       // )
    LBracket,     // [
    RBracket,     // ]
    LBrace,       // {
    RBrace,       // }
    Arrow,        // ->
    FatArrow,     // =>
    EqEq,         // ==
    NotEq,        // !=
    LessEq,       // <=
    GreaterEq,    // >=
    PlusEq,       // +=
    MinusEq,      // -=
    StarEq,       // *=
    SlashEq,      // /=
    PercentEq,    // %=
    CaretEq,      // ^=
    PlusPlus,     // ++
    MinusMinus,   // --
    AmpAmp,       // &&
    PipePipe,     // ||
    Walrus,       // :=
    StarStar,     // **
    Shl,          // <<
    Shr,          // >>
    Ellipsis,     // ...
}

impl TokenKind {
    /// Keyword lookup for identifier-shaped lexemes.
    #[must_use]
    pub fn keyword(ident: &str) -> Option<Self> {
        let kind = match ident {
            "and" => Self::And,
            "or" => Self::Or,
            "not" => Self::Not,
            "import" => Self::Import,
            "func" => Self::Func,
            "var" => Self::Var,
            "const" => Self::Const,
            "final" => Self::Final,
            "while" => Self::While,
            "for" => Self::For,
            "if" => Self::If,
            "else" => Self::Else,
            "struct" => Self::Struct,
            "interface" => Self::Interface,
            "impl" => Self::Impl,
            "is" => Self::Is,
            "public" => Self::Public,
            "return" => Self::Return,
            "break" => Self::Break,
            "continue" => Self::Continue,
            "try" => Self::Try,
            "catch" => Self::Catch,
            "throw" => Self::Throw,
            "finally" => Self::Finally,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Rc<str>,
    pub loc: CodeLoc,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, lexeme: impl Into<Rc<str>>, loc: CodeLoc) -> Self {
        Self { kind, lexeme: lexeme.into(), loc }
    }
}
