//! The lexer: UTF-8 source text to positioned tokens.

use crate::{
    ast::CodeLoc,
    exception::{ErrorKind, FigError, Warning},
    token::{Token, TokenKind},
};

/// Identifier is suspiciously close to a keyword.
pub const WARN_KEYWORD_LOOKALIKE: u8 = 1;
/// Identifier is a single character.
pub const WARN_SHORT_IDENTIFIER: u8 = 2;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    warnings: Vec<Warning>,
}

impl Lexer {
    #[must_use]
    pub fn new(source: &str) -> Self {
        // CR is accepted but stripped; line breaks are LF.
        Self {
            chars: source.chars().filter(|&c| c != '\r').collect(),
            pos: 0,
            line: 1,
            column: 1,
            warnings: Vec::new(),
        }
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn loc(&self) -> CodeLoc {
        CodeLoc { line: self.line, column: self.column }
    }

    fn syntax_error(message: impl Into<String>, loc: CodeLoc) -> FigError {
        FigError::new(ErrorKind::SyntaxError, message).at(loc)
    }

    /// Produces the next token, or the `Eof` token once the input is
    /// exhausted. The first lexical error aborts the stream.
    pub fn next_token(&mut self) -> Result<Token, FigError> {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.bump();
            }
            let start = self.loc();
            let Some(c) = self.peek() else {
                return Ok(Token::new(TokenKind::Eof, "", start));
            };

            if c == '/' && matches!(self.peek_at(1), Some('/' | '*')) {
                self.skip_comment(start)?;
                continue;
            }
            if c == 'r' && self.peek_at(1) == Some('"') {
                self.bump();
                self.bump();
                return self.scan_raw_string(start);
            }
            if c == '"' {
                if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                    self.bump();
                    self.bump();
                    self.bump();
                    return self.scan_multiline_string(start);
                }
                self.bump();
                return self.scan_string(start);
            }
            if c.is_alphabetic() || c == '_' {
                return Ok(self.scan_identifier(start));
            }
            if c.is_ascii_digit() {
                return self.scan_number(start);
            }
            if c.is_ascii_punctuation() {
                return self.scan_symbol(start);
            }
            return Err(Self::syntax_error(format!("Cannot tokenize char: '{c}'"), start));
        }
    }

    fn skip_comment(&mut self, start: CodeLoc) -> Result<(), FigError> {
        self.bump(); // '/'
        let marker = self.bump(); // '/' or '*'
        if marker == Some('/') {
            while let Some(c) = self.peek() {
                self.bump();
                if c == '\n' {
                    break;
                }
            }
            return Ok(());
        }
        // Block comment; report unterminated ones at the opening position.
        loop {
            match self.peek() {
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
                None => return Err(Self::syntax_error("Unterminated block comment", start)),
            }
        }
    }

    fn scan_identifier(&mut self, start: CodeLoc) -> Token {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if let Some(kind) = TokenKind::keyword(&ident) {
            return Token::new(kind, ident, start);
        }
        match ident.as_str() {
            "true" | "false" => return Token::new(TokenKind::Bool, ident, start),
            "null" => return Token::new(TokenKind::Null, ident, start),
            _ => {}
        }
        if TokenKind::keyword(&ident.to_lowercase()).is_some() {
            self.warnings.push(Warning {
                id: WARN_KEYWORD_LOOKALIKE,
                message: format!("Identifier `{ident}` differs from a keyword only by case"),
                loc: start,
            });
        }
        if ident.chars().count() <= 1 {
            self.warnings.push(Warning {
                id: WARN_SHORT_IDENTIFIER,
                message: format!("Identifier `{ident}` is too short to be descriptive"),
                loc: start,
            });
        }
        Token::new(TokenKind::Identifier, ident, start)
    }

    fn scan_number(&mut self, start: CodeLoc) -> Result<Token, FigError> {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or_default());
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            text.push(self.bump().unwrap_or_default());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().unwrap_or_default());
            }
        }
        if self.peek() == Some('e') {
            text.push(self.bump().unwrap_or_default());
            if self.peek() == Some('-') {
                text.push(self.bump().unwrap_or_default());
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(Self::syntax_error(format!("Illegal number literal: {text}"), start));
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.bump().unwrap_or_default());
            }
        }
        Ok(Token::new(TokenKind::Number, text, start))
    }

    fn scan_escape(&mut self, allow_backslash: bool) -> Result<char, FigError> {
        // The leading '\' is already consumed.
        let loc = self.loc();
        let Some(c) = self.bump() else {
            return Err(Self::syntax_error("Unterminated string", loc));
        };
        let escaped = match c {
            'n' => '\n',
            't' => '\t',
            'v' => '\u{0B}',
            'b' => '\u{08}',
            '"' => '"',
            '\'' => '\'',
            '\\' if allow_backslash => '\\',
            other => {
                return Err(Self::syntax_error(format!("Unsupported escape character: {other}"), loc));
            }
        };
        Ok(escaped)
    }

    fn scan_string(&mut self, start: CodeLoc) -> Result<Token, FigError> {
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    return Ok(Token::new(TokenKind::Str, text, start));
                }
                Some('\n') | None => {
                    return Err(Self::syntax_error("Unterminated string", start));
                }
                Some('\\') => {
                    self.bump();
                    text.push(self.scan_escape(false)?);
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn scan_raw_string(&mut self, start: CodeLoc) -> Result<Token, FigError> {
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') => {
                    self.bump();
                    return Ok(Token::new(TokenKind::Str, text, start));
                }
                Some('\n') | None => {
                    return Err(Self::syntax_error("Unterminated string", start));
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn scan_multiline_string(&mut self, start: CodeLoc) -> Result<Token, FigError> {
        let mut text = String::new();
        loop {
            match self.peek() {
                Some('"') if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') => {
                    self.bump();
                    self.bump();
                    self.bump();
                    return Ok(Token::new(TokenKind::Str, text, start));
                }
                Some('\\') => {
                    self.bump();
                    text.push(self.scan_escape(true)?);
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
                None => return Err(Self::syntax_error("Unterminated string", start)),
            }
        }
    }

    fn scan_symbol(&mut self, start: CodeLoc) -> Result<Token, FigError> {
        // Longest match over the fixed punctuation table: try three
        // characters, then two, then one.
        for len in (1..=3).rev() {
            let candidate: String = (0..len).filter_map(|i| self.peek_at(i)).collect();
            if candidate.chars().count() < len {
                continue;
            }
            if let Some(kind) = symbol_kind(&candidate) {
                for _ in 0..len {
                    self.bump();
                }
                return Ok(Token::new(kind, candidate, start));
            }
        }
        let c = self.peek().unwrap_or_default();
        self.bump();
        Err(Self::syntax_error(format!("No such operator: {c}"), start))
    }
}

fn symbol_kind(symbol: &str) -> Option<TokenKind> {
    use TokenKind::*;
    let kind = match symbol {
        "..." => Ellipsis,
        "==" => EqEq,
        "!=" => NotEq,
        "<=" => LessEq,
        ">=" => GreaterEq,
        "<<" => Shl,
        ">>" => Shr,
        "+=" => PlusEq,
        "-=" => MinusEq,
        "*=" => StarEq,
        "/=" => SlashEq,
        "%=" => PercentEq,
        "^=" => CaretEq,
        "++" => PlusPlus,
        "--" => MinusMinus,
        "&&" => AmpAmp,
        "||" => PipePipe,
        ":=" => Walrus,
        "**" => StarStar,
        "->" => Arrow,
        "=>" => FatArrow,
        "+" => Plus,
        "-" => Minus,
        "*" => Star,
        "/" => Slash,
        "%" => Percent,
        "^" => Caret,
        "&" => Amp,
        "|" => Pipe,
        "~" => Tilde,
        "!" => Bang,
        "?" => Question,
        "=" => Assign,
        "<" => Less,
        ">" => Greater,
        "." => Dot,
        "," => Comma,
        ":" => Colon,
        ";" => Semicolon,
        "(" => LParen,
        ")" => RParen,
        "[" => LBracket,
        "]" => RBracket,
        "{" => LBrace,
        "}" => RBrace,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().expect("lexes");
            if tok.kind == TokenKind::Eof {
                return out;
            }
            out.push(tok.kind);
        }
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("var count = func while0"),
            vec![Var, Identifier, Assign, Func, Identifier]
        );
    }

    #[test]
    fn longest_match_symbols() {
        use TokenKind::*;
        assert_eq!(kinds("a<<=b"), vec![Identifier, Shl, Assign, Identifier]);
        assert_eq!(kinds("x...;**"), vec![Identifier, Ellipsis, Semicolon, StarStar]);
    }

    #[test]
    fn positions_are_one_based() {
        let mut lexer = Lexer::new("var x;\n  x = 1;");
        let var = lexer.next_token().unwrap();
        assert_eq!((var.loc.line, var.loc.column), (1, 1));
        let x = lexer.next_token().unwrap();
        assert_eq!((x.loc.line, x.loc.column), (1, 5));
        lexer.next_token().unwrap(); // ;
        let x2 = lexer.next_token().unwrap();
        assert_eq!((x2.loc.line, x2.loc.column), (2, 3));
    }

    #[test]
    fn string_escapes() {
        let mut lexer = Lexer::new(r#""a\tb\"c""#);
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Str);
        assert_eq!(&*tok.lexeme, "a\tb\"c");
    }

    #[test]
    fn raw_string_disables_escapes() {
        let mut lexer = Lexer::new(r#"r"a\nb""#);
        let tok = lexer.next_token().unwrap();
        assert_eq!(&*tok.lexeme, "a\\nb");
    }

    #[test]
    fn multiline_string() {
        let mut lexer = Lexer::new("\"\"\"line1\nline2\\\\\"\"\"");
        let tok = lexer.next_token().unwrap();
        assert_eq!(&*tok.lexeme, "line1\nline2\\");
    }

    #[test]
    fn unterminated_string_reports_opening_position() {
        let mut lexer = Lexer::new("var s = \"abc\ns");
        for _ in 0..3 {
            lexer.next_token().unwrap();
        }
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
        assert_eq!(err.loc.map(|l| (l.line, l.column)), Some((1, 9)));
    }

    #[test]
    fn unterminated_block_comment() {
        let mut lexer = Lexer::new("/* nope");
        let err = lexer.next_token().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn scientific_numbers() {
        let mut lexer = Lexer::new("1.25e-3 7e2");
        assert_eq!(&*lexer.next_token().unwrap().lexeme, "1.25e-3");
        assert_eq!(&*lexer.next_token().unwrap().lexeme, "7e2");
        let mut bad = Lexer::new("3e");
        assert!(bad.next_token().is_err());
    }

    #[test]
    fn identifier_warnings() {
        let mut lexer = Lexer::new("Var x");
        while lexer.next_token().unwrap().kind != TokenKind::Eof {}
        let warnings = lexer.take_warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].id, WARN_KEYWORD_LOOKALIKE);
        assert_eq!(warnings[1].id, WARN_SHORT_IDENTIFIER);
    }
}
