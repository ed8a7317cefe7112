//! The parser: Pratt precedence climbing for expressions, recursive descent
//! for statements.
//!
//! Binding powers are (left, right) pairs; left-associative operators use
//! `(n, n+1)`, right-associative ones `(n, n-1)`. The parser never recovers:
//! the first error aborts.

use std::rc::Rc;

use crate::{
    ast::{
        Block, CatchClause, CodeLoc, DefaultParam, Expr, ExprKind, FieldDef, FunctionDef,
        FunctionLiteral, FunctionParams, ImplDef, ImplMethod, InitArg, InitMode, InterfaceDef,
        InterfaceMethod, Literal, Operator, Param, Stmt, StmtKind, StructDef, TypeAnnotation,
        VarDef,
    },
    ast::AccessModifier,
    exception::{ErrorKind, FigError, SourceFile, Warning},
    lexer::Lexer,
    token::{Token, TokenKind},
};

const TERNARY_LBP: u8 = 4;
const TERNARY_RBP: u8 = 3;
const PREFIX_BP: u8 = 29;

fn binary_operator(kind: TokenKind) -> Option<Operator> {
    let op = match kind {
        TokenKind::Plus => Operator::Add,
        TokenKind::Minus => Operator::Sub,
        TokenKind::Star => Operator::Mul,
        TokenKind::Slash => Operator::Div,
        TokenKind::Percent => Operator::Mod,
        TokenKind::StarStar => Operator::Pow,
        TokenKind::And | TokenKind::AmpAmp => Operator::And,
        TokenKind::Or | TokenKind::PipePipe => Operator::Or,
        TokenKind::EqEq => Operator::Eq,
        TokenKind::NotEq => Operator::NotEq,
        TokenKind::Less => Operator::Less,
        TokenKind::LessEq => Operator::LessEq,
        TokenKind::Greater => Operator::Greater,
        TokenKind::GreaterEq => Operator::GreaterEq,
        TokenKind::Is => Operator::Is,
        TokenKind::Amp => Operator::BitAnd,
        TokenKind::Pipe => Operator::BitOr,
        TokenKind::Caret => Operator::BitXor,
        TokenKind::Shl => Operator::Shl,
        TokenKind::Shr => Operator::Shr,
        TokenKind::Assign => Operator::Assign,
        TokenKind::PlusEq => Operator::AddAssign,
        TokenKind::MinusEq => Operator::SubAssign,
        TokenKind::StarEq => Operator::MulAssign,
        TokenKind::SlashEq => Operator::DivAssign,
        TokenKind::PercentEq => Operator::ModAssign,
        TokenKind::CaretEq => Operator::CaretAssign,
        _ => return None,
    };
    Some(op)
}

fn prefix_operator(kind: TokenKind) -> Option<Operator> {
    let op = match kind {
        TokenKind::Bang | TokenKind::Not => Operator::Not,
        TokenKind::Minus => Operator::Sub,
        TokenKind::Tilde => Operator::BitNot,
        TokenKind::Amp => Operator::Ref,
        _ => return None,
    };
    Some(op)
}

/// (left, right) binding powers, loosest to tightest:
/// assignment < ternary < `or` < `and` < equality/`is` < comparison <
/// `|` < `^` < `&` < shifts < additive < multiplicative < `**` < unary.
fn infix_binding_power(op: Operator) -> (u8, u8) {
    match op {
        Operator::Assign
        | Operator::AddAssign
        | Operator::SubAssign
        | Operator::MulAssign
        | Operator::DivAssign
        | Operator::ModAssign
        | Operator::CaretAssign => (2, 1),
        Operator::Or => (5, 6),
        Operator::And => (7, 8),
        Operator::Eq | Operator::NotEq | Operator::Is => (9, 10),
        Operator::Less | Operator::LessEq | Operator::Greater | Operator::GreaterEq => (11, 12),
        Operator::BitOr => (13, 14),
        Operator::BitXor => (15, 16),
        Operator::BitAnd => (17, 18),
        Operator::Shl | Operator::Shr => (19, 20),
        Operator::Add | Operator::Sub => (21, 22),
        Operator::Mul | Operator::Div | Operator::Mod => (23, 24),
        Operator::Pow => (28, 27),
        Operator::Not | Operator::BitNot | Operator::Ref => (0, 0),
    }
}

pub struct Parser {
    lexer: Lexer,
    current: Token,
    peeked: Option<Token>,
    source: Rc<SourceFile>,
}

impl Parser {
    pub fn new(mut lexer: Lexer, source: Rc<SourceFile>) -> Result<Self, FigError> {
        let current = lexer.next_token().map_err(|e| e.in_source(&source))?;
        Ok(Self { lexer, current, peeked: None, source })
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        self.lexer.take_warnings()
    }

    fn syntax_error(&self, message: impl Into<String>) -> FigError {
        FigError::new(ErrorKind::SyntaxError, message)
            .at(self.current.loc)
            .in_source(&self.source)
    }

    fn expected(&self, what: &str) -> FigError {
        self.syntax_error(format!("Expected {what}, but got `{}`", self.current.kind))
    }

    fn advance(&mut self) -> Result<(), FigError> {
        self.current = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token().map_err(|e| e.in_source(&self.source))?,
        };
        Ok(())
    }

    fn peek_kind(&mut self) -> Result<TokenKind, FigError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token().map_err(|e| e.in_source(&self.source))?);
        }
        Ok(self.peeked.as_ref().map_or(TokenKind::Eof, |t| t.kind))
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn expect(&self, kind: TokenKind) -> Result<(), FigError> {
        if self.at(kind) {
            Ok(())
        } else {
            Err(self.expected(&format!("`{kind}`")))
        }
    }

    fn expect_consume(&mut self, kind: TokenKind) -> Result<(), FigError> {
        self.expect(kind)?;
        self.advance()
    }

    fn ident_lexeme(&self, what: &str) -> Result<Rc<str>, FigError> {
        if self.at(TokenKind::Identifier) {
            Ok(Rc::clone(&self.current.lexeme))
        } else {
            Err(self.expected(what))
        }
    }

    // ----- program & statements -----

    pub fn parse_program(&mut self) -> Result<Vec<Stmt>, FigError> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    fn parse_statement(&mut self) -> Result<Stmt, FigError> {
        let loc = self.current.loc;
        let kind = match self.current.kind {
            TokenKind::Import => self.parse_import()?,
            TokenKind::Public => {
                self.advance()?;
                match self.current.kind {
                    TokenKind::Var | TokenKind::Const | TokenKind::Final => self.parse_var_def(true)?,
                    TokenKind::Func => {
                        self.advance()?;
                        StmtKind::FunctionDef(Rc::new(self.parse_function_def(true)?))
                    }
                    TokenKind::Struct => {
                        self.advance()?;
                        self.parse_struct_def(true)?
                    }
                    TokenKind::Interface => {
                        self.advance()?;
                        self.parse_interface_def(true)?
                    }
                    _ => {
                        return Err(self.expected(
                            "`var`, `const`, `func`, `struct` or `interface` after `public`",
                        ));
                    }
                }
            }
            TokenKind::Var | TokenKind::Const | TokenKind::Final => self.parse_var_def(false)?,
            TokenKind::Func => {
                // `func name(..)` is a definition; `func (..)` starts a
                // function-literal expression statement.
                if self.peek_kind()? == TokenKind::Identifier {
                    self.advance()?;
                    StmtKind::FunctionDef(Rc::new(self.parse_function_def(false)?))
                } else {
                    let expr = self.parse_expression(0)?;
                    self.expect_consume(TokenKind::Semicolon)?;
                    StmtKind::Expression(expr)
                }
            }
            TokenKind::Struct => {
                self.advance()?;
                self.parse_struct_def(false)?
            }
            TokenKind::Interface => {
                self.advance()?;
                self.parse_interface_def(false)?
            }
            TokenKind::Impl => self.parse_impl()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Else => return Err(self.syntax_error("`else` without matching `if`")),
            TokenKind::Catch | TokenKind::Finally => {
                return Err(self.syntax_error(format!(
                    "`{}` without matching `try`",
                    self.current.lexeme
                )));
            }
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::While => self.parse_while()?,
            TokenKind::For => self.parse_for()?,
            TokenKind::Return => self.parse_return()?,
            TokenKind::Break => {
                self.advance()?;
                self.expect_consume(TokenKind::Semicolon)?;
                StmtKind::Break
            }
            TokenKind::Continue => {
                self.advance()?;
                self.expect_consume(TokenKind::Semicolon)?;
                StmtKind::Continue
            }
            TokenKind::Try => self.parse_try()?,
            TokenKind::Throw => {
                self.advance()?;
                let value = self.parse_expression(0)?;
                self.expect_consume(TokenKind::Semicolon)?;
                StmtKind::Throw(value)
            }
            _ => {
                let expr = self.parse_expression(0)?;
                self.expect_consume(TokenKind::Semicolon)?;
                StmtKind::Expression(expr)
            }
        };
        Ok(Stmt { kind, loc })
    }

    fn parse_import(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        let mut path = Vec::new();
        loop {
            path.push(self.ident_lexeme("package name")?);
            self.advance()?;
            match self.current.kind {
                TokenKind::Semicolon => {
                    self.advance()?;
                    return Ok(StmtKind::Import(path));
                }
                TokenKind::Dot => self.advance()?,
                _ => return Err(self.expected("`.` or `;` in import path")),
            }
        }
    }

    fn parse_var_def(&mut self, is_public: bool) -> Result<StmtKind, FigError> {
        let is_const = !self.at(TokenKind::Var);
        self.advance()?;
        let name = self.ident_lexeme("variable name")?;
        self.advance()?;

        let mut annotation = TypeAnnotation::Default;
        if self.at(TokenKind::Colon) {
            self.advance()?;
            annotation = TypeAnnotation::Named(self.ident_lexeme("type name")?);
            self.advance()?;
        }
        if self.at(TokenKind::Semicolon) {
            self.advance()?;
            return Ok(StmtKind::VarDef(VarDef { is_public, is_const, name, annotation, init: None }));
        }
        match self.current.kind {
            TokenKind::Walrus => {
                if matches!(annotation, TypeAnnotation::Named(_)) {
                    return Err(self.syntax_error("`:=` cannot be combined with a type annotation"));
                }
                annotation = TypeAnnotation::Inferred;
                self.advance()?;
            }
            TokenKind::Assign => self.advance()?,
            _ => return Err(self.expected("`=` or `:=`")),
        }
        let init = self.parse_expression(0)?;
        self.expect_consume(TokenKind::Semicolon)?;
        Ok(StmtKind::VarDef(VarDef { is_public, is_const, name, annotation, init: Some(init) }))
    }

    /// Entry: current is the function name.
    fn parse_function_def(&mut self, is_public: bool) -> Result<FunctionDef, FigError> {
        let name = self.ident_lexeme("function name")?;
        self.advance()?;
        let params = self.parse_params()?;
        let mut ret_type = None;
        if self.at(TokenKind::Arrow) {
            self.advance()?;
            ret_type = Some(self.ident_lexeme("return type")?);
            self.advance()?;
        }
        let body = Rc::new(self.parse_block()?);
        Ok(FunctionDef { is_public, name, params, ret_type, body })
    }

    /// Entry: current is `(`. Stops past the closing `)`.
    fn parse_params(&mut self) -> Result<FunctionParams, FigError> {
        self.expect_consume(TokenKind::LParen)?;
        let mut params = FunctionParams::default();
        loop {
            if self.at(TokenKind::RParen) {
                self.advance()?;
                return Ok(params);
            }
            let name = self.ident_lexeme("identifier or `)`")?;
            self.advance()?;
            match self.current.kind {
                TokenKind::Assign => {
                    self.advance()?;
                    let default = self.parse_expression(0)?;
                    params.defaulted.push(DefaultParam { name, ty: None, default });
                }
                TokenKind::Colon => {
                    self.advance()?;
                    let ty = self.ident_lexeme("type name")?;
                    self.advance()?;
                    if self.at(TokenKind::Assign) {
                        self.advance()?;
                        let default = self.parse_expression(0)?;
                        params.defaulted.push(DefaultParam { name, ty: Some(ty), default });
                    } else {
                        params.positional.push(Param { name, ty: Some(ty) });
                    }
                }
                TokenKind::Ellipsis => {
                    self.advance()?;
                    if !params.positional.is_empty() || !params.defaulted.is_empty() || !self.at(TokenKind::RParen) {
                        return Err(self.syntax_error(
                            "A variadic parameter must be the only parameter",
                        ));
                    }
                    params.variadic = Some(name);
                    self.advance()?;
                    return Ok(params);
                }
                _ => params.positional.push(Param { name, ty: None }),
            }
            if self.at(TokenKind::Comma) {
                self.advance()?;
            }
        }
    }

    /// Entry: current is the struct name.
    fn parse_struct_def(&mut self, is_public: bool) -> Result<StmtKind, FigError> {
        let name = self.ident_lexeme("struct name")?;
        self.advance()?;
        self.expect_consume(TokenKind::LBrace)?;

        let mut fields: Vec<FieldDef> = Vec::new();
        let mut methods = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RBrace => {
                    self.advance()?;
                    return Ok(StmtKind::StructDef(Rc::new(StructDef { is_public, name, fields, methods })));
                }
                TokenKind::Eof => return Err(self.syntax_error("braces are not closed")),
                TokenKind::Identifier | TokenKind::Const | TokenKind::Final => {
                    fields.push(self.parse_struct_field(false)?);
                }
                TokenKind::Func => {
                    self.advance()?;
                    self.ident_lexeme("method name")?;
                    methods.push(Rc::new(self.parse_function_def(false)?));
                }
                TokenKind::Public => match self.peek_kind()? {
                    TokenKind::Const | TokenKind::Final | TokenKind::Identifier => {
                        self.advance()?;
                        fields.push(self.parse_struct_field(true)?);
                    }
                    TokenKind::Func => {
                        self.advance()?;
                        self.advance()?;
                        self.ident_lexeme("method name")?;
                        methods.push(Rc::new(self.parse_function_def(true)?));
                    }
                    _ => return Err(self.expected("a field or method after `public`")),
                },
                TokenKind::Var => {
                    return Err(self.syntax_error(
                        "Variables are not allowed to be defined within a structure",
                    ));
                }
                _ => return Err(self.expected("a field or method in struct body")),
            }
        }
    }

    fn parse_struct_field(&mut self, is_public: bool) -> Result<FieldDef, FigError> {
        let is_const = matches!(self.current.kind, TokenKind::Const | TokenKind::Final);
        if is_const {
            self.advance()?;
        }
        let loc = self.current.loc;
        let name = self.ident_lexeme("field name")?;
        self.advance()?;
        let mut ty = None;
        if self.at(TokenKind::Colon) {
            self.advance()?;
            ty = Some(self.ident_lexeme("type name")?);
            self.advance()?;
        }
        let mut default = None;
        if self.at(TokenKind::Assign) {
            self.advance()?;
            default = Some(self.parse_expression(0)?);
        }
        self.expect_consume(TokenKind::Semicolon)?;
        Ok(FieldDef { access: AccessModifier::from_flags(is_public, is_const), name, ty, default, loc })
    }

    /// Entry: current is the interface name.
    fn parse_interface_def(&mut self, is_public: bool) -> Result<StmtKind, FigError> {
        let name = self.ident_lexeme("interface name")?;
        self.advance()?;
        self.expect_consume(TokenKind::LBrace)?;

        let mut bundles = Vec::new();
        let mut methods = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RBrace => {
                    self.advance()?;
                    return Ok(StmtKind::InterfaceDef(Rc::new(InterfaceDef { is_public, name, bundles, methods })));
                }
                TokenKind::Identifier => {
                    // `bundle` is a contextual keyword: only an identifier
                    // list terminated by `;` follows it.
                    if &*self.current.lexeme == "bundle" && self.peek_kind()? == TokenKind::Identifier {
                        self.advance()?;
                        loop {
                            bundles.push(self.ident_lexeme("interface name")?);
                            self.advance()?;
                            if self.at(TokenKind::Comma) {
                                self.advance()?;
                            } else {
                                break;
                            }
                        }
                        self.expect_consume(TokenKind::Semicolon)?;
                        continue;
                    }
                    let method_name = Rc::clone(&self.current.lexeme);
                    self.advance()?;
                    let params = self.parse_params()?;
                    self.expect_consume(TokenKind::Arrow)?;
                    let ret_type = self.ident_lexeme("return type")?;
                    self.advance()?;
                    let default_body = if self.at(TokenKind::LBrace) {
                        Some(Rc::new(self.parse_block()?))
                    } else {
                        self.expect_consume(TokenKind::Semicolon)?;
                        None
                    };
                    methods.push(InterfaceMethod { name: method_name, params, ret_type, default_body });
                }
                _ => return Err(self.expected("a method declaration in interface body")),
            }
        }
    }

    fn parse_impl(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        let interface_name = self.ident_lexeme("interface name")?;
        self.advance()?;
        self.expect_consume(TokenKind::For)?;
        let struct_name = self.ident_lexeme("struct name")?;
        self.advance()?;
        self.expect_consume(TokenKind::LBrace)?;

        let mut impl_methods = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RBrace => {
                    self.advance()?;
                    return Ok(StmtKind::Impl(Rc::new(ImplDef { interface_name, struct_name, methods: impl_methods })));
                }
                TokenKind::Identifier => {
                    let loc = self.current.loc;
                    let name = Rc::clone(&self.current.lexeme);
                    self.advance()?;
                    let params = self.parse_params()?;
                    let body = Rc::new(self.parse_block()?);
                    impl_methods.push(ImplMethod { name, params, body, loc });
                }
                _ => return Err(self.expected("a method implementation in impl body")),
            }
        }
    }

    fn parse_block(&mut self) -> Result<Block, FigError> {
        let loc = self.current.loc;
        self.expect_consume(TokenKind::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RBrace => {
                    self.advance()?;
                    return Ok(Block { stmts, loc });
                }
                TokenKind::Eof => return Err(self.syntax_error("braces are not closed")),
                _ => stmts.push(self.parse_statement()?),
            }
        }
    }

    fn parse_if(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        let cond = self.parse_expression(0)?;
        let body = self.parse_block()?;
        let mut elifs = Vec::new();
        let mut else_body = None;
        while self.at(TokenKind::Else) {
            self.advance()?;
            if self.at(TokenKind::If) {
                self.advance()?;
                let elif_cond = self.parse_expression(0)?;
                elifs.push((elif_cond, self.parse_block()?));
            } else {
                else_body = Some(self.parse_block()?);
                break;
            }
        }
        Ok(StmtKind::If { cond, body, elifs, else_body })
    }

    fn parse_while(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        let cond = self.parse_expression(0)?;
        let body = self.parse_block()?;
        Ok(StmtKind::While { cond, body })
    }

    fn parse_for(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        let paren = self.at(TokenKind::LParen);
        if paren {
            self.advance()?;
        }
        let init = Box::new(self.parse_statement()?);
        let cond = self.parse_expression(0)?;
        self.expect_consume(TokenKind::Semicolon)?;

        let stop = if paren { TokenKind::RParen } else { TokenKind::LBrace };
        let mut step = None;
        if !self.at(stop) {
            step = Some(Box::new(self.parse_for_step()?));
        }
        if paren {
            self.expect_consume(TokenKind::RParen)?;
        }
        let body = self.parse_block()?;
        Ok(StmtKind::For { init, cond, step, body })
    }

    /// The increment may only be an assignment or expression statement.
    fn parse_for_step(&mut self) -> Result<Stmt, FigError> {
        match self.current.kind {
            TokenKind::LBrace => {
                Err(self.syntax_error("A block cannot be used as a for-loop increment"))
            }
            TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue => Err(self.syntax_error(
                "Control flow statements cannot be used as a for-loop increment",
            )),
            _ => {
                let loc = self.current.loc;
                let expr = self.parse_expression(0)?;
                if self.at(TokenKind::Semicolon) {
                    self.advance()?;
                }
                Ok(Stmt { kind: StmtKind::Expression(expr), loc })
            }
        }
    }

    fn parse_return(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        if self.at(TokenKind::Semicolon) {
            self.advance()?;
            return Ok(StmtKind::Return(None));
        }
        let value = self.parse_expression(0)?;
        self.expect_consume(TokenKind::Semicolon)?;
        Ok(StmtKind::Return(Some(value)))
    }

    fn parse_try(&mut self) -> Result<StmtKind, FigError> {
        self.advance()?;
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.at(TokenKind::Catch) {
            let loc = self.current.loc;
            self.advance()?;
            self.expect_consume(TokenKind::LParen)?;
            let var_name = self.ident_lexeme("catch variable")?;
            self.advance()?;
            let mut ty = None;
            if self.at(TokenKind::Colon) {
                self.advance()?;
                ty = Some(self.ident_lexeme("type name")?);
                self.advance()?;
            }
            self.expect_consume(TokenKind::RParen)?;
            let body = self.parse_block()?;
            catches.push(CatchClause { var_name, ty, body, loc });
        }
        if catches.is_empty() {
            return Err(self.expected("`catch` after try block"));
        }
        let finally = if self.at(TokenKind::Finally) {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(StmtKind::Try { body, catches, finally })
    }

    // ----- expressions -----

    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, FigError> {
        let loc = self.current.loc;
        let mut lhs = self.parse_prefix(loc)?;

        loop {
            match self.current.kind {
                TokenKind::Semicolon | TokenKind::Eof => break,
                TokenKind::LParen => {
                    let args = self.parse_call_args()?;
                    lhs = Expr { kind: ExprKind::Call { callee: Box::new(lhs), args }, loc };
                }
                TokenKind::Dot => {
                    self.advance()?;
                    let member = self.ident_lexeme("identifier after `.`")?;
                    self.advance()?;
                    lhs = Expr { kind: ExprKind::Member { base: Box::new(lhs), member }, loc };
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let index = self.parse_expression(0)?;
                    self.expect_consume(TokenKind::RBracket)?;
                    lhs = Expr {
                        kind: ExprKind::Index { base: Box::new(lhs), index: Box::new(index) },
                        loc,
                    };
                }
                TokenKind::Question => {
                    if TERNARY_LBP < min_bp {
                        break;
                    }
                    self.advance()?;
                    let when_true = self.parse_expression(0)?;
                    self.expect_consume(TokenKind::Colon)?;
                    let when_false = self.parse_expression(TERNARY_RBP)?;
                    lhs = Expr {
                        kind: ExprKind::Ternary {
                            cond: Box::new(lhs),
                            when_true: Box::new(when_true),
                            when_false: Box::new(when_false),
                        },
                        loc,
                    };
                }
                kind => {
                    let Some(op) = binary_operator(kind) else { break };
                    let (lbp, rbp) = infix_binding_power(op);
                    if lbp < min_bp {
                        break;
                    }
                    self.advance()?;
                    let rhs = self.parse_expression(rbp)?;
                    lhs = Expr {
                        kind: ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
                        loc,
                    };
                }
            }
        }
        Ok(lhs)
    }

    fn parse_prefix(&mut self, loc: CodeLoc) -> Result<Expr, FigError> {
        match self.current.kind {
            TokenKind::LBracket => self.parse_list_literal(loc),
            TokenKind::LParen => self.parse_tuple_or_paren(loc),
            TokenKind::LBrace => self.parse_map_literal(loc),
            TokenKind::Func => self.parse_function_literal(loc),
            TokenKind::Number => {
                let value = self.parse_number_literal()?;
                self.advance()?;
                Ok(Expr { kind: ExprKind::Literal(value), loc })
            }
            TokenKind::Str => {
                let text = Rc::clone(&self.current.lexeme);
                self.advance()?;
                Ok(Expr { kind: ExprKind::Literal(Literal::Str(text)), loc })
            }
            TokenKind::Bool => {
                let value = &*self.current.lexeme == "true";
                self.advance()?;
                Ok(Expr { kind: ExprKind::Literal(Literal::Bool(value)), loc })
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(Expr { kind: ExprKind::Literal(Literal::Null), loc })
            }
            TokenKind::Identifier => {
                let name = Rc::clone(&self.current.lexeme);
                self.advance()?;
                if self.at(TokenKind::LBrace) {
                    let target = Expr { kind: ExprKind::Var(name), loc };
                    self.parse_struct_init(target, loc)
                } else {
                    Ok(Expr { kind: ExprKind::Var(name), loc })
                }
            }
            kind => {
                if let Some(op) = prefix_operator(kind) {
                    self.advance()?;
                    let operand = self.parse_expression(PREFIX_BP)?;
                    return Ok(Expr { kind: ExprKind::Unary { op, operand: Box::new(operand) }, loc });
                }
                Err(self.syntax_error(format!(
                    "Unexpected token `{}` in expression",
                    self.current.kind
                )))
            }
        }
    }

    fn parse_number_literal(&self) -> Result<Literal, FigError> {
        let text = &*self.current.lexeme;
        if text.contains('.') || text.contains('e') {
            text.parse::<f64>()
                .map(Literal::Double)
                .map_err(|_| self.syntax_error(format!("Illegal number literal: {text}")))
        } else {
            text.parse::<i64>()
                .map(Literal::Int)
                .map_err(|_| self.syntax_error(format!("Illegal number literal: {text}")))
        }
    }

    fn parse_function_literal(&mut self, loc: CodeLoc) -> Result<Expr, FigError> {
        self.advance()?;
        if self.at(TokenKind::Identifier) {
            return Err(self.syntax_error("A function literal must not have a name"));
        }
        self.expect(TokenKind::LParen)?;
        let params = self.parse_params()?;
        let body = if self.at(TokenKind::FatArrow) {
            self.advance()?;
            let value = self.parse_expression(0)?;
            let value_loc = value.loc;
            // `=> expr` is sugar for `{ return expr; }`.
            Rc::new(Block {
                stmts: vec![Stmt { kind: StmtKind::Return(Some(value)), loc: value_loc }],
                loc: value_loc,
            })
        } else {
            Rc::new(self.parse_block()?)
        };
        Ok(Expr {
            kind: ExprKind::FunctionLiteral(Rc::new(FunctionLiteral { params, body })),
            loc,
        })
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, FigError> {
        self.expect_consume(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression(0)?);
                if self.at(TokenKind::Comma) {
                    self.advance()?;
                    continue;
                }
                break;
            }
        }
        self.expect_consume(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_list_literal(&mut self, loc: CodeLoc) -> Result<Expr, FigError> {
        self.advance()?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBracket) {
            if self.at(TokenKind::Eof) {
                return Err(self.syntax_error("brackets are not closed"));
            }
            items.push(self.parse_expression(0)?);
            if self.at(TokenKind::Comma) {
                self.advance()?;
            }
        }
        self.advance()?;
        Ok(Expr { kind: ExprKind::List(items), loc })
    }

    fn parse_map_literal(&mut self, loc: CodeLoc) -> Result<Expr, FigError> {
        self.advance()?;
        let mut entries = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.syntax_error("braces are not closed"));
            }
            let key = self.parse_expression(0)?;
            self.expect_consume(TokenKind::Colon)?;
            let value = self.parse_expression(0)?;
            entries.push((key, value));
            if self.at(TokenKind::Comma) {
                self.advance()?;
            } else if !self.at(TokenKind::RBrace) {
                return Err(self.expected("`,` or `}` in map literal"));
            }
        }
        self.advance()?;
        Ok(Expr { kind: ExprKind::Map(entries), loc })
    }

    fn parse_tuple_or_paren(&mut self, loc: CodeLoc) -> Result<Expr, FigError> {
        self.advance()?;
        if self.at(TokenKind::RParen) {
            self.advance()?;
            return Ok(Expr { kind: ExprKind::Tuple(Vec::new()), loc });
        }
        let first = self.parse_expression(0)?;
        match self.current.kind {
            TokenKind::Comma => {
                let mut elements = vec![first];
                while self.at(TokenKind::Comma) {
                    self.advance()?;
                    if self.at(TokenKind::RParen) {
                        break;
                    }
                    elements.push(self.parse_expression(0)?);
                }
                self.expect_consume(TokenKind::RParen)?;
                Ok(Expr { kind: ExprKind::Tuple(elements), loc })
            }
            TokenKind::RParen => {
                self.advance()?;
                Ok(first)
            }
            _ => Err(self.expected("`)` or `,` after expression in parentheses")),
        }
    }

    /// Entry: current is `{` and `target` is the type expression.
    fn parse_struct_init(&mut self, target: Expr, loc: CodeLoc) -> Result<Expr, FigError> {
        self.advance()?;
        let mut mode = None;
        let mut args = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.syntax_error("braces are not closed"));
            }
            if mode.is_none() {
                let detected = if self.at(TokenKind::Identifier) {
                    match self.peek_kind()? {
                        TokenKind::Colon => InitMode::Named,
                        TokenKind::Comma | TokenKind::RBrace => InitMode::Shorthand,
                        _ => InitMode::Positional,
                    }
                } else {
                    InitMode::Positional
                };
                mode = Some(detected);
            }
            match mode.unwrap_or(InitMode::Positional) {
                InitMode::Named => {
                    let name = self.ident_lexeme("field name")?;
                    self.advance()?;
                    self.expect_consume(TokenKind::Colon)?;
                    let value = self.parse_expression(0)?;
                    args.push(InitArg { name: Some(name), value });
                }
                InitMode::Shorthand => {
                    let name = self.ident_lexeme("field name")?;
                    let value = Expr { kind: ExprKind::Var(Rc::clone(&name)), loc: self.current.loc };
                    args.push(InitArg { name: Some(name), value });
                    self.advance()?;
                }
                InitMode::Positional => {
                    let value = self.parse_expression(0)?;
                    args.push(InitArg { name: None, value });
                }
            }
            if self.at(TokenKind::Comma) {
                self.advance()?;
            } else if !self.at(TokenKind::RBrace) {
                return Err(self.expected("`,` or `}` in struct initialization"));
            }
        }
        self.advance()?;
        Ok(Expr {
            kind: ExprKind::StructInit {
                target: Box::new(target),
                mode: mode.unwrap_or(InitMode::Positional),
                args,
            },
            loc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Stmt> {
        let file = Rc::new(SourceFile::new("test.fig", source));
        let mut parser = Parser::new(Lexer::new(source), file).expect("parser starts");
        parser.parse_program().expect("parses")
    }

    fn parse_expr(source: &str) -> Expr {
        let mut stmts = parse(&format!("{source};"));
        match stmts.remove(0).kind {
            StmtKind::Expression(e) => e,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    fn shape(expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(i)) => i.to_string(),
            ExprKind::Literal(Literal::Double(d)) => d.to_string(),
            ExprKind::Var(name) => name.to_string(),
            ExprKind::Unary { op, operand } => format!("({}{})", op.symbol(), shape(operand)),
            ExprKind::Binary { op, lhs, rhs } => {
                format!("({} {} {})", shape(lhs), op.symbol(), shape(rhs))
            }
            ExprKind::Ternary { cond, when_true, when_false } => {
                format!("({} ? {} : {})", shape(cond), shape(when_true), shape(when_false))
            }
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn precedence_ladder() {
        assert_eq!(shape(&parse_expr("1 + 2 * 3")), "(1 + (2 * 3))");
        assert_eq!(shape(&parse_expr("1 << 2 + 3")), "(1 << (2 + 3))");
        assert_eq!(shape(&parse_expr("1 & 2 | 3")), "((1 & 2) | 3)");
        assert_eq!(shape(&parse_expr("a == b and c or d")), "(((a == b) and c) or d)");
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(shape(&parse_expr("2 ** 3 ** 2")), "(2 ** (3 ** 2))");
    }

    #[test]
    fn assignment_is_right_associative() {
        assert_eq!(shape(&parse_expr("a = b = 1")), "(a = (b = 1))");
        assert_eq!(shape(&parse_expr("a += 1 + 2")), "(a += (1 + 2))");
    }

    #[test]
    fn unary_binds_tightest() {
        assert_eq!(shape(&parse_expr("-2 ** 2")), "((-2) ** 2)");
        assert_eq!(shape(&parse_expr("~1 + 1")), "((~1) + 1)");
    }

    #[test]
    fn ternary_nests_right() {
        assert_eq!(shape(&parse_expr("a ? 1 : b ? 2 : 3")), "(a ? 1 : (b ? 2 : 3))");
    }

    #[test]
    fn init_expr_modes() {
        let ExprKind::StructInit { mode, args, .. } = parse_expr("P {x: 1, y: 2}").kind else {
            panic!("expected init expr");
        };
        assert_eq!(mode, InitMode::Named);
        assert_eq!(args.len(), 2);

        let ExprKind::StructInit { mode, .. } = parse_expr("P {x, y}").kind else {
            panic!("expected init expr");
        };
        assert_eq!(mode, InitMode::Shorthand);

        let ExprKind::StructInit { mode, .. } = parse_expr("P {1, 2}").kind else {
            panic!("expected init expr");
        };
        assert_eq!(mode, InitMode::Positional);
    }

    #[test]
    fn node_positions_point_at_first_lexeme() {
        let stmts = parse("var x = 1;\n  x = 2;");
        assert_eq!((stmts[0].loc.line, stmts[0].loc.column), (1, 1));
        assert_eq!((stmts[1].loc.line, stmts[1].loc.column), (2, 3));
    }

    #[test]
    fn walrus_with_annotation_is_rejected() {
        let file = Rc::new(SourceFile::new("test.fig", "var x: Int := 1;"));
        let mut parser = Parser::new(Lexer::new("var x: Int := 1;"), file).unwrap();
        let err = parser.parse_program().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SyntaxError);
    }

    #[test]
    fn variadic_must_stand_alone() {
        let source = "func f(a, rest...) {}";
        let file = Rc::new(SourceFile::new("test.fig", source));
        let mut parser = Parser::new(Lexer::new(source), file).unwrap();
        assert!(parser.parse_program().is_err());
    }

    #[test]
    fn empty_source_is_empty_program() {
        assert!(parse("").is_empty());
    }

    #[test]
    fn statement_forms_parse() {
        let program = r#"
            import a.b.c;
            public const K: Int = 1;
            var inferred := 2;
            func add(a: Int, b: Int = 1) -> Int { return a + b; }
            struct P { public x: Int; const tag = "p"; public func show() { } }
            interface Greet { hello() -> String { return "hi"; } bye() -> String; }
            impl Greet for P { bye() { return "bye"; } }
            for var i = 0; i < 3; i += 1 { continue; }
            while false { break; }
            try { throw "x"; } catch (e: String) { } finally { }
        "#;
        assert_eq!(parse(program).len(), 10);
    }
}
