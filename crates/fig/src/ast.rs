//! The abstract syntax tree: expressions, statements, operators and
//! parameter lists, each node carrying its source position.

use std::{fmt, rc::Rc};

/// 1-based line/column of the first lexeme that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Access modifier of a variable slot or struct field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessModifier {
    Normal,
    Const,
    Public,
    PublicConst,
}

impl AccessModifier {
    #[must_use]
    pub fn from_flags(is_public: bool, is_const: bool) -> Self {
        match (is_public, is_const) {
            (false, false) => Self::Normal,
            (false, true) => Self::Const,
            (true, false) => Self::Public,
            (true, true) => Self::PublicConst,
        }
    }

    #[must_use]
    pub fn is_const(self) -> bool {
        matches!(self, Self::Const | Self::PublicConst)
    }

    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Self::Public | Self::PublicConst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    And,
    Or,
    Not,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Is,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
    Ref,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    CaretAssign,
}

impl Operator {
    /// Surface syntax for diagnostics.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::And => "and",
            Self::Or => "or",
            Self::Not => "!",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Is => "is",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitNot => "~",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Ref => "&",
            Self::Assign => "=",
            Self::AddAssign => "+=",
            Self::SubAssign => "-=",
            Self::MulAssign => "*=",
            Self::DivAssign => "/=",
            Self::ModAssign => "%=",
            Self::CaretAssign => "^=",
        }
    }

    #[must_use]
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::AddAssign
                | Self::SubAssign
                | Self::MulAssign
                | Self::DivAssign
                | Self::ModAssign
                | Self::CaretAssign
        )
    }
}

#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Rc<str>),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    Positional,
    Named,
    Shorthand,
}

#[derive(Debug, Clone)]
pub struct InitArg {
    pub name: Option<Rc<str>>,
    pub value: Expr,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Var(Rc<str>),
    Unary {
        op: Operator,
        operand: Box<Expr>,
    },
    Binary {
        op: Operator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },
    FunctionLiteral(Rc<FunctionLiteral>),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Member {
        base: Box<Expr>,
        member: Rc<str>,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    StructInit {
        target: Box<Expr>,
        mode: InitMode,
        args: Vec<InitArg>,
    },
}

/// `func(params) { .. }` / `func(params) => expr`; an expression body is
/// wrapped into a synthetic `return` block at parse time.
#[derive(Debug, Clone)]
pub struct FunctionLiteral {
    pub params: FunctionParams,
    pub body: Rc<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: Rc<str>,
    pub ty: Option<Rc<str>>,
}

#[derive(Debug, Clone)]
pub struct DefaultParam {
    pub name: Rc<str>,
    pub ty: Option<Rc<str>>,
    pub default: Expr,
}

#[derive(Debug, Clone, Default)]
pub struct FunctionParams {
    pub positional: Vec<Param>,
    pub defaulted: Vec<DefaultParam>,
    /// A variadic tail parameter must be the only parameter.
    pub variadic: Option<Rc<str>>,
}

impl FunctionParams {
    /// Number of declarable parameters (positional + defaulted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len() + self.defaulted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.variadic.is_none()
    }

    /// Interface signature equality: parameter names, declared types and
    /// default presence, in order.
    #[must_use]
    pub fn signature_matches(&self, other: &Self) -> bool {
        if self.positional != other.positional {
            return false;
        }
        if self.defaulted.len() != other.defaulted.len() {
            return false;
        }
        let defaults_match = self
            .defaulted
            .iter()
            .zip(&other.defaulted)
            .all(|(a, b)| a.name == b.name && a.ty == b.ty);
        defaults_match && self.variadic == other.variadic
    }

    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for p in &self.positional {
            match &p.ty {
                Some(ty) => parts.push(format!("{}: {ty}", p.name)),
                None => parts.push(p.name.to_string()),
            }
        }
        for p in &self.defaulted {
            match &p.ty {
                Some(ty) => parts.push(format!("{}: {ty} = ..", p.name)),
                None => parts.push(format!("{} = ..", p.name)),
            }
        }
        if let Some(v) = &self.variadic {
            parts.push(format!("{v}..."));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub loc: CodeLoc,
}

/// Declared type of a variable definition.
#[derive(Debug, Clone)]
pub enum TypeAnnotation {
    /// No annotation: the slot accepts anything.
    Default,
    /// `: TypeName`.
    Named(Rc<str>),
    /// `:=`: the declared type follows the initializer's runtime type.
    Inferred,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub is_public: bool,
    pub is_const: bool,
    pub name: Rc<str>,
    pub annotation: TypeAnnotation,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub is_public: bool,
    pub name: Rc<str>,
    pub params: FunctionParams,
    pub ret_type: Option<Rc<str>>,
    pub body: Rc<Block>,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub access: AccessModifier,
    pub name: Rc<str>,
    pub ty: Option<Rc<str>>,
    pub default: Option<Expr>,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub is_public: bool,
    pub name: Rc<str>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<Rc<FunctionDef>>,
}

#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    pub name: Rc<str>,
    pub params: FunctionParams,
    pub ret_type: Rc<str>,
    pub default_body: Option<Rc<Block>>,
}

#[derive(Debug, Clone)]
pub struct InterfaceDef {
    pub is_public: bool,
    pub name: Rc<str>,
    pub bundles: Vec<Rc<str>>,
    pub methods: Vec<InterfaceMethod>,
}

#[derive(Debug, Clone)]
pub struct ImplMethod {
    pub name: Rc<str>,
    pub params: FunctionParams,
    pub body: Rc<Block>,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone)]
pub struct ImplDef {
    pub interface_name: Rc<str>,
    pub struct_name: Rc<str>,
    pub methods: Vec<ImplMethod>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub var_name: Rc<str>,
    pub ty: Option<Rc<str>>,
    pub body: Block,
    pub loc: CodeLoc,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expression(Expr),
    Block(Block),
    VarDef(VarDef),
    FunctionDef(Rc<FunctionDef>),
    StructDef(Rc<StructDef>),
    InterfaceDef(Rc<InterfaceDef>),
    Impl(Rc<ImplDef>),
    If {
        cond: Expr,
        body: Block,
        elifs: Vec<(Expr, Block)>,
        else_body: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        init: Box<Stmt>,
        cond: Expr,
        step: Option<Box<Stmt>>,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Throw(Expr),
    Import(Vec<Rc<str>>),
}
