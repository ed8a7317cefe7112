//! Error kinds, the internal error carriers, and the public [`Exception`]
//! type the CLI renders.

use std::{fmt, rc::Rc};

use crate::{ast::CodeLoc, value::Value};

/// Every diagnostic the interpreter can raise.
///
/// The strum derives give the exact kind name used in rendered errors and in
/// the `String` form bound by `catch` for host-raised errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr)]
pub enum ErrorKind {
    SyntaxError,
    TypeError,
    ValueError,
    RedeclarationError,
    ImmutableError,
    UndeclaredIdentifierError,
    NoAttributeError,
    NoSubscriptableError,
    IndexOutOfRangeError,
    KeyError,
    ArgumentMismatchError,
    ArgumentTypeMismatchError,
    DefaultParameterTypeError,
    ReturnTypeMismatchError,
    StructInitArgumentMismatchError,
    StructFieldTypeMismatchError,
    StructFieldRedeclarationError,
    StructFieldNotFoundError,
    InterfaceSignatureMismatchError,
    DuplicateImplementError,
    DuplicateImplementMethodError,
    MissingImplementationError,
    RedundantImplementationError,
    UnsupportedOpError,
    UncaughtExceptionError,
    BreakOutsideLoopError,
    ContinueOutsideLoopError,
    RuntimeError,
    ModuleNotFoundError,
}

/// A loaded source file, shared by every error raised while evaluating it.
#[derive(Debug)]
pub struct SourceFile {
    pub path: String,
    pub lines: Vec<String>,
}

impl SourceFile {
    #[must_use]
    pub fn new(path: impl Into<String>, source: &str) -> Self {
        Self {
            path: path.into(),
            lines: source.lines().map(|l| l.trim_end_matches('\r').to_owned()).collect(),
        }
    }
}

/// A host-raised diagnostic. Position and source are attached at the raise
/// site; the scope-name stack is captured once, at the innermost frame.
#[derive(Debug, Clone)]
pub struct FigError {
    pub kind: ErrorKind,
    pub message: String,
    pub loc: Option<CodeLoc>,
    pub source: Option<Rc<SourceFile>>,
    pub frames: Vec<String>,
}

impl FigError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), loc: None, source: None, frames: Vec::new() }
    }

    /// Attaches a position unless one is already set.
    #[must_use]
    pub fn at(mut self, loc: CodeLoc) -> Self {
        if self.loc.is_none() {
            self.loc = Some(loc);
        }
        self
    }

    #[must_use]
    pub fn in_source(mut self, source: &Rc<SourceFile>) -> Self {
        if self.source.is_none() {
            self.source = Some(Rc::clone(source));
        }
        self
    }

    #[must_use]
    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        if self.frames.is_empty() {
            self.frames = frames;
        }
        self
    }
}

/// An error in flight during evaluation: either a host diagnostic or a value
/// the program threw.
#[derive(Debug)]
pub enum RunError {
    Raised(FigError),
    Thrown {
        value: Value,
        loc: CodeLoc,
        source: Option<Rc<SourceFile>>,
        frames: Vec<String>,
    },
}

pub type RunResult<T> = Result<T, RunError>;

impl From<FigError> for RunError {
    fn from(e: FigError) -> Self {
        Self::Raised(e)
    }
}

/// A non-fatal lexer diagnostic.
#[derive(Debug, Clone)]
pub struct Warning {
    pub id: u8,
    pub message: String,
    pub loc: CodeLoc,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning[W{}]: {} at {}", self.id, self.message, self.loc)
    }
}

/// The error surface the embedder sees: one kind, one message, the resolved
/// source position, and the scope stack at the failure point.
#[derive(Debug, Clone)]
pub struct Exception {
    pub kind: ErrorKind,
    pub message: String,
    pub path: Option<String>,
    pub loc: Option<CodeLoc>,
    pub source_line: Option<String>,
    pub frames: Vec<String>,
}

impl Exception {
    pub(crate) fn from_error(err: FigError) -> Self {
        let path = err.source.as_ref().map(|s| s.path.clone());
        let source_line = match (&err.source, err.loc) {
            (Some(src), Some(loc)) => src.lines.get(loc.line as usize - 1).cloned(),
            _ => None,
        };
        Self {
            kind: err.kind,
            message: err.message,
            path,
            loc: err.loc,
            source_line,
            frames: err.frames,
        }
    }

    pub(crate) fn from_run_error(err: RunError) -> Self {
        match err {
            RunError::Raised(e) => Self::from_error(e),
            RunError::Thrown { value, loc, source, frames } => {
                let e = FigError::new(
                    ErrorKind::UncaughtExceptionError,
                    format!("Uncaught exception: {}", value.display_plain()),
                )
                .at(loc)
                .with_frames(frames);
                let e = match source {
                    Some(src) => e.in_source(&src),
                    None => e,
                };
                Self::from_error(e)
            }
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let (Some(path), Some(loc)) = (&self.path, self.loc) {
            write!(f, "\n  --> {path}:{loc}")?;
            if let Some(line) = &self.source_line {
                let caret_pad = " ".repeat(loc.column.saturating_sub(1) as usize);
                write!(f, "\n   |\n{:>3} | {line}\n   | {caret_pad}^", loc.line)?;
            }
        }
        if !self.frames.is_empty() {
            write!(f, "\nstack trace (outermost first):")?;
            for (i, frame) in self.frames.iter().enumerate() {
                write!(f, "\n  #{i} {frame}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Exception {}
