//! The public [`Runner`] entry point and the evaluator state it drives.

use std::{path::PathBuf, rc::Rc, time::Instant};

use crate::{
    ast::{CodeLoc, Stmt},
    env::{Env, Scope, ScopeKind},
    exception::{ErrorKind, Exception, FigError, RunError, RunResult, SourceFile, Warning},
    io::{PrintWriter, ReadInput},
    lexer::Lexer,
    parser::Parser,
    type_info::{TypeInfo, TypeRegistry},
    value::Value,
};

/// How a statement finished. Errors travel separately, as the `Err` arm of
/// [`RunResult`].
pub(crate) enum Flow {
    Normal(Value),
    Return(Value),
    Break,
    Continue,
}

/// One parsed program, ready to evaluate.
///
/// Construction lexes and parses; evaluation is a separate step, so lexer
/// warnings can be reported before the program produces any output.
pub struct Runner {
    source_file: Rc<SourceFile>,
    program: Vec<Stmt>,
    warnings: Vec<Warning>,
}

impl Runner {
    /// Lexes and parses the program. Lexical and syntactic failures surface
    /// here, as an [`Exception`].
    pub fn new(source: String, path: impl Into<PathBuf>) -> Result<Self, Exception> {
        let path = path.into();
        let source_file = Rc::new(SourceFile::new(path.to_string_lossy(), &source));

        let lexer = Lexer::new(&source);
        let mut parser = Parser::new(lexer, Rc::clone(&source_file)).map_err(Exception::from_error)?;
        let program = parser.parse_program();
        let warnings = parser.take_warnings();
        let program = program.map_err(Exception::from_error)?;
        Ok(Self { source_file, program, warnings })
    }

    /// Lexer warnings, available as soon as [`Self::new`] returns.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Evaluates the parsed program in a fresh session. Runtime failures and
    /// uncaught user throws surface as an [`Exception`].
    pub fn run(&self, print: &mut impl PrintWriter, input: &mut impl ReadInput) -> Result<(), Exception> {
        let mut evaluator = Evaluator::new(print, input, Rc::clone(&self.source_file));
        let global = Scope::new("<Global>", ScopeKind::Global, None);
        evaluator
            .register_builtin_values(&global)
            .and_then(|()| evaluator.register_builtin_functions(&global))
            .map_err(|e| Exception::from_error(e.in_source(&self.source_file)))?;
        evaluator.run_program(&self.program, &global).map_err(Exception::from_run_error)?;
        Ok(())
    }
}

pub(crate) struct Evaluator<'io, W, R> {
    pub(crate) types: TypeRegistry,
    next_fn_id: u64,
    pub(crate) print: &'io mut W,
    pub(crate) input: &'io mut R,
    /// Stack of source files; the top is the module currently evaluating.
    pub(crate) sources: Vec<Rc<SourceFile>>,
    pub(crate) started: Instant,
}

impl<'io, W: PrintWriter, R: ReadInput> Evaluator<'io, W, R> {
    pub(crate) fn new(print: &'io mut W, input: &'io mut R, source: Rc<SourceFile>) -> Self {
        Self {
            types: TypeRegistry::new(),
            next_fn_id: 0,
            print,
            input,
            sources: vec![source],
            started: Instant::now(),
        }
    }

    pub(crate) fn next_function_id(&mut self) -> u64 {
        self.next_fn_id += 1;
        self.next_fn_id
    }

    pub(crate) fn current_source(&self) -> Rc<SourceFile> {
        Rc::clone(self.sources.last().expect("source stack is never empty"))
    }

    /// Builds a positioned error with the current source file and the scope
    /// stack of `env` attached.
    pub(crate) fn error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        loc: CodeLoc,
        env: &Env,
    ) -> RunError {
        RunError::Raised(
            FigError::new(kind, message)
                .at(loc)
                .in_source(&self.current_source())
                .with_frames(env.frames()),
        )
    }

    /// Attaches position/source/frames to an error raised without context.
    pub(crate) fn locate(&self, err: FigError, loc: CodeLoc, env: &Env) -> RunError {
        RunError::Raised(err.at(loc).in_source(&self.current_source()).with_frames(env.frames()))
    }

    pub(crate) fn thrown(&self, value: Value, loc: CodeLoc, env: &Env) -> RunError {
        RunError::Thrown {
            value,
            loc,
            source: Some(self.current_source()),
            frames: env.frames(),
        }
    }

    /// Runs a parsed program top to bottom in `env`. A user value thrown out
    /// of the top level becomes `UncaughtExceptionError` here, at the
    /// evaluator boundary; a top-level `return` stops execution early.
    pub(crate) fn run_program(&mut self, program: &[Stmt], env: &Env) -> RunResult<()> {
        for stmt in program {
            let flow = self.exec_stmt(stmt, env).map_err(|err| match err {
                RunError::Thrown { value, loc, source, frames } => RunError::Raised({
                    let e = FigError::new(
                        ErrorKind::UncaughtExceptionError,
                        format!("Uncaught exception: {}", value.display_plain()),
                    )
                    .at(loc)
                    .with_frames(frames);
                    match source {
                        Some(src) => e.in_source(&src),
                        None => e,
                    }
                }),
                raised => raised,
            })?;
            match flow {
                Flow::Return(_) => return Ok(()),
                Flow::Normal(_) | Flow::Break | Flow::Continue => {}
            }
        }
        Ok(())
    }

    /// Resolves a type name to its identity: the name must be bound to a
    /// struct type or interface value in `env`.
    pub(crate) fn resolve_type_name(
        &mut self,
        name: &str,
        env: &Env,
        loc: CodeLoc,
    ) -> RunResult<TypeInfo> {
        let Some(slot) = env.lookup(name) else {
            return Err(self.error(
                ErrorKind::UndeclaredIdentifierError,
                format!("Type `{name}` is not defined"),
                loc,
                env,
            ));
        };
        let value = slot.borrow().value.clone();
        match &value {
            Value::Struct(st) => Ok(st.type_info.clone()),
            Value::Interface(it) => Ok(it.type_info.clone()),
            other => Err(self.error(
                ErrorKind::TypeError,
                format!("`{name}` is not a type, it is '{}'", other.pretty_type(&self.types)),
                loc,
                env,
            )),
        }
    }
}
