//! Module loading: `import a.b.c;`.
//!
//! The path resolves against the directory of the currently-evaluated
//! source, then `<install>/Library`, then `<install>/Library/fpm`. Each
//! module evaluates in a fresh parentless scope seeded with the builtin
//! values; its impl registry merges into the importing scope and the module
//! itself binds under the last path segment. `_builtins` is special: it
//! installs the builtin function table instead of loading a file.

use std::{
    path::{Path, PathBuf},
    rc::Rc,
};

use crate::{
    ast::{AccessModifier, CodeLoc},
    env::{Env, Scope, ScopeKind},
    exception::{ErrorKind, FigError, RunError, RunResult, SourceFile},
    interp::{Evaluator, Flow},
    io::{PrintWriter, ReadInput},
    lexer::Lexer,
    parser::Parser,
    value::{Module, Value},
};

impl<W: PrintWriter, R: ReadInput> Evaluator<'_, W, R> {
    pub(crate) fn exec_import(&mut self, path: &[Rc<str>], env: &Env, loc: CodeLoc) -> RunResult<Flow> {
        let module_name = path.last().expect("an import path has at least one segment");
        if &**module_name == "_builtins" {
            self.register_builtin_functions(env)
                .map_err(|e| self.locate(e, loc, env))?;
            return Ok(Flow::Normal(Value::Null));
        }

        let file = self
            .resolve_module_path(path)
            .map_err(|e| RunError::Raised(e.with_frames(env.frames())))?;
        let module_env = self.load_module(&file)?;

        module_env.merge_impls_into(env);

        if env.contains_in_this_scope(module_name) {
            return Err(self.error(
                ErrorKind::RedeclarationError,
                format!("`{module_name}` has already been declared"),
                loc,
                env,
            ));
        }
        env.define(
            module_name,
            self.types.module(),
            AccessModifier::PublicConst,
            Value::Module(Rc::new(Module { name: Rc::clone(module_name), env: module_env })),
        )
        .map_err(|e| self.locate(e, loc, env))?;
        Ok(Flow::Normal(Value::Null))
    }

    /// Walks the search roots for the first segment, then descends the
    /// remaining segments. A directory segment must contain a file named
    /// after itself to terminate the path.
    fn resolve_module_path(&self, parts: &[Rc<str>]) -> Result<PathBuf, FigError> {
        let not_found = |segment: &str| {
            FigError::new(
                ErrorKind::ModuleNotFoundError,
                format!("Could not find module `{segment}`"),
            )
        };

        let mut roots: Vec<PathBuf> = Vec::new();
        let current = PathBuf::from(&self.current_source().path);
        roots.push(current.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf));
        if let Ok(exe) = std::env::current_exe()
            && let Some(install) = exe.parent()
        {
            roots.push(install.join("Library"));
            roots.push(install.join("Library").join("fpm"));
        }

        let first = &*parts[0];
        let mut dir = None;
        let mut file = None;
        for root in &roots {
            let candidate = root.join(format!("{first}.fig"));
            if candidate.is_file() {
                dir = Some(root.clone());
                file = Some(candidate);
                break;
            }
            let sub = root.join(first);
            if sub.is_dir() {
                let inner = sub.join(format!("{first}.fig"));
                if inner.is_file() {
                    dir = Some(sub);
                    file = Some(inner);
                    break;
                }
            }
        }
        let (mut dir, mut file) = match (dir, file) {
            (Some(dir), Some(file)) => (dir, file),
            _ => return Err(not_found(first)),
        };

        for (i, segment) in parts.iter().enumerate().skip(1) {
            let segment = &**segment;
            let terminal = i == parts.len() - 1;
            let as_file = dir.join(format!("{segment}.fig"));
            if terminal && as_file.is_file() {
                file = as_file;
                continue;
            }
            let as_dir = dir.join(segment);
            if !as_dir.is_dir() {
                return Err(not_found(segment));
            }
            dir = as_dir;
            if terminal {
                file = dir.join(format!("{segment}.fig"));
                if !file.is_file() {
                    return Err(not_found(segment));
                }
            }
        }
        Ok(file)
    }

    /// Parses and evaluates one module file in a fresh parentless scope.
    fn load_module(&mut self, path: &Path) -> RunResult<Env> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            RunError::Raised(FigError::new(
                ErrorKind::RuntimeError,
                format!("Could not read module file {}: {e}", path.display()),
            ))
        })?;
        let source_file = Rc::new(SourceFile::new(path.display().to_string(), &source));

        let lexer = Lexer::new(&source);
        let mut parser = Parser::new(lexer, Rc::clone(&source_file)).map_err(RunError::Raised)?;
        let program = parser.parse_program().map_err(RunError::Raised)?;

        let module_env = Scope::new(
            format!("<Module {}>", path.display()),
            ScopeKind::Module,
            None,
        );
        self.sources.push(source_file);
        let seeded = self.register_builtin_values(&module_env);
        let result = match seeded {
            Err(e) => {
                let source = self.current_source();
                Err(RunError::Raised(e.in_source(&source)))
            }
            Ok(()) => self.run_program(&program, &module_env),
        };
        self.sources.pop();
        result?;
        Ok(module_env)
    }
}
