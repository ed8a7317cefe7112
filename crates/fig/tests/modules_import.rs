//! Module resolution and loading, driven through temp directories.

use std::{fs, path::Path};

use fig::{CollectStringPrint, ErrorKind, Exception, QueueInput, Runner};
use pretty_assertions::assert_eq;

fn run_in(dir: &Path, source: &str) -> Result<String, Exception> {
    let runner = Runner::new(source.to_owned(), dir.join("main.fig"))?;
    let mut print = CollectStringPrint::new();
    let mut input = QueueInput::new("");
    runner.run(&mut print, &mut input)?;
    Ok(print.into_output())
}

#[test]
fn module_constants_are_importable() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("m.fig"), "public const K = 42;\n").expect("write module");

    let output = run_in(dir.path(), "import m;\n__fstdout_println(m.K);").expect("program runs");
    assert_eq!(output, "42\n");
}

#[test]
fn nested_module_paths() {
    let dir = tempfile::tempdir().expect("temp dir");
    let pkg = dir.path().join("pkg");
    fs::create_dir(&pkg).expect("create pkg");
    // A directory segment must contain a file named after itself.
    fs::write(pkg.join("pkg.fig"), "").expect("write pkg marker");
    fs::write(pkg.join("util.fig"), "public const N = 7;\n").expect("write util");

    let output =
        run_in(dir.path(), "import pkg.util;\n__fstdout_println(util.N);").expect("program runs");
    assert_eq!(output, "7\n");
}

#[test]
fn missing_modules_are_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = run_in(dir.path(), "import nothing_here;").expect_err("import fails");
    assert_eq!(err.kind, ErrorKind::ModuleNotFoundError);
}

#[test]
fn non_public_module_members_are_hidden() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("m.fig"), "const secret = 1;\n").expect("write module");

    let err = run_in(dir.path(), "import m;\nm.secret;").expect_err("access fails");
    assert_eq!(err.kind, ErrorKind::NoAttributeError);
}

#[test]
fn impl_registries_merge_into_the_importer() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("shapes.fig"),
        r"
        public struct Square { side: Int; }
        public interface Area { area() -> Int; }
        impl Area for Square { area() { return side * side; } }
        ",
    )
    .expect("write module");

    let output = run_in(
        dir.path(),
        r"
        import shapes;
        var Square = shapes.Square;
        var sq = Square{3};
        __fstdout_println(sq.area());
        ",
    )
    .expect("program runs");
    assert_eq!(output, "9\n");
}

#[test]
fn module_functions_keep_their_module_scope() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("counter.fig"),
        r"
        var hidden = 0;
        public func bump() { hidden += 1; return hidden; }
        ",
    )
    .expect("write module");

    let output = run_in(
        dir.path(),
        r"
        import counter;
        counter.bump();
        __fstdout_println(counter.bump());
        ",
    )
    .expect("program runs");
    assert_eq!(output, "2\n");
}

#[test]
fn modules_see_builtin_values_but_not_the_function_table() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join("printer.fig"),
        r#"
        import _builtins;
        public func shout(text: String) { __fstdout_println(text); }
        "#,
    )
    .expect("write module");

    let output = run_in(
        dir.path(),
        r#"
        import printer;
        printer.shout("hello");
        "#,
    )
    .expect("program runs");
    assert_eq!(output, "hello\n");
}

#[test]
fn throwing_module_fails_the_import() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join("bad.fig"), "throw \"broken module\";\n").expect("write module");

    let err = run_in(dir.path(), "import bad;").expect_err("import fails");
    assert_eq!(err.kind, ErrorKind::UncaughtExceptionError);
}
