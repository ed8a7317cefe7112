//! Failure semantics: error kinds, positions, catch matching, propagation.

use fig::{CollectStringPrint, ErrorKind, Exception, QueueInput, Runner};
use pretty_assertions::assert_eq;

fn run(source: &str) -> Result<String, Exception> {
    let runner = Runner::new(source.to_owned(), "test.fig")?;
    let mut print = CollectStringPrint::new();
    let mut input = QueueInput::new("");
    runner.run(&mut print, &mut input)?;
    Ok(print.into_output())
}

fn run_ok(source: &str) -> String {
    match run(source) {
        Ok(output) => output,
        Err(err) => panic!("program failed:\n{err}"),
    }
}

fn run_err(source: &str) -> Exception {
    match run(source) {
        Ok(output) => panic!("program unexpectedly succeeded with output {output:?}"),
        Err(err) => err,
    }
}

#[test]
fn undeclared_identifier() {
    let err = run_err("x;");
    assert_eq!(err.kind, ErrorKind::UndeclaredIdentifierError);
}

#[test]
fn error_positions_are_one_based() {
    let err = run_err("var y = 1;\n  z;");
    assert_eq!(err.kind, ErrorKind::UndeclaredIdentifierError);
    let loc = err.loc.expect("runtime errors carry a position");
    assert_eq!((loc.line, loc.column), (2, 3));
    assert_eq!(err.source_line.as_deref(), Some("  z;"));
}

#[test]
fn redeclaration() {
    let err = run_err("var a = 1; var a = 2;");
    assert_eq!(err.kind, ErrorKind::RedeclarationError);
}

#[test]
fn immutable_assignment() {
    let err = run_err("const c = 1; c = 2;");
    assert_eq!(err.kind, ErrorKind::ImmutableError);
    let err = run_err("final f = 1; f = 2;");
    assert_eq!(err.kind, ErrorKind::ImmutableError);
}

#[test]
fn declared_types_are_enforced() {
    let err = run_err(r#"var x: Int = 1; x = "s";"#);
    assert_eq!(err.kind, ErrorKind::TypeError);
    let err = run_err(r#"var x: Int = "s";"#);
    assert_eq!(err.kind, ErrorKind::TypeError);
    let err = run_err(r#"var n := 5; n = "s";"#);
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn typed_definition_without_initializer_gets_zero_value() {
    let output = run_ok(
        r"
        var n: Int;
        var s: String;
        var b: Bool;
        __fstdout_println(n);
        __fstdout_println(s.length());
        __fstdout_println(b);
        ",
    );
    assert_eq!(output, "0\n0\nfalse\n");
}

#[test]
fn break_and_continue_outside_loops() {
    assert_eq!(run_err("break;").kind, ErrorKind::BreakOutsideLoopError);
    assert_eq!(run_err("continue;").kind, ErrorKind::ContinueOutsideLoopError);
    // A function body called from inside a loop is not "in" the loop.
    let err = run_err(
        r"
        func leak() { break; }
        for var i = 0; i < 1; i += 1 { leak(); }
        ",
    );
    assert_eq!(err.kind, ErrorKind::BreakOutsideLoopError);
}

#[test]
fn arithmetic_failures() {
    assert_eq!(run_err("1 / 0;").kind, ErrorKind::ValueError);
    assert_eq!(run_err("1 % 0;").kind, ErrorKind::ValueError);
    assert_eq!(run_err(r#"1 + "s";"#).kind, ErrorKind::TypeError);
    assert_eq!(run_err(r#"1 < "s";"#).kind, ErrorKind::TypeError);
    assert_eq!(run_err(r#"1 & true;"#).kind, ErrorKind::TypeError);
}

#[test]
fn caret_assign_is_unsupported() {
    let err = run_err("var x = 1; x ^= 2;");
    assert_eq!(err.kind, ErrorKind::UnsupportedOpError);
}

#[test]
fn conditions_must_be_bool() {
    assert_eq!(run_err("if 1 { }").kind, ErrorKind::TypeError);
    assert_eq!(run_err("while 1 { }").kind, ErrorKind::TypeError);
    assert_eq!(run_err(r#"var x = 1 ? 2 : 3;"#).kind, ErrorKind::TypeError);
}

#[test]
fn index_and_key_failures() {
    assert_eq!(run_err("var l = [1, 2]; l[2];").kind, ErrorKind::IndexOutOfRangeError);
    assert_eq!(run_err(r#"var m = {}; m["k"];"#).kind, ErrorKind::KeyError);
    assert_eq!(run_err("var n = 1; n[0];").kind, ErrorKind::NoSubscriptableError);
}

#[test]
fn call_discipline_failures() {
    assert_eq!(run_err("func f(a) { } f();").kind, ErrorKind::ArgumentMismatchError);
    assert_eq!(
        run_err(r#"func f(a: Int) { } f("s");"#).kind,
        ErrorKind::ArgumentTypeMismatchError
    );
    assert_eq!(
        run_err(r#"func f() -> Int { return "s"; } f();"#).kind,
        ErrorKind::ReturnTypeMismatchError
    );
    assert_eq!(
        run_err(r#"func f(a: Int = "s") { } f();"#).kind,
        ErrorKind::DefaultParameterTypeError
    );
    assert_eq!(run_err("__fmath_sqrt(1, 2);").kind, ErrorKind::ArgumentMismatchError);
}

#[test]
fn struct_failures() {
    let common = r"struct P { x: Int; y: Int; }";
    assert_eq!(
        run_err(&format!("{common} var p = P{{1, 2, 3}};")).kind,
        ErrorKind::StructInitArgumentMismatchError
    );
    assert_eq!(
        run_err(&format!(r#"{common} var p = P{{1, "s"}};"#)).kind,
        ErrorKind::StructFieldTypeMismatchError
    );
    assert_eq!(
        run_err(&format!("{common} var p = P{{x: 1, z: 2}};")).kind,
        ErrorKind::StructFieldNotFoundError
    );
    assert_eq!(
        run_err("struct Q { x: Int; x: Int; }").kind,
        ErrorKind::RedeclarationError
    );
}

#[test]
fn interface_impl_failures() {
    let iface = r"interface I { a() -> Int; b() -> Int; } struct S {}";
    assert_eq!(
        run_err(&format!("{iface} impl I for S {{ a() {{ return 1; }} }}")).kind,
        ErrorKind::MissingImplementationError
    );
    assert_eq!(
        run_err(&format!(
            "{iface} impl I for S {{ a() {{ return 1; }} b() {{ return 2; }} c() {{ return 3; }} }}"
        ))
        .kind,
        ErrorKind::RedundantImplementationError
    );
    assert_eq!(
        run_err(&format!(
            "{iface} impl I for S {{ a(wrong) {{ return 1; }} b() {{ return 2; }} }}"
        ))
        .kind,
        ErrorKind::InterfaceSignatureMismatchError
    );
    let dup = r"
        interface I { a() -> Int; }
        struct S {}
        impl I for S { a() { return 1; } }
        impl I for S { a() { return 2; } }
    ";
    assert_eq!(run_err(dup).kind, ErrorKind::DuplicateImplementError);
}

#[test]
fn builtin_operators_cannot_be_overloaded() {
    let err = run_err(
        r"
        interface Operation { Add(a, b) -> Int; }
        impl Operation for Int { Add(a, b) { return 0; } }
        ",
    );
    assert_eq!(err.kind, ErrorKind::TypeError);
}

#[test]
fn throw_null_is_rejected() {
    assert_eq!(run_err("throw null;").kind, ErrorKind::TypeError);
}

#[test]
fn uncaught_throw_reaches_the_boundary() {
    let err = run_err(r#"throw "boom";"#);
    assert_eq!(err.kind, ErrorKind::UncaughtExceptionError);
    assert!(err.message.contains("boom"), "message was {:?}", err.message);
}

#[test]
fn syntax_errors_carry_positions() {
    let err = run_err("var x = ;");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    assert!(err.loc.is_some());
    let err = run_err("var s = \"unterminated");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
    let err = run_err("/* unterminated");
    assert_eq!(err.kind, ErrorKind::SyntaxError);
}

#[test]
fn host_errors_are_catchable_as_strings() {
    let output = run_ok(
        r"
        try { var l = [1]; l[5]; } catch (e: String) { __fstdout_println(e); }
        ",
    );
    assert!(output.starts_with("IndexOutOfRangeError:"), "output was {output:?}");
}

#[test]
fn unmatched_catches_propagate_outward() {
    let output = run_ok(
        r#"
        try {
            try { throw 5; } catch (e: String) { __fstdout_println("inner"); }
        } catch (e: Int) { __fstdout_println("outer"); }
        "#,
    );
    assert_eq!(output, "outer\n");

    let err = run_err(r#"try { throw 5; } catch (e: String) { }"#);
    assert_eq!(err.kind, ErrorKind::UncaughtExceptionError);
}

#[test]
fn typed_catches_match_interface_membership() {
    let output = run_ok(
        r#"
        struct Oops { msg: String; }
        interface Desc { what() -> String; }
        impl Desc for Oops { what() { return msg; } }
        try { throw Oops{"bad"}; } catch (e: Desc) { __fstdout_println(e.what()); }
        "#,
    );
    assert_eq!(output, "bad\n");
}

#[test]
fn finally_overrides_non_normal_outcomes() {
    let output = run_ok(
        r"
        func f() {
            try { return 1; } catch (e) { } finally { return 2; }
        }
        __fstdout_println(f());
        ",
    );
    assert_eq!(output, "2\n");
}

#[test]
fn stack_traces_list_scopes_outermost_first() {
    let err = run_err("func f() { g(); } f();");
    assert_eq!(err.frames.first().map(String::as_str), Some("<Global>"));
    assert!(
        err.frames.iter().any(|f| f.contains("<Function f()>")),
        "frames were {:?}",
        err.frames
    );
}

#[test]
fn lexer_warnings_are_available_before_evaluation() {
    let runner = Runner::new("var x = 1;".to_owned(), "test.fig").expect("program parses");
    // No run() yet: warnings come out of the parse phase.
    let warnings = runner.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].id, 2);

    let mut print = CollectStringPrint::new();
    let mut input = QueueInput::new("");
    runner.run(&mut print, &mut input).expect("program runs");
}
