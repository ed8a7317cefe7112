//! End-to-end runs through the public `Runner` surface.

use fig::{CollectStringPrint, Exception, QueueInput, Runner};
use pretty_assertions::assert_eq;

fn run_with_input(source: &str, input: &str) -> Result<String, Exception> {
    let runner = Runner::new(source.to_owned(), "test.fig")?;
    let mut print = CollectStringPrint::new();
    let mut input = QueueInput::new(input);
    runner.run(&mut print, &mut input)?;
    Ok(print.into_output())
}

fn run_ok(source: &str) -> String {
    match run_with_input(source, "") {
        Ok(output) => output,
        Err(err) => panic!("program failed:\n{err}"),
    }
}

#[test]
fn closure_counter() {
    let output = run_ok(
        r"
        func makeCounter() { var n = 0; return func() { n += 1; return n; }; }
        var counter = makeCounter();
        __fstdout_println(counter());
        __fstdout_println(counter());
        __fstdout_println(counter());
        ",
    );
    assert_eq!(output, "1\n2\n3\n");
}

#[test]
fn operator_overloading() {
    let output = run_ok(
        r"
        struct V { x: Int; y: Int; }
        interface Operation { Add(a, b) -> V; }
        impl Operation for V { Add(a, b) { return V{ x: a.x + b.x, y: a.y + b.y }; } }
        var r = V{1, 2} + V{3, 4};
        __fstdout_println(r.x);
        __fstdout_println(r.y);
        ",
    );
    assert_eq!(output, "4\n6\n");
}

#[test]
fn interface_default_fallback() {
    let output = run_ok(
        r#"
        interface Greet { hello() -> String { return "hi"; } }
        struct P {}
        impl Greet for P {}
        __fstdout_println(P{}.hello());
        "#,
    );
    assert_eq!(output, "hi\n");
}

#[test]
fn try_catch_with_finally() {
    let output = run_ok(
        r#"
        try { throw "boom"; } catch (e) { __fstdout_println(e); } finally { __fstdout_println("done"); }
        "#,
    );
    assert_eq!(output, "boom\ndone\n");
}

#[test]
fn floor_modulo() {
    let output = run_ok("__fstdout_println((-7) % 3);");
    assert_eq!(output, "2\n");
}

#[test]
fn empty_source_runs_clean() {
    assert_eq!(run_ok(""), "");
}

#[test]
fn print_returns_argument_count() {
    let output = run_ok(r#"__fstdout_println(__fstdout_print("a", 1, true));"#);
    assert_eq!(output, "a1true3\n");
}

#[test]
fn stdin_builtins() {
    let output = run_with_input(
        r"
        __fstdout_println(__fstdin_readln());
        __fstdout_println(__fstdin_read());
        ",
        "hello world\nfoo bar\n",
    )
    .expect("program runs");
    assert_eq!(output, "hello world\nfoo\n");
}

#[test]
fn int_parse_round_trips_through_display() {
    let output = run_ok(r#"__fstdout_println(__fvalue_string_from(__fvalue_int_parse("123")));"#);
    assert_eq!(output, "123\n");
}

#[test]
fn value_type_names() {
    let output = run_ok(
        r#"
        __fstdout_println(__fvalue_type(1));
        __fstdout_println(__fvalue_type("s"));
        __fstdout_println(__fvalue_type(1.5));
        __fstdout_println(__fvalue_type([1]));
        "#,
    );
    assert_eq!(output, "Int\nString\nDouble\nList\n");
}

#[test]
fn math_builtins() {
    let output = run_ok(
        r"
        __fstdout_println(__fmath_sqrt(9));
        __fstdout_println(__fmath_gcd(12, 18));
        __fstdout_println(__fmath_floor(2.7));
        __fstdout_println(__fmath_isequal(0.1 + 0.2, 0.3));
        ",
    );
    assert_eq!(output, "3\n6\n2\ntrue\n");
}

#[test]
fn time_builtin_is_non_negative() {
    let output = run_ok("__fstdout_println(__ftime_now_ns() >= 0);");
    assert_eq!(output, "true\n");
}

#[test]
fn division_never_truncates() {
    let output = run_ok(
        r"
        __fstdout_println(6 / 3);
        __fstdout_println(7 / 2);
        ",
    );
    assert_eq!(output, "2\n3.5\n");
}

#[test]
fn string_concat_and_repeat() {
    let output = run_ok(
        r#"
        __fstdout_println("ab" * 3);
        __fstdout_println("fi" + "g");
        __fstdout_println("x" * (-2));
        "#,
    );
    assert_eq!(output, "ababab\nfig\n\n");
}

#[test]
fn int_addition_wraps_on_overflow() {
    let output = run_ok("__fstdout_println(9223372036854775807 + 1);");
    assert_eq!(output, "-9223372036854775808\n");
}

#[test]
fn import_builtins_is_idempotent_at_top_level() {
    let output = run_ok("import _builtins;\n__fstdout_println(1);");
    assert_eq!(output, "1\n");
}
