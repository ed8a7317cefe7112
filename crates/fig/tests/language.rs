//! Language-level behavior: structs, interfaces, overloading, closures,
//! control flow, containers.

use fig::{CollectStringPrint, Exception, QueueInput, Runner};
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

#[test]
fn struct_construction_modes() {
    let output = run_ok(
        r"
        struct Point { x: Int; y: Int; }
        var a = Point{1, 2};
        var b = Point{y: 4, x: 3};
        var x = 5;
        var y = 6;
        var c = Point{x, y};
        __fstdout_println(a.x + a.y);
        __fstdout_println(b.x);
        __fstdout_println(b.y);
        __fstdout_println(c.x + c.y);
        ",
    );
    assert_eq!(output, "3\n3\n4\n11\n");
}

#[test]
fn struct_field_defaults_evaluate_in_defining_scope() {
    let output = run_ok(
        r#"
        struct Conf { host: String = "localhost"; port: Int = 80; }
        var conf = Conf{port: 8080};
        __fstdout_println(conf.host);
        __fstdout_println(conf.port);
        "#,
    );
    assert_eq!(output, "localhost\n8080\n");
}

#[test]
fn struct_methods_close_over_the_instance() {
    let output = run_ok(
        r"
        struct Point {
            x: Int;
            y: Int;
            public func sum() { return x + y; }
            public func shift() { x = x + 10; }
        }
        var p = Point{1, 2};
        __fstdout_println(p.sum());
        p.shift();
        __fstdout_println(p.x);
        ",
    );
    assert_eq!(output, "3\n11\n");
}

#[test]
fn instance_mutation_is_visible_through_aliases() {
    let output = run_ok(
        r"
        struct Box { value: Int; }
        var a = Box{1};
        var b = a;
        b.value = 7;
        __fstdout_println(a.value);
        var l = [1];
        var l2 = l;
        l2.push(2);
        __fstdout_println(l.length());
        ",
    );
    assert_eq!(output, "7\n2\n");
}

#[test]
fn interface_bundles_aggregate_methods() {
    let output = run_ok(
        r#"
        interface A { ping() -> String; }
        interface B { pong() -> String; }
        interface C { bundle A, B; }
        struct S {}
        impl C for S {
            ping() { return "ping"; }
            pong() { return "pong"; }
        }
        __fstdout_println(S{}.ping());
        __fstdout_println(S{}.pong());
        "#,
    );
    assert_eq!(output, "ping\npong\n");
}

#[test]
fn impl_on_builtin_type() {
    let output = run_ok(
        r#"
        interface Describe { describe() -> String; }
        impl Describe for Int { describe() { return "an int"; } }
        __fstdout_println(5.describe());
        "#,
    );
    assert_eq!(output, "an int\n");
}

#[test]
fn overloads_preempt_native_operators() {
    let output = run_ok(
        r"
        struct V { x: Int; }
        interface Operation { Add(a, b) -> V; Neg(a) -> V; Equal(a, b) -> Bool; }
        impl Operation for V {
            Add(a, b) { return V{ x: a.x + b.x }; }
            Neg(a) { return V{ x: 0 - a.x }; }
            Equal(a, b) { return a.x == b.x; }
        }
        var v = V{2} + V{3};
        __fstdout_println(v.x);
        __fstdout_println((-v).x);
        __fstdout_println(V{1} == V{1});
        __fstdout_println(V{1} == V{2});
        ",
    );
    assert_eq!(output, "5\n-5\ntrue\nfalse\n");
}

#[test]
fn closures_share_their_captured_scope() {
    let output = run_ok(
        r"
        func makePair() {
            var n = 0;
            var inc = func() { n += 1; return n; };
            var get = func() { return n; };
            return [inc, get];
        }
        var pair = makePair();
        var inc = pair[0];
        var get = pair[1];
        inc();
        inc();
        __fstdout_println(get());
        ",
    );
    assert_eq!(output, "2\n");
}

#[test]
fn recursion() {
    let output = run_ok(
        r"
        func fib(n) {
            if n < 2 { return n; }
            return fib(n - 1) + fib(n - 2);
        }
        __fstdout_println(fib(10));
        ",
    );
    assert_eq!(output, "55\n");
}

#[test]
fn higher_order_functions_and_expression_bodies() {
    let output = run_ok(
        r"
        func apply(f, x) { return f(x); }
        __fstdout_println(apply(func(v) => v * 2, 21));
        ",
    );
    assert_eq!(output, "42\n");
}

#[test]
fn variadic_functions_collect_into_a_list() {
    let output = run_ok(
        r#"
        func count(items...) { return items.length(); }
        __fstdout_println(count(1, "a", true));
        __fstdout_println(count());
        "#,
    );
    assert_eq!(output, "3\n0\n");
}

#[test]
fn default_parameters_reevaluate_in_caller_scope() {
    let output = run_ok(
        r#"
        func f(x = base) { return x; }
        var base = 10;
        __fstdout_println(f());
        __fstdout_println(f(1));
        func greet(name, punct = "!") { return name + punct; }
        __fstdout_println(greet("hi"));
        __fstdout_println(greet("hi", "?"));
        "#,
    );
    assert_eq!(output, "10\n1\nhi!\nhi?\n");
}

#[test]
fn for_loop_with_break_and_continue() {
    // `continue` must still run the increment, or this never terminates.
    let output = run_ok(
        r"
        var total = 0;
        for var i = 0; i < 10; i += 1 {
            if i % 2 == 0 { continue; }
            if i > 7 { break; }
            total += i;
        }
        __fstdout_println(total);
        ",
    );
    assert_eq!(output, "16\n");
}

#[test]
fn while_loop() {
    let output = run_ok(
        r"
        var n = 3;
        var acc = 1;
        while n > 0 { acc *= n; n -= 1; }
        __fstdout_println(acc);
        ",
    );
    assert_eq!(output, "6\n");
}

#[test]
fn ternary_and_short_circuit() {
    let output = run_ok(
        r#"
        __fstdout_println(1 < 2 ? "yes" : "no");
        var calls = 0;
        func bump() { calls += 1; return true; }
        var ignored = false and bump();
        var ignored2 = true or bump();
        __fstdout_println(calls);
        "#,
    );
    assert_eq!(output, "yes\n0\n");
}

#[test]
fn is_operator() {
    let output = run_ok(
        r#"
        __fstdout_println(1 is Int);
        __fstdout_println("s" is Int);
        interface Marker { tag() -> String { return "m"; } }
        struct T {}
        impl Marker for T {}
        var t = T{};
        __fstdout_println(t is T);
        __fstdout_println(t is Marker);
        "#,
    );
    assert_eq!(output, "true\nfalse\ntrue\ntrue\n");
}

#[test]
fn string_mutation_is_code_point_based() {
    let output = run_ok(
        r#"
        var s = "héllo";
        __fstdout_println(s.length());
        s.replace(1, "e");
        __fstdout_println(s);
        __fstdout_println(s[1]);
        s[0] = "H";
        s.insert(5, "!");
        s.erase(1, 1);
        __fstdout_println(s);
        "#,
    );
    assert_eq!(output, "5\nhello\ne\nHllo!\n");
}

#[test]
fn list_and_map_member_methods() {
    let output = run_ok(
        r#"
        var l = [1, 2];
        l.push(3);
        __fstdout_println(l.length());
        __fstdout_println(l[2]);
        l[0] = 10;
        __fstdout_println(l);
        var m = {"a": 1};
        m["b"] = 2;
        __fstdout_println(m.get("b"));
        __fstdout_println(m.contains("z"));
        __fstdout_println(m.get("z"));
        __fstdout_println(m["a"]);
        "#,
    );
    assert_eq!(output, "3\n3\n[10, 2, 3]\n2\nfalse\nnull\n1\n");
}

#[test]
fn tuples_evaluate_to_lists() {
    let output = run_ok(
        r"
        var t = (1, 2, 3);
        __fstdout_println(t.length());
        __fstdout_println((42));
        ",
    );
    assert_eq!(output, "3\n42\n");
}

#[test]
fn builtin_type_construction() {
    let output = run_ok(
        r#"
        __fstdout_println(Int{});
        __fstdout_println(String{"x"});
        var l = [1];
        var copy = List{l};
        copy.push(2);
        __fstdout_println(l.length());
        __fstdout_println(copy.length());
        "#,
    );
    assert_eq!(output, "0\nx\n1\n2\n");
}

#[test]
fn string_literals_yield_fresh_objects() {
    let output = run_ok(
        r#"
        func stamp() { var s = "ab"; s.replace(0, "x"); return s; }
        __fstdout_println(stamp());
        __fstdout_println(stamp());
        "#,
    );
    assert_eq!(output, "xb\nxb\n");
}

#[test]
fn inferred_declarations_pin_the_runtime_type() {
    let output = run_ok(
        r"
        var n := 5;
        n = 6;
        __fstdout_println(n);
        ",
    );
    assert_eq!(output, "6\n");
}
