use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use treelox as lox;

use lox::error::{LoxError, RuntimeError};
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

/// A `Write` handle whose buffer outlives the interpreter that owns it,
/// so tests can capture everything `print` emits.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `source` through the full pipeline and return (printed output, result).
fn run(source: &str) -> (String, Result<(), LoxError>) {
    let buf = SharedBuf::default();
    let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

    let (tokens, lex_errors) = Scanner::new(source.as_bytes()).scan_all();
    assert!(lex_errors.is_empty(), "lexical errors: {:?}", lex_errors);

    let mut parser = Parser::new(&tokens);
    let statements = parser.parse().expect("test source should parse");

    Resolver::new(&mut interpreter)
        .resolve(&statements)
        .expect("test source should resolve");

    let result = interpreter.interpret(&statements);
    let output = String::from_utf8(buf.0.borrow().clone()).expect("utf8 output");
    (output, result)
}

/// Run `source` expecting success; returns the printed lines.
fn run_ok(source: &str) -> Vec<String> {
    let (output, result) = run(source);
    result.expect("program should run without errors");
    output.lines().map(str::to_owned).collect()
}

/// Run `source` expecting a runtime failure; returns the error.
fn run_err(source: &str) -> RuntimeError {
    let (_, result) = run(source);
    match result {
        Ok(()) => panic!("program unexpectedly succeeded"),
        Err(LoxError::Runtime(e)) => e,
        Err(other) => panic!("expected runtime error, got {:?}", other),
    }
}

// ───────────────────────── expressions & statements ─────────────────────────

#[test]
fn test_arithmetic_and_grouping() {
    let lines = run_ok("print 1 + 2 * 3; print (1 + 2) * 3; print 10 - 4 / 2;");
    assert_eq!(lines, vec!["7", "9", "8"]);
}

#[test]
fn test_number_formatting() {
    let lines = run_ok("print 2.5; print 4 / 2; print 0.5 + 0.25; print -0.0 - 3;");
    assert_eq!(lines, vec!["2.5", "2", "0.75", "-3"]);
}

#[test]
fn test_string_concatenation() {
    let lines = run_ok("print \"foo\" + \"bar\";");
    assert_eq!(lines, vec!["foobar"]);
}

#[test]
fn test_bang_yields_truthiness() {
    // `!x` evaluates to the truthiness of x, not its negation.
    let lines = run_ok("print !true; print !nil; print !0; print !\"\";");
    assert_eq!(lines, vec!["true", "false", "true", "true"]);
}

#[test]
fn test_logical_operators_return_operands() {
    let lines = run_ok(
        "print \"hi\" or 2; print nil or \"yes\"; print nil and 2; print 1 and 2;",
    );
    assert_eq!(lines, vec!["hi", "yes", "nil", "2"]);
}

#[test]
fn test_equality_on_numbers() {
    let lines = run_ok("print 1 == 1; print 1 == 2; print 1 != 2;");
    assert_eq!(lines, vec!["true", "false", "true"]);
}

#[test]
fn test_equality_requires_numbers() {
    let err = run_err("print \"a\" == \"a\";");
    assert!(matches!(err, RuntimeError::Type { .. }));
    assert!(err.to_string().contains("Operands must be numbers."));
}

#[test]
fn test_division_by_zero() {
    let err = run_err("var x = 0;\nprint 1 / x;");
    assert!(matches!(err, RuntimeError::DivisionByZero { line: 2 }));
}

#[test]
fn test_minus_on_non_numbers() {
    let err = run_err("print \"a\" - 1;");
    assert!(err.to_string().contains("Operands must be numbers."));
}

#[test]
fn test_plus_on_mixed_operands() {
    let err = run_err("print \"a\" + 1;");
    assert!(err
        .to_string()
        .contains("Operands must be two numbers or two strings."));
}

#[test]
fn test_if_else_and_while() {
    let lines = run_ok(
        "var n = 3;\n\
         var out = \"\";\n\
         while (n > 0) {\n\
           if (n > 1) { out = out + \"x\"; } else { out = out + \"y\"; }\n\
           n = n - 1;\n\
         }\n\
         print out;",
    );
    assert_eq!(lines, vec!["xxy"]);
}

#[test]
fn test_for_loop() {
    let lines = run_ok(
        "var sum = 0;\n\
         for (var i = 1; i <= 4; i = i + 1) { sum = sum + i; }\n\
         print sum;",
    );
    assert_eq!(lines, vec!["10"]);
}

// ───────────────────────── variables & scoping ──────────────────────────────

#[test]
fn test_block_shadowing() {
    let lines = run_ok(
        "var a = \"outer\";\n\
         {\n\
           var a = \"inner\";\n\
           a = \"changed\";\n\
           print a;\n\
         }\n\
         print a;",
    );
    assert_eq!(lines, vec!["changed", "outer"]);
}

#[test]
fn test_closures_capture_by_reference() {
    let lines = run_ok(
        "fun makeCounter() {\n\
           var i = 0;\n\
           fun count() { i = i + 1; return i; }\n\
           return count;\n\
         }\n\
         var a = makeCounter();\n\
         var b = makeCounter();\n\
         print a(); print a(); print b(); print a();",
    );
    assert_eq!(lines, vec!["1", "2", "1", "3"]);
}

#[test]
fn test_static_binding_survives_later_declaration() {
    // The classic case: showA keeps seeing the global, even after a
    // variable of the same name appears in the enclosing block.
    let lines = run_ok(
        "var a = \"global\";\n\
         {\n\
           fun showA() { print a; }\n\
           showA();\n\
           var a = \"block\";\n\
           showA();\n\
         }",
    );
    assert_eq!(lines, vec!["global", "global"]);
}

#[test]
fn test_undefined_variable() {
    let err = run_err("print missing;");
    match err {
        RuntimeError::UndefinedVariable { name, line } => {
            assert_eq!(name, "missing");
            assert_eq!(line, 1);
        }
        other => panic!("expected UndefinedVariable, got {:?}", other),
    }
}

// ───────────────────────── functions ────────────────────────────────────────

#[test]
fn test_function_returns_nil_when_falling_through() {
    let lines = run_ok("fun noop() {} print noop();");
    assert_eq!(lines, vec!["nil"]);
}

#[test]
fn test_recursion() {
    let lines = run_ok(
        "fun fib(n) {\n\
           if (n < 2) { return n; }\n\
           return fib(n - 1) + fib(n - 2);\n\
         }\n\
         print fib(10);",
    );
    assert_eq!(lines, vec!["55"]);
}

#[test]
fn test_return_unwinds_only_its_own_frame() {
    let lines = run_ok(
        "fun inner() { return \"in\"; }\n\
         fun outer() {\n\
           inner();\n\
           return \"out\";\n\
         }\n\
         print outer();",
    );
    assert_eq!(lines, vec!["out"]);
}

#[test]
fn test_arity_mismatch() {
    let err = run_err("fun f(a, b) { return a; }\nf(1);");
    match err {
        RuntimeError::ArityMismatch { expected, got, line } => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
            assert_eq!(line, 2);
        }
        other => panic!("expected ArityMismatch, got {:?}", other),
    }
}

#[test]
fn test_calling_a_non_callable() {
    let err = run_err("\"not a function\"();");
    assert!(err
        .to_string()
        .contains("Can only call functions and classes."));
}

#[test]
fn test_clock_native() {
    let lines = run_ok("print clock() > 0;");
    assert_eq!(lines, vec!["true"]);
}

#[test]
fn test_function_stringification() {
    let lines = run_ok("fun greet() {} print greet; print clock;");
    assert_eq!(lines, vec!["<fn greet>", "<native fn clock>"]);
}

// ───────────────────────── classes & instances ──────────────────────────────

#[test]
fn test_instance_fields_and_methods() {
    let lines = run_ok(
        "class Person {\n\
           fun init(name) { this.name = name; }\n\
           fun greet() { return \"Hello, \" + this.name; }\n\
         }\n\
         print Person(\"Ada\").greet();",
    );
    assert_eq!(lines, vec!["Hello, Ada"]);
}

#[test]
fn test_initializer_returns_this() {
    // An early bare `return` in init still yields the instance.
    let lines = run_ok(
        "class Thing {\n\
           fun init() { this.x = 1; return; }\n\
         }\n\
         print Thing().x;",
    );
    assert_eq!(lines, vec!["1"]);
}

#[test]
fn test_field_shadows_method() {
    let lines = run_ok(
        "class C { fun m() { return \"method\"; } }\n\
         var c = C();\n\
         c.m = \"field\";\n\
         print c.m;",
    );
    assert_eq!(lines, vec!["field"]);
}

#[test]
fn test_methods_bind_this() {
    let lines = run_ok(
        "class Box { fun init(v) { this.v = v; } fun get() { return this.v; } }\n\
         var take = Box(7).get;\n\
         print take();",
    );
    assert_eq!(lines, vec!["7"]);
}

#[test]
fn test_undefined_property() {
    let err = run_err("class Foo {}\nFoo().bar;");
    match err {
        RuntimeError::UndefinedProperty { name, line } => {
            assert_eq!(name, "bar");
            assert_eq!(line, 2);
        }
        other => panic!("expected UndefinedProperty, got {:?}", other),
    }
}

#[test]
fn test_property_on_primitive() {
    let err = run_err("var s = \"str\";\ns.length;");
    assert!(err.to_string().contains("Only instances have properties."));
}

// ───────────────────────── inheritance & super ──────────────────────────────

#[test]
fn test_inherited_method_lookup() {
    let lines = run_ok(
        "class A { fun who() { return \"A\"; } }\n\
         class B < A {}\n\
         class C < B {}\n\
         print C().who();",
    );
    assert_eq!(lines, vec!["A"]);
}

#[test]
fn test_super_resolves_through_empty_intermediate() {
    // Lookup from `super` starts at the defining class's superclass and
    // walks the chain, so an empty middle class is transparent.
    let lines = run_ok(
        "class A { fun f() { return \"A\"; } }\n\
         class B < A {}\n\
         class C < B { fun f() { return super.f(); } }\n\
         print C().f();\n\
         print B().f();",
    );
    assert_eq!(lines, vec!["A", "A"]);
}

#[test]
fn test_super_dispatch() {
    let lines = run_ok(
        "class Doughnut {\n\
           fun cook() { print \"Fry until golden brown.\"; }\n\
         }\n\
         class BostonCream < Doughnut {\n\
           fun cook() {\n\
             super.cook();\n\
             print \"Pipe full of custard.\";\n\
           }\n\
         }\n\
         BostonCream().cook();",
    );
    assert_eq!(lines, vec!["Fry until golden brown.", "Pipe full of custard."]);
}

#[test]
fn test_super_binds_the_original_receiver() {
    let lines = run_ok(
        "class A {\n\
           fun name() { return \"A\"; }\n\
           fun describe() { return \"instance of \" + this.name(); }\n\
         }\n\
         class B < A {\n\
           fun name() { return \"B\"; }\n\
           fun describe() { return super.describe(); }\n\
         }\n\
         print B().describe();",
    );
    // super.describe() runs A's body, but `this` is still the B instance.
    assert_eq!(lines, vec!["instance of B"]);
}

#[test]
fn test_inherited_initializer() {
    let lines = run_ok(
        "class A { fun init(v) { this.v = v; } }\n\
         class B < A {}\n\
         print B(9).v;",
    );
    assert_eq!(lines, vec!["9"]);
}

#[test]
fn test_superclass_must_be_a_class() {
    let err = run_err("var NotAClass = 1;\nclass Sub < NotAClass {}");
    assert!(err.to_string().contains("Superclass must be a class."));
}

// ───────────────────────── metaclasses ──────────────────────────────────────

#[test]
fn test_class_methods_live_on_the_metaclass() {
    let lines = run_ok(
        "class Math {\n\
           class fun square(n) { return n * n; }\n\
         }\n\
         print Math.square(3);",
    );
    assert_eq!(lines, vec!["9"]);
}

#[test]
fn test_klass_pseudo_field() {
    let lines = run_ok(
        "class Foo {}\n\
         var f = Foo();\n\
         print f.klass;\n\
         print Foo.klass;",
    );
    assert_eq!(lines, vec!["Foo", "Foo metaclass"]);
}

#[test]
fn test_calling_a_metaclass_instantiates_it() {
    // A metaclass value is callable like a class: it produces an instance
    // of the metaclass, running a bound `init` from the class-method table.
    let lines = run_ok(
        "class Foo {\n\
           class fun init() { this.tag = \"made by metaclass\"; }\n\
         }\n\
         var m = Foo.klass;\n\
         var i = m();\n\
         print i;\n\
         print i.tag;",
    );
    assert_eq!(lines, vec!["Foo instance", "made by metaclass"]);
}

#[test]
fn test_fields_on_class_objects() {
    let lines = run_ok(
        "class Counter {}\n\
         Counter.count = 0;\n\
         Counter.count = Counter.count + 1;\n\
         Counter.count = Counter.count + 1;\n\
         print Counter.count;",
    );
    assert_eq!(lines, vec!["2"]);
}

#[test]
fn test_instance_lookup_falls_through_to_class_object() {
    // A miss on the instance continues into the class object's own
    // properties: class fields first, then metaclass methods.
    let lines = run_ok(
        "class Config {\n\
           class fun version() { return \"1.0\"; }\n\
         }\n\
         Config.mode = \"dev\";\n\
         var c = Config();\n\
         print c.mode;\n\
         print c.version();",
    );
    assert_eq!(lines, vec!["dev", "1.0"]);
}

#[test]
fn test_class_methods_are_not_inherited() {
    // Each class gets its own metaclass; the metaclass chain is not
    // wired to the superclass's metaclass.
    let err = run_err(
        "class Base {\n\
           class fun kind() { return \"base\"; }\n\
         }\n\
         class Derived < Base {}\n\
         Derived.kind();",
    );
    match err {
        RuntimeError::UndefinedProperty { name, .. } => assert_eq!(name, "kind"),
        other => panic!("expected UndefinedProperty, got {:?}", other),
    }
}

#[test]
fn test_class_and_instance_stringification() {
    let lines = run_ok(
        "class Widget {}\n\
         print Widget;\n\
         print Widget();",
    );
    assert_eq!(lines, vec!["Widget", "Widget instance"]);
}

#[test]
fn test_methods_can_return_their_own_class() {
    let lines = run_ok(
        "class Factory {\n\
           fun make() { return Factory; }\n\
         }\n\
         print Factory().make();",
    );
    assert_eq!(lines, vec!["Factory"]);
}
