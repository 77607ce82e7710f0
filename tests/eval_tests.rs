//! Core language semantics: definitions, overloads, scoping, and the
//! statement forms.

use wpp::runtime::env::Environment;
use wpp::runtime::eval::eval;
use wpp::syntax::parser::parse;
use wpp::{ErrorKind, Warnings, WppError};

// ---
// Test Setup
// ---

fn run_with_warnings(source: &str, warnings: Warnings) -> Result<String, WppError> {
    let base = std::env::current_dir().expect("cwd");
    let mut env = Environment::new(base, warnings);
    let root = parse(source, "<test>", &mut env.tree)?;
    eval(root, &mut env, None)
}

fn run_source(source: &str) -> Result<String, WppError> {
    run_with_warnings(source, Warnings::none())
}

fn expect_text(source: &str) -> String {
    run_source(source).unwrap_or_else(|error| panic!("evaluation failed: {error}"))
}

// ---
// Literals and concatenation
// ---

#[test]
fn literal_text_passes_through() {
    assert_eq!(expect_text(r#""hello""#), "hello");
    assert_eq!(expect_text("'single quoted'"), "single quoted");
    assert_eq!(expect_text(""), "");
}

#[test]
fn concatenation_is_associative() {
    let left = expect_text(r#""a" .. "b" .. "c""#);
    assert_eq!(left, "abc");
    // Statement juxtaposition concatenates too.
    assert_eq!(expect_text("\"a\"\n\"b\""), "ab");
}

// ---
// Definitions and invocation
// ---

#[test]
fn function_with_parameter() {
    assert_eq!(
        expect_text("let greet(x) \"hello \" .. x\ngreet(\"world\")"),
        "hello world"
    );
}

#[test]
fn definitions_yield_empty_text() {
    assert_eq!(expect_text(r#"let f "x""#), "");
    assert_eq!(expect_text(r#"let f "x" f"#), "x");
}

#[test]
fn bodies_are_late_bound() {
    let source = concat!(
        "let library_callback \"library: \" .. user_callback(\"foo\")\n",
        "let user_callback(x) \"user: \" .. x\n",
        "library_callback"
    );
    assert_eq!(expect_text(source), "library: user: foo");
}

#[test]
fn overloads_are_selected_by_arity() {
    assert_eq!(
        expect_text("let f \"0\"\nlet f(x) x\nf .. f(\"a\")"),
        "0a"
    );
}

#[test]
fn definitions_stack_and_drop_resurfaces() {
    assert_eq!(
        expect_text("let f \"a\"\nlet f \"b\"\nf .. { drop f(); f }"),
        "ba"
    );
}

#[test]
fn dropping_the_last_overload_undefines() {
    let source = "let f \"1\"\ndrop f()\nf";
    let error = run_source(source).expect_err("f should be gone");
    assert!(matches!(error.kind, ErrorKind::UndefinedFn { name } if name == "f"));
}

#[test]
fn dropping_an_unknown_function_fails() {
    let error = run_source("drop nope()").expect_err("nothing to drop");
    assert!(
        matches!(error.kind, ErrorKind::UndefinedDrop { name, arity } if name == "nope" && arity == 0)
    );
}

#[test]
fn drop_is_arity_specific() {
    let source = "let f \"0\"\nlet f(x) x\ndrop f()\nf(\"kept\")";
    assert_eq!(expect_text(source), "kept");

    let error = run_source("let f(x) x\ndrop f()").expect_err("no zero-arity overload");
    assert!(matches!(error.kind, ErrorKind::UndefinedDrop { arity: 0, .. }));
}

#[test]
fn calling_an_undefined_function_fails() {
    let error = run_source("missing").expect_err("not defined");
    assert!(matches!(error.kind, ErrorKind::UndefinedFn { name } if name == "missing"));
}

// ---
// Argument scoping
// ---

#[test]
fn parameters_scope_dynamically() {
    let source = "let outer(x) inner()\nlet inner() x\nouter(\"yes\")";
    assert_eq!(expect_text(source), "yes");
}

#[test]
fn inner_parameters_shadow_outer_ones() {
    let source = "let outer(x) inner(\"in\")\nlet inner(x) x\nouter(\"out\")";
    assert_eq!(expect_text(source), "in");
}

#[test]
fn parameters_win_over_functions() {
    let source = "let x \"function\"\nlet f(x) x\nf(\"parameter\")";
    assert_eq!(expect_text(source), "parameter");
}

#[test]
fn a_parameter_cannot_be_called_with_arguments() {
    let source = "let f(x) x(\"oops\")\nf(\"value\")";
    let error = run_source(source).expect_err("parameter used as function");
    assert!(matches!(error.kind, ErrorKind::ArgAsFn { name } if name == "x"));
}

// ---
// Variables
// ---

#[test]
fn variables_capture_eagerly_functions_lazily() {
    // `var` snapshots the definition-time value...
    let source = "let a \"1\"\nvar v a\nlet a \"2\"\nv";
    assert_eq!(expect_text(source), "1");

    // ...while a zero-parameter `let` re-reads at call time.
    let source = "let a \"1\"\nlet w a\nlet a \"2\"\nw";
    assert_eq!(expect_text(source), "2");
}

// ---
// Blocks
// ---

#[test]
fn blocks_discard_statement_text() {
    assert_eq!(expect_text(r#"{ "ignored" "kept" }"#), "kept");
    assert_eq!(expect_text(r#"{ let a "1" a }"#), "1");
}

// ---
// Match
// ---

#[test]
fn match_selects_by_string_equality() {
    let source = r#"match "b" { "a" -> "1", "b" -> "2", * -> "3" }"#;
    assert_eq!(expect_text(source), "2");
}

#[test]
fn match_falls_back_to_default() {
    let source = r#"match "z" { "a" -> "1", * -> "3" }"#;
    assert_eq!(expect_text(source), "3");
}

#[test]
fn match_without_default_fails() {
    let error = run_source(r#"match "z" { "a" -> "1" }"#).expect_err("no arm matches");
    assert!(matches!(error.kind, ErrorKind::NoMatch));
}

#[test]
fn match_takes_the_first_matching_arm() {
    let source = r#"match "a" { "a" -> "first", "a" -> "second" }"#;
    assert_eq!(expect_text(source), "first");
}

#[test]
fn match_keys_may_be_computed() {
    let source = "let key \"k\"\nmatch \"k\" { key -> \"hit\", * -> \"miss\" }";
    assert_eq!(expect_text(source), "hit");
}

// ---
// Prefix
// ---

#[test]
fn prefix_qualifies_definitions() {
    assert_eq!(expect_text("prefix \"ns_\" { let f \"A\" }\nns_f"), "A");
}

#[test]
fn nested_prefixes_compose_outermost_first() {
    let source = "prefix \"a_\" { prefix \"b_\" { let f \"X\" } }\na_b_f";
    assert_eq!(expect_text(source), "X");
}

#[test]
fn prefix_passes_other_statements_through() {
    assert_eq!(expect_text("prefix \"p_\" { \"text\" }"), "text");
}

#[test]
fn prefix_expression_is_evaluated() {
    let source = "let ns \"m_\"\nprefix ns { let f \"V\" }\nm_f";
    assert_eq!(expect_text(source), "V");
}

// ---
// Codeify
// ---

#[test]
fn codeify_evaluates_text_as_code() {
    assert_eq!(expect_text("let f \"z\"\n!\"f\""), "z");
}

// ---
// Warnings
// ---

#[test]
fn warnings_do_not_alter_output() {
    // Each of these trips at least one warning condition.
    let sources = [
        "let f \"1\"\nlet f \"2\"\nf",
        "var v \"1\"\nvar v \"2\"\nv",
        "let x \"fn\"\nlet f(x) x\nf(\"param\")",
        "let outer(x) inner(\"b\")\nlet inner(x) x\nouter(\"a\")",
    ];
    for source in sources {
        let quiet = run_with_warnings(source, Warnings::none()).expect("quiet run");
        let loud = run_with_warnings(source, Warnings::all()).expect("loud run");
        assert_eq!(quiet, loud, "warning bits changed output for {source:?}");
    }
}
