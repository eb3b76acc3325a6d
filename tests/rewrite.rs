//! Tests for the program-rewriting passes: constant folding, variable
//! substitution, and symbol extraction.

use std::collections::HashMap;

use exprima::{Context, Instruction, Parser, Value};
use proptest::prelude::*;

fn bindings(pairs: &[(&str, f64)]) -> HashMap<String, Value> {
    pairs.iter()
         .map(|&(name, value)| (name.to_string(), Value::Number(value)))
         .collect()
}

#[test]
fn fully_constant_expressions_fold_to_one_literal() {
    let expr = Parser::new().parse("2 + 3 * 4").unwrap();
    let folded = expr.simplify(&HashMap::new());

    assert_eq!(folded.program().instructions,
               vec![Instruction::Number(Value::Number(14.0))]);
}

#[test]
fn known_values_fold_and_free_variables_survive() {
    let parser = Parser::new();
    let expr = parser.parse("x * (y * atan(1))").unwrap();
    let folded = expr.simplify(&bindings(&[("y", 4.0)]));

    assert_eq!(folded.symbols(false), vec!["x".to_string()]);

    let context = Context::new();
    context.set("x", Value::Number(2.0));
    context.set("y", Value::Number(4.0));
    assert_eq!(folded.evaluate(&context).unwrap(),
               expr.evaluate(&context).unwrap());
}

#[test]
fn folding_stops_at_deferred_boundaries() {
    let parser = Parser::new();
    let expr = parser.parse("x > 0 ? 1 + 1 : 2 + 2").unwrap();
    let folded = expr.simplify(&bindings(&[("x", 5.0)]));

    // The branches stay nested sub-programs (simplified inside), and the
    // choice is still made at evaluation time.
    assert!(folded.program()
                  .instructions
                  .iter()
                  .any(|i| matches!(i, Instruction::Expr(..))));
    assert_eq!(folded.evaluate(&Context::new()).unwrap(), Value::Number(2.0));
}

#[test]
fn array_literals_fold_through() {
    let expr = Parser::new().parse("[1 + 1, 2 * 3][0]").unwrap();
    let folded = expr.simplify(&HashMap::new());
    assert_eq!(folded.evaluate(&Context::new()).unwrap(), Value::Number(2.0));
}

#[test]
fn simplify_preserves_assignment_semantics() {
    let expr = Parser::new().parse("x = 2 + 3; x * 2").unwrap();
    let folded = expr.simplify(&HashMap::new());

    let context = Context::new();
    assert_eq!(folded.evaluate(&context).unwrap(), Value::Number(10.0));
    assert_eq!(context.get("x"), Some(Value::Number(5.0)));
}

#[test]
fn substitute_splices_the_replacement_program() {
    let parser = Parser::new();
    let expr = parser.parse("x + y").unwrap();
    let replacement = parser.parse("2 * z").unwrap();

    let substituted = expr.substitute("x", &replacement);
    assert_eq!(substituted.symbols(false),
               vec!["z".to_string(), "y".to_string()]);

    let context = Context::new();
    context.set("y", Value::Number(1.0));
    context.set("z", Value::Number(3.0));
    assert_eq!(substituted.evaluate(&context).unwrap(), Value::Number(7.0));
}

#[test]
fn substitute_reaches_nested_programs() {
    let parser = Parser::new();
    let expr = parser.parse("c ? x : 0").unwrap();
    let substituted = expr.substitute("x", &parser.parse("y + 1").unwrap());

    let context = Context::new();
    context.set("c", Value::Bool(true));
    context.set("y", Value::Number(41.0));
    assert_eq!(substituted.evaluate(&context).unwrap(), Value::Number(42.0));
}

#[test]
fn substitute_is_idempotent_once_no_occurrence_remains() {
    let parser = Parser::new();
    let expr = parser.parse("x * x + y").unwrap();
    let replacement = parser.parse("z ^ 2").unwrap();

    let once = expr.substitute("x", &replacement);
    let twice = once.substitute("x", &replacement);
    assert_eq!(once.program(), twice.program());
}

#[test]
fn symbols_deduplicate_in_first_seen_order() {
    let expr = Parser::new().parse("a + b * a - c").unwrap();
    assert_eq!(expr.symbols(false),
               vec!["a".to_string(), "b".to_string(), "c".to_string()]);
}

#[test]
fn symbols_recurse_into_deferred_programs() {
    let expr = Parser::new().parse("p ? q : r and s").unwrap();
    assert_eq!(expr.symbols(false),
               vec!["p".to_string(), "q".to_string(), "r".to_string(), "s".to_string()]);
}

#[test]
fn symbols_fuse_member_paths_when_requested() {
    let expr = Parser::new().parse("obj.a.b + obj.c").unwrap();
    assert_eq!(expr.symbols(true),
               vec!["obj.a.b".to_string(), "obj.c".to_string()]);
    assert_eq!(expr.symbols(false), vec!["obj".to_string()]);
}

#[test]
fn variables_filter_out_registered_function_names() {
    let expr = Parser::new().parse("min(x, y) + z").unwrap();
    assert_eq!(expr.symbols(false),
               vec!["min".to_string(), "x".to_string(), "y".to_string(), "z".to_string()]);
    assert_eq!(expr.variables(false),
               vec!["x".to_string(), "y".to_string(), "z".to_string()]);
}

// ---------- Generated-program properties ----------

#[derive(Debug, Clone)]
enum Ast {
    Num(i32),
    Add(Box<Ast>, Box<Ast>),
    Sub(Box<Ast>, Box<Ast>),
    Mul(Box<Ast>, Box<Ast>),
    Neg(Box<Ast>),
}

fn arb_ast() -> impl Strategy<Value = Ast> {
    let leaf = (0..20i32).prop_map(Ast::Num);
    leaf.prop_recursive(4, 32, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                    Ast::Add(Box::new(a), Box::new(b))
                }),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                    Ast::Sub(Box::new(a), Box::new(b))
                }),
                (inner.clone(), inner.clone()).prop_map(|(a, b)| {
                    Ast::Mul(Box::new(a), Box::new(b))
                }),
                inner.prop_map(|a| Ast::Neg(Box::new(a))),
            ]
        })
}

fn render(ast: &Ast) -> String {
    match ast {
        Ast::Num(n) => n.to_string(),
        Ast::Add(a, b) => format!("({} + {})", render(a), render(b)),
        Ast::Sub(a, b) => format!("({} - {})", render(a), render(b)),
        Ast::Mul(a, b) => format!("({} * {})", render(a), render(b)),
        Ast::Neg(a) => format!("(-{})", render(a)),
    }
}

fn reference_eval(ast: &Ast) -> f64 {
    match ast {
        Ast::Num(n) => f64::from(*n),
        Ast::Add(a, b) => reference_eval(a) + reference_eval(b),
        Ast::Sub(a, b) => reference_eval(a) - reference_eval(b),
        Ast::Mul(a, b) => reference_eval(a) * reference_eval(b),
        Ast::Neg(a) => -reference_eval(a),
    }
}

proptest! {
    // Evaluation terminates with a single value matching direct arithmetic,
    // and folding with no known constants is observationally equivalent.
    #[test]
    fn simplify_is_observationally_equivalent(ast in arb_ast()) {
        let source = render(&ast);
        let parser = Parser::new();
        let expr = parser.parse(&source).unwrap();

        let direct = expr.evaluate(&Context::new()).unwrap();
        let folded = expr.simplify(&HashMap::new())
                         .evaluate(&Context::new())
                         .unwrap();

        prop_assert_eq!(&direct, &folded);

        let expected = reference_eval(&ast);
        prop_assert_eq!(direct, Value::Number(if expected == 0.0 { 0.0 } else { expected }));
    }

    // Substituting a variable that never occurs is a structural no-op.
    #[test]
    fn substitute_without_occurrences_is_identity(ast in arb_ast()) {
        let source = render(&ast);
        let parser = Parser::new();
        let expr = parser.parse(&source).unwrap();
        let replacement = parser.parse("q").unwrap();

        let substituted = expr.substitute("absent", &replacement);
        prop_assert_eq!(expr.program(), substituted.program());
    }
}
