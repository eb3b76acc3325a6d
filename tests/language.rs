use std::{collections::HashMap, f64::consts, rc::Rc};

use exprima::{Context, EvalError, OperatorOptions, ParseError, Parser, ParserOptions, Value};

fn eval(source: &str) -> Value {
    exprima::evaluate(source, &Context::new()).unwrap_or_else(|e| {
        panic!("'{source}' failed: {e}")
    })
}

fn eval_with(source: &str, context: &Context) -> Value {
    Parser::new().evaluate(source, context)
                 .unwrap_or_else(|e| panic!("'{source}' failed: {e}"))
}

fn num(source: &str) -> f64 {
    match eval(source) {
        Value::Number(n) => n,
        other => panic!("'{source}' produced {other:?} instead of a number"),
    }
}

fn parse_fails(source: &str) -> ParseError {
    match Parser::new().parse(source) {
        Ok(_) => panic!("'{source}' parsed but was expected to fail"),
        Err(e) => e,
    }
}

fn array(values: &[f64]) -> Value {
    Value::Array(Rc::new(values.iter().map(|&n| Value::Number(n)).collect()))
}

#[test]
fn precedence_and_arithmetic() {
    assert_eq!(num("2 + 3 * 4"), 14.0);
    assert_eq!(num("(2 + 3) * 4"), 20.0);
    assert_eq!(num("2 ^ 3 ^ 2"), 512.0);
    assert_eq!(num("-2^2"), -4.0);
    assert_eq!(num("2^-2"), 0.25);
    assert_eq!(num("10 % 3"), 1.0);
    assert_eq!(num("7 - 2 - 1"), 4.0);
    assert_eq!(num("12 / 4 / 3"), 1.0);
}

#[test]
fn numeric_literals() {
    assert_eq!(num("0x1f"), 31.0);
    assert_eq!(num("0b101"), 5.0);
    assert_eq!(num("2e3"), 2000.0);
    assert_eq!(num(".5"), 0.5);
    assert_eq!(num("1.5e-2"), 0.015);
    assert_eq!(num("3."), 3.0);
}

#[test]
fn string_literals_and_escapes() {
    assert_eq!(eval("'abc'"), Value::Str("abc".to_string()));
    assert_eq!(eval(r#""a\nb""#), Value::Str("a\nb".to_string()));
    assert_eq!(eval(r#""A""#), Value::Str("A".to_string()));
    assert_eq!(eval(r"'it\'s'"), Value::Str("it's".to_string()));

    assert!(matches!(parse_fails(r#""\q""#), ParseError::BadEscape { .. }));
    assert!(matches!(parse_fails(r#""\u12""#), ParseError::BadEscape { .. }));
}

#[test]
fn comments_and_whitespace() {
    assert_eq!(num("2 /* two */ + 3"), 5.0);
    assert_eq!(num("1 +\n\t2"), 3.0);
}

#[test]
fn constants() {
    assert_eq!(num("PI"), consts::PI);
    assert_eq!(num("E"), consts::E);
    assert_eq!(eval("true"), Value::Bool(true));
    assert_eq!(eval("false"), Value::Bool(false));
}

#[test]
fn comparisons() {
    assert_eq!(eval("2 < 3"), Value::Bool(true));
    assert_eq!(eval("2 >= 3"), Value::Bool(false));
    assert_eq!(eval("2 == 2"), Value::Bool(true));
    assert_eq!(eval("2 != 2"), Value::Bool(false));
    assert_eq!(eval("'abc' < 'abd'"), Value::Bool(true));
    assert_eq!(eval("'a' == 'a'"), Value::Bool(true));
    assert_eq!(eval("1 == '1'"), Value::Bool(false));
}

#[test]
fn logical_operators() {
    assert_eq!(eval("true and false"), Value::Bool(false));
    assert_eq!(eval("true or false"), Value::Bool(true));
    assert_eq!(eval("not true"), Value::Bool(false));
    assert_eq!(eval("1 and 2"), Value::Bool(true));
    assert_eq!(eval("0 or false"), Value::Bool(false));
    assert_eq!(eval("'' or 'x'"), Value::Bool(true));
}

#[test]
fn concatenation() {
    assert_eq!(eval("'ab' || 'cd'"), Value::Str("abcd".to_string()));
    assert_eq!(eval("[1, 2] || [3]"), array(&[1.0, 2.0, 3.0]));
    assert_eq!(eval("'n=' || 4"), Value::Str("n=4".to_string()));
}

#[test]
fn membership() {
    assert_eq!(eval("2 in [1, 2, 3]"), Value::Bool(true));
    assert_eq!(eval("5 in [1, 2, 3]"), Value::Bool(false));
    assert_eq!(eval("'b' in 'abc'"), Value::Bool(true));
}

#[test]
fn conditional_operator() {
    assert_eq!(num("1 ? 2 : 3"), 2.0);
    assert_eq!(num("0 ? 2 : 3"), 3.0);
    assert_eq!(num("0 ? 1 : 0 ? 2 : 3"), 3.0);
    assert_eq!(num("1 < 2 ? 1 + 1 : 10"), 2.0);
}

#[test]
fn factorial() {
    assert_eq!(num("5!"), 120.0);
    assert_eq!(num("3!!"), 720.0);
    assert_eq!(num("0!"), 1.0);
    assert_eq!(num("-4!"), -24.0);
}

#[test]
fn gamma_golden_values() {
    assert_eq!(num("gamma(5)"), 24.0);
    assert!((num("gamma(0.5)") - consts::PI.sqrt()).abs() < 1e-10);
    assert!((num("gamma(-0.5)") + 2.0 * consts::PI.sqrt()).abs() < 1e-9);
    assert_eq!(num("gamma(0)"), f64::INFINITY);
    assert_eq!(num("gamma(200)"), f64::INFINITY);
    assert_eq!(num("fac(4)"), 24.0);
}

#[test]
fn rounding_golden_values() {
    assert_eq!(num("round(3.7)"), 4.0);
    assert_eq!(num("round(-2.5)"), -2.0);
    assert_eq!(num("roundTo(1.005, 2)"), 1.01);
    assert_eq!(num("roundTo(3.7, 0)"), 4.0);
    assert_eq!(num("roundTo(123.456, 1)"), 123.5);
    assert_eq!(num("trunc(-1.7)"), -1.0);
}

#[test]
fn builtin_functions() {
    assert_eq!(num("sqrt(9)"), 3.0);
    assert_eq!(num("sin(0)"), 0.0);
    assert_eq!(num("cos(0)"), 1.0);
    assert_eq!(num("min(3, 1, 2)"), 1.0);
    assert_eq!(num("min([3, 1, 2])"), 1.0);
    assert_eq!(num("max()"), f64::NEG_INFINITY);
    assert_eq!(num("hypot(3, 4)"), 5.0);
    assert_eq!(num("sum([1, 2, 3])"), 6.0);
    assert_eq!(num("length('abcd')"), 4.0);
    assert_eq!(num("length([1, 2])"), 2.0);
    assert_eq!(num("indexOf('b', 'abc')"), 1.0);
    assert_eq!(num("indexOf(2, [1, 2])"), 1.0);
    assert_eq!(eval("join(',', [1, 2])"), Value::Str("1,2".to_string()));
    assert_eq!(num("pow(2, 10)"), 1024.0);
    assert!((num("atan2(1, 1)") - consts::FRAC_PI_4).abs() < 1e-15);
    assert_eq!(num("if(1, 2, 3)"), 2.0);
}

#[test]
fn prefix_operators_and_higher_order_functions() {
    assert_eq!(num("sin(1) * 0"), 0.0);
    // A prefix operator followed by a terminator is a reference to the
    // built-in itself, usable as a higher-order argument.
    assert_eq!(eval("map(sin, [0, 0])"), array(&[0.0, 0.0]));
    assert_eq!(eval("map(f(x) = x * 2, [1, 2, 3])"), array(&[2.0, 4.0, 6.0]));
    assert_eq!(num("fold(f(a, b) = a + b, 0, [1, 2, 3])"), 6.0);
    assert_eq!(eval("filter(f(x) = x > 1, [0, 1, 2, 3])"), array(&[2.0, 3.0]));
}

#[test]
fn variables_from_context() {
    let context = Context::new();
    context.set("x", Value::Number(2.0));
    assert_eq!(eval_with("x + 1", &context), Value::Number(3.0));

    let err = Parser::new().parse("nope + 1")
                           .unwrap()
                           .evaluate(&Context::new())
                           .unwrap_err();
    assert!(matches!(err, EvalError::UndefinedVariable { .. }));
    assert!(!err.is_security());
}

#[test]
fn assignment_writes_through() {
    let context = Context::new();
    assert_eq!(eval_with("x = 3; x * 2", &context), Value::Number(6.0));
    assert_eq!(context.get("x"), Some(Value::Number(3.0)));

    // Later statements and sibling sub-expressions observe the write.
    assert_eq!(eval("y = 4; y + 1"), Value::Number(5.0));
    assert_eq!(eval("(a = 5; 0) ? 0 : a"), Value::Number(5.0));
}

#[test]
fn statement_sequences() {
    assert_eq!(num("1; 2; 3"), 3.0);
    assert_eq!(num("(1; 2) + 1"), 3.0);
    assert_eq!(num("4;"), 4.0);
}

#[test]
fn arrays_and_indexing() {
    assert_eq!(eval("[1, 2, 3]"), array(&[1.0, 2.0, 3.0]));
    assert_eq!(num("[1, 2, 3][1]"), 2.0);
    assert_eq!(num("[[1, 2], [3, 4]][1][0]"), 3.0);
    assert_eq!(eval("'abc'[1]"), Value::Str("b".to_string()));
    assert_eq!(eval("[]"), array(&[]));

    let err = Parser::new().parse("[1][5]")
                           .unwrap()
                           .evaluate(&Context::new())
                           .unwrap_err();
    assert!(matches!(err, EvalError::IndexOutOfBounds { .. }));
}

#[test]
fn member_access() {
    let context = Context::new();
    let object = HashMap::from([("a".to_string(), Value::Number(1.0)),
                                ("b".to_string(), Value::Str("two".to_string()))]);
    context.set("obj", Value::from(object));

    assert_eq!(eval_with("obj.a + 1", &context), Value::Number(2.0));
    assert_eq!(eval_with("obj.b", &context), Value::Str("two".to_string()));

    let err = Parser::new().evaluate("obj.missing", &context).unwrap_err();
    assert!(matches!(err, exprima::Error::Eval(EvalError::UnknownMember { .. })));
}

#[test]
fn user_defined_functions() {
    assert_eq!(num("(f(x) = x * x)(5)"), 25.0);
    assert_eq!(num("square(x) = x ^ 2; square(4)"), 16.0);
    assert_eq!(num("add(a, b) = a + b; add(2, 5)"), 7.0);
    assert_eq!(num("fib(n) = n < 2 ? n : fib(n - 1) + fib(n - 2); fib(10)"), 55.0);
}

#[test]
fn lambda_scope_is_a_flat_copy() {
    // The body sees outer bindings...
    assert_eq!(num("a = 2; (g(x) = x + a)(1)"), 3.0);

    // ...but writes inside the body stay in the call scope.
    let context = Context::new();
    assert_eq!(eval_with("a = 1; h(x) = (a = x); h(5); a", &context),
               Value::Number(1.0));
    assert_eq!(context.get("a"), Some(Value::Number(1.0)));
}

#[test]
fn short_circuit_skips_the_right_operand() {
    let parser = Parser::new();
    parser.register_function("boom",
                             exprima::NativeFn::new(|_| {
                                 Err(EvalError::InvalidArgument { details: "boom called".to_string(), })
                             }));

    let context = Context::new();
    assert_eq!(parser.evaluate("false and boom()", &context).unwrap(),
               Value::Bool(false));
    assert_eq!(parser.evaluate("true or boom()", &context).unwrap(),
               Value::Bool(true));

    // The deferred branch really does run when demanded.
    assert!(parser.evaluate("true and boom()", &context).is_err());
}

#[test]
fn ternary_arms_are_deferred() {
    let parser = Parser::new();
    parser.register_function("boom",
                             exprima::NativeFn::new(|_| {
                                 Err(EvalError::InvalidArgument { details: "boom called".to_string(), })
                             }));

    let context = Context::new();
    assert_eq!(parser.evaluate("1 ? 42 : boom()", &context).unwrap(),
               Value::Number(42.0));
}

#[test]
fn disabled_operator_families() {
    let options = ParserOptions { operators: OperatorOptions { multiply: false,
                                                               ..OperatorOptions::default() },
                                  ..ParserOptions::default() };
    let parser = Parser::with_options(options);

    match parser.parse("2 * 3") {
        Err(ParseError::DisabledOperator { operator, .. }) => assert_eq!(operator, "*"),
        other => panic!("expected a disabled-operator error, got {other:?}"),
    }
    assert!(parser.parse("2 + 3").is_ok());
}

#[test]
fn disabled_member_access() {
    let options = ParserOptions { allow_member_access: false,
                                  ..ParserOptions::default() };
    let parser = Parser::with_options(options);
    assert!(matches!(parser.parse("obj.a"),
                     Err(ParseError::MemberAccessDisabled { .. })));
}

#[test]
fn disabled_function_definition() {
    let mut options = ParserOptions::default();
    options.operators.fndef = false;
    let parser = Parser::with_options(options);
    assert!(matches!(parser.parse("(f(x) = x)(1)"),
                     Err(ParseError::FunctionDefinitionDisabled { .. })));
}

#[test]
fn disabled_arrays() {
    let mut options = ParserOptions::default();
    options.operators.array = false;
    let parser = Parser::with_options(options);
    assert!(matches!(parser.parse("[1, 2]"),
                     Err(ParseError::DisabledOperator { .. })));
}

#[test]
fn disabled_named_operator() {
    let mut options = ParserOptions::default();
    options.disabled_names.insert("in".to_string());
    let parser = Parser::with_options(options);

    // With `in` disabled the word lexes as a plain name and the parse
    // cannot complete.
    assert!(parser.parse("2 in [1, 2]").is_err());
}

#[test]
fn parse_errors_carry_coordinates() {
    match parse_fails("1 +\n@") {
        ParseError::UnknownCharacter { character, line, column } => {
            assert_eq!(character, '@');
            assert_eq!(line, 2);
            assert_eq!(column, 1);
        },
        other => panic!("expected an unknown-character error, got {other:?}"),
    }

    match parse_fails("2 + ") {
        ParseError::UnexpectedToken { found, .. } => assert_eq!(found, "end of input"),
        other => panic!("expected an unexpected-token error, got {other:?}"),
    }

    assert!(matches!(parse_fails("1 ? 2"), ParseError::ExpectedToken { .. }));
    assert!(matches!(parse_fails("(1"), ParseError::ExpectedToken { .. }));
    assert!(matches!(parse_fails("2 3 +"), ParseError::ExpectedToken { .. }));
}

#[test]
fn assignment_target_validation() {
    assert!(matches!(parse_fails("2 = 3"), ParseError::InvalidAssignmentTarget { .. }));
    assert!(matches!(parse_fails("'x' = 3"), ParseError::InvalidAssignmentTarget { .. }));
}

#[test]
fn custom_constants_and_functions() {
    let parser = Parser::new();
    parser.register_const("TAU", Value::Number(consts::TAU));
    parser.register_function("double",
                             exprima::NativeFn::new(|args| {
                                 Ok(Value::Number(args[0].as_number()? * 2.0))
                             }));

    let context = Context::new();
    assert_eq!(parser.evaluate("TAU / PI", &context).unwrap(), Value::Number(2.0));
    assert_eq!(parser.evaluate("double(21)", &context).unwrap(),
               Value::Number(42.0));
}

#[test]
fn random_stays_in_range() {
    for _ in 0..50 {
        let value = num("random()");
        assert!((0.0..1.0).contains(&value));
        let scaled = num("random(10)");
        assert!((0.0..10.0).contains(&scaled));
    }
}
