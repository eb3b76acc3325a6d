//! # exprima
//!
//! exprima is an embeddable expression language. It parses arithmetic and
//! logical expressions into an instruction program, evaluates that program
//! against a caller-supplied variable context, and treats the context as
//! untrusted input: a callable found there may only be invoked if it is
//! reference-identical to an entry in the parser's operator or function
//! tables. On top of evaluation it offers constant-folding simplification,
//! variable substitution, and free-symbol extraction over the same program
//! representation.

#![warn(
    clippy::redundant_clone,
    clippy::needless_pass_by_value,
    clippy::similar_names,
    clippy::large_enum_variant,
    clippy::string_lit_as_bytes,
    clippy::match_same_arms,
    clippy::cargo,
    clippy::nursery,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    clippy::correctness,
    clippy::complexity,
    clippy::pedantic,
)]
#![allow(clippy::missing_errors_doc)]

/// Provides unified error types for parsing and evaluation.
///
/// This module defines all errors that can be raised while lexing, parsing,
/// or evaluating an expression, including the distinguished security error
/// raised by the evaluator's trust gate.
///
/// # Responsibilities
/// - Defines error enums for all failure modes (lexer, parser, evaluator).
/// - Attaches 1-based line/column coordinates to every parse failure.
/// - Keeps security failures matchable apart from ordinary evaluation
///   failures.
pub mod error;

/// Orchestrates the expression pipeline.
///
/// This module ties together the token source, the recursive-descent
/// parser, the instruction model, the stack-machine evaluator with its
/// security gate, the rewrite passes, and the built-in function catalogue.
///
/// # Responsibilities
/// - Coordinates all core components: lexer, parser, evaluator, rewriters.
/// - Owns the operator/function tables that form the trust boundary.
/// - Provides the `Parser` and `Expression` entry points.
pub mod engine;

pub use engine::{
    expression::Expression,
    instruction::{Instruction, Program},
    parser::{OperatorOptions, Parser, ParserOptions},
    value::{Context, NativeFn, Value},
};
pub use error::{Error, EvalError, ParseError, SecurityError};

/// Parses and evaluates an expression with a fresh default parser.
///
/// This is the one-shot convenience entry point; construct a [`Parser`] to
/// reuse tables, register host functions, or configure operator toggles.
///
/// # Errors
/// Returns an error if parsing or evaluation fails, including the
/// distinguished security failure for untrusted callables.
///
/// # Examples
/// ```
/// use exprima::{Context, Value, evaluate};
///
/// let context = Context::new();
/// context.set("x", Value::Number(4.0));
///
/// let result = evaluate("2 ^ x", &context).unwrap();
/// assert_eq!(result, Value::Number(16.0));
/// ```
pub fn evaluate(expression: &str, context: &Context) -> Result<Value, Error> {
    Parser::new().evaluate(expression, context)
}
