use std::collections::HashMap;

use crate::{
    engine::{
        evaluator, simplify,
        instruction::Program,
        parser::Parser,
        substitute, symbols,
        value::{Context, Value},
    },
    error::EvalError,
};

/// A parsed expression bound to the parser (and tables) that produced it.
///
/// Expressions are immutable; `simplify` and `substitute` return new
/// expressions sharing the same parser. One expression may be evaluated any
/// number of times against different contexts.
#[derive(Debug)]
pub struct Expression {
    program: Program,
    parser:  Parser,
}

impl Expression {
    pub(crate) const fn new(program: Program, parser: Parser) -> Self {
        Self { program, parser }
    }

    /// The underlying instruction sequence.
    #[must_use]
    pub const fn program(&self) -> &Program {
        &self.program
    }

    /// Evaluates the expression against a caller-supplied context.
    ///
    /// The context may be mutated by assignment and function-definition
    /// forms; those writes are visible to the caller afterwards.
    ///
    /// # Errors
    /// Returns an [`EvalError`]; the [`EvalError::Security`] variant
    /// specifically means the expression touched an untrusted callable or a
    /// reserved name.
    ///
    /// # Examples
    /// ```
    /// use exprima::{Context, Parser, Value};
    ///
    /// let expr = Parser::new().parse("x ^ 2").unwrap();
    /// let context = Context::new();
    /// context.set("x", Value::Number(9.0));
    ///
    /// assert_eq!(expr.evaluate(&context).unwrap(), Value::Number(81.0));
    /// ```
    pub fn evaluate(&self, context: &Context) -> Result<Value, EvalError> {
        evaluator::evaluate(&self.program, &self.parser, context)
    }

    /// Returns a new expression with the given bindings folded in as
    /// constants.
    ///
    /// Evaluating the result is observationally equivalent to evaluating
    /// the original under any context consistent with `values`.
    #[must_use]
    pub fn simplify(&self, values: &HashMap<String, Value>) -> Self {
        Self { program: simplify::simplify(&self.program, &self.parser, values),
               parser:  self.parser.clone(), }
    }

    /// Returns a new expression with every reference to `variable` replaced
    /// by `replacement`'s program.
    #[must_use]
    pub fn substitute(&self, variable: &str, replacement: &Self) -> Self {
        Self { program: substitute::substitute(&self.program,
                                               variable,
                                               replacement.program()),
               parser:  self.parser.clone(), }
    }

    /// The names this expression references, in first-seen order.
    ///
    /// With `with_members` set, member chains are fused into dotted paths.
    #[must_use]
    pub fn symbols(&self, with_members: bool) -> Vec<String> {
        let mut names = Vec::new();
        symbols::get_symbols(&self.program, &mut names, with_members);
        names
    }

    /// Like [`Expression::symbols`], minus names registered in the
    /// named-function table.
    #[must_use]
    pub fn variables(&self, with_members: bool) -> Vec<String> {
        self.symbols(with_members)
            .into_iter()
            .filter(|name| self.parser.registered_function(name).is_none())
            .collect()
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)
    }
}
