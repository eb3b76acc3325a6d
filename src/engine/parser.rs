/// Recursive-descent parser state.
///
/// Consumes the token stream with one token of lookahead plus a single
/// save/restore checkpoint, emitting postfix instructions.
pub mod state;

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::{
    engine::{
        expression::Expression,
        functions,
        instruction::Program,
        lexer::TokenStream,
        parser::state::ParserState,
        value::{Context, NativeFn, Value},
    },
    error::{Error, ParseError},
};

/// Per-family feature toggles for the recognized operators.
///
/// Every family defaults to enabled; switching one off removes its symbols
/// from the token source, so expressions using them fail to parse.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct OperatorOptions {
    /// `+`
    pub add:         bool,
    /// `-`
    pub subtract:    bool,
    /// `*`
    pub multiply:    bool,
    /// `/`
    pub divide:      bool,
    /// `%`
    pub remainder:   bool,
    /// `^`
    pub power:       bool,
    /// Postfix `!`
    pub factorial:   bool,
    /// `== != < <= > >=`
    pub comparison:  bool,
    /// String/array concatenation `||`
    pub concatenate: bool,
    /// `and`, `or`, `not`
    pub logical:     bool,
    /// Conditional `?:`
    pub conditional: bool,
    /// Assignment `=`
    pub assignment:  bool,
    /// Array literals and indexing `[]`
    pub array:       bool,
    /// Function definition `name(args) = body`
    pub fndef:       bool,
}

impl Default for OperatorOptions {
    fn default() -> Self {
        Self { add:         true,
               subtract:    true,
               multiply:    true,
               divide:      true,
               remainder:   true,
               power:       true,
               factorial:   true,
               comparison:  true,
               concatenate: true,
               logical:     true,
               conditional: true,
               assignment:  true,
               array:       true,
               fndef:       true, }
    }
}

/// Configuration accepted by [`Parser::with_options`].
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// When `false`, the `.` member access form is a parse error.
    pub allow_member_access: bool,
    /// Per-family operator toggles.
    pub operators:           OperatorOptions,
    /// Individually disabled operator or built-in names that are not covered
    /// by a family toggle (`in`, `sin`, ...).
    pub disabled_names:      HashSet<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { allow_member_access: true,
               operators:           OperatorOptions::default(),
               disabled_names:      HashSet::new(), }
    }
}

/// The operator, function, and constant registries owned by a parser.
///
/// These tables are the trust boundary: a callable is invocable exactly when
/// it is reference-identical to some entry here. The arity tables are fixed
/// at construction; the functions and constants tables accept insertions
/// (host registration, and the function-definition instruction).
#[derive(Debug)]
pub(crate) struct Tables {
    pub unary:          HashMap<String, NativeFn>,
    pub binary:         HashMap<String, NativeFn>,
    pub ternary:        HashMap<String, NativeFn>,
    pub functions:      RefCell<HashMap<String, NativeFn>>,
    pub consts:         RefCell<HashMap<String, Value>>,
    pub lambda_counter: Cell<u64>,
}

impl Tables {
    fn new() -> Self {
        Self { unary:          functions::default_unary_ops(),
               binary:         functions::default_binary_ops(),
               ternary:        functions::default_ternary_ops(),
               functions:      RefCell::new(functions::default_functions()),
               consts:         RefCell::new(functions::default_consts()),
               lambda_counter: Cell::new(0), }
    }
}

#[derive(Debug)]
struct ParserInner {
    options: ParserOptions,
    tables:  Tables,
}

/// Parses expression text into [`Expression`] values.
///
/// A parser owns the operator/function tables its expressions evaluate
/// against; cloning it is cheap and shares those tables. Expressions keep
/// their parser alive, so a parser may be dropped once its expressions are.
#[derive(Debug, Clone)]
pub struct Parser {
    inner: Rc<ParserInner>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Creates a parser with every feature enabled and the default built-in
    /// tables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// Creates a parser with the given feature configuration.
    #[must_use]
    pub fn with_options(options: ParserOptions) -> Self {
        Self { inner: Rc::new(ParserInner { options,
                                            tables: Tables::new() }), }
    }

    /// Parses an expression into an evaluatable [`Expression`].
    ///
    /// # Errors
    /// Returns a [`ParseError`] carrying 1-based line/column for lexical and
    /// syntax violations.
    ///
    /// # Examples
    /// ```
    /// use exprima::{Context, Parser, Value};
    ///
    /// let parser = Parser::new();
    /// let expr = parser.parse("2 + 3 * 4").unwrap();
    /// assert_eq!(expr.evaluate(&Context::new()).unwrap(), Value::Number(14.0));
    /// ```
    pub fn parse(&self, expression: &str) -> Result<Expression, ParseError> {
        let stream = TokenStream::new(self.clone(), expression);
        let mut state = ParserState::new(self.clone(), stream)?;

        let mut instr = Vec::new();
        state.parse_expression(&mut instr)?;
        state.expect_eof()?;

        Ok(Expression::new(Program::new(instr), self.clone()))
    }

    /// Parses and evaluates in one step against the given context.
    ///
    /// # Errors
    /// Returns the parse or evaluation failure, including the distinguished
    /// security error.
    pub fn evaluate(&self, expression: &str, context: &Context) -> Result<Value, Error> {
        Ok(self.parse(expression)?.evaluate(context)?)
    }

    /// Registers a host function under the given name, making it trusted:
    /// context values that are reference-identical to it pass the security
    /// gate.
    pub fn register_function(&self, name: &str, f: NativeFn) {
        self.inner
            .tables
            .functions
            .borrow_mut()
            .insert(name.to_string(), f);
    }

    /// Registers or replaces a named constant recognized by the token
    /// source.
    pub fn register_const(&self, name: &str, value: Value) {
        self.inner
            .tables
            .consts
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    /// Looks up a function registered in the named-function table.
    #[must_use]
    pub fn registered_function(&self, name: &str) -> Option<NativeFn> {
        self.inner.tables.functions.borrow().get(name).cloned()
    }

    /// Looks up a callable from any of the four tables, searching the
    /// named-function table first and then the unary, binary, and ternary
    /// tables.
    ///
    /// Useful for placing a trusted built-in into a context object: any
    /// handle cloned from the returned one is reference-identical to the
    /// table entry and therefore passes the security gate.
    #[must_use]
    pub fn builtin(&self, name: &str) -> Option<NativeFn> {
        let tables = self.tables();
        self.registered_function(name)
            .or_else(|| tables.unary.get(name).cloned())
            .or_else(|| tables.binary.get(name).cloned())
            .or_else(|| tables.ternary.get(name).cloned())
    }

    /// Whether the operator symbol or name is enabled under the current
    /// options.
    ///
    /// Symbols map onto their family toggle; names outside every family
    /// (`in`, the named built-ins) are enabled unless listed in
    /// `disabled_names`.
    #[must_use]
    pub fn is_operator_enabled(&self, op: &str) -> bool {
        let operators = &self.inner.options.operators;
        match op {
            "+" => operators.add,
            "-" => operators.subtract,
            "*" => operators.multiply,
            "/" => operators.divide,
            "%" => operators.remainder,
            "^" => operators.power,
            "!" => operators.factorial,
            "<" | ">" | "<=" | ">=" | "==" | "!=" => operators.comparison,
            "||" => operators.concatenate,
            "and" | "or" | "not" => operators.logical,
            "?" | ":" => operators.conditional,
            "=" => operators.assignment,
            "[" => operators.array,
            "()=" => operators.fndef,
            _ => !self.inner.options.disabled_names.contains(op),
        }
    }

    pub(crate) fn allow_member_access(&self) -> bool {
        self.inner.options.allow_member_access
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.inner.tables
    }

    /// Whether the name is present in any arity table, making it a named
    /// operator for the token source.
    pub(crate) fn has_operator(&self, name: &str) -> bool {
        let tables = self.tables();
        tables.unary.contains_key(name)
        || tables.binary.contains_key(name)
        || tables.ternary.contains_key(name)
    }

    pub(crate) fn is_unary(&self, name: &str) -> bool {
        self.tables().unary.contains_key(name)
    }

    pub(crate) fn unary_op(&self, name: &str) -> Option<NativeFn> {
        self.tables().unary.get(name).cloned()
    }

    pub(crate) fn binary_op(&self, name: &str) -> Option<NativeFn> {
        self.tables().binary.get(name).cloned()
    }

    pub(crate) fn ternary_op(&self, name: &str) -> Option<NativeFn> {
        self.tables().ternary.get(name).cloned()
    }

    pub(crate) fn constant(&self, name: &str) -> Option<Value> {
        self.tables().consts.borrow().get(name).cloned()
    }

    /// Mints the next unique name for a user-defined function.
    pub(crate) fn next_lambda_name(&self) -> String {
        let counter = self.tables().lambda_counter.get();
        self.tables().lambda_counter.set(counter + 1);
        format!("lambda_{counter}")
    }

    /// The identity check behind the security gate: `true` exactly when the
    /// callable is reference-identical to an entry in one of the four
    /// tables.
    pub(crate) fn is_allowed_func(&self, f: &NativeFn) -> bool {
        let tables = self.tables();
        if tables.functions.borrow().values().any(|g| f.ptr_eq(g)) {
            return true;
        }

        tables.unary.values().any(|g| f.ptr_eq(g))
        || tables.binary.values().any(|g| f.ptr_eq(g))
        || tables.ternary.values().any(|g| f.ptr_eq(g))
    }
}
