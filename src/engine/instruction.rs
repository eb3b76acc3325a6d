use std::rc::Rc;

use crate::engine::value::Value;

/// A single step of a parsed program.
///
/// Instructions are laid out in postfix evaluation order: evaluating them
/// left to right against a value stack reconstructs the expression tree.
/// Deferred constructs (ternary arms, short-circuit right operands,
/// assignment right-hand sides, lambda bodies, statement sequences) are
/// nested as [`Instruction::Expr`] sub-programs that the evaluator only runs
/// when a consuming instruction demands them.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Pushes a literal value (number, string, or constant).
    Number(Value),
    /// Applies the named unary operator to the top of stack.
    Unary(String),
    /// Applies the named binary operator to the top two stack entries.
    Binary(String),
    /// Applies the named ternary operator to the top three stack entries.
    Ternary(String),
    /// Pushes the value of a variable or built-in.
    Var(String),
    /// Pushes a binding target name for assignment or function definition.
    VarName(String),
    /// Calls the stacked function with the given number of stacked arguments.
    FunCall(usize),
    /// Defines a function with the given parameter count from the stacked
    /// name, parameter names, and body sub-program.
    FunDef(usize),
    /// Pushes a lazy sub-program, deferred until a consumer demands it.
    Expr(Rc<Program>),
    /// Replaces the top of stack with one of its members.
    Member(String),
    /// Discards the value of a finished statement.
    EndStatement,
    /// Collects the given number of stacked values into an array.
    Array(usize),
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Unary(op) | Self::Binary(op) | Self::Ternary(op) => write!(f, "{op}"),
            Self::Var(name) | Self::VarName(name) => write!(f, "{name}"),
            Self::FunCall(argc) => write!(f, "CALL {argc}"),
            Self::FunDef(argc) => write!(f, "DEF {argc}"),
            Self::Expr(program) => write!(f, "({program})"),
            Self::Member(name) => write!(f, ".{name}"),
            Self::EndStatement => write!(f, ";"),
            Self::Array(argc) => write!(f, "ARRAY {argc}"),
        }
    }
}

/// An ordered instruction sequence representing one parsed expression.
///
/// A program is created once by the parser (or by a rewrite pass producing a
/// new program) and is immutable and shareable across evaluations from then
/// on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    #[must_use]
    pub const fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, instruction) in self.instructions.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }
            write!(f, "{instruction}")?;
        }
        Ok(())
    }
}
