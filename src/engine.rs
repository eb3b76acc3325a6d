/// Lexical token model.
///
/// Defines the `Token` struct produced by the token source and consumed by
/// the parser, along with its kind and value enums.
pub mod token;

/// Token source.
///
/// Scans raw text into a lazy sequence of tokens with a logos-derived
/// scanner, applying the parser's operator enable-gating and reclassifying
/// identifiers into named operators and constants.
pub mod lexer;

/// Instruction and program model.
///
/// The tagged instruction representation shared by the parser, evaluator,
/// and both rewrite passes. A `Program` is an ordered instruction sequence
/// in postfix evaluation order.
pub mod instruction;

/// Runtime values and the evaluation context.
///
/// Defines the `Value` enum, the reference-identity `NativeFn` callable
/// wrapper, and the caller-owned mutable `Context` mapping.
pub mod value;

/// Parser facade and recursive-descent implementation.
///
/// Holds the operator/function tables, the feature-toggle options, and the
/// `parse` entry point that turns text into an `Expression`.
pub mod parser;

/// Stack-machine evaluator.
///
/// Walks a program with a single value stack, resolving lazy sub-programs on
/// demand and enforcing the identity-based security gate.
pub mod evaluator;

/// Constant-folding simplifier.
///
/// Rewrites a program into a generally shorter, semantically equivalent one
/// given a set of known-constant bindings.
pub mod simplify;

/// Variable substitution.
///
/// Structurally replaces a free variable with another parsed program.
pub mod substitute;

/// Symbol extraction.
///
/// Collects the free variable names (optionally fused into dotted member
/// paths) referenced by a program.
pub mod symbols;

/// Built-in function catalogue.
///
/// Pure numeric, string, array, and higher-order functions plus the default
/// operator tables and constants.
pub mod functions;

/// Expression facade.
///
/// Bundles a parsed program with the tables it was parsed against and
/// exposes evaluate, simplify, substitute, and symbol extraction.
pub mod expression;
