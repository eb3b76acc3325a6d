/// Parsing errors.
///
/// Defines all error types that can occur during lexing and parsing of an
/// expression. Parse errors include unknown characters, malformed escape
/// sequences, unexpected tokens, and constructs that are disallowed by the
/// active parser configuration.
pub mod parse_error;
/// Evaluation errors.
///
/// Contains all error types that can be raised while executing a parsed
/// program, including the distinguished [`SecurityError`] subtype raised by
/// the evaluator's trust gate.
pub mod eval_error;

pub use eval_error::{EvalError, SecurityError};
pub use parse_error::ParseError;

#[derive(Debug)]
/// Either phase of failure, for APIs that parse and evaluate in one step.
pub enum Error {
    /// The expression could not be parsed.
    Parse(ParseError),
    /// The expression parsed but failed to evaluate.
    Eval(EvalError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Eval(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Eval(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Self::Eval(e)
    }
}
