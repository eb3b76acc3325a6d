#[derive(Debug, Clone, PartialEq)]
/// The distinguished failure raised by the evaluator's trust gate.
///
/// Callers are expected to match on [`EvalError::Security`] to distinguish
/// "the expression referenced something unsafe" from "the expression is
/// malformed or hit a runtime type problem".
pub enum SecurityError {
    /// A variable or member name matched the reserved prototype-chain
    /// pattern (`__proto__`, `prototype`, `constructor`).
    ReservedName {
        /// The rejected name.
        name: String,
    },
    /// A context variable held a callable that is not reference-identical to
    /// any entry in the operator or function tables.
    UntrustedVariable {
        /// The variable name the callable was read from.
        name: String,
    },
    /// A call target was a callable outside the trusted tables.
    UntrustedCall,
    /// A member access produced a callable outside the trusted tables.
    UntrustedMember {
        /// The member name the callable was read from.
        name: String,
    },
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReservedName { name } => {
                write!(f, "Security error: Access to reserved name '{name}'.")
            },
            Self::UntrustedVariable { name } => write!(f,
                                                       "Security error: Variable '{name}' references a function that is not allowed."),
            Self::UntrustedCall => {
                write!(f, "Security error: Call target is not an allowed function.")
            },
            Self::UntrustedMember { name } => write!(f,
                                                     "Security error: Member '{name}' references a function that is not allowed."),
        }
    }
}

impl std::error::Error for SecurityError {}

#[derive(Debug, Clone, PartialEq)]
/// Represents all errors that can occur while evaluating a program.
pub enum EvalError {
    /// The evaluator's security gate rejected the operation.
    Security(SecurityError),
    /// A variable was neither in the evaluation context nor a built-in.
    UndefinedVariable {
        /// The name of the variable.
        name: String,
    },
    /// A member access named a key that does not exist in the object.
    UnknownMember {
        /// The name of the member.
        name: String,
    },
    /// A call was made on a value that is not a function.
    NotAFunction {
        /// A description of the value that was called.
        found: String,
    },
    /// An operator instruction named an operator missing from its table.
    UnknownOperator {
        /// The operator name.
        name: String,
    },
    /// The program left the value stack in an impossible state.
    InvalidExpression {
        /// Details about the violation.
        details: String,
    },
    /// A value had an unexpected or incompatible type.
    TypeMismatch {
        /// Details about the type mismatch.
        details: String,
    },
    /// An argument to a built-in was invalid or missing.
    InvalidArgument {
        /// Details about why the argument is invalid.
        details: String,
    },
    /// Tried to index an array or string outside its bounds.
    IndexOutOfBounds {
        /// The number of elements in the indexed value.
        len:   usize,
        /// The index that was actually requested.
        found: i64,
    },
}

impl EvalError {
    /// Returns `true` if this error came from the security gate.
    #[must_use]
    pub const fn is_security(&self) -> bool {
        matches!(self, Self::Security(..))
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Security(e) => write!(f, "{e}"),
            Self::UndefinedVariable { name } => write!(f, "Undefined variable '{name}'."),
            Self::UnknownMember { name } => write!(f, "Unknown member '{name}'."),
            Self::NotAFunction { found } => write!(f, "{found} is not a function."),
            Self::UnknownOperator { name } => write!(f, "Unknown operator '{name}'."),
            Self::InvalidExpression { details } => write!(f, "Invalid expression: {details}."),
            Self::TypeMismatch { details } => write!(f, "Type mismatch: {details}."),
            Self::InvalidArgument { details } => write!(f, "Invalid argument: {details}."),
            Self::IndexOutOfBounds { len, found } => write!(f,
                                                            "Index {found} is out of bounds for length {len}."),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<SecurityError> for EvalError {
    fn from(e: SecurityError) -> Self {
        Self::Security(e)
    }
}
