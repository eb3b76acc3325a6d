#[derive(Debug, Clone, PartialEq)]
/// Represents all errors that can occur during lexing or parsing.
///
/// Every variant carries the 1-based line and column of the offending
/// position in the source text.
pub enum ParseError {
    /// Encountered a character the lexer does not recognize.
    UnknownCharacter {
        /// The unrecognized character.
        character: char,
        /// The source line where the error occurred.
        line:      usize,
        /// The source column where the error occurred.
        column:    usize,
    },
    /// A string literal contained a malformed escape sequence.
    BadEscape {
        /// The offending escape sequence, backslash included.
        sequence: String,
        /// The source line where the error occurred.
        line:     usize,
        /// The source column where the error occurred.
        column:   usize,
    },
    /// A numeric literal could not be represented.
    BadNumber {
        /// The source line where the error occurred.
        line:   usize,
        /// The source column where the error occurred.
        column: usize,
    },
    /// An operator appeared whose family is disabled in the parser options.
    DisabledOperator {
        /// The operator symbol or name.
        operator: String,
        /// The source line where the error occurred.
        line:     usize,
        /// The source column where the error occurred.
        column:   usize,
    },
    /// A `.` member access appeared while member access is disabled.
    MemberAccessDisabled {
        /// The source line where the error occurred.
        line:   usize,
        /// The source column where the error occurred.
        column: usize,
    },
    /// A `name(args) = body` definition appeared while the function
    /// definition feature is disabled.
    FunctionDefinitionDisabled {
        /// The source line where the error occurred.
        line:   usize,
        /// The source column where the error occurred.
        column: usize,
    },
    /// A specific token was required but something else was found.
    ExpectedToken {
        /// A description of the expected token.
        expected: String,
        /// A description of the token actually found.
        found:    String,
        /// The source line where the error occurred.
        line:     usize,
        /// The source column where the error occurred.
        column:   usize,
    },
    /// Found a token that cannot start or continue an expression here.
    UnexpectedToken {
        /// A description of the token encountered.
        found:  String,
        /// The source line where the error occurred.
        line:   usize,
        /// The source column where the error occurred.
        column: usize,
    },
    /// The left-hand side of `=` was not a variable or member access.
    InvalidAssignmentTarget {
        /// The source line where the error occurred.
        line:   usize,
        /// The source column where the error occurred.
        column: usize,
    },
    /// The call-shaped pattern in a function definition was malformed.
    InvalidFunctionDefinition {
        /// The source line where the error occurred.
        line:   usize,
        /// The source column where the error occurred.
        column: usize,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCharacter { character, line, column } => {
                write!(f, "Error at {line}:{column}: Unknown character '{character}'.")
            },

            Self::BadEscape { sequence, line, column } => {
                write!(f, "Error at {line}:{column}: Illegal escape sequence '{sequence}'.")
            },

            Self::BadNumber { line, column } => {
                write!(f, "Error at {line}:{column}: Numeric literal cannot be represented.")
            },

            Self::DisabledOperator { operator, line, column } => {
                write!(f, "Error at {line}:{column}: Operator '{operator}' is disabled.")
            },

            Self::MemberAccessDisabled { line, column } => {
                write!(f, "Error at {line}:{column}: Member access is not permitted.")
            },

            Self::FunctionDefinitionDisabled { line, column } => {
                write!(f, "Error at {line}:{column}: Function definition is not permitted.")
            },

            Self::ExpectedToken { expected,
                                  found,
                                  line,
                                  column, } => {
                write!(f, "Error at {line}:{column}: Expected {expected} but found {found}.")
            },

            Self::UnexpectedToken { found, line, column } => {
                write!(f, "Error at {line}:{column}: Unexpected token {found}.")
            },

            Self::InvalidAssignmentTarget { line, column } => {
                write!(f, "Error at {line}:{column}: Expected a variable for assignment.")
            },

            Self::InvalidFunctionDefinition { line, column } => write!(f,
                                                                       "Error at {line}:{column}: Invalid function definition syntax. Example: f(x) = x * x"),
        }
    }
}

impl std::error::Error for ParseError {}
