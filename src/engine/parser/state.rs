use std::rc::Rc;

use crate::{
    engine::{
        instruction::{Instruction, Program},
        lexer::TokenStream,
        parser::Parser,
        token::{Token, TokenKind, TokenValue},
        value::Value,
    },
    error::ParseError,
};

const COMPARISON_OPERATORS: [&str; 7] = ["==", "!=", "<", "<=", ">=", ">", "in"];
const ADD_SUB_OPERATORS: [&str; 3] = ["+", "-", "||"];
const TERM_OPERATORS: [&str; 3] = ["*", "/", "%"];

/// Recursive-descent parser over a token stream.
///
/// Keeps the current token and one token of lookahead, plus one saved
/// checkpoint used to back out of ambiguous prefix-operator forms. Each
/// `parse_*` method appends postfix instructions to the caller's buffer;
/// deferred constructs are collected into their own buffer first and pushed
/// as nested [`Instruction::Expr`] programs.
pub(crate) struct ParserState<'s> {
    parser:        Parser,
    tokens:        TokenStream<'s>,
    current:       Token,
    next_token:    Token,
    saved_current: Token,
    saved_next:    Token,
}

impl<'s> ParserState<'s> {
    pub fn new(parser: Parser, mut tokens: TokenStream<'s>) -> Result<Self, ParseError> {
        let next_token = tokens.next()?;
        Ok(Self { parser,
                  tokens,
                  current: Token::eof(0),
                  next_token,
                  saved_current: Token::eof(0),
                  saved_next: Token::eof(0) })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let fresh = self.tokens.next()?;
        self.current = std::mem::replace(&mut self.next_token, fresh);
        Ok(())
    }

    fn save(&mut self) {
        self.saved_current = self.current.clone();
        self.saved_next = self.next_token.clone();
        self.tokens.save();
    }

    fn restore(&mut self) {
        self.tokens.restore();
        self.current = self.saved_current.clone();
        self.next_token = self.saved_next.clone();
    }

    /// The textual payload of the most recently accepted token.
    fn current_text(&self) -> String {
        self.current.text().unwrap_or_default().to_string()
    }

    fn accept_kind(&mut self, kind: TokenKind) -> Result<bool, ParseError> {
        if self.next_token.kind == kind {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn accept_op(&mut self, symbol: &str) -> Result<bool, ParseError> {
        if self.next_token.is_op(symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn accept_op_in(&mut self, symbols: &[&str]) -> Result<bool, ParseError> {
        let matches = self.next_token.kind == TokenKind::Op
                      && self.next_token.text().is_some_and(|t| symbols.contains(&t));
        if matches {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Accepts any operator token whose name is in the unary table. This is
    /// how built-ins like `sin` are recognized in prefix or atom position.
    fn accept_prefix_op(&mut self) -> Result<bool, ParseError> {
        let matches = self.next_token.kind == TokenKind::Op
                      && self.next_token
                             .text()
                             .is_some_and(|t| self.parser.is_unary(t));
        if matches {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn accept_paren(&mut self, symbol: &str) -> Result<bool, ParseError> {
        if self.next_token.is_paren(symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn accept_bracket(&mut self, symbol: &str) -> Result<bool, ParseError> {
        if self.next_token.is_bracket(symbol) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn expected(&self, what: &str) -> ParseError {
        let (line, column) = self.tokens.coordinates(self.next_token.pos);
        ParseError::ExpectedToken { expected: what.to_string(),
                                    found: self.next_token.to_string(),
                                    line,
                                    column }
    }

    fn unexpected(&self) -> ParseError {
        let (line, column) = self.tokens.coordinates(self.next_token.pos);
        ParseError::UnexpectedToken { found: self.next_token.to_string(),
                                      line,
                                      column }
    }

    fn expect_op(&mut self, symbol: &str) -> Result<(), ParseError> {
        if self.accept_op(symbol)? {
            return Ok(());
        }
        Err(self.expected(&format!("'{symbol}'")))
    }

    fn expect_paren(&mut self, symbol: &str) -> Result<(), ParseError> {
        if self.accept_paren(symbol)? {
            return Ok(());
        }
        Err(self.expected(&format!("'{symbol}'")))
    }

    fn expect_bracket(&mut self, symbol: &str) -> Result<(), ParseError> {
        if self.accept_bracket(symbol)? {
            return Ok(());
        }
        Err(self.expected(&format!("'{symbol}'")))
    }

    fn expect_name(&mut self) -> Result<(), ParseError> {
        if self.accept_kind(TokenKind::Name)? {
            return Ok(());
        }
        Err(self.expected("a name"))
    }

    /// Requires the whole input to have been consumed.
    pub fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.accept_kind(TokenKind::Eof)? {
            return Ok(());
        }
        Err(self.expected("end of input"))
    }

    /// Parses a statement sequence: assignment-level expressions separated
    /// by `;`, with all but the last discarded at evaluation time.
    pub fn parse_expression(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        let mut expr_instr = Vec::new();
        if self.parse_until_end_statement(instr, &mut expr_instr)? {
            return Ok(());
        }

        self.parse_variable_assignment(&mut expr_instr)?;
        if self.parse_until_end_statement(instr, &mut expr_instr)? {
            return Ok(());
        }

        instr.append(&mut expr_instr);
        Ok(())
    }

    /// On `;`, wraps what has been parsed so far (plus the rest of the
    /// sequence) into a lazy sub-program and reports that the caller is
    /// done.
    fn parse_until_end_statement(&mut self,
                                 instr: &mut Vec<Instruction>,
                                 expr_instr: &mut Vec<Instruction>)
                                 -> Result<bool, ParseError> {
        if !self.accept_kind(TokenKind::Semicolon)? {
            return Ok(false);
        }

        if self.next_token.kind != TokenKind::Eof && !self.next_token.is_paren(")") {
            expr_instr.push(Instruction::EndStatement);
        }
        if self.next_token.kind != TokenKind::Eof {
            self.parse_expression(expr_instr)?;
        }

        instr.push(Instruction::Expr(Rc::new(Program::new(std::mem::take(expr_instr)))));
        Ok(true)
    }

    /// Parses right-associative assignment, rewriting `name(args) = body`
    /// into a function definition when that feature is enabled.
    fn parse_variable_assignment(&mut self,
                                 instr: &mut Vec<Instruction>)
                                 -> Result<(), ParseError> {
        self.parse_conditional(instr)?;

        while self.accept_op("=")? {
            let (line, column) = self.tokens.coordinates(self.current.pos);
            let target = instr.pop()
                              .ok_or(ParseError::InvalidAssignmentTarget { line, column })?;

            match target {
                Instruction::FunCall(argc) => {
                    if !self.parser.is_operator_enabled("()=") {
                        return Err(ParseError::FunctionDefinitionDisabled { line, column });
                    }
                    if instr.len() <= argc {
                        return Err(ParseError::InvalidFunctionDefinition { line, column });
                    }

                    // The call's target and arguments become the function
                    // name and parameter-name list.
                    let last = instr.len() - 1;
                    for i in 0..=argc {
                        if let Instruction::Var(name) = &instr[last - i] {
                            instr[last - i] = Instruction::VarName(name.clone());
                        }
                    }

                    let mut body = Vec::new();
                    self.parse_variable_assignment(&mut body)?;
                    instr.push(Instruction::Expr(Rc::new(Program::new(body))));
                    instr.push(Instruction::FunDef(argc));
                },
                Instruction::Var(name) | Instruction::Member(name) => {
                    let mut value = Vec::new();
                    self.parse_variable_assignment(&mut value)?;
                    instr.push(Instruction::VarName(name));
                    instr.push(Instruction::Expr(Rc::new(Program::new(value))));
                    instr.push(Instruction::Binary("=".to_string()));
                },
                _ => return Err(ParseError::InvalidAssignmentTarget { line, column }),
            }
        }
        Ok(())
    }

    /// Parses `cond ? a : b` with both arms deferred.
    fn parse_conditional(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_or(instr)?;

        while self.accept_op("?")? {
            let mut true_branch = Vec::new();
            let mut false_branch = Vec::new();

            self.parse_conditional(&mut true_branch)?;
            self.expect_op(":")?;
            self.parse_conditional(&mut false_branch)?;

            instr.push(Instruction::Expr(Rc::new(Program::new(true_branch))));
            instr.push(Instruction::Expr(Rc::new(Program::new(false_branch))));
            instr.push(Instruction::Ternary("?".to_string()));
        }
        Ok(())
    }

    /// Parses `or` with a deferred right operand (short-circuit).
    fn parse_or(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_and(instr)?;

        while self.accept_op("or")? {
            let mut rhs = Vec::new();
            self.parse_and(&mut rhs)?;
            instr.push(Instruction::Expr(Rc::new(Program::new(rhs))));
            instr.push(Instruction::Binary("or".to_string()));
        }
        Ok(())
    }

    /// Parses `and` with a deferred right operand (short-circuit).
    fn parse_and(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_comparison(instr)?;

        while self.accept_op("and")? {
            let mut rhs = Vec::new();
            self.parse_comparison(&mut rhs)?;
            instr.push(Instruction::Expr(Rc::new(Program::new(rhs))));
            instr.push(Instruction::Binary("and".to_string()));
        }
        Ok(())
    }

    fn parse_comparison(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_add_sub(instr)?;

        while self.accept_op_in(&COMPARISON_OPERATORS)? {
            let op = self.current_text();
            self.parse_add_sub(instr)?;
            instr.push(Instruction::Binary(op));
        }
        Ok(())
    }

    fn parse_add_sub(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_term(instr)?;

        while self.accept_op_in(&ADD_SUB_OPERATORS)? {
            let op = self.current_text();
            self.parse_term(instr)?;
            instr.push(Instruction::Binary(op));
        }
        Ok(())
    }

    fn parse_term(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_factor(instr)?;

        while self.accept_op_in(&TERM_OPERATORS)? {
            let op = self.current_text();
            self.parse_factor(instr)?;
            instr.push(Instruction::Binary(op));
        }
        Ok(())
    }

    /// Parses a unary-prefix form.
    ///
    /// `-` and `+` are always unary here. Any other prefix operator is
    /// re-examined: followed by `(` it is really a call, and followed by a
    /// terminator it is really a plain identifier; both cases rewind to the
    /// checkpoint and re-parse.
    fn parse_factor(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.save();

        if self.accept_prefix_op()? {
            let op = self.current_text();

            if op != "-" && op != "+" {
                if self.next_token.is_paren("(") {
                    self.restore();
                    return self.parse_exponential(instr);
                }

                if self.next_token.kind == TokenKind::Semicolon
                   || self.next_token.kind == TokenKind::Comma
                   || self.next_token.kind == TokenKind::Eof
                   || self.next_token.is_paren(")")
                {
                    self.restore();
                    return self.parse_atom(instr);
                }
            }

            self.parse_factor(instr)?;
            instr.push(Instruction::Unary(op));
            return Ok(());
        }

        self.parse_exponential(instr)
    }

    /// Parses right-associative `^` by re-entering the unary level for the
    /// exponent.
    fn parse_exponential(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_postfix(instr)?;

        while self.accept_op("^")? {
            self.parse_factor(instr)?;
            instr.push(Instruction::Binary("^".to_string()));
        }
        Ok(())
    }

    fn parse_postfix(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_function_call(instr)?;

        while self.accept_op("!")? {
            instr.push(Instruction::Unary("!".to_string()));
        }
        Ok(())
    }

    fn parse_function_call(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        if self.accept_prefix_op()? {
            let op = self.current_text();
            self.parse_atom(instr)?;
            instr.push(Instruction::Unary(op));
            return Ok(());
        }

        self.parse_member(instr)?;
        while self.accept_paren("(")? {
            if self.accept_paren(")")? {
                instr.push(Instruction::FunCall(0));
            } else {
                let argc = self.parse_argument_list(instr)?;
                instr.push(Instruction::FunCall(argc));
            }
        }
        Ok(())
    }

    fn parse_argument_list(&mut self, instr: &mut Vec<Instruction>) -> Result<usize, ParseError> {
        let mut argc = 0;

        while !self.accept_paren(")")? {
            self.parse_expression(instr)?;
            argc += 1;

            while self.accept_kind(TokenKind::Comma)? {
                self.parse_expression(instr)?;
                argc += 1;
            }
        }
        Ok(argc)
    }

    fn parse_member(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        self.parse_atom(instr)?;

        loop {
            if self.accept_op(".")? {
                if !self.parser.allow_member_access() {
                    let (line, column) = self.tokens.coordinates(self.current.pos);
                    return Err(ParseError::MemberAccessDisabled { line, column });
                }

                self.expect_name()?;
                instr.push(Instruction::Member(self.current_text()));
            } else if self.accept_bracket("[")? {
                self.parse_expression(instr)?;
                self.expect_bracket("]")?;
                instr.push(Instruction::Binary("[".to_string()));
            } else {
                return Ok(());
            }
        }
    }

    fn parse_atom(&mut self, instr: &mut Vec<Instruction>) -> Result<(), ParseError> {
        if self.accept_kind(TokenKind::Name)? || self.accept_prefix_op()? {
            instr.push(Instruction::Var(self.current_text()));
        } else if self.accept_kind(TokenKind::Number)? {
            instr.push(Instruction::Number(token_value(&self.current)));
        } else if self.accept_kind(TokenKind::Str)? {
            instr.push(Instruction::Number(Value::Str(self.current_text())));
        } else if self.accept_paren("(")? {
            self.parse_expression(instr)?;
            self.expect_paren(")")?;
        } else if self.accept_bracket("[")? {
            if self.accept_bracket("]")? {
                instr.push(Instruction::Array(0));
            } else {
                let argc = self.parse_array_list(instr)?;
                instr.push(Instruction::Array(argc));
            }
        } else {
            return Err(self.unexpected());
        }
        Ok(())
    }

    fn parse_array_list(&mut self, instr: &mut Vec<Instruction>) -> Result<usize, ParseError> {
        let mut argc = 0;

        while !self.accept_bracket("]")? {
            self.parse_expression(instr)?;
            argc += 1;

            while self.accept_kind(TokenKind::Comma)? {
                self.parse_expression(instr)?;
                argc += 1;
            }
        }
        Ok(argc)
    }
}

/// Converts a number token's payload into a literal value.
fn token_value(token: &Token) -> Value {
    match &token.value {
        TokenValue::Number(n) => Value::Number(*n),
        TokenValue::Bool(b) => Value::Bool(*b),
        TokenValue::Text(s) => Value::Str(s.clone()),
        TokenValue::None => Value::Number(0.0),
    }
}
