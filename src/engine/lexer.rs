use logos::Logos;

use crate::{
    engine::{
        parser::Parser,
        token::{Token, TokenKind, TokenValue},
        value::Value,
    },
    error::ParseError,
};

/// Failures the raw scanner can produce for a single token.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexError {
    /// No recognizer matched the character.
    #[default]
    UnknownCharacter,
    /// A numeric literal could not be represented as `f64`.
    BadNumber,
    /// A string literal contained a malformed escape sequence.
    BadEscape(String),
}

/// Raw lexical shapes recognized by the scanner, before operator gating.
///
/// Whitespace and `/* ... */` comments are skipped. The wider classification
/// into the [`Token`] model (named operators, constants, enable-gating) is
/// done by [`TokenStream`].
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
pub enum RawToken {
    /// Numeric literal tokens: decimal forms such as `3.14`, `.5`, `2e-10`,
    /// and radix-prefixed integers such as `0x1f` or `0b101`.
    #[regex(r"0x[0-9a-fA-F]+", parse_radix_16)]
    #[regex(r"0b[01]+", parse_radix_2)]
    #[regex(r"[0-9]+\.?[0-9]*([eE][+-]?[0-9]+)?", parse_number)]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", parse_number)]
    Number(f64),
    /// Quoted string literals with their backslash escapes decoded.
    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    #[regex(r"'([^'\\]|\\.)*'", unescape)]
    Str(String),
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `*` (the dot-operator glyphs are accepted as aliases)
    #[token("*")]
    #[token("∙")]
    #[token("•")]
    Star,
    /// `/`
    #[token("/")]
    Slash,
    /// `%`
    #[token("%")]
    Percent,
    /// `^`
    #[token("^")]
    Caret,
    /// `?`
    #[token("?")]
    Question,
    /// `:`
    #[token(":")]
    Colon,
    /// `.`
    #[token(".")]
    Dot,
    /// `==`
    #[token("==")]
    EqualEqual,
    /// `=`
    #[token("=")]
    Equal,
    /// `!=`
    #[token("!=")]
    BangEqual,
    /// `!`
    #[token("!")]
    Bang,
    /// `>=`
    #[token(">=")]
    GreaterEqual,
    /// `>`
    #[token(">")]
    Greater,
    /// `<=`
    #[token("<=")]
    LessEqual,
    /// `<`
    #[token("<")]
    Less,
    /// `||`
    #[token("||")]
    DoublePipe,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `,`
    #[token(",")]
    Comma,
    /// `;`
    #[token(";")]
    Semicolon,
    /// Identifier tokens; reclassified by the stream into named operators,
    /// constants, or plain names.
    #[regex(r"[A-Za-z_$][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),
}

fn parse_number(lex: &logos::Lexer<RawToken>) -> Result<f64, LexError> {
    lex.slice().parse().map_err(|_| LexError::BadNumber)
}

fn parse_radix_16(lex: &logos::Lexer<RawToken>) -> Result<f64, LexError> {
    parse_radix(&lex.slice()[2..], 16)
}

fn parse_radix_2(lex: &logos::Lexer<RawToken>) -> Result<f64, LexError> {
    parse_radix(&lex.slice()[2..], 2)
}

#[allow(clippy::cast_precision_loss)]
fn parse_radix(digits: &str, radix: u32) -> Result<f64, LexError> {
    u64::from_str_radix(digits, radix).map(|v| v as f64)
                                      .map_err(|_| LexError::BadNumber)
}

/// Decodes the escape sequences of a quoted string literal.
///
/// Recognized escapes: `\n \t \r \b \f \\ \/ \' \"` and `\uXXXX` with
/// exactly four hex digits. Anything else is a lexical error.
fn unescape(lex: &logos::Lexer<RawToken>) -> Result<String, LexError> {
    let slice = lex.slice();
    let raw = &slice[1..slice.len() - 1];

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('b') => out.push('\u{0008}'),
            Some('f') => out.push('\u{000C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                    return Err(LexError::BadEscape(format!("\\u{hex}")));
                }

                let code = u32::from_str_radix(&hex, 16).map_err(|_| {
                              LexError::BadEscape(format!("\\u{hex}"))
                          })?;
                match char::from_u32(code) {
                    Some(decoded) => out.push(decoded),
                    None => return Err(LexError::BadEscape(format!("\\u{hex}"))),
                }
            },
            Some(other) => return Err(LexError::BadEscape(format!("\\{other}"))),
            None => return Err(LexError::BadEscape("\\".to_string())),
        }
    }

    Ok(out)
}

/// A lazy token source over one expression string.
///
/// Wraps the raw scanner and applies the parser configuration: symbolic
/// operators must be enabled to be produced, brackets require the array
/// feature, and identifiers are reclassified into named operators (when
/// enabled and present in an operator table), constants, or plain names.
///
/// `save`/`restore` provide the single checkpoint slot the parser uses to
/// backtrack ambiguous prefix forms.
pub(crate) struct TokenStream<'s> {
    source: &'s str,
    lexer:  logos::Lexer<'s, RawToken>,
    saved:  Option<logos::Lexer<'s, RawToken>>,
    parser: Parser,
}

impl<'s> TokenStream<'s> {
    pub fn new(parser: Parser, source: &'s str) -> Self {
        Self { source,
               lexer: RawToken::lexer(source),
               saved: None,
               parser }
    }

    /// Checkpoints the current scan position.
    pub fn save(&mut self) {
        self.saved = Some(self.lexer.clone());
    }

    /// Rewinds to the last checkpoint.
    pub fn restore(&mut self) {
        if let Some(saved) = &self.saved {
            self.lexer = saved.clone();
        }
    }

    /// Produces the next token, or the end-of-input token once the source is
    /// exhausted.
    ///
    /// # Errors
    /// Returns a `ParseError` with 1-based line/column for unknown
    /// characters, malformed literals, and disabled operator symbols.
    pub fn next(&mut self) -> Result<Token, ParseError> {
        let Some(raw) = self.lexer.next() else {
            return Ok(Token::eof(self.source.len()));
        };
        let pos = self.lexer.span().start;

        match raw {
            Ok(RawToken::Number(n)) => {
                Ok(Token::new(TokenKind::Number, TokenValue::Number(n), pos))
            },
            Ok(RawToken::Str(s)) => Ok(Token::new(TokenKind::Str, TokenValue::Text(s), pos)),
            Ok(RawToken::Plus) => self.op("+", pos),
            Ok(RawToken::Minus) => self.op("-", pos),
            Ok(RawToken::Star) => self.op("*", pos),
            Ok(RawToken::Slash) => self.op("/", pos),
            Ok(RawToken::Percent) => self.op("%", pos),
            Ok(RawToken::Caret) => self.op("^", pos),
            Ok(RawToken::Question) => self.op("?", pos),
            Ok(RawToken::Colon) => self.op(":", pos),
            Ok(RawToken::Dot) => self.op(".", pos),
            Ok(RawToken::EqualEqual) => self.op("==", pos),
            Ok(RawToken::Equal) => self.op("=", pos),
            Ok(RawToken::BangEqual) => self.op("!=", pos),
            Ok(RawToken::Bang) => self.op("!", pos),
            Ok(RawToken::GreaterEqual) => self.op(">=", pos),
            Ok(RawToken::Greater) => self.op(">", pos),
            Ok(RawToken::LessEqual) => self.op("<=", pos),
            Ok(RawToken::Less) => self.op("<", pos),
            Ok(RawToken::DoublePipe) => self.op("||", pos),
            Ok(RawToken::LParen) => Ok(self.punct(TokenKind::Paren, "(", pos)),
            Ok(RawToken::RParen) => Ok(self.punct(TokenKind::Paren, ")", pos)),
            Ok(RawToken::LBracket) => self.bracket("[", pos),
            Ok(RawToken::RBracket) => self.bracket("]", pos),
            Ok(RawToken::Comma) => Ok(self.punct(TokenKind::Comma, ",", pos)),
            Ok(RawToken::Semicolon) => Ok(self.punct(TokenKind::Semicolon, ";", pos)),
            Ok(RawToken::Identifier(name)) => Ok(self.classify_name(name, pos)),
            Err(e) => Err(self.lex_error(&e, pos)),
        }
    }

    /// Computes 1-based line/column coordinates for a byte offset.
    pub fn coordinates(&self, pos: usize) -> (usize, usize) {
        let clamped = pos.min(self.source.len());
        let before = &self.source[..clamped];
        let line = before.matches('\n').count() + 1;
        let column = clamped - before.rfind('\n').map_or(0, |i| i + 1) + 1;
        (line, column)
    }

    fn op(&self, symbol: &str, pos: usize) -> Result<Token, ParseError> {
        if self.parser.is_operator_enabled(symbol) {
            Ok(Token::new(TokenKind::Op, TokenValue::Text(symbol.to_string()), pos))
        } else {
            let (line, column) = self.coordinates(pos);
            Err(ParseError::DisabledOperator { operator: symbol.to_string(),
                                               line,
                                               column })
        }
    }

    fn bracket(&self, symbol: &str, pos: usize) -> Result<Token, ParseError> {
        if self.parser.is_operator_enabled("[") {
            Ok(Token::new(TokenKind::Bracket, TokenValue::Text(symbol.to_string()), pos))
        } else {
            let (line, column) = self.coordinates(pos);
            Err(ParseError::DisabledOperator { operator: "[".to_string(),
                                               line,
                                               column })
        }
    }

    fn punct(&self, kind: TokenKind, symbol: &str, pos: usize) -> Token {
        Token::new(kind, TokenValue::Text(symbol.to_string()), pos)
    }

    /// Reclassifies an identifier, in priority order: enabled named operator
    /// present in an operator table, then constant, then plain name.
    fn classify_name(&self, name: String, pos: usize) -> Token {
        if self.parser.has_operator(&name) && self.parser.is_operator_enabled(&name) {
            return Token::new(TokenKind::Op, TokenValue::Text(name), pos);
        }

        if let Some(value) = self.parser.constant(&name) {
            let value = match value {
                Value::Number(n) => TokenValue::Number(n),
                Value::Bool(b) => TokenValue::Bool(b),
                Value::Str(s) => TokenValue::Text(s),
                other => TokenValue::Number(other.as_number().unwrap_or(f64::NAN)),
            };
            return Token::new(TokenKind::Number, value, pos);
        }

        Token::new(TokenKind::Name, TokenValue::Text(name), pos)
    }

    fn lex_error(&self, e: &LexError, pos: usize) -> ParseError {
        let (line, column) = self.coordinates(pos);
        match e {
            LexError::UnknownCharacter => {
                let character = self.source[pos..].chars().next().unwrap_or(' ');
                ParseError::UnknownCharacter { character,
                                               line,
                                               column }
            },
            LexError::BadNumber => ParseError::BadNumber { line, column },
            LexError::BadEscape(sequence) => ParseError::BadEscape { sequence: sequence.clone(),
                                                                     line,
                                                                     column, },
        }
    }
}
