use std::iter::Peekable;
use std::str::CharIndices;

use crate::ast::{Clause, Fallback, StringLiteral, TemplateString, VariableRef};
use crate::error::{ParseError, ParseErrorKind};

type ParseResult<T> = Result<T, ParseError>;

/// Characters that must be escaped with `\` to appear literally.
pub const RESERVED: [char; 6] = ['\\', '{', '}', '[', ']', '|'];

/// Limits applied while parsing untrusted template sources.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ParseOptions {
    /// Maximum number of nested fallbacks.
    pub max_depth: usize,
    /// Maximum source length in bytes.
    pub max_length: usize,
}

impl ParseOptions {
    pub const DEFAULT_MAX_DEPTH: usize = 32;
    pub const DEFAULT_MAX_LENGTH: usize = 4096;
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            max_length: Self::DEFAULT_MAX_LENGTH,
        }
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    /// Current fallback nesting level.
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, options: &ParseOptions) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            depth: 0,
            max_depth: options.max_depth,
        }
    }

    /// Byte offset of the next unconsumed character.
    #[inline]
    fn offset(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    #[inline]
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        self.chars.next().map(|(_, c)| c)
    }

    #[inline]
    fn make_error(&mut self, kind: ParseErrorKind) -> ParseError {
        let offset = self.offset();
        ParseError::new(kind, offset)
    }

    fn eof(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    /// Parses clauses until end of input or a `|`/`]` that belongs to an
    /// enclosing fallback. The caller decides whether stopping there is valid.
    fn parse_template_string(&mut self) -> ParseResult<TemplateString> {
        let mut clauses = Vec::new();
        loop {
            match self.peek() {
                None | Some('|' | ']') => break,
                Some('{') => clauses.push(Clause::VariableRef(self.parse_variable_ref()?)),
                Some('[') => clauses.push(Clause::Fallback(self.parse_fallback()?)),
                Some('}') => return Err(self.make_error(ParseErrorKind::UnexpectedCharacter)),
                Some(_) => clauses.push(Clause::Literal(self.parse_literal()?)),
            }
        }
        Ok(TemplateString::new(clauses))
    }

    /// Consumes the character after a `\`, which must be reserved.
    fn parse_escape(&mut self, unterminated: ParseErrorKind) -> ParseResult<char> {
        match self.peek() {
            None => Err(self.make_error(unterminated)),
            Some(c) if RESERVED.contains(&c) => {
                self.bump();
                Ok(c)
            }
            Some(_) => Err(self.make_error(ParseErrorKind::UnexpectedCharacter)),
        }
    }

    fn parse_literal(&mut self) -> ParseResult<StringLiteral> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.bump();
                    value.push(self.parse_escape(ParseErrorKind::UnterminatedLiteral)?);
                }
                '{' | '}' | '[' | ']' | '|' => break,
                _ => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        Ok(StringLiteral { value })
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        let mut name = String::new();
        match self.peek() {
            None => return Err(self.make_error(ParseErrorKind::UnterminatedVariable)),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.bump();
                name.push(c);
            }
            Some(_) => return Err(self.make_error(ParseErrorKind::InvalidIdentifier)),
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.bump();
                name.push(c);
            } else {
                break;
            }
        }
        Ok(name)
    }

    fn parse_argument(&mut self) -> ParseResult<String> {
        let mut arg = String::new();
        loop {
            match self.peek() {
                None => return Err(self.make_error(ParseErrorKind::UnterminatedVariable)),
                Some('}') => return Ok(arg),
                Some('\\') => {
                    self.bump();
                    arg.push(self.parse_escape(ParseErrorKind::UnterminatedVariable)?);
                }
                Some('{' | '[' | ']' | '|') => {
                    return Err(self.make_error(ParseErrorKind::UnexpectedCharacter));
                }
                Some(c) => {
                    self.bump();
                    arg.push(c);
                }
            }
        }
    }

    fn parse_variable_ref(&mut self) -> ParseResult<VariableRef> {
        self.bump(); // '{'
        let name = self.parse_identifier()?;
        let arg = match self.peek() {
            Some(':') => {
                self.bump();
                Some(self.parse_argument()?)
            }
            Some('}') => None,
            None => return Err(self.make_error(ParseErrorKind::UnterminatedVariable)),
            Some(_) => return Err(self.make_error(ParseErrorKind::InvalidIdentifier)),
        };
        // Both branches above stop on '}'.
        self.bump();
        Ok(VariableRef { name, arg })
    }

    fn parse_fallback(&mut self) -> ParseResult<Fallback> {
        if self.depth >= self.max_depth {
            return Err(self.make_error(ParseErrorKind::NestingTooDeep));
        }
        self.bump(); // '['
        self.depth = self.depth.saturating_add(1);

        let mut choices = Vec::new();
        loop {
            choices.push(self.parse_template_string()?);
            match self.bump() {
                Some('|') => continue,
                Some(']') => break,
                // parse_template_string only stops at '|', ']' or end of input.
                _ => return Err(self.make_error(ParseErrorKind::UnterminatedFallback)),
            }
        }

        self.depth = self.depth.saturating_sub(1);
        Ok(Fallback::new(choices))
    }
}

/// Parses a complete template with the default [`ParseOptions`].
///
/// # Errors
/// Returns a [`ParseError`] carrying the byte offset of the first problem.
pub fn parse(source: &str) -> Result<TemplateString, ParseError> {
    parse_with_options(source, &ParseOptions::default())
}

/// Parses a complete template, rejecting sources that exceed `options`.
///
/// # Errors
/// Returns a [`ParseError`] carrying the byte offset of the first problem.
pub fn parse_with_options(
    source: &str,
    options: &ParseOptions,
) -> Result<TemplateString, ParseError> {
    if source.len() > options.max_length {
        return Err(ParseError::new(
            ParseErrorKind::InputTooLong,
            options.max_length,
        ));
    }

    let mut parser = Parser::new(source, options);
    let template = parser.parse_template_string()?;

    if !parser.eof() {
        return Err(parser.make_error(ParseErrorKind::TrailingInput));
    }

    tracing::trace!(
        clauses = template.clauses.len(),
        len = source.len(),
        "parsed template"
    );

    Ok(template)
}
