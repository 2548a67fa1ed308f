use thiserror::Error;

use crate::ast::VariableRef;

pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// The syntactic reason a template failed to parse.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// A trailing `\` with nothing left to escape.
    UnterminatedLiteral,
    /// `{` without a matching `}`.
    UnterminatedVariable,
    /// `[` without a matching `]`.
    UnterminatedFallback,
    /// A variable name that is empty or not `[A-Za-z_][A-Za-z0-9_]*`.
    InvalidIdentifier,
    /// A reserved character where the grammar does not allow one.
    UnexpectedCharacter,
    /// Input left over after a complete top-level template.
    TrailingInput,
    /// Fallbacks nested deeper than [`ParseOptions::max_depth`](crate::ParseOptions).
    NestingTooDeep,
    /// Source longer than [`ParseOptions::max_length`](crate::ParseOptions).
    InputTooLong,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::UnterminatedLiteral => "unterminated escape sequence",
            Self::UnterminatedVariable => "unterminated variable reference",
            Self::UnterminatedFallback => "unterminated fallback",
            Self::InvalidIdentifier => "invalid variable name",
            Self::UnexpectedCharacter => "unexpected character",
            Self::TrailingInput => "unexpected trailing input",
            Self::NestingTooDeep => "fallbacks nested too deeply",
            Self::InputTooLong => "template is too long",
        };
        f.write_str(message)
    }
}

/// A template failed to parse. `offset` is the byte offset into the source.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("parse error at byte {offset}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

impl ParseError {
    pub const fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// A variable had no value and no enclosing fallback recovered.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("variable has no value: {name}")]
pub struct MissingVariableError {
    pub name: String,
}

/// Problems found by [`VariableRegistry::validate`](crate::VariableRegistry::validate).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ValidationError {
    #[error("unknown variable: {}", .var_ref.name)]
    UnknownVariable { var_ref: VariableRef },
    #[error("variable does not take an argument: {}", .var_ref.name)]
    HasArgument { var_ref: VariableRef },
    #[error("invalid argument for variable: {}", .var_ref.name)]
    InvalidArgument { var_ref: VariableRef },
}

impl ValidationError {
    /// The reference that triggered this error.
    pub const fn var_ref(&self) -> &VariableRef {
        match self {
            Self::UnknownVariable { var_ref }
            | Self::HasArgument { var_ref }
            | Self::InvalidArgument { var_ref } => var_ref,
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    MissingVariable(#[from] MissingVariableError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Evaluation succeeded but left no usable path segments.
    #[error("template evaluated to an empty path")]
    EmptyPath,
}
