//! Filename templates for call recordings.
//!
//! A template is literal text mixed with `{variable}` / `{variable:arg}`
//! references and `[first|second|...]` fallbacks, for example
//! `{date}[_{direction}|][_{phone_number}|]`. This crate parses templates,
//! evaluates them against a resolver, prints them back in canonical form, and
//! can work out where a variable sits in previously generated output so that
//! a call's timestamp can be recovered from its filename.

mod analysis;
mod ast;
mod error;
mod evaluator;
mod filename;
mod parser;
mod printer;
mod registry;
mod template;
mod timestamp;

// Public exports.
pub use analysis::{VariableRefLocation, find_all_variable_refs, find_variable_ref};
pub use ast::{Clause, Fallback, StringLiteral, TemplateString, VariableRef};
pub use error::{
    MissingVariableError, ParseError, ParseErrorKind, TemplateError, TemplateResult,
    ValidationError,
};
pub use evaluator::{evaluate, evaluate_with_refs};
pub use filename::{
    CallDirection, CallMetadata, DEFAULT_TEMPLATE, EvaluationContext, FilenameGenerator,
    OutputPath, PHONE_NUMBER_FORMATS, PhoneNumber, split_path,
};
pub use parser::{ParseOptions, parse, parse_with_options};
pub use printer::{ToTemplate, to_template};
pub use registry::{ArgumentRule, VariableRegistry, VariableSpec};
pub use template::Template;
pub use timestamp::{DateFormatter, OffsetFallback, parse_timestamp};
