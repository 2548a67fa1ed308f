use chrono::{DateTime, FixedOffset};

use crate::analysis::{VariableRefLocation, find_all_variable_refs, find_variable_ref};
use crate::ast::{TemplateString, VariableRef};
use crate::error::{MissingVariableError, TemplateResult, ValidationError};
use crate::evaluator::evaluate;
use crate::parser::{ParseOptions, parse_with_options};
use crate::printer::ToTemplate;
use crate::registry::VariableRegistry;
use crate::timestamp::{DateFormatter, parse_timestamp};

/// A parsed template together with the source it came from.
///
/// Templates are immutable, so one instance can be evaluated and analysed
/// from several threads at once.
///
/// # Example
///
/// ```
/// use callrec_template::Template;
///
/// let template = Template::new("call_[{contact_name}|unknown]").unwrap();
/// let name = template
///     .evaluate(|name, _| (name == "contact_name").then(|| "Alice".to_string()))
///     .unwrap();
/// assert_eq!(name, "call_Alice");
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    source: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    ast: TemplateString,
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Template {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct TemplateHelper {
            source: String,
        }

        let helper = TemplateHelper::deserialize(deserializer)?;
        Self::new(helper.source)
            .map_err(|e| serde::de::Error::custom(format!("Failed to parse template: {e}")))
    }
}

impl Template {
    /// Parses `source` with the default [`ParseOptions`].
    ///
    /// # Errors
    /// Returns [`TemplateError::Parse`](crate::TemplateError::Parse) if the
    /// source is not a valid template.
    pub fn new<T: Into<String>>(source: T) -> TemplateResult<Self> {
        Self::with_options(source, &ParseOptions::default())
    }

    /// # Errors
    /// Returns [`TemplateError::Parse`](crate::TemplateError::Parse) if the
    /// source is not a valid template or exceeds `options`.
    pub fn with_options<T: Into<String>>(
        source: T,
        options: &ParseOptions,
    ) -> TemplateResult<Self> {
        let source = source.into();
        let ast = parse_with_options(&source, options)?;
        Ok(Self { source, ast })
    }

    /// Parses `source` and checks it against `registry`, failing on the first
    /// validation error.
    ///
    /// # Errors
    /// Returns a parse error or the first [`ValidationError`] found.
    pub fn new_validated<T: Into<String>>(
        source: T,
        registry: &VariableRegistry,
    ) -> TemplateResult<Self> {
        let template = Self::new(source)?;
        match template.validate(registry).into_iter().next() {
            Some(err) => Err(err.into()),
            None => Ok(template),
        }
    }

    /// The source exactly as given.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub const fn ast(&self) -> &TemplateString {
        &self.ast
    }

    /// The source re-printed from the syntax tree.
    pub fn canonical(&self) -> String {
        self.ast.to_template()
    }

    /// See [`evaluate`](crate::evaluate).
    ///
    /// # Errors
    /// Returns [`MissingVariableError`] if a required variable is missing.
    pub fn evaluate<F>(&self, resolve: F) -> Result<String, MissingVariableError>
    where
        F: FnMut(&str, Option<&str>) -> Option<String>,
    {
        evaluate(&self.ast, resolve)
    }

    pub fn variable_refs(&self) -> Vec<&VariableRef> {
        find_all_variable_refs(&self.ast)
    }

    pub fn find_variable_ref(
        &self,
        name: &str,
    ) -> Option<(&VariableRef, Vec<VariableRefLocation>)> {
        find_variable_ref(&self.ast, name)
    }

    pub fn validate(&self, registry: &VariableRegistry) -> Vec<ValidationError> {
        registry.validate(&self.ast)
    }

    /// Recovers the value of the date variable `name` from output this
    /// template generated earlier.
    ///
    /// The variable's argument, if any, is used as the pattern; otherwise
    /// `default_format` is.
    pub fn parse_timestamp(
        &self,
        haystack: &str,
        name: &str,
        default_format: &DateFormatter,
    ) -> Option<DateTime<FixedOffset>> {
        let (var_ref, locations) = self.find_variable_ref(name)?;
        let formatter = match var_ref.arg() {
            Some(pattern) => DateFormatter::new(pattern)?
                .with_offset_fallback(default_format.offset_fallback()),
            None => default_format.clone(),
        };
        parse_timestamp(haystack, &locations, &formatter)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.ast.write_template(f)
    }
}

impl std::str::FromStr for Template {
    type Err = crate::TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
