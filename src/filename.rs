//! Output paths for call recordings.
//!
//! [`FilenameGenerator`] evaluates the user's template against a call's
//! metadata and falls back to [`DEFAULT_TEMPLATE`] whenever the custom
//! template is unusable, so a recording always gets a name. It can also read
//! the call's timestamp back out of a path it produced earlier, which is what
//! retention cleanup relies on.

use chrono::{DateTime, FixedOffset};

use crate::error::{MissingVariableError, TemplateError, TemplateResult};
use crate::evaluator::evaluate_with_refs;
use crate::registry::VariableRegistry;
use crate::template::Template;
use crate::timestamp::{DateFormatter, OffsetFallback};

pub const DEFAULT_TEMPLATE: &str = concat!(
    "{date}[_{direction}|][_sim{sim_slot}|][_{phone_number}|]",
    "[_[{contact_name}|{caller_name}|{call_log_name}]|]",
);

/// Accepted arguments for `{phone_number:...}`.
pub const PHONE_NUMBER_FORMATS: [&str; 3] = ["digits_only", "E.164", "formatted"];

const DATE_VARIABLE: &str = "date";

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CallDirection {
    In,
    Out,
    Conference,
}

impl std::fmt::Display for CallDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::Out => "out",
            Self::Conference => "conference",
        })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber {
    raw: String,
    /// Human-readable form from the platform's number formatter, if any.
    formatted: Option<String>,
}

/// Debug view of text that may identify a person: only its length.
struct Redacted<'a>(&'a str);

impl std::fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{} chars>", self.0.chars().count())
    }
}

// Phone numbers must not end up in logs.
impl std::fmt::Debug for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhoneNumber")
            .field("raw", &Redacted(&self.raw))
            .field("formatted", &self.formatted.as_deref().map(Redacted))
            .finish()
    }
}

impl PhoneNumber {
    pub fn new<T: Into<String>>(raw: T) -> Self {
        Self {
            raw: raw.into(),
            formatted: None,
        }
    }

    #[must_use]
    pub fn with_formatted<T: Into<String>>(mut self, formatted: T) -> Self {
        self.formatted = Some(formatted.into());
        self
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn digits_only(&self) -> Option<String> {
        let digits: String = self.raw.chars().filter(char::is_ascii_digit).collect();
        (!digits.is_empty()).then_some(digits)
    }

    /// `+` followed by the digits, for numbers given in international form.
    pub fn e164(&self) -> Option<String> {
        if !self.raw.trim_start().starts_with('+') {
            return None;
        }
        self.digits_only().map(|digits| format!("+{digits}"))
    }

    fn format(&self, mode: Option<&str>) -> Option<String> {
        match mode {
            None => Some(self.raw.clone()),
            Some("digits_only") => self.digits_only(),
            Some("E.164") => self.e164(),
            Some("formatted") => self.formatted.clone(),
            Some(_) => None,
        }
    }
}

/// Everything known about a call when its recording is named.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CallMetadata {
    pub timestamp: DateTime<FixedOffset>,
    pub direction: Option<CallDirection>,
    pub sim_slot: Option<u32>,
    pub phone_number: Option<PhoneNumber>,
    pub contact_name: Option<String>,
    pub caller_name: Option<String>,
    pub call_log_name: Option<String>,
}

impl CallMetadata {
    pub const fn new(timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            timestamp,
            direction: None,
            sim_slot: None,
            phone_number: None,
            contact_name: None,
            caller_name: None,
            call_log_name: None,
        }
    }
}

impl std::fmt::Debug for CallMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallMetadata")
            .field("timestamp", &self.timestamp)
            .field("direction", &self.direction)
            .field("sim_slot", &self.sim_slot)
            .field("phone_number", &self.phone_number)
            .field("contact_name", &self.contact_name.as_deref().map(Redacted))
            .field("caller_name", &self.caller_name.as_deref().map(Redacted))
            .field("call_log_name", &self.call_log_name.as_deref().map(Redacted))
            .finish()
    }
}

/// Replaces path separators so a value cannot introduce directories. Empty
/// values count as missing.
fn sanitize(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.replace('/', "_"))
}

/// State for one evaluation of a filename template.
///
/// Created per call to [`FilenameGenerator::generate`] and never shared, so
/// evaluations running concurrently on the same template cannot interfere.
#[derive(Debug)]
pub struct EvaluationContext<'a> {
    metadata: &'a CallMetadata,
    offset_fallback: OffsetFallback,
    /// Formatter of the first `{date}` in the last successful output.
    date_format: Option<DateFormatter>,
}

impl<'a> EvaluationContext<'a> {
    pub const fn new(metadata: &'a CallMetadata, offset_fallback: OffsetFallback) -> Self {
        Self {
            metadata,
            offset_fallback,
            date_format: None,
        }
    }

    fn date_formatter(&self, arg: Option<&str>) -> Option<DateFormatter> {
        let formatter = match arg {
            Some(pattern) => DateFormatter::new(pattern)?,
            None => DateFormatter::default(),
        };
        Some(formatter.with_offset_fallback(self.offset_fallback))
    }

    /// Resolver for [`evaluate`](crate::evaluate).
    pub fn resolve(&self, name: &str, arg: Option<&str>) -> Option<String> {
        let metadata = self.metadata;
        match name {
            DATE_VARIABLE => self.date_formatter(arg)?.format(&metadata.timestamp),
            "direction" => metadata.direction.map(|d| d.to_string()),
            "sim_slot" => metadata.sim_slot.map(|slot| slot.to_string()),
            "phone_number" => metadata
                .phone_number
                .as_ref()?
                .format(arg)
                .and_then(|n| sanitize(&n)),
            "contact_name" => metadata.contact_name.as_deref().and_then(sanitize),
            "caller_name" => metadata.caller_name.as_deref().and_then(sanitize),
            "call_log_name" => metadata.call_log_name.as_deref().and_then(sanitize),
            _ => None,
        }
    }

    /// Evaluates `template` for this call and records the formatter of the
    /// first `{date}` whose value ended up in the output.
    ///
    /// # Errors
    /// Returns [`MissingVariableError`] as [`evaluate`](crate::evaluate) does.
    pub fn evaluate(&mut self, template: &Template) -> Result<String, MissingVariableError> {
        let (output, refs) =
            evaluate_with_refs(template.ast(), |name, arg| self.resolve(name, arg))?;
        self.date_format = refs
            .iter()
            .find(|var_ref| var_ref.name == DATE_VARIABLE)
            .and_then(|var_ref| self.date_formatter(var_ref.arg()));
        Ok(output)
    }

    pub const fn date_format(&self) -> Option<&DateFormatter> {
        self.date_format.as_ref()
    }

    fn into_date_format(self) -> Option<DateFormatter> {
        self.date_format
    }
}

/// Splits on `/`, dropping empty, `.` and `..` segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .map(str::to_owned)
        .collect()
}

/// A generated relative path, as `/`-separated segments.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OutputPath {
    segments: Vec<String>,
    date_format: Option<DateFormatter>,
    used_default: bool,
}

impl std::fmt::Debug for OutputPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segments: Vec<_> = self.segments.iter().map(|s| Redacted(s)).collect();
        f.debug_struct("OutputPath")
            .field("segments", &segments)
            .field("date_format", &self.date_format)
            .field("used_default", &self.used_default)
            .finish()
    }
}

impl OutputPath {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The last segment. Earlier segments are directories.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The formatter used for `{date}`, if the template referenced it.
    pub const fn date_format(&self) -> Option<&DateFormatter> {
        self.date_format.as_ref()
    }

    /// Whether the custom template failed and [`DEFAULT_TEMPLATE`] was used.
    pub const fn used_default(&self) -> bool {
        self.used_default
    }
}

impl std::fmt::Display for OutputPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

#[derive(Debug, Clone)]
pub struct FilenameGenerator {
    custom: Option<Template>,
    default: Template,
    offset_fallback: OffsetFallback,
}

impl FilenameGenerator {
    /// Uses `custom` when it parses and passes `registry`; otherwise the
    /// default template.
    ///
    /// # Errors
    /// Only if the built-in default template fails to parse.
    pub fn new(custom: Option<&str>, registry: &VariableRegistry) -> TemplateResult<Self> {
        let default = Template::new(DEFAULT_TEMPLATE)?;
        let custom = custom.and_then(|source| match Template::new_validated(source, registry) {
            Ok(template) => Some(template),
            Err(err) => {
                tracing::warn!(error = %err, "rejecting custom filename template");
                None
            }
        });
        Ok(Self {
            custom,
            default,
            offset_fallback: OffsetFallback::default(),
        })
    }

    /// Sets the offset assumed for timestamps read back without one.
    #[must_use]
    pub const fn with_offset_fallback(mut self, offset_fallback: OffsetFallback) -> Self {
        self.offset_fallback = offset_fallback;
        self
    }

    /// The template in effect.
    pub fn template(&self) -> &Template {
        self.custom.as_ref().unwrap_or(&self.default)
    }

    pub const fn is_custom(&self) -> bool {
        self.custom.is_some()
    }

    fn generate_with(
        &self,
        template: &Template,
        metadata: &CallMetadata,
        used_default: bool,
    ) -> TemplateResult<OutputPath> {
        let mut context = EvaluationContext::new(metadata, self.offset_fallback);
        let path = context.evaluate(template)?;

        let segments = split_path(&path);
        if segments.is_empty() {
            return Err(TemplateError::EmptyPath);
        }
        tracing::debug!(
            segments = segments.len(),
            len = path.len(),
            used_default,
            "generated output path"
        );
        Ok(OutputPath {
            segments,
            date_format: context.into_date_format(),
            used_default,
        })
    }

    /// Produces the output path for a call.
    ///
    /// # Errors
    /// Fails only if the default template itself cannot produce a path for
    /// `metadata`.
    pub fn generate(&self, metadata: &CallMetadata) -> TemplateResult<OutputPath> {
        let Some(custom) = &self.custom else {
            return self.generate_with(&self.default, metadata, false);
        };
        match self.generate_with(custom, metadata, false) {
            Ok(path) => Ok(path),
            Err(err) => {
                tracing::warn!(error = %err, "custom filename template failed, using default");
                self.generate_with(&self.default, metadata, true)
            }
        }
    }

    /// Reads back the call timestamp from a path produced by [`generate`].
    ///
    /// Tries the template in effect, then the default one. `None` means the
    /// timestamp cannot be trusted and the file should be left alone.
    ///
    /// [`generate`]: Self::generate
    pub fn parse_timestamp(&self, path: &str) -> Option<DateTime<FixedOffset>> {
        let default_format = DateFormatter::default().with_offset_fallback(self.offset_fallback);
        self.custom
            .iter()
            .chain(std::iter::once(&self.default))
            .find_map(|template| template.parse_timestamp(path, DATE_VARIABLE, &default_format))
    }
}
