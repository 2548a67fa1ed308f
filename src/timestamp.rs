//! Formatting timestamps into filenames and recovering them afterwards.
//!
//! Patterns use chrono's strftime syntax. When reading a timestamp back, any
//! component the pattern does not contain is normalised as follows:
//!
//! - missing time of day becomes midnight;
//! - missing seconds and fractional seconds become zero;
//! - a missing UTC offset comes from the formatter's [`OffsetFallback`];
//! - a missing date component makes the parse fail.

use std::fmt::Write;

use chrono::format::{Item, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};

use crate::analysis::VariableRefLocation;

/// UTC offset assumed when a pattern carries no offset of its own.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum OffsetFallback {
    /// The system's local time zone at the parsed wall-clock time.
    #[default]
    Local,
    /// A fixed offset, in seconds east of UTC.
    Fixed(i32),
}

impl OffsetFallback {
    fn resolve(self, naive: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(DateTime::<FixedOffset>::from),
            Self::Fixed(seconds) => FixedOffset::east_opt(seconds)?
                .from_local_datetime(naive)
                .single(),
        }
    }
}

/// A validated strftime pattern.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateFormatter {
    pattern: String,
    offset_fallback: OffsetFallback,
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DateFormatter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct DateFormatterHelper {
            pattern: String,
            #[serde(default)]
            offset_fallback: OffsetFallback,
        }

        let helper = DateFormatterHelper::deserialize(deserializer)?;
        Self::new(helper.pattern)
            .map(|formatter| formatter.with_offset_fallback(helper.offset_fallback))
            .ok_or_else(|| serde::de::Error::custom("Invalid date pattern"))
    }
}

impl DateFormatter {
    /// Pattern used by `{date}` when no argument is given, for example
    /// `20230414_215701.088-0400`.
    pub const DEFAULT_PATTERN: &'static str = "%Y%m%d_%H%M%S%.3f%z";

    /// Returns `None` if `pattern` is empty or not a valid strftime pattern.
    pub fn new<T: Into<String>>(pattern: T) -> Option<Self> {
        let pattern = pattern.into();
        Self::is_valid_pattern(&pattern).then_some(Self {
            pattern,
            offset_fallback: OffsetFallback::default(),
        })
    }

    #[must_use]
    pub const fn with_offset_fallback(mut self, offset_fallback: OffsetFallback) -> Self {
        self.offset_fallback = offset_fallback;
        self
    }

    pub fn is_valid_pattern(pattern: &str) -> bool {
        !pattern.is_empty() && StrftimeItems::new(pattern).all(|item| !matches!(item, Item::Error))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub const fn offset_fallback(&self) -> OffsetFallback {
        self.offset_fallback
    }

    /// Formats `timestamp`. Returns `None` only if the pattern asks for data a
    /// timestamp cannot supply.
    pub fn format(&self, timestamp: &DateTime<FixedOffset>) -> Option<String> {
        let mut out = String::new();
        write!(
            out,
            "{}",
            timestamp.format_with_items(StrftimeItems::new(&self.pattern))
        )
        .ok()?;
        Some(out)
    }

    /// Parses a timestamp from the start of `input`; trailing text is ignored.
    pub fn parse_prefix(&self, input: &str) -> Option<DateTime<FixedOffset>> {
        let mut parsed = Parsed::new();
        chrono::format::parse_and_remainder(&mut parsed, input, StrftimeItems::new(&self.pattern))
            .ok()?;

        if parsed.hour_div_12().is_none() && parsed.hour_mod_12().is_none() {
            parsed.set_hour(0).ok()?;
        }
        if parsed.minute().is_none() {
            parsed.set_minute(0).ok()?;
        }

        let naive = parsed.to_naive_date().ok()?.and_time(parsed.to_naive_time().ok()?);
        match parsed.offset() {
            Some(seconds) => FixedOffset::east_opt(seconds)?
                .from_local_datetime(&naive)
                .single(),
            None => self.offset_fallback.resolve(&naive),
        }
    }
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self {
            pattern: Self::DEFAULT_PATTERN.to_string(),
            offset_fallback: OffsetFallback::default(),
        }
    }
}

/// Recovers a timestamp from `haystack` using the locations produced by
/// [`find_variable_ref`](crate::find_variable_ref).
///
/// Locations are tried in order. An `at_start` location only matches at the
/// very beginning of `haystack`; any other location is tried after every
/// occurrence of its literal. [`VariableRefLocation::Arbitrary`] locations
/// give no anchor and are skipped, so a template whose date only follows
/// other variables never yields a timestamp.
pub fn parse_timestamp(
    haystack: &str,
    locations: &[VariableRefLocation],
    date_format: &DateFormatter,
) -> Option<DateTime<FixedOffset>> {
    for location in locations {
        let (literal, at_start) = match location {
            VariableRefLocation::AfterPrefix { literal, at_start } => (literal, *at_start),
            VariableRefLocation::Arbitrary => continue,
        };

        if at_start {
            if let Some(timestamp) = haystack
                .strip_prefix(literal.as_str())
                .and_then(|rest| date_format.parse_prefix(rest))
            {
                return Some(timestamp);
            }
            continue;
        }

        // Occurrences may overlap, so resume one character past each hit.
        let mut from = 0;
        while let Some(index) = haystack
            .get(from..)
            .and_then(|rest| rest.find(literal.as_str()))
            .map(|found| found.saturating_add(from))
        {
            let timestamp = haystack
                .get(index.saturating_add(literal.len())..)
                .and_then(|rest| date_format.parse_prefix(rest));
            if timestamp.is_some() {
                return timestamp;
            }
            let step = haystack
                .get(index..)
                .and_then(|rest| rest.chars().next())
                .map_or(1, char::len_utf8);
            from = index.saturating_add(step);
        }
    }

    tracing::debug!(
        locations = locations.len(),
        "no timestamp found at any candidate location"
    );
    None
}
