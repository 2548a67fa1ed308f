use std::collections::HashMap;

use crate::analysis::find_all_variable_refs;
use crate::ast::{TemplateString, VariableRef};
use crate::error::ValidationError;
use crate::timestamp::DateFormatter;

/// What a variable accepts after the `:` in `{name:arg}`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "values", rename_all = "snake_case"))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentRule {
    /// No argument may be given.
    None,
    /// An optional strftime pattern.
    DateFormat,
    /// An optional argument that must be one of the listed values.
    OneOf(Vec<String>),
    /// Any argument, or none.
    Any,
}

impl ArgumentRule {
    fn check(&self, var_ref: &VariableRef) -> Option<ValidationError> {
        let arg = var_ref.arg()?;
        let valid = match self {
            Self::None => {
                return Some(ValidationError::HasArgument {
                    var_ref: var_ref.clone(),
                });
            }
            Self::DateFormat => DateFormatter::is_valid_pattern(arg),
            Self::OneOf(values) => values.iter().any(|v| v == arg),
            Self::Any => true,
        };
        (!valid).then(|| ValidationError::InvalidArgument {
            var_ref: var_ref.clone(),
        })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableSpec {
    pub argument: ArgumentRule,
}

impl VariableSpec {
    pub const fn new(argument: ArgumentRule) -> Self {
        Self { argument }
    }
}

/// The set of variables a template may use, supplied by the application.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariableRegistry {
    variables: HashMap<String, VariableSpec>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The variables understood by
    /// [`FilenameGenerator`](crate::FilenameGenerator).
    pub fn call_recording() -> Self {
        let mut registry = Self::new();
        registry
            .insert("date", VariableSpec::new(ArgumentRule::DateFormat))
            .insert("direction", VariableSpec::new(ArgumentRule::None))
            .insert("sim_slot", VariableSpec::new(ArgumentRule::None))
            .insert(
                "phone_number",
                VariableSpec::new(ArgumentRule::OneOf(
                    crate::filename::PHONE_NUMBER_FORMATS
                        .iter()
                        .map(|s| (*s).to_string())
                        .collect(),
                )),
            )
            .insert("contact_name", VariableSpec::new(ArgumentRule::None))
            .insert("caller_name", VariableSpec::new(ArgumentRule::None))
            .insert("call_log_name", VariableSpec::new(ArgumentRule::None));
        registry
    }

    pub fn insert<T: AsRef<str>>(&mut self, name: T, spec: VariableSpec) -> &mut Self {
        self.variables.insert(name.as_ref().to_string(), spec);
        self
    }

    pub fn get<T: AsRef<str>>(&self, name: T) -> Option<&VariableSpec> {
        self.variables.get(name.as_ref())
    }

    pub fn contains<T: AsRef<str>>(&self, name: T) -> bool {
        self.variables.contains_key(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Checks every variable reference in `template`, including ones in
    /// fallback choices that can never be selected.
    ///
    /// Errors are returned in document order; an empty list means the
    /// template is valid.
    pub fn validate(&self, template: &TemplateString) -> Vec<ValidationError> {
        let errors: Vec<_> = find_all_variable_refs(template)
            .into_iter()
            .filter_map(|var_ref| match self.variables.get(&var_ref.name) {
                None => Some(ValidationError::UnknownVariable {
                    var_ref: var_ref.clone(),
                }),
                Some(spec) => spec.argument.check(var_ref),
            })
            .collect();
        if !errors.is_empty() {
            tracing::debug!(errors = errors.len(), "template failed validation");
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn validate(source: &str) -> Vec<ValidationError> {
        VariableRegistry::call_recording().validate(&parse(source).unwrap())
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_valid_default_template() {
        assert!(validate(crate::filename::DEFAULT_TEMPLATE).is_empty());
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_unknown_variable_in_unreachable_choice() {
        assert_eq!(
            validate("[{date}|{unknown}]"),
            vec![ValidationError::UnknownVariable {
                var_ref: VariableRef::new("unknown", None)
            }]
        );
        assert_eq!(
            validate("[|{bogus}]"),
            vec![ValidationError::UnknownVariable {
                var_ref: VariableRef::new("bogus", None)
            }]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_argument_not_allowed() {
        assert_eq!(
            validate("{direction:x}"),
            vec![ValidationError::HasArgument {
                var_ref: VariableRef::new("direction", Some("x"))
            }]
        );
        assert_eq!(
            validate("{sim_slot:}"),
            vec![ValidationError::HasArgument {
                var_ref: VariableRef::new("sim_slot", Some(""))
            }]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_date_argument() {
        assert!(validate("{date:%Y/%m/%d}").is_empty());
        assert_eq!(
            validate("{date:%Q}"),
            vec![ValidationError::InvalidArgument {
                var_ref: VariableRef::new("date", Some("%Q"))
            }]
        );
        assert_eq!(validate("{date:}").len(), 1);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_phone_number_argument() {
        assert!(
            validate("{phone_number:digits_only}{phone_number:E.164}{phone_number:formatted}")
                .is_empty()
        );
        assert_eq!(
            validate("{phone_number:national}"),
            vec![ValidationError::InvalidArgument {
                var_ref: VariableRef::new("phone_number", Some("national"))
            }]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_all_errors_reported_in_order() {
        let errors = validate("{a}{direction:x}[{b}|{date:%Q}]");
        let names: Vec<_> = errors.iter().map(|e| e.var_ref().name.as_str()).collect();
        assert_eq!(names, vec!["a", "direction", "b", "date"]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_custom_registry() {
        let mut registry = VariableRegistry::new();
        registry.insert("anything", VariableSpec::new(ArgumentRule::Any));
        assert!(registry.validate(&parse("{anything:x}{anything}").unwrap()).is_empty());
        assert_eq!(registry.validate(&parse("{date}").unwrap()).len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
