//! Template syntax tree.
//!
//! The tree is immutable once parsed and every parent owns its children, so a
//! parsed template can be shared freely between threads.

/// A literal span with all escapes already processed.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringLiteral {
    pub value: String,
}

impl StringLiteral {
    pub fn new<T: Into<String>>(value: T) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// A `{name}` or `{name:arg}` reference.
///
/// `{name}` has no argument while `{name:}` has an empty one; the two are
/// distinct.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableRef {
    pub name: String,
    pub arg: Option<String>,
}

impl VariableRef {
    pub fn new<N: Into<String>>(name: N, arg: Option<&str>) -> Self {
        Self {
            name: name.into(),
            arg: arg.map(str::to_owned),
        }
    }

    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

/// An ordered list of alternatives, `[a|b|c]`. The first choice that evaluates
/// without a missing variable wins.
///
/// Never empty: `[]` parses to a single empty choice.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fallback {
    pub choices: Vec<TemplateString>,
}

impl Fallback {
    /// Builds a fallback, substituting a single empty choice for an empty list.
    pub fn new(choices: Vec<TemplateString>) -> Self {
        if choices.is_empty() {
            Self {
                choices: vec![TemplateString::default()],
            }
        } else {
            Self { choices }
        }
    }
}

/// One syntactic unit of a template.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Clause {
    Literal(StringLiteral),
    VariableRef(VariableRef),
    Fallback(Fallback),
}

impl From<StringLiteral> for Clause {
    fn from(literal: StringLiteral) -> Self {
        Self::Literal(literal)
    }
}

impl From<VariableRef> for Clause {
    fn from(var_ref: VariableRef) -> Self {
        Self::VariableRef(var_ref)
    }
}

impl From<Fallback> for Clause {
    fn from(fallback: Fallback) -> Self {
        Self::Fallback(fallback)
    }
}

/// A sequence of clauses. This is both the root of a parsed template and the
/// body of every fallback choice.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TemplateString {
    pub clauses: Vec<Clause>,
}

impl TemplateString {
    pub const fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl FromIterator<Clause> for TemplateString {
    fn from_iter<I: IntoIterator<Item = Clause>>(iter: I) -> Self {
        Self {
            clauses: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_fallback_normalised() {
        let fallback = Fallback::new(vec![]);
        assert_eq!(fallback.choices, vec![TemplateString::default()]);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_absent_and_empty_argument_differ() {
        assert_ne!(VariableRef::new("v", None), VariableRef::new("v", Some("")));
        assert_eq!(VariableRef::new("v", Some("")).arg(), Some(""));
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_ast_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TemplateString>();
    }
}
