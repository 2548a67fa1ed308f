//! Static analysis over parsed templates.
//!
//! [`find_variable_ref`] works out which literal text is guaranteed to sit
//! directly before the first occurrence of a variable in any output the
//! template can produce. That is enough to find a date again inside a
//! filename generated earlier, without knowing what the other variables
//! resolved to at the time.

use crate::ast::{Clause, Fallback, TemplateString, VariableRef};

/// Where a variable's value can begin in evaluated output.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableRefLocation {
    /// The value directly follows `literal`. With `at_start`, `literal` is
    /// also the very beginning of the output.
    AfterPrefix { literal: String, at_start: bool },
    /// Preceded only by other variables' values, so there is nothing fixed to
    /// search for.
    Arbitrary,
}

/// Literal text known to precede the current position.
///
/// `at_start` means everything since the start of the enclosing template
/// string is in `literal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Prefix {
    literal: String,
    at_start: bool,
}

impl Prefix {
    const fn start() -> Self {
        Self {
            literal: String::new(),
            at_start: true,
        }
    }

    const fn unknown() -> Self {
        Self {
            literal: String::new(),
            at_start: false,
        }
    }
}

impl From<Prefix> for VariableRefLocation {
    fn from(prefix: Prefix) -> Self {
        if prefix.literal.is_empty() && !prefix.at_start {
            Self::Arbitrary
        } else {
            Self::AfterPrefix {
                literal: prefix.literal,
                at_start: prefix.at_start,
            }
        }
    }
}

/// Candidate set that keeps discovery order and drops duplicates.
#[derive(Debug, Clone, Default)]
struct Prefixes(Vec<Prefix>);

impl Prefixes {
    fn single(prefix: Prefix) -> Self {
        Self(vec![prefix])
    }

    fn insert(&mut self, prefix: Prefix) {
        if !self.0.contains(&prefix) {
            self.0.push(prefix);
        }
    }

    fn append_literal(&mut self, text: &str) {
        let old = std::mem::take(&mut self.0);
        for mut prefix in old {
            prefix.literal.push_str(text);
            self.insert(prefix);
        }
    }

    /// Places `inner`, which was computed relative to the start of a fallback
    /// choice, after every candidate in `self`.
    ///
    /// Candidates that reach back to the choice's start are joined onto each
    /// outer candidate. The rest already follow unknown content and are kept
    /// as they are.
    fn extend_with(&self, inner: Self, into: &mut Self) {
        for candidate in inner.0 {
            if candidate.at_start {
                for outer in &self.0 {
                    let mut literal = outer.literal.clone();
                    literal.push_str(&candidate.literal);
                    into.insert(Prefix {
                        literal,
                        at_start: outer.at_start,
                    });
                }
            } else {
                into.insert(candidate);
            }
        }
    }

    fn has_start(&self) -> bool {
        self.0.iter().any(|p| p.at_start)
    }
}

enum Search<'t> {
    Found(&'t VariableRef, Prefixes),
    NotFound(Prefixes),
}

fn search_fallback<'t>(fallback: &'t Fallback, name: &str, outer: &Prefixes) -> Search<'t> {
    let mut next = Prefixes::default();
    for choice in &fallback.choices {
        match search_clauses(&choice.clauses, name, Prefixes::single(Prefix::start())) {
            Search::Found(var_ref, inner) => {
                let mut found = Prefixes::default();
                outer.extend_with(inner, &mut found);
                return Search::Found(var_ref, found);
            }
            Search::NotFound(inner) => {
                // A choice that can produce output without touching any
                // variable always succeeds, so later choices never run.
                let always_succeeds = inner.has_start();
                outer.extend_with(inner, &mut next);
                if always_succeeds {
                    break;
                }
            }
        }
    }
    Search::NotFound(next)
}

fn search_clauses<'t>(clauses: &'t [Clause], name: &str, mut prefixes: Prefixes) -> Search<'t> {
    for clause in clauses {
        match clause {
            Clause::Literal(literal) => prefixes.append_literal(&literal.value),
            Clause::VariableRef(var_ref) if var_ref.name == name => {
                return Search::Found(var_ref, prefixes);
            }
            Clause::VariableRef(_) => prefixes = Prefixes::single(Prefix::unknown()),
            Clause::Fallback(fallback) => match search_fallback(fallback, name, &prefixes) {
                found @ Search::Found(..) => return found,
                Search::NotFound(next) => prefixes = next,
            },
        }
    }
    Search::NotFound(prefixes)
}

/// Finds the first reachable reference to `name` and every location its value
/// can start at.
///
/// Returns `None` when the template has no such reference, or when every
/// reference sits behind a fallback choice that can never be selected (such
/// as the `{var}` in `[|{var}]`). Locations are deduplicated and listed in the
/// order they were discovered.
///
/// The analysis is conservative: it may give up with
/// [`VariableRefLocation::Arbitrary`], but never reports literal text that
/// does not actually precede the value.
pub fn find_variable_ref<'t>(
    template: &'t TemplateString,
    name: &str,
) -> Option<(&'t VariableRef, Vec<VariableRefLocation>)> {
    match search_clauses(
        &template.clauses,
        name,
        Prefixes::single(Prefix::start()),
    ) {
        Search::Found(var_ref, prefixes) => {
            let mut locations: Vec<VariableRefLocation> = Vec::with_capacity(prefixes.0.len());
            for location in prefixes.0.into_iter().map(VariableRefLocation::from) {
                if !locations.contains(&location) {
                    locations.push(location);
                }
            }
            tracing::debug!(name, locations = locations.len(), "located variable");
            Some((var_ref, locations))
        }
        Search::NotFound(_) => {
            tracing::debug!(name, "variable not reachable in template");
            None
        }
    }
}

fn collect_variable_refs<'t>(template: &'t TemplateString, refs: &mut Vec<&'t VariableRef>) {
    for clause in &template.clauses {
        match clause {
            Clause::Literal(_) => {}
            Clause::VariableRef(var_ref) => refs.push(var_ref),
            Clause::Fallback(fallback) => {
                for choice in &fallback.choices {
                    collect_variable_refs(choice, refs);
                }
            }
        }
    }
}

/// Every variable reference in document order, including those in fallback
/// choices that can never be selected.
pub fn find_all_variable_refs(template: &TemplateString) -> Vec<&VariableRef> {
    let mut refs = Vec::new();
    collect_variable_refs(template, &mut refs);
    refs
}
