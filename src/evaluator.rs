use std::collections::HashMap;

use crate::ast::{Clause, Fallback, TemplateString, VariableRef};
use crate::error::MissingVariableError;

type EvalResult<T> = Result<T, MissingVariableError>;

/// Resolver results cached for the duration of one [`evaluate`] call, keyed by
/// name and argument borrowed from the tree being evaluated.
struct Evaluator<'t, F> {
    resolve: F,
    cache: HashMap<(&'t str, Option<&'t str>), Option<String>>,
    /// References whose values are in the output so far.
    used: Vec<&'t VariableRef>,
}

impl<'t, F> Evaluator<'t, F>
where
    F: FnMut(&str, Option<&str>) -> Option<String>,
{
    fn new(resolve: F) -> Self {
        Self {
            resolve,
            cache: HashMap::new(),
            used: Vec::new(),
        }
    }

    fn variable_ref(&mut self, var_ref: &'t VariableRef, output: &mut String) -> EvalResult<()> {
        let key = (var_ref.name.as_str(), var_ref.arg.as_deref());
        let value = self.cache.entry(key).or_insert_with(|| {
            tracing::trace!(name = key.0, has_arg = key.1.is_some(), "resolving variable");
            (self.resolve)(key.0, key.1)
        });

        match value {
            Some(value) => {
                output.push_str(value);
                self.used.push(var_ref);
                Ok(())
            }
            None => Err(MissingVariableError {
                name: var_ref.name.clone(),
            }),
        }
    }

    /// The first choice that succeeds wins. When all fail, the last choice's
    /// error is returned.
    fn fallback(&mut self, fallback: &'t Fallback, output: &mut String) -> EvalResult<()> {
        let mut last_error = None;
        for choice in &fallback.choices {
            let mark = self.used.len();
            let mut choice_output = String::new();
            match self.template_string(choice, &mut choice_output) {
                Ok(()) => {
                    output.push_str(&choice_output);
                    return Ok(());
                }
                Err(err) => {
                    self.used.truncate(mark);
                    last_error = Some(err);
                }
            }
        }
        // Fallback::new guarantees at least one choice, but a hand-built tree
        // may still have none; treat that like an empty choice.
        last_error.map_or(Ok(()), Err)
    }

    fn template_string(
        &mut self,
        template: &'t TemplateString,
        output: &mut String,
    ) -> EvalResult<()> {
        for clause in &template.clauses {
            match clause {
                Clause::Literal(literal) => output.push_str(&literal.value),
                Clause::VariableRef(var_ref) => self.variable_ref(var_ref, output)?,
                Clause::Fallback(fallback) => self.fallback(fallback, output)?,
            }
        }
        Ok(())
    }
}

/// Evaluates `template`, asking `resolve` for each variable's value.
///
/// `resolve` is called at most once per distinct name and argument pair during
/// one evaluation; repeated references reuse the first answer, including a
/// `None` answer.
///
/// # Errors
/// Returns [`MissingVariableError`] when a variable outside any fallback has no
/// value, or when every choice of a fallback fails. In the latter case the
/// error comes from the last choice.
pub fn evaluate<F>(template: &TemplateString, resolve: F) -> Result<String, MissingVariableError>
where
    F: FnMut(&str, Option<&str>) -> Option<String>,
{
    evaluate_with_refs(template, resolve).map(|(output, _)| output)
}

/// Like [`evaluate`], but also returns the references whose values made it
/// into the output, in output order. References inside fallback choices that
/// were abandoned are not included.
///
/// # Errors
/// As for [`evaluate`].
pub fn evaluate_with_refs<'t, F>(
    template: &'t TemplateString,
    resolve: F,
) -> Result<(String, Vec<&'t VariableRef>), MissingVariableError>
where
    F: FnMut(&str, Option<&str>) -> Option<String>,
{
    let mut evaluator = Evaluator::new(resolve);
    let mut output = String::new();
    evaluator.template_string(template, &mut output)?;
    tracing::trace!(
        refs = evaluator.used.len(),
        len = output.len(),
        "evaluated template"
    );
    Ok((output, evaluator.used))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn only(
        name: &'static str,
        value: &'static str,
    ) -> impl FnMut(&str, Option<&str>) -> Option<String> {
        move |n, _| (n == name).then(|| value.to_string())
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_literal_only() {
        let ast = parse("hello").unwrap();
        assert_eq!(evaluate(&ast, |_, _| None).unwrap(), "hello");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_variable_receives_argument() {
        let ast = parse("{a:x}{a}{a:}").unwrap();
        let output = evaluate(&ast, |name, arg| {
            Some(format!("{name}={}", arg.unwrap_or("none")))
        })
        .unwrap();
        assert_eq!(output, "a=xa=nonea=");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_fallback_takes_first_success() {
        let ast = parse("[{a}|{b}|{arg:c}]").unwrap();
        let output = evaluate(&ast, |name, arg| {
            (name == "arg").then(|| arg.unwrap_or_default().to_string())
        })
        .unwrap();
        assert_eq!(output, "c");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_failed_choice_output_is_discarded() {
        let ast = parse("[pre{a}post|{b}]").unwrap();
        assert_eq!(evaluate(&ast, only("b", "B")).unwrap(), "B");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_refs_from_abandoned_choices_not_reported() {
        let ast = parse("{a}[{b:1}{c}|{b:2}|x]{a}").unwrap();
        let (output, refs) = evaluate_with_refs(&ast, |name, arg| {
            (name != "c").then(|| format!("{name}{}", arg.unwrap_or_default()))
        })
        .unwrap();
        assert_eq!(output, "ab2a");
        assert_eq!(
            refs,
            vec![
                &VariableRef::new("a", None),
                &VariableRef::new("b", Some("2")),
                &VariableRef::new("a", None),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_top_level_missing_variable() {
        let ast = parse("x{arg}y").unwrap();
        let err = evaluate(&ast, |_, _| None).unwrap_err();
        assert_eq!(err.name, "arg");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_fallback_propagates_last_error() {
        let ast = parse("[{a}|{b}]").unwrap();
        let err = evaluate(&ast, |_, _| None).unwrap_err();
        assert_eq!(err.name, "b");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_nested_fallback_error() {
        let ast = parse("[{a}|[{b}|{c}]]").unwrap();
        let err = evaluate(&ast, |_, _| None).unwrap_err();
        assert_eq!(err.name, "c");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_empty_fallback() {
        let ast = parse("[]").unwrap();
        assert_eq!(evaluate(&ast, |_, _| None).unwrap(), "");
        assert_eq!(evaluate(&ast, |_, _| Some("x".into())).unwrap(), "");
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_resolver_memoised() {
        let ast = parse("{a}{a}[{a}|x]{a:1}{a:1}[{b}|{b}|]").unwrap();
        let mut calls = Vec::new();
        let output = evaluate(&ast, |name, arg| {
            calls.push((name.to_string(), arg.map(str::to_string)));
            (name == "a").then(|| "A".to_string())
        })
        .unwrap();
        assert_eq!(output, "AAAAA");
        assert_eq!(
            calls,
            vec![
                ("a".to_string(), None),
                ("a".to_string(), Some("1".to_string())),
                ("b".to_string(), None),
            ]
        );
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_memoisation_is_per_call() {
        let ast = parse("{a}").unwrap();
        let mut count = 0;
        for _ in 0..3 {
            evaluate(&ast, |_, _| {
                count += 1;
                Some(String::new())
            })
            .unwrap();
        }
        assert_eq!(count, 3);
    }

    #[test]
    #[ntest::timeout(100)]
    fn test_hand_built_empty_fallback() {
        let ast = TemplateString::new(vec![Clause::Fallback(Fallback { choices: vec![] })]);
        assert_eq!(evaluate(&ast, |_, _| None).unwrap(), "");
    }
}
