//! Renders syntax trees back to template source.
//!
//! Printing escapes exactly the reserved characters, so `parse(print(ast))`
//! returns the same tree for anything the parser produced, and printing a
//! reparsed tree is byte-for-byte stable.

use std::fmt::{self, Write};

use crate::ast::{Clause, Fallback, StringLiteral, TemplateString, VariableRef};
use crate::parser::RESERVED;

/// Conversion of a syntax tree node back into template syntax.
pub trait ToTemplate {
    /// Writes the template syntax for this node into `out`.
    ///
    /// # Errors
    /// Only propagates errors from the underlying writer.
    fn write_template<W: Write>(&self, out: &mut W) -> fmt::Result;

    fn to_template(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        self.write_template(&mut out).map(|()| out).unwrap_or_default()
    }
}

fn write_escaped<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    Ok(())
}

impl ToTemplate for StringLiteral {
    fn write_template<W: Write>(&self, out: &mut W) -> fmt::Result {
        write_escaped(out, &self.value)
    }
}

impl ToTemplate for VariableRef {
    fn write_template<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_char('{')?;
        out.write_str(&self.name)?;
        if let Some(arg) = &self.arg {
            out.write_char(':')?;
            write_escaped(out, arg)?;
        }
        out.write_char('}')
    }
}

impl ToTemplate for Fallback {
    fn write_template<W: Write>(&self, out: &mut W) -> fmt::Result {
        out.write_char('[')?;
        for (i, choice) in self.choices.iter().enumerate() {
            if i > 0 {
                out.write_char('|')?;
            }
            choice.write_template(out)?;
        }
        out.write_char(']')
    }
}

impl ToTemplate for Clause {
    fn write_template<W: Write>(&self, out: &mut W) -> fmt::Result {
        match self {
            Self::Literal(literal) => literal.write_template(out),
            Self::VariableRef(var_ref) => var_ref.write_template(out),
            Self::Fallback(fallback) => fallback.write_template(out),
        }
    }
}

impl ToTemplate for TemplateString {
    fn write_template<W: Write>(&self, out: &mut W) -> fmt::Result {
        self.clauses
            .iter()
            .try_for_each(|clause| clause.write_template(out))
    }
}

macro_rules! display_as_template {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    self.write_template(f)
                }
            }
        )*
    };
}

display_as_template!(StringLiteral, VariableRef, Fallback, Clause, TemplateString);

/// Free-function form of [`ToTemplate::to_template`].
pub fn to_template<T: ToTemplate + ?Sized>(node: &T) -> String {
    node.to_template()
}
