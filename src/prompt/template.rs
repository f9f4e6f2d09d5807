//! Placeholder substitution for prompt skeletons.
//!
//! Syntax:
//! - `{name}` is replaced by the value registered under `name`
//!   (surrounding whitespace inside the braces is ignored)
//! - `{{` and `}}` produce a literal `{` and `}`
//! - a lone `}` is kept as-is
//!
//! The whole template is scanned before any lookup, so a structural defect is
//! reported even when values are also missing.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Source of values for placeholder substitution.
pub trait PlaceholderValues {
    /// Look up the value for `name`.
    fn value(&self, name: &str) -> Option<&str>;
}

impl<K, V, S> PlaceholderValues for HashMap<K, V, S>
where
    K: Borrow<str> + Hash + Eq,
    V: AsRef<str>,
    S: std::hash::BuildHasher,
{
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|v| v.as_ref())
    }
}

impl<K, V> PlaceholderValues for BTreeMap<K, V>
where
    K: Borrow<str> + Ord,
    V: AsRef<str>,
{
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(|v| v.as_ref())
    }
}

/// An immutable prompt skeleton containing `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptTemplate {
    source: String,
}

/// A template with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RenderedPrompt(String);

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(String),
    Placeholder(&'a str),
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The raw template text.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check the template structure without rendering it.
    pub fn validate(&self) -> Result<(), CoreError> {
        parse(&self.source).map(|_| ())
    }

    /// Distinct placeholder names, in order of first appearance.
    pub fn placeholders(&self) -> Result<Vec<&str>, CoreError> {
        let mut names: Vec<&str> = Vec::new();
        for segment in parse(&self.source)? {
            if let Segment::Placeholder(name) = segment {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Substitute every placeholder with its value, verbatim.
    ///
    /// Extra entries in `values` are ignored.
    pub fn render<V>(&self, values: &V) -> Result<RenderedPrompt, CoreError>
    where
        V: PlaceholderValues + ?Sized,
    {
        let segments = parse(&self.source)?;
        let mut out = String::with_capacity(self.source.len());
        for segment in &segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = values.value(name).ok_or_else(|| {
                        CoreError::MissingPlaceholderValue {
                            name: (*name).to_string(),
                        }
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(RenderedPrompt(out))
    }
}

impl From<&str> for PromptTemplate {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for PromptTemplate {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl RenderedPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RenderedPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RenderedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RenderedPrompt> for String {
    fn from(prompt: RenderedPrompt) -> Self {
        prompt.0
    }
}

/// Render `template` with `values`.
pub fn render<V>(template: &PromptTemplate, values: &V) -> Result<RenderedPrompt, CoreError>
where
    V: PlaceholderValues + ?Sized,
{
    template.render(values)
}

fn parse(source: &str) -> Result<Vec<Segment<'_>>, CoreError> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut literal = String::new();
    // Start of the literal run not yet copied into `literal`.
    let mut pending = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                literal.push_str(&source[pending..i]);
                literal.push('{');
                i += 2;
                pending = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                literal.push_str(&source[pending..i]);
                literal.push('}');
                i += 2;
                pending = i;
            }
            b'{' => {
                literal.push_str(&source[pending..i]);
                let rest = &source[i + 1..];
                let close = match rest.find(['{', '}']) {
                    Some(offset) if rest.as_bytes()[offset] == b'}' => offset,
                    Some(_) => {
                        return Err(CoreError::malformed(
                            i,
                            "placeholder opened again before being closed",
                        ))
                    }
                    None => return Err(CoreError::malformed(i, "unterminated placeholder")),
                };

                let name = rest[..close].trim();
                if name.is_empty() {
                    return Err(CoreError::malformed(i, "empty placeholder name"));
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Placeholder(name));

                i += close + 2;
                pending = i;
            }
            _ => i += 1,
        }
    }

    literal.push_str(&source[pending..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
