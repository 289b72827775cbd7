//! Built-in byte transforms and matchers used by graph manifests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::converter::{ConvertError, ConvertFn, Converted, DetectFn};

/// A byte-level conversion function selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Hand the input over unchanged.
    Identity,
    Append,
    StripSuffix,
    Prepend,
    StripPrefix,
    /// ASCII uppercase.
    Uppercase,
    /// ASCII lowercase.
    Lowercase,
}

impl Transform {
    pub fn name(&self) -> &'static str {
        match self {
            Transform::Identity => "identity",
            Transform::Append => "append",
            Transform::StripSuffix => "strip_suffix",
            Transform::Prepend => "prepend",
            Transform::StripPrefix => "strip_prefix",
            Transform::Uppercase => "uppercase",
            Transform::Lowercase => "lowercase",
        }
    }

    /// Whether the transform needs an argument.
    pub fn requires_arg(&self) -> bool {
        matches!(
            self,
            Transform::Append | Transform::StripSuffix | Transform::Prepend | Transform::StripPrefix
        )
    }

    pub fn apply(&self, input: &[u8], arg: &[u8]) -> Result<Converted, ConvertError> {
        let output = match self {
            Transform::Identity => return Ok(Converted::Reused),
            Transform::Append => [input, arg].concat(),
            Transform::Prepend => [arg, input].concat(),
            Transform::StripSuffix => input
                .strip_suffix(arg)
                .ok_or_else(|| {
                    ConvertError::new(format!(
                        "input does not end with '{}'",
                        String::from_utf8_lossy(arg)
                    ))
                })?
                .to_vec(),
            Transform::StripPrefix => input
                .strip_prefix(arg)
                .ok_or_else(|| {
                    ConvertError::new(format!(
                        "input does not start with '{}'",
                        String::from_utf8_lossy(arg)
                    ))
                })?
                .to_vec(),
            Transform::Uppercase => input.to_ascii_uppercase(),
            Transform::Lowercase => input.to_ascii_lowercase(),
        };
        Ok(Converted::Replaced(output))
    }

    /// Binds the argument and returns a convert function.
    pub fn into_fn(self, arg: Option<String>) -> ConvertFn {
        let arg = arg.unwrap_or_default().into_bytes();
        Arc::new(move |input: &[u8], _config: Option<&str>| self.apply(input, &arg))
    }
}

/// A byte-level predicate selectable by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matcher {
    Always,
    Never,
    StartsWith,
    EndsWith,
    Contains,
}

impl Matcher {
    pub fn name(&self) -> &'static str {
        match self {
            Matcher::Always => "always",
            Matcher::Never => "never",
            Matcher::StartsWith => "starts_with",
            Matcher::EndsWith => "ends_with",
            Matcher::Contains => "contains",
        }
    }

    /// Whether the matcher needs a pattern.
    pub fn requires_pattern(&self) -> bool {
        matches!(
            self,
            Matcher::StartsWith | Matcher::EndsWith | Matcher::Contains
        )
    }

    pub fn matches(&self, data: &[u8], pattern: &[u8]) -> bool {
        match self {
            Matcher::Always => true,
            Matcher::Never => false,
            Matcher::StartsWith => data.starts_with(pattern),
            Matcher::EndsWith => data.ends_with(pattern),
            Matcher::Contains => {
                pattern.is_empty() || data.windows(pattern.len()).any(|w| w == pattern)
            }
        }
    }

    /// Binds the pattern and returns a detector predicate.
    pub fn into_fn(self, pattern: Option<String>) -> DetectFn {
        let pattern = pattern.unwrap_or_default().into_bytes();
        Arc::new(move |data: &[u8]| self.matches(data, &pattern))
    }
}
