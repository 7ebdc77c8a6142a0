// src/cmdline/arguments.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{ForensicflowError, Result};

/// Flag name → ordered values.
///
/// Keys are kept sorted so [`Arguments::to_command_line`] is reproducible
/// across runs. A flag may carry several values; each one is emitted as its
/// own `--flag value` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, OneOrMany>")]
pub struct Arguments {
    values: BTreeMap<String, Vec<String>>,
}

/// Document values may be a single scalar or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(Scalar),
    Many(Vec<Scalar>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

impl From<BTreeMap<String, OneOrMany>> for Arguments {
    fn from(raw: BTreeMap<String, OneOrMany>) -> Self {
        let values = raw
            .into_iter()
            .map(|(name, v)| {
                let list = match v {
                    OneOrMany::One(s) => vec![s.into_string()],
                    OneOrMany::Many(items) => items.into_iter().map(Scalar::into_string).collect(),
                };
                (name, list)
            })
            .collect();
        Self { values }
    }
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// First value recorded for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values recorded for `name`.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Replace every value of `name` with a single `value`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), vec![value.into()]);
    }

    /// Append `value` to the values of `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// New instance holding the values of `self` followed by the values of
    /// `other`, per flag. Nothing is de-duplicated.
    pub fn merged(&self, other: &Arguments) -> Arguments {
        let mut out = self.clone();
        for (name, values) in other.values.iter() {
            out.values
                .entry(name.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        out
    }

    /// Copy without the named flags.
    pub fn without(&self, names: &[&str]) -> Arguments {
        let values = self
            .values
            .iter()
            .filter(|(k, _)| !names.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Arguments { values }
    }

    /// `--<flag> <value>` for every value of every flag, flags in key order.
    pub fn to_command_line(&self) -> Vec<String> {
        let mut argv = Vec::new();
        for (name, values) in self.values.iter() {
            for value in values {
                argv.push(format!("--{name}"));
                argv.push(value.clone());
            }
        }
        argv
    }

    /// Parse loose pass-through flags (`--name value`, `--name=value`).
    ///
    /// A flag followed by another flag, or by nothing, gets the value
    /// `"true"`. Bare positional words are rejected.
    pub fn from_passthrough<S: AsRef<str>>(argv: &[S]) -> Result<Arguments> {
        let mut args = Arguments::new();
        let mut iter = argv.iter().map(AsRef::as_ref).peekable();

        while let Some(token) = iter.next() {
            let Some(flag) = token.strip_prefix("--").or_else(|| token.strip_prefix('-')) else {
                return Err(ForensicflowError::ConfigError(format!(
                    "unexpected positional argument '{token}' in pass-through arguments"
                )));
            };

            if flag.is_empty() {
                return Err(ForensicflowError::ConfigError(
                    "empty flag name in pass-through arguments".to_string(),
                ));
            }

            if let Some((name, value)) = flag.split_once('=') {
                args.push(name, value);
                continue;
            }

            match iter.peek() {
                Some(next) if !next.starts_with('-') => {
                    let value = iter.next().unwrap_or_default();
                    args.push(flag, value);
                }
                _ => args.push(flag, "true"),
            }
        }

        Ok(args)
    }
}

impl<K, V> FromIterator<(K, V)> for Arguments
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Arguments::new();
        for (k, v) in iter {
            args.push(k, v);
        }
        args
    }
}
