// src/cmdline/filter.rs

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::store::Record;

/// One AND-conjunction of `field contains substring` checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct MatchGroup {
    conditions: BTreeMap<String, String>,
}

impl MatchGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, substring: impl Into<String>) -> Self {
        self.conditions.insert(field.into(), substring.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Every listed field is present on `record` and contains its substring.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            record
                .get(field)
                .is_some_and(|value| field_text(value).contains(expected.as_str()))
        })
    }

    /// `field=substring,field=substring,...` in field order.
    fn to_token(&self) -> String {
        self.conditions
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<K, V> FromIterator<(K, V)> for MatchGroup
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            conditions: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Record predicate: matches when any group matches.
///
/// An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    groups: Vec<MatchGroup>,
}

impl Filter {
    pub fn new(groups: Vec<MatchGroup>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[MatchGroup] {
        &self.groups
    }

    pub fn push(&mut self, group: MatchGroup) {
        self.groups.push(group);
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.groups.is_empty() || self.groups.iter().any(|g| g.matches(record))
    }

    /// One `--filter field=substring,...` pair per group.
    pub fn to_command_line(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.groups.len() * 2);
        for group in &self.groups {
            argv.push("--filter".to_string());
            argv.push(group.to_token());
        }
        argv
    }
}

impl FromIterator<MatchGroup> for Filter {
    fn from_iter<I: IntoIterator<Item = MatchGroup>>(iter: I) -> Self {
        Self {
            groups: iter.into_iter().collect(),
        }
    }
}

/// Scalars are compared through their string form; strings are used
/// verbatim rather than JSON-quoted.
fn field_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}
