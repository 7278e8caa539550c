//! The `key=value` text encoding shared by every file on the map.
//!
//! Two shapes exist: a single line of `|`-separated fields, and a file with
//! one field per line. Keys are case-insensitive and stored lowercased;
//! values are trimmed. A later duplicate key overrides an earlier one.

use crate::{Error, Result};
use std::collections::BTreeMap;

/// Parsed fields of one record, keyed by lowercased name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single pipe-delimited line such as `xy=1 2|ikona=a|proces=on`.
    ///
    /// Blank segments and segments without `=` are ignored; each segment is
    /// split on its first `=`.
    #[must_use]
    pub fn from_pipe_line(line: &str) -> Self {
        let mut fields = Self::new();
        for part in line.split('|').filter(|p| !p.trim().is_empty()) {
            fields.insert_raw(part);
        }
        fields
    }

    /// Parses one field per line. Lines without `=` are ignored.
    #[must_use]
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields = Self::new();
        for line in lines {
            fields.insert_raw(line);
        }
        fields
    }

    fn insert_raw(&mut self, segment: &str) {
        if let Some((key, value)) = segment.split_once('=') {
            self.insert(key, value);
        }
    }

    /// Inserts a field, normalising the key and trimming the value.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.0
            .insert(key.trim().to_lowercase(), value.trim().to_string());
    }

    /// Looks up a field by (case-insensitive) name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Looks up a field, treating an empty value as absent.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Whether `line` is a `key=...` line for the given key, ignoring ASCII case
/// and whitespace around the key.
#[must_use]
pub fn is_key_line(line: &str, key: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.len() < key.len() || !trimmed.is_char_boundary(key.len()) {
        return false;
    }
    let (head, rest) = trimmed.split_at(key.len());
    head.eq_ignore_ascii_case(key) && rest.trim_start().starts_with('=')
}

/// Replaces every `key=` line of a multi-line file with `key=value`, or
/// appends one when none exists. Other lines are kept in order.
///
/// The result always ends with a newline.
#[must_use]
pub fn upsert_key_line(content: &str, key: &str, value: &str) -> String {
    let replacement = format!("{key}={value}");
    let mut hit = false;
    let mut out: Vec<&str> = Vec::new();
    for line in content.lines() {
        if is_key_line(line, key) {
            out.push(&replacement);
            hit = true;
        } else {
            out.push(line);
        }
    }
    if !hit {
        out.push(&replacement);
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Removes every `key=` line and appends a single `key=value` line.
#[must_use]
pub fn replace_key_line_once(content: &str, key: &str, value: &str) -> String {
    let mut out: Vec<String> = content
        .lines()
        .filter(|line| !is_key_line(line, key))
        .map(str::to_string)
        .collect();
    out.push(format!("{key}={value}"));
    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Replaces the `key=` segment of a pipe-delimited line, keeping every other
/// segment byte-for-byte. Returns `None` when the line has no such segment.
#[must_use]
pub fn replace_pipe_field(line: &str, key: &str, value: &str) -> Option<String> {
    let mut hit = false;
    let parts: Vec<String> = line
        .split('|')
        .map(|part| {
            if is_key_line(part, key) {
                hit = true;
                format!("{key}={value}")
            } else {
                part.to_string()
            }
        })
        .collect();
    hit.then(|| parts.join("|"))
}

/// The two object ids a line connects (`AB.txt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// `obiekt_A=`
    pub a: String,
    /// `obiekt_B=`
    pub b: String,
}

impl Endpoints {
    /// Parses an `AB.txt` body. Both ids are required.
    pub fn parse(text: &str) -> Result<Self> {
        let fields = FieldMap::from_lines(text.lines());
        let a = fields
            .get_non_empty("obiekt_a")
            .ok_or(Error::MissingField("obiekt_A"))?
            .to_string();
        let b = fields
            .get_non_empty("obiekt_b")
            .ok_or(Error::MissingField("obiekt_B"))?
            .to_string();
        Ok(Self { a, b })
    }

    /// Renders the file body.
    #[must_use]
    pub fn render(&self) -> String {
        format!("obiekt_A={}\nobiekt_B={}\n", self.a, self.b)
    }
}
