//! Path pattern compiler
//!
//! Compiles a route template such as `/users/:id`, `/a/:b?` or `/files/*`
//! into a segment matcher plus the ordered list of parameter names.
//! No regex: matching walks the `/`-separated segments of the path.

use std::collections::HashMap;

use crate::error::PatternError;

/// Parameter name bound to a `*` segment
pub const WILDCARD_PARAM: &str = "wildcard";

/// How much of the path a pattern has to cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole path, start to end (route layers)
    Exact,
    /// Leading run of path segments (`use` layers)
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Optional(String),
    Wildcard,
}

/// A compiled route template
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
    mode: MatchMode,
}

/// Captured values, one slot per parameter name.
/// An absent optional segment leaves its slot as `None`.
pub type Captures<'p> = Vec<Option<&'p str>>;

impl PathPattern {
    /// Compile a template for full-path matching
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        Self::compile(template, MatchMode::Exact)
    }

    /// Compile a template that matches any path it is a segment-prefix of
    pub fn parse_prefix(template: &str) -> Result<Self, PatternError> {
        Self::compile(template, MatchMode::Prefix)
    }

    /// Prefix pattern for `/`, covering every path
    pub(crate) fn any_path() -> Self {
        Self {
            raw: "/".to_string(),
            segments: vec![Segment::Literal(String::new())],
            param_names: Vec::new(),
            mode: MatchMode::Prefix,
        }
    }

    fn compile(template: &str, mode: MatchMode) -> Result<Self, PatternError> {
        let raw = normalize_template(template);
        let body = match mode {
            // A trailing slash never narrows a prefix, and "/" covers everything
            MatchMode::Prefix => raw.trim_end_matches('/'),
            MatchMode::Exact => raw.as_str(),
        };

        let parts: Vec<&str> = body.split('/').collect();
        let last = parts.len() - 1;
        let mut segments = Vec::with_capacity(parts.len());
        let mut param_names = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            if *part == "*" {
                if i != last {
                    return Err(PatternError::WildcardNotLast {
                        pattern: raw.clone(),
                    });
                }
                param_names.push(WILDCARD_PARAM.to_string());
                segments.push(Segment::Wildcard);
            } else if let Some(name) = part.strip_prefix(':') {
                let (name, optional) = match name.strip_suffix('?') {
                    Some(n) => (n, true),
                    None => (name, false),
                };
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName {
                        pattern: raw.clone(),
                    });
                }
                if optional && i != last {
                    return Err(PatternError::OptionalNotLast {
                        name: name.to_string(),
                        pattern: raw.clone(),
                    });
                }
                param_names.push(name.to_string());
                segments.push(if optional {
                    Segment::Optional(name.to_string())
                } else {
                    Segment::Param(name.to_string())
                });
            } else {
                segments.push(Segment::Literal((*part).to_string()));
            }
        }

        Ok(Self {
            raw,
            segments,
            param_names,
            mode,
        })
    }

    /// The normalized template this pattern was compiled from
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub const fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Match `path` (no query string) against this pattern.
    ///
    /// The returned captures always have exactly `param_names().len()` slots.
    pub fn matches<'p>(&self, path: &'p str) -> Option<Captures<'p>> {
        let parts = split_with_offsets(path);
        let mut captures = Vec::with_capacity(self.param_names.len());
        let mut consumed = 0;

        for (i, segment) in self.segments.iter().enumerate() {
            let part = parts.get(i);
            match segment {
                Segment::Literal(literal) => {
                    let (_, text) = part?;
                    if *text != literal.as_str() {
                        return None;
                    }
                    consumed += 1;
                }
                Segment::Param(_) => {
                    let (_, text) = part?;
                    if text.is_empty() {
                        return None;
                    }
                    captures.push(Some(*text));
                    consumed += 1;
                }
                Segment::Optional(_) => match part {
                    None => captures.push(None),
                    Some((_, text)) if !text.is_empty() => {
                        captures.push(Some(*text));
                        consumed += 1;
                    }
                    // `/` is the root itself, so the optional slot is absent
                    Some(_) if path == "/" => {
                        captures.push(None);
                        consumed += 1;
                    }
                    Some(_) => return None,
                },
                Segment::Wildcard => {
                    let (offset, _) = part?;
                    captures.push(Some(&path[*offset..]));
                    return Some(captures);
                }
            }
        }

        match self.mode {
            MatchMode::Exact if consumed != parts.len() => None,
            _ => Some(captures),
        }
    }

    /// Pair captured values with parameter names; absent optionals are omitted
    pub fn bind(&self, captures: &Captures<'_>) -> HashMap<String, String> {
        self.param_names
            .iter()
            .zip(captures)
            .filter_map(|(name, value)| value.map(|v| (name.clone(), v.to_string())))
            .collect()
    }
}

/// Templates always start with `/`; an empty template means the root
fn normalize_template(template: &str) -> String {
    if template.starts_with('/') {
        template.to_string()
    } else {
        format!("/{template}")
    }
}

/// Split on `/`, remembering where each segment starts in `path`
fn split_with_offsets(path: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    path.split('/')
        .map(|part| {
            let start = offset;
            offset += part.len() + 1;
            (start, part)
        })
        .collect()
}
