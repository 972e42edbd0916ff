/// Subtree specifications (RFC 3672 flavored)
///
/// Text form:
/// `{ base "<rdns>", specificExclusions { chopBefore "<rdn>", chopAfter "<rdn>" },
///    minimum N, maximum N, specificationFilter <refinement> }`
///
/// Every clause is optional; `{}` is the empty specification. Printing
/// always emits clauses in the order above, joined by `, `.

pub mod refinement;

pub use refinement::Refinement;

use crate::error::{DirError, DirResult};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a named entry an exclusion chops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChopKind {
    /// Excludes the named entry and everything beneath it
    ChopBefore,
    /// Excludes only what is beneath the named entry
    ChopAfter,
}

impl ChopKind {
    pub fn keyword(self) -> &'static str {
        match self {
            ChopKind::ChopBefore => "chopBefore",
            ChopKind::ChopAfter => "chopAfter",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificExclusion {
    pub kind: ChopKind,
    /// RDN sequence relative to the base
    pub local_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeSpecification {
    pub base: Option<String>,
    pub specific_exclusions: Option<Vec<SpecificExclusion>>,
    pub minimum: Option<u64>,
    pub maximum: Option<u64>,
    pub specification_filter: Option<Refinement>,
}

impl SubtreeSpecification {
    pub fn parse(raw: &str) -> DirResult<Self> {
        Self::parse_inner(raw).map_err(|e| {
            metrics::record_codec_error("subtree", e.kind());
            e
        })
    }

    fn parse_inner(raw: &str) -> DirResult<Self> {
        let raw = raw.trim();
        let body = raw
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| {
                DirError::SubtreeSpecFormat(format!(
                    "Subtree specification must be encapsulated in braces: {}",
                    raw
                ))
            })?;

        let mut spec = SubtreeSpecification::default();
        if body.trim().is_empty() {
            return Ok(spec);
        }

        for clause in split_top_level(body)? {
            let clause = clause.trim();
            let keyword_len = clause
                .bytes()
                .take_while(|b| b.is_ascii_alphabetic())
                .count();
            let (keyword, rest) = clause.split_at(keyword_len);

            match keyword {
                "base" => {
                    let (value, trailing) = take_quoted(rest)?;
                    if !trailing.trim().is_empty() {
                        return Err(DirError::SubtreeSpecFormat(format!(
                            "Unexpected text after base value: {}",
                            trailing
                        )));
                    }
                    set_once(&mut spec.base, value.to_string(), keyword)?;
                }
                "specificExclusions" => {
                    set_once(&mut spec.specific_exclusions, parse_exclusions(rest)?, keyword)?;
                }
                "minimum" => set_once(&mut spec.minimum, parse_count(keyword, rest)?, keyword)?,
                "maximum" => set_once(&mut spec.maximum, parse_count(keyword, rest)?, keyword)?,
                "specificationFilter" => {
                    set_once(&mut spec.specification_filter, Refinement::parse(rest)?, keyword)?;
                }
                "" => {
                    return Err(DirError::SubtreeSpecFormat(format!(
                        "Empty or malformed clause in: {}",
                        raw
                    )))
                }
                other => {
                    return Err(DirError::SubtreeSpecFormat(format!(
                        "Unknown subtree specification clause: {}",
                        other
                    )))
                }
            }
        }

        Ok(spec)
    }

    pub fn is_empty(&self) -> bool {
        *self == SubtreeSpecification::default()
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_exclusion(mut self, kind: ChopKind, local_name: impl Into<String>) -> Self {
        self.specific_exclusions
            .get_or_insert_with(Vec::new)
            .push(SpecificExclusion {
                kind,
                local_name: local_name.into(),
            });
        self
    }

    pub fn with_bounds(mut self, minimum: Option<u64>, maximum: Option<u64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_filter(mut self, filter: Refinement) -> Self {
        self.specification_filter = Some(filter);
        self
    }
}

impl FromStr for SubtreeSpecification {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SubtreeSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut clauses = Vec::new();

        if let Some(base) = &self.base {
            clauses.push(format!("base \"{}\"", base));
        }
        if let Some(exclusions) = &self.specific_exclusions {
            let items = exclusions
                .iter()
                .map(|e| format!("{} \"{}\"", e.kind.keyword(), e.local_name))
                .collect::<Vec<_>>();
            if items.is_empty() {
                clauses.push("specificExclusions {}".to_string());
            } else {
                clauses.push(format!("specificExclusions {{ {} }}", items.join(", ")));
            }
        }
        if let Some(minimum) = self.minimum {
            clauses.push(format!("minimum {}", minimum));
        }
        if let Some(maximum) = self.maximum {
            clauses.push(format!("maximum {}", maximum));
        }
        if let Some(filter) = &self.specification_filter {
            clauses.push(format!("specificationFilter {}", filter));
        }

        write!(f, "{{{}}}", clauses.join(", "))
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, keyword: &str) -> DirResult<()> {
    if slot.is_some() {
        return Err(DirError::SubtreeSpecFormat(format!(
            "Duplicate {} clause",
            keyword
        )));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_count(keyword: &str, raw: &str) -> DirResult<u64> {
    let raw = raw.trim();
    raw.parse::<u64>().map_err(|e| {
        DirError::SubtreeSpecFormat(format!("Invalid {} value {:?}: {}", keyword, raw, e))
    })
}

/// `{ chopBefore "x", chopAfter "y" }`; commas between pairs are optional
/// and a `:` after the keyword is tolerated
fn parse_exclusions(raw: &str) -> DirResult<Vec<SpecificExclusion>> {
    let raw = raw.trim();
    let inner = raw.strip_prefix('{').ok_or_else(|| {
        DirError::SubtreeSpecFormat(format!("specificExclusions must open with '{{': {}", raw))
    })?;
    let inner = inner.strip_suffix('}').ok_or_else(|| {
        DirError::SubtreeSpecFormat(format!(
            "specificExclusions is missing its closing brace: {}",
            raw
        ))
    })?;

    let mut exclusions = Vec::new();
    let mut rest = inner;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }

        let keyword_len = rest
            .bytes()
            .take_while(|b| b.is_ascii_alphabetic())
            .count();
        let (keyword, after) = rest.split_at(keyword_len);
        let kind = match keyword {
            "chopBefore" => ChopKind::ChopBefore,
            "chopAfter" => ChopKind::ChopAfter,
            _ => {
                return Err(DirError::SubtreeSpecFormat(format!(
                    "Unknown specificExclusions keyword: {:?}",
                    keyword
                )))
            }
        };

        let after = after.trim_start();
        let after = after.strip_prefix(':').unwrap_or(after);
        let (local_name, remaining) = take_quoted(after)?;
        exclusions.push(SpecificExclusion {
            kind,
            local_name: local_name.to_string(),
        });
        rest = remaining;
    }

    Ok(exclusions)
}

/// Leading `"..."` value (backslash escapes the next character) and the text after it
fn take_quoted(raw: &str) -> DirResult<(&str, &str)> {
    let raw = raw.trim_start();
    let body = raw.strip_prefix('"').ok_or_else(|| {
        DirError::SubtreeSpecFormat(format!("Expected an opening quote: {}", raw))
    })?;

    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Ok((&body[..i], &body[i + 1..])),
            _ => {}
        }
    }

    Err(DirError::SubtreeSpecFormat(format!(
        "Unterminated quoted value: {}",
        raw
    )))
}

/// Split at commas that sit outside braces and quotes
pub(crate) fn split_top_level(raw: &str) -> DirResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in raw.char_indices() {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    DirError::SubtreeSpecFormat(format!("Unbalanced '}}' in: {}", raw))
                })?;
            }
            ',' if depth == 0 => {
                parts.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(DirError::SubtreeSpecFormat(format!(
            "Unterminated quoted value in: {}",
            raw
        )));
    }
    if depth != 0 {
        return Err(DirError::SubtreeSpecFormat(format!(
            "Unbalanced '{{' in: {}",
            raw
        )));
    }

    parts.push(&raw[start..]);
    Ok(parts)
}
