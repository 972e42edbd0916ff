/// Refinement expressions: `item:`, `and:{...}`, `or:{...}`, `not:`
use super::split_top_level;
use crate::error::{DirError, DirResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Object-class filter tree of a subtree specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Refinement {
    /// OID or descriptor of an object class
    Item(String),
    And(Vec<Refinement>),
    Or(Vec<Refinement>),
    Not(Box<Refinement>),
}

impl Refinement {
    pub fn parse(raw: &str) -> DirResult<Self> {
        let raw = raw.trim();

        if let Some(rest) = raw.strip_prefix("item:") {
            let item = rest.trim();
            if item.is_empty() {
                return Err(DirError::SubtreeSpecFormat(
                    "Refinement item has no value".to_string(),
                ));
            }
            if item.contains(|c: char| c == '{' || c == '}' || c == ',') {
                return Err(DirError::SubtreeSpecFormat(format!(
                    "Malformed refinement item: {}",
                    item
                )));
            }
            return Ok(Refinement::Item(item.to_string()));
        }
        if let Some(rest) = raw.strip_prefix("and:") {
            return Self::parse_set(rest).map(Refinement::And);
        }
        if let Some(rest) = raw.strip_prefix("or:") {
            return Self::parse_set(rest).map(Refinement::Or);
        }
        if let Some(rest) = raw.strip_prefix("not:") {
            return Ok(Refinement::Not(Box::new(Self::parse(rest)?)));
        }

        Err(DirError::SubtreeSpecFormat(format!(
            "Refinement must start with item:, and:, or: or not: ({})",
            raw
        )))
    }

    /// `{r, r, ...}` with splitting only at top-level commas
    fn parse_set(raw: &str) -> DirResult<Vec<Refinement>> {
        let raw = raw.trim();
        let inner = raw
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| {
                DirError::SubtreeSpecFormat(format!(
                    "Refinement set must be brace-delimited: {}",
                    raw
                ))
            })?;

        if inner.trim().is_empty() {
            return Err(DirError::SubtreeSpecFormat(
                "Refinement set has no members".to_string(),
            ));
        }

        split_top_level(inner)?
            .into_iter()
            .map(Self::parse)
            .collect()
    }

    /// Every item value in the tree, left to right
    pub fn items(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_items(&mut out);
        out
    }

    fn collect_items<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Refinement::Item(item) => out.push(item),
            Refinement::And(members) | Refinement::Or(members) => {
                for member in members {
                    member.collect_items(out);
                }
            }
            Refinement::Not(inner) => inner.collect_items(out),
        }
    }
}

impl FromStr for Refinement {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Refinement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Refinement::Item(item) => write!(f, "item:{}", item),
            Refinement::And(members) => write_set(f, "and", members),
            Refinement::Or(members) => write_set(f, "or", members),
            Refinement::Not(inner) => write!(f, "not:{}", inner),
        }
    }
}

fn write_set(f: &mut fmt::Formatter<'_>, op: &str, members: &[Refinement]) -> fmt::Result {
    write!(f, "{}:{{", op)?;
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", member)?;
    }
    f.write_str("}")
}
