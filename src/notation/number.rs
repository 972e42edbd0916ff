/// NumberForm and DotNotation values
use crate::error::{DirError, DirResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single non-negative arc number.
///
/// Stored as its decimal text so arcs wider than any machine integer
/// (e.g. UUID arcs beneath `2.25`) survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NumberForm(String);

impl NumberForm {
    pub fn parse(raw: &str) -> DirResult<Self> {
        Self::from_digits(raw.trim())
    }

    /// Strict form of `parse`: no surrounding whitespace is tolerated
    pub(crate) fn from_digits(raw: &str) -> DirResult<Self> {
        if raw.is_empty() {
            return Err(DirError::NotationFormat("Empty NumberForm".to_string()));
        }
        if !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DirError::NotationFormat(format!(
                "NumberForm must contain only digits: {}",
                raw
            )));
        }
        if raw.len() > 1 && raw.starts_with('0') {
            return Err(DirError::NotationFormat(format!(
                "NumberForm has leading zeros: {}",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value when it fits in a u128
    pub fn value(&self) -> Option<u128> {
        self.0.parse().ok()
    }

    /// True when the arc is no greater than `max`
    pub fn is_at_most(&self, max: u128) -> bool {
        self.value().map(|v| v <= max).unwrap_or(false)
    }
}

impl From<u64> for NumberForm {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl FromStr for NumberForm {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for NumberForm {
    type Error = DirError;

    fn try_from(s: String) -> DirResult<Self> {
        Self::parse(&s)
    }
}

impl From<NumberForm> for String {
    fn from(n: NumberForm) -> Self {
        n.0
    }
}

impl fmt::Display for NumberForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Dot-delimited sequence of NumberForms, e.g. `1.3.6.1.4.1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DotNotation(Vec<NumberForm>);

impl DotNotation {
    pub fn parse(raw: &str) -> DirResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DirError::NotationFormat("Empty dotNotation".to_string()));
        }
        if raw.starts_with('.') || raw.ends_with('.') {
            return Err(DirError::NotationFormat(format!(
                "dotNotation has a leading or trailing dot: {}",
                raw
            )));
        }

        let arcs = raw
            .split('.')
            .map(|arc| {
                NumberForm::from_digits(arc).map_err(|e| {
                    DirError::NotationFormat(format!("Bad arc in dotNotation {}: {}", raw, e))
                })
            })
            .collect::<DirResult<Vec<_>>>()?;

        Ok(Self(arcs))
    }

    pub fn from_arcs(arcs: Vec<NumberForm>) -> DirResult<Self> {
        if arcs.is_empty() {
            return Err(DirError::NotationFormat("Empty dotNotation".to_string()));
        }
        Ok(Self(arcs))
    }

    pub fn arcs(&self) -> &[NumberForm] {
        &self.0
    }

    /// Number of arcs
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn root(&self) -> &NumberForm {
        &self.0[0]
    }

    pub fn leaf(&self) -> &NumberForm {
        &self.0[self.0.len() - 1]
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// The superior OID, or None for a root
    pub fn parent(&self) -> Option<DotNotation> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append an arc beneath this OID
    pub fn child(&self, arc: NumberForm) -> DotNotation {
        let mut arcs = self.0.clone();
        arcs.push(arc);
        Self(arcs)
    }
}

impl From<NumberForm> for DotNotation {
    fn from(arc: NumberForm) -> Self {
        Self(vec![arc])
    }
}

impl FromStr for DotNotation {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DotNotation {
    type Error = DirError;

    fn try_from(s: String) -> DirResult<Self> {
        Self::parse(&s)
    }
}

impl From<DotNotation> for String {
    fn from(d: DotNotation) -> Self {
        d.to_string()
    }
}

impl fmt::Display for DotNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arc) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(arc.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_form_valid() {
        assert_eq!(NumberForm::parse("0").unwrap().as_str(), "0");
        assert_eq!(NumberForm::parse(" 56521 ").unwrap().to_string(), "56521");
        let wide = "340282366920938463463374607431768211456000";
        assert_eq!(NumberForm::parse(wide).unwrap().as_str(), wide);
    }

    #[test]
    fn test_number_form_invalid() {
        assert!(NumberForm::parse("").is_err());
        assert!(NumberForm::parse("01").is_err());
        assert!(NumberForm::parse("-1").is_err());
        assert!(NumberForm::parse("1a").is_err());
    }

    #[test]
    fn test_number_form_bounds() {
        assert!(NumberForm::parse("39").unwrap().is_at_most(39));
        assert!(!NumberForm::parse("40").unwrap().is_at_most(39));
        let huge = NumberForm::parse("999999999999999999999999999999999999999999").unwrap();
        assert_eq!(huge.value(), None);
        assert!(!huge.is_at_most(39));
    }

    #[test]
    fn test_dot_notation_rejects_inner_whitespace() {
        for raw in ["1. 3", "1 .3", "1.3. 6", "1.\t3"] {
            assert!(DotNotation::parse(raw).is_err(), "input {:?}", raw);
        }
        assert_eq!(DotNotation::parse(" 1.3 ").unwrap().to_string(), "1.3");
    }

    #[test]
    fn test_dot_notation_idempotent() {
        let raw = "1.3.6.1.4.1.56521.101";
        let dot = DotNotation::parse(raw).unwrap();
        assert_eq!(dot.to_string(), raw);
        assert_eq!(dot.depth(), 8);
        assert_eq!(dot.leaf().as_str(), "101");
        assert_eq!(dot.parent().unwrap().to_string(), "1.3.6.1.4.1.56521");
    }

    #[test]
    fn test_dot_notation_root() {
        let dot = DotNotation::parse("2").unwrap();
        assert!(dot.is_root());
        assert!(dot.parent().is_none());
        assert_eq!(dot.child(NumberForm::from(25)).to_string(), "2.25");
    }

    #[test]
    fn test_dot_notation_invalid() {
        assert!(DotNotation::parse("").is_err());
        assert!(DotNotation::parse(".1.3").is_err());
        assert!(DotNotation::parse("1.3.").is_err());
        assert!(DotNotation::parse("1..3").is_err());
        assert!(DotNotation::parse("1.03").is_err());
        assert!(DotNotation::from_arcs(vec![]).is_err());
    }
}
