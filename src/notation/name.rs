/// Identifier and NameAndNumberForm values
use super::number::NumberForm;
use crate::error::{DirError, DirResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An ASN.1 identifier: lowercase start, alphanumeric/hyphen body,
/// no double hyphen, alphanumeric end
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    pub fn parse(raw: &str) -> DirResult<Self> {
        let raw = raw.trim();
        if is_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(DirError::NotationFormat(format!("Invalid identifier: {:?}", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check the identifier grammar without allocating
pub fn is_identifier(s: &str) -> bool {
    let bytes = s.as_bytes();
    let (first, last) = match (bytes.first(), bytes.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return false,
    };

    if !first.is_ascii_lowercase() || !last.is_ascii_alphanumeric() {
        return false;
    }
    if !bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-') {
        return false;
    }
    !s.contains("--")
}

impl FromStr for Identifier {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = DirError;

    fn try_from(s: String) -> DirResult<Self> {
        Self::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(i: Identifier) -> Self {
        i.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `identifier(number)`, e.g. `internet(1)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameAndNumberForm {
    pub identifier: Identifier,
    pub number: NumberForm,
}

impl NameAndNumberForm {
    pub fn new(identifier: Identifier, number: NumberForm) -> Self {
        Self { identifier, number }
    }

    pub fn parse(raw: &str) -> DirResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DirError::NotationFormat("Empty nameAndNumberForm".to_string()));
        }

        let open = raw.find('(');
        let (open, inner) = match (open, raw.strip_suffix(')')) {
            (Some(open), Some(without_close)) if open < without_close.len() => {
                (open, &without_close[open + 1..])
            }
            _ => {
                return Err(DirError::NotationFormat(format!(
                    "nameAndNumberForm must be encapsulated as identifier(number): {}",
                    raw
                )))
            }
        };

        if inner.contains('(') || inner.contains(')') {
            return Err(DirError::NotationFormat(format!(
                "Nested parentheses in nameAndNumberForm: {}",
                raw
            )));
        }

        let identifier = Identifier::parse(&raw[..open])?;
        let number = NumberForm::parse(inner)?;
        Ok(Self { identifier, number })
    }
}

impl FromStr for NameAndNumberForm {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for NameAndNumberForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.identifier, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_grammar() {
        assert!(is_identifier("a"));
        assert!(is_identifier("oid-directory"));
        assert!(is_identifier("joint-iso-itu-t"));
        assert!(is_identifier("example2"));
        assert!(is_identifier("camelCase"));

        assert!(!is_identifier(""));
        assert!(!is_identifier("Upper"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("double--hyphen"));
        assert!(!is_identifier("trailing-"));
        assert!(!is_identifier("under_score"));
    }

    #[test]
    fn test_name_and_number_form() {
        let nanf = NameAndNumberForm::parse("oid-directory(101)").unwrap();
        assert_eq!(nanf.identifier.as_str(), "oid-directory");
        assert_eq!(nanf.number.as_str(), "101");
        assert_eq!(nanf.to_string(), "oid-directory(101)");
    }

    #[test]
    fn test_name_and_number_form_invalid() {
        assert!(NameAndNumberForm::parse("").is_err());
        assert!(NameAndNumberForm::parse("internet").is_err());
        assert!(NameAndNumberForm::parse("internet(1").is_err());
        assert!(NameAndNumberForm::parse("internet)1(").is_err());
        assert!(NameAndNumberForm::parse("internet()").is_err());
        assert!(NameAndNumberForm::parse("Internet(1)").is_err());
        assert!(NameAndNumberForm::parse("internet(01)").is_err());
        assert!(NameAndNumberForm::parse("internet((1))").is_err());
    }
}
