/// ASN.1 value notation for OIDs, e.g. `{iso identified-organization(3) dod(6)}`
use super::name::{Identifier, NameAndNumberForm};
use super::number::{DotNotation, NumberForm};
use super::root::RootArc;
use crate::error::{DirError, DirResult};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest second-level arc allowed beneath itu-t and iso
const MAX_SECOND_ARC: u128 = 39;

/// One brace-delimited label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArcLabel {
    Number(NumberForm),
    NameAndNumber(NameAndNumberForm),
    /// Bare identifier; only legal for the root label
    Name(Identifier),
}

impl ArcLabel {
    fn parse_arc(token: &str) -> DirResult<Self> {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return NumberForm::parse(token).map(ArcLabel::Number);
        }
        if token.contains('(') {
            return NameAndNumberForm::parse(token).map(ArcLabel::NameAndNumber);
        }
        Err(DirError::NotationFormat(format!(
            "Arc label is neither a number nor identifier(number): {}",
            token
        )))
    }

    fn parse_root(token: &str) -> DirResult<Self> {
        if token.bytes().all(|b| b.is_ascii_digit()) {
            return NumberForm::parse(token).map(ArcLabel::Number);
        }
        if token.contains('(') {
            return NameAndNumberForm::parse(token).map(ArcLabel::NameAndNumber);
        }
        Identifier::parse(token).map(ArcLabel::Name)
    }

    pub fn number(&self) -> Option<&NumberForm> {
        match self {
            ArcLabel::Number(n) => Some(n),
            ArcLabel::NameAndNumber(nanf) => Some(&nanf.number),
            ArcLabel::Name(_) => None,
        }
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            ArcLabel::Number(_) => None,
            ArcLabel::NameAndNumber(nanf) => Some(&nanf.identifier),
            ArcLabel::Name(id) => Some(id),
        }
    }
}

impl fmt::Display for ArcLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArcLabel::Number(n) => write!(f, "{}", n),
            ArcLabel::NameAndNumber(nanf) => write!(f, "{}", nanf),
            ArcLabel::Name(id) => write!(f, "{}", id),
        }
    }
}

/// A parsed, validated ASN.1 notation.
///
/// `Display` reproduces the labels as written (whitespace normalized);
/// [`Asn1Notation::canonical`] spells the root as `identifier(number)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Asn1Notation {
    root: RootArc,
    labels: Vec<ArcLabel>,
}

impl Asn1Notation {
    pub fn parse(raw: &str) -> DirResult<Self> {
        Self::parse_inner(raw).map_err(|e| {
            metrics::record_codec_error("asn1", e.kind());
            e
        })
    }

    fn parse_inner(raw: &str) -> DirResult<Self> {
        let cleaned = normalize_whitespace(raw);
        if cleaned.is_empty() {
            return Err(DirError::NotationFormat("Empty ASN.1 notation".to_string()));
        }

        let body = cleaned
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| {
                DirError::NotationFormat(format!(
                    "ASN.1 notation must be encapsulated in braces: {}",
                    cleaned
                ))
            })?;
        if body.contains('{') || body.contains('}') {
            return Err(DirError::NotationFormat(format!(
                "Unbalanced braces in ASN.1 notation: {}",
                cleaned
            )));
        }

        let mut tokens = body.split_whitespace();
        let root_token = tokens.next().ok_or_else(|| {
            DirError::RootClassification("ASN.1 notation has no root label".to_string())
        })?;
        let root = RootArc::classify(root_token)?;
        let root_label = ArcLabel::parse_root(root_token)
            .map_err(|e| DirError::RootClassification(e.to_string()))?;

        let mut labels = vec![root_label];
        for token in tokens {
            labels.push(ArcLabel::parse_arc(token)?);
        }

        if root.limits_second_arc() {
            if let Some(second) = labels.get(1).and_then(ArcLabel::number) {
                if !second.is_at_most(MAX_SECOND_ARC) {
                    return Err(DirError::IllegalArc(format!(
                        "Second arc beneath {} must be 0..={}, got {}",
                        root, MAX_SECOND_ARC, second
                    )));
                }
            }
        }

        Ok(Self { root, labels })
    }

    pub fn root(&self) -> RootArc {
        self.root
    }

    pub fn labels(&self) -> &[ArcLabel] {
        &self.labels
    }

    pub fn depth(&self) -> usize {
        self.labels.len()
    }

    pub fn leaf(&self) -> &ArcLabel {
        &self.labels[self.labels.len() - 1]
    }

    /// Number of every arc, root first
    pub fn to_dot_notation(&self) -> DotNotation {
        let root = DotNotation::from(NumberForm::from(self.root.number() as u64));
        // non-root labels always carry a number
        self.labels[1..]
            .iter()
            .filter_map(ArcLabel::number)
            .fold(root, |dot, arc| dot.child(arc.clone()))
    }

    /// Notation with the root label written as `identifier(number)`
    pub fn canonical(&self) -> String {
        let mut out = String::from("{");
        out.push_str(&self.root.name_and_number_form());
        for label in &self.labels[1..] {
            out.push(' ');
            out.push_str(&label.to_string());
        }
        out.push('}');
        out
    }

    /// Identifier of the leaf arc, if it was given one
    pub fn leaf_identifier(&self) -> Option<String> {
        if self.depth() == 1 {
            return Some(self.root.identifier().to_string());
        }
        self.leaf().identifier().map(|i| i.to_string())
    }

    pub fn leaf_number(&self) -> NumberForm {
        self.to_dot_notation().leaf().clone()
    }
}

impl FromStr for Asn1Notation {
    type Err = DirError;

    fn from_str(s: &str) -> DirResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Asn1Notation {
    type Error = DirError;

    fn try_from(s: String) -> DirResult<Self> {
        Self::parse(&s)
    }
}

impl From<Asn1Notation> for String {
    fn from(n: Asn1Notation) -> Self {
        n.to_string()
    }
}

impl fmt::Display for Asn1Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", label)?;
        }
        f.write_str("}")
    }
}

/// Everything derivable from one ASN.1 notation value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotationParts {
    pub notation: String,
    /// Empty for a root-only notation
    pub dot_notation: String,
    pub identifier: String,
    pub name_and_number_form: String,
    pub number_form: String,
}

impl From<NotationParts> for [String; 5] {
    fn from(p: NotationParts) -> Self {
        [
            p.notation,
            p.dot_notation,
            p.identifier,
            p.name_and_number_form,
            p.number_form,
        ]
    }
}

/// Split an ASN.1 notation into its cleaned form, dotNotation, leaf identifier,
/// leaf nameAndNumberForm and leaf number
pub fn asn1_notation_to_multi(raw: &str) -> DirResult<NotationParts> {
    let notation = Asn1Notation::parse(raw)?;

    let dot_notation = if notation.depth() == 1 {
        String::new()
    } else {
        notation.to_dot_notation().to_string()
    };

    let number_form = notation.leaf_number().to_string();
    let identifier = notation.leaf_identifier().unwrap_or_default();
    let name_and_number_form = if identifier.is_empty() {
        String::new()
    } else {
        format!("{}({})", identifier, number_form)
    };

    Ok(NotationParts {
        notation: notation.canonical(),
        dot_notation,
        identifier,
        name_and_number_form,
        number_form,
    })
}

/// Collapse newlines, tabs and runs of spaces to single spaces
pub fn normalize_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY_OID: &str =
        "{iso identified-organization(3) dod(6) internet(1) private(4) enterprise(1) 56521 oid-directory(101)}";

    #[test]
    fn test_multi_full_path() {
        let parts = asn1_notation_to_multi(DIRECTORY_OID).unwrap();
        assert_eq!(parts.dot_notation, "1.3.6.1.4.1.56521.101");
        assert_eq!(parts.identifier, "oid-directory");
        assert_eq!(parts.name_and_number_form, "oid-directory(101)");
        assert_eq!(parts.number_form, "101");
        assert_eq!(
            parts.notation,
            "{iso(1) identified-organization(3) dod(6) internet(1) private(4) enterprise(1) 56521 oid-directory(101)}"
        );
    }

    #[test]
    fn test_multi_root_only() {
        let parts: [String; 5] = asn1_notation_to_multi("{iso}").unwrap().into();
        assert_eq!(parts, ["{iso(1)}", "", "iso", "iso(1)", "1"].map(String::from));
    }

    #[test]
    fn test_multi_bare_number_leaf() {
        let parts = asn1_notation_to_multi("{joint-iso-itu-t(2) 25 1234}").unwrap();
        assert_eq!(parts.dot_notation, "2.25.1234");
        assert_eq!(parts.identifier, "");
        assert_eq!(parts.name_and_number_form, "");
        assert_eq!(parts.number_form, "1234");
    }

    #[test]
    fn test_whitespace_normalization() {
        let raw = "{ iso\n\tidentified-organization(3)   dod(6) }";
        let notation = Asn1Notation::parse(raw).unwrap();
        assert_eq!(notation.to_string(), "{iso identified-organization(3) dod(6)}");
    }

    #[test]
    fn test_round_trip() {
        let notation = Asn1Notation::parse(DIRECTORY_OID).unwrap();
        assert_eq!(notation.to_string(), DIRECTORY_OID);
        assert_eq!(notation.depth(), 8);
        assert_eq!(notation.root(), RootArc::Iso);
    }

    #[test]
    fn test_second_arc_limit() {
        assert!(Asn1Notation::parse("{iso 39}").is_ok());
        assert!(matches!(
            Asn1Notation::parse("{iso 40}"),
            Err(DirError::IllegalArc(_))
        ));
        assert!(matches!(
            Asn1Notation::parse("{itu-t(0) example(1000)}"),
            Err(DirError::IllegalArc(_))
        ));
        // joint-iso-itu-t is exempt
        assert!(Asn1Notation::parse("{joint-iso-itu-t 999 1}").is_ok());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Asn1Notation::parse(""),
            Err(DirError::NotationFormat(_))
        ));
        assert!(matches!(
            Asn1Notation::parse("iso 3 6"),
            Err(DirError::NotationFormat(_))
        ));
        assert!(matches!(
            Asn1Notation::parse("{}"),
            Err(DirError::RootClassification(_))
        ));
        assert!(matches!(
            Asn1Notation::parse("{internet(1) 3}"),
            Err(DirError::RootClassification(_))
        ));
        assert!(matches!(
            Asn1Notation::parse("{iso dod 6}"),
            Err(DirError::NotationFormat(_))
        ));
        assert!(Asn1Notation::parse("{iso {3}}").is_err());
        assert!(Asn1Notation::parse("{iso Dod(6)}").is_err());
    }

    #[test]
    fn test_to_dot_notation_includes_root() {
        let notation = Asn1Notation::parse("{2}").unwrap();
        assert_eq!(notation.to_dot_notation().to_string(), "2");
        assert_eq!(notation.leaf_identifier().as_deref(), Some("joint-iso-itu-t"));
    }
}
