/// Root arc classification and the derived registeredRoot record
use super::asn1::Asn1Notation;
use super::name::NameAndNumberForm;
use super::number::{DotNotation, NumberForm};
use crate::error::{DirError, DirResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three top-level arcs of the OID tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootArc {
    ItuT,
    Iso,
    JointIsoItuT,
}

impl RootArc {
    pub const ALL: [RootArc; 3] = [RootArc::ItuT, RootArc::Iso, RootArc::JointIsoItuT];

    pub fn number(self) -> u8 {
        match self {
            RootArc::ItuT => 0,
            RootArc::Iso => 1,
            RootArc::JointIsoItuT => 2,
        }
    }

    pub fn identifier(self) -> &'static str {
        match self {
            RootArc::ItuT => "itu-t",
            RootArc::Iso => "iso",
            RootArc::JointIsoItuT => "joint-iso-itu-t",
        }
    }

    /// `itu-t(0)`, `iso(1)` or `joint-iso-itu-t(2)`
    pub fn name_and_number_form(self) -> String {
        format!("{}({})", self.identifier(), self.number())
    }

    /// Auxiliary object class carried by registrations beneath this root
    pub fn auxiliary_class(self) -> &'static str {
        match self {
            RootArc::ItuT => "iTUTRegistration",
            RootArc::Iso => "iSORegistration",
            RootArc::JointIsoItuT => "jointISOITUTRegistration",
        }
    }

    /// Whether second-level arcs are limited to 0..=39 (X.660)
    pub fn limits_second_arc(self) -> bool {
        self != RootArc::JointIsoItuT
    }

    pub fn from_number(n: &NumberForm) -> Option<RootArc> {
        match n.as_str() {
            "0" => Some(RootArc::ItuT),
            "1" => Some(RootArc::Iso),
            "2" => Some(RootArc::JointIsoItuT),
            _ => None,
        }
    }

    /// Primary identifiers plus the X.660 secondary ones (`ccitt`, `itu-r`, `joint-iso-ccitt`)
    pub fn from_identifier(name: &str) -> Option<RootArc> {
        match name {
            "itu-t" | "ccitt" | "itu-r" => Some(RootArc::ItuT),
            "iso" => Some(RootArc::Iso),
            "joint-iso-itu-t" | "joint-iso-ccitt" => Some(RootArc::JointIsoItuT),
            _ => None,
        }
    }

    /// Classify a root label: bare number, bare identifier or `identifier(number)`
    pub fn classify(label: &str) -> DirResult<RootArc> {
        let label = label.trim();
        if label.is_empty() {
            return Err(DirError::RootClassification("Missing root label".to_string()));
        }

        if label.bytes().all(|b| b.is_ascii_digit()) {
            let n = NumberForm::parse(label)
                .map_err(|e| DirError::RootClassification(e.to_string()))?;
            return RootArc::from_number(&n).ok_or_else(|| {
                DirError::RootClassification(format!("No root arc numbered {}", label))
            });
        }

        if label.contains('(') {
            let nanf = NameAndNumberForm::parse(label)
                .map_err(|e| DirError::RootClassification(e.to_string()))?;
            let by_name = RootArc::from_identifier(nanf.identifier.as_str()).ok_or_else(|| {
                DirError::RootClassification(format!("Unknown root identifier: {}", label))
            })?;
            return match RootArc::from_number(&nanf.number) {
                Some(by_number) if by_number == by_name => Ok(by_name),
                _ => Err(DirError::RootClassification(format!(
                    "Root identifier and number disagree: {}",
                    label
                ))),
            };
        }

        RootArc::from_identifier(label).ok_or_else(|| {
            DirError::RootClassification(format!("Unknown root identifier: {}", label))
        })
    }
}

impl fmt::Display for RootArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Structural object class of a registration entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructuralKind {
    Root,
    Arc,
}

impl StructuralKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StructuralKind::Root => "root",
            StructuralKind::Arc => "arc",
        }
    }
}

/// Root classification derived from the first notation assigned to a registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredRoot {
    /// Number of arcs in the OID
    pub depth: usize,
    /// Root number 0..=2, or -1 when the root could not be determined
    pub n: i8,
    pub identifier: String,
    pub name_and_number_form: String,
    pub structural: StructuralKind,
    pub auxiliary_class: String,
}

impl RegisteredRoot {
    pub fn from_asn1(notation: &Asn1Notation) -> Self {
        Self::build(notation.depth(), Some(notation.root()))
    }

    /// dotNotation values are not root-checked, so N may be -1
    pub fn from_dot(dot: &DotNotation) -> Self {
        Self::build(dot.depth(), RootArc::from_number(dot.root()))
    }

    fn build(depth: usize, root: Option<RootArc>) -> Self {
        let structural = if depth <= 1 {
            StructuralKind::Root
        } else {
            StructuralKind::Arc
        };
        match root {
            Some(root) => Self {
                depth,
                n: root.number() as i8,
                identifier: root.identifier().to_string(),
                name_and_number_form: root.name_and_number_form(),
                structural,
                auxiliary_class: root.auxiliary_class().to_string(),
            },
            None => Self {
                depth,
                n: -1,
                identifier: String::new(),
                name_and_number_form: String::new(),
                structural,
                auxiliary_class: String::new(),
            },
        }
    }

    pub fn root(&self) -> Option<RootArc> {
        RootArc::ALL.iter().copied().find(|r| r.number() as i8 == self.n)
    }

    /// Long arcs are only assignable beneath joint-iso-itu-t, below the root itself
    pub fn permits_long_arc(&self) -> bool {
        self.depth > 1 && self.n == 2
    }
}
