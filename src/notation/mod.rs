/// OID identity codec
///
/// Parses and prints the notations a registration can be named by
/// (NumberForm, dotNotation, nameAndNumberForm, ASN.1 notation), classifies
/// root arcs and converts between dotNotation and registration DNs.

pub mod asn1;
pub mod dn;
pub mod name;
pub mod number;
pub mod root;

pub use asn1::{asn1_notation_to_multi, normalize_whitespace, ArcLabel, Asn1Notation, NotationParts};
pub use dn::{
    dn_to_dot_notation, dn_to_dot_notation_2d, dn_to_dot_notation_3d, dot_notation_to_dn,
    dot_notation_to_dn_2d, dot_notation_to_dn_3d,
};
pub use name::{is_identifier, Identifier, NameAndNumberForm};
pub use number::{DotNotation, NumberForm};
pub use root::{RegisteredRoot, RootArc, StructuralKind};

use crate::error::DirResult;

pub fn parse_number_form(raw: &str) -> DirResult<NumberForm> {
    NumberForm::parse(raw)
}

pub fn parse_dot_notation(raw: &str) -> DirResult<DotNotation> {
    DotNotation::parse(raw)
}

pub fn parse_name_and_number_form(raw: &str) -> DirResult<NameAndNumberForm> {
    NameAndNumberForm::parse(raw)
}

pub fn parse_asn1_notation(raw: &str) -> DirResult<Asn1Notation> {
    Asn1Notation::parse(raw)
}
