/// Conversions between dotNotation and registration DNs
///
/// Three-dimensional DNs carry one `n=<arc>` RDN per arc, most specific
/// first: `n=101,n=56521,n=1,...,n=1,<base>`. Two-dimensional DNs carry the
/// whole OID in one RDN: `dotNotation=1.3.6.1,<base>`.
use super::number::{DotNotation, NumberForm};
use crate::config::{Dimension, DirectoryProfile};
use crate::error::{DirError, DirResult};
use tracing::debug;

const ARC_ATTRIBUTE: &str = "n";
const DOT_ATTRIBUTE: &str = "dotNotation";

pub fn dot_notation_to_dn_3d(dot: &str, profile: &DirectoryProfile) -> DirResult<String> {
    require_model(profile, Dimension::ThreeDimensional)?;
    let dot = DotNotation::parse(dot)?;
    let base = profile.primary_registration_base()?;

    let mut rdns = dot
        .arcs()
        .iter()
        .rev()
        .map(|arc| format!("{}={}", ARC_ATTRIBUTE, arc))
        .collect::<Vec<_>>();
    rdns.push(base.to_string());
    Ok(rdns.join(","))
}

pub fn dn_to_dot_notation_3d(dn: &str, profile: &DirectoryProfile) -> DirResult<String> {
    require_model(profile, Dimension::ThreeDimensional)?;
    let rdns = strip_registration_base(dn, profile)?;

    let mut arcs = rdns
        .iter()
        .map(|rdn| {
            let value = rdn_value(rdn, ARC_ATTRIBUTE)?;
            NumberForm::from_digits(value).map_err(|_| {
                DirError::NotationFormat(format!("RDN is not of the form n=<digits>: {}", rdn))
            })
        })
        .collect::<DirResult<Vec<_>>>()?;
    arcs.reverse();

    let dot = DotNotation::from_arcs(arcs)?;
    debug!("Decoded 3D DN {} as {}", dn, dot);
    Ok(dot.to_string())
}

pub fn dot_notation_to_dn_2d(dot: &str, profile: &DirectoryProfile) -> DirResult<String> {
    require_model(profile, Dimension::TwoDimensional)?;
    let dot = DotNotation::parse(dot)?;
    let base = profile.primary_registration_base()?;
    Ok(format!("{}={},{}", DOT_ATTRIBUTE, dot, base))
}

pub fn dn_to_dot_notation_2d(dn: &str, profile: &DirectoryProfile) -> DirResult<String> {
    require_model(profile, Dimension::TwoDimensional)?;
    let rdns = strip_registration_base(dn, profile)?;

    if rdns.len() != 1 {
        return Err(DirError::NotationFormat(format!(
            "Two-dimensional DN must carry exactly one RDN above the base: {}",
            dn
        )));
    }
    let value = rdn_value(rdns[0], DOT_ATTRIBUTE)?;
    let dot = DotNotation::parse(value)?;
    debug!("Decoded 2D DN {} as {}", dn, dot);
    Ok(dot.to_string())
}

/// Build a registration DN using whichever model the profile declares
pub fn dot_notation_to_dn(dot: &str, profile: &DirectoryProfile) -> DirResult<String> {
    match profile.dimension {
        Dimension::TwoDimensional => dot_notation_to_dn_2d(dot, profile),
        Dimension::ThreeDimensional => dot_notation_to_dn_3d(dot, profile),
    }
}

/// Decode a registration DN using whichever model the profile declares
pub fn dn_to_dot_notation(dn: &str, profile: &DirectoryProfile) -> DirResult<String> {
    match profile.dimension {
        Dimension::TwoDimensional => dn_to_dot_notation_2d(dn, profile),
        Dimension::ThreeDimensional => dn_to_dot_notation_3d(dn, profile),
    }
}

fn require_model(profile: &DirectoryProfile, wanted: Dimension) -> DirResult<()> {
    if profile.dimension != wanted {
        return Err(DirError::DirectoryProfile(format!(
            "Profile is configured for the {} model, not {}",
            profile.dimension, wanted
        )));
    }
    Ok(())
}

/// Split a DN into trimmed RDNs
fn split_rdns(dn: &str) -> Vec<&str> {
    dn.split(',').map(str::trim).collect()
}

/// RDNs of `dn` above whichever configured registration base it ends with
fn strip_registration_base<'a>(dn: &'a str, profile: &DirectoryProfile) -> DirResult<Vec<&'a str>> {
    let rdns = split_rdns(dn);

    for base in &profile.registration_bases {
        let base_rdns = split_rdns(base);
        if base_rdns.is_empty() || base_rdns.len() >= rdns.len() {
            continue;
        }
        let split = rdns.len() - base_rdns.len();
        let matches = rdns[split..]
            .iter()
            .zip(base_rdns.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b));
        if matches {
            return Ok(rdns[..split].to_vec());
        }
    }

    Err(DirError::DirectoryProfile(format!(
        "DN does not sit beneath any configured registration base: {}",
        dn
    )))
}

/// Value of an `attr=value` RDN; attribute matched case-insensitively, no padding around `=`
fn rdn_value<'a>(rdn: &'a str, attribute: &str) -> DirResult<&'a str> {
    match rdn.split_once('=') {
        Some((attr, value))
            if attr.eq_ignore_ascii_case(attribute) && value.trim() == value && !value.is_empty() =>
        {
            Ok(value)
        }
        _ => Err(DirError::NotationFormat(format!(
            "Expected a {}=<value> RDN, got {}",
            attribute, rdn
        ))),
    }
}
