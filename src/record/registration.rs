/// OID registration record
use super::{optional, single_value, FieldTable};
use crate::cache::{CacheKind, CacheMaps, Cacheable, KindStore};
use crate::config::DirectoryProfile;
use crate::error::{DirError, DirResult};
use crate::notation::{
    dn_to_dot_notation, dot_notation_to_dn, Asn1Notation, DotNotation, Identifier,
    NameAndNumberForm, NumberForm, RegisteredRoot,
};
use crate::time::{generalized_time_to_time, time_to_generalized_time};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

lazy_static! {
    static ref REGISTRATION_FIELDS: FieldTable<Registration> = FieldTable::<Registration>::new()
        .register(
            "n",
            |r| optional(&r.n),
            |r, v| r.set_number_form(single_value("n", v)?.as_deref()),
        )
        .register(
            "dotNotation",
            |r| optional(&r.dot_notation),
            |r, v| r.set_dot_notation(single_value("dotNotation", v)?.as_deref()),
        )
        .register(
            "aSN1Notation",
            |r| optional(&r.asn1_notation),
            |r, v| r.set_asn1_notation(single_value("aSN1Notation", v)?.as_deref()),
        )
        .register(
            "identifier",
            |r| optional(&r.identifier),
            |r, v| r.set_identifier(single_value("identifier", v)?.as_deref()),
        )
        .register(
            "nameAndNumberForm",
            |r| optional(&r.name_and_number_form),
            |r, v| r.set_name_and_number_form(single_value("nameAndNumberForm", v)?.as_deref()),
        )
        .register("longArc", |r| r.long_arcs.clone(), |r, v| r.set_long_arcs(v))
        .register(
            "description",
            |r| optional(&r.description),
            |r, v| {
                r.description = single_value("description", v)?;
                Ok(())
            },
        )
        .register(
            "registrationCreated",
            |r| r.created_generalized().into_iter().collect(),
            |r, v| r.set_created(single_value("registrationCreated", v)?.as_deref()),
        )
        .register(
            "registrationModified",
            |r| r.modified_generalized().into_iter().collect(),
            |r, v| r.set_modified(single_value("registrationModified", v)?.as_deref()),
        );
}

/// A registration entry: one OID node with its notations and metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    dn: String,
    n: Option<NumberForm>,
    dot_notation: Option<DotNotation>,
    asn1_notation: Option<Asn1Notation>,
    identifier: Option<Identifier>,
    name_and_number_form: Option<NameAndNumberForm>,
    long_arcs: Vec<String>,
    description: Option<String>,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    /// Written once, by the first notation assigned
    registered_root: Option<RegisteredRoot>,
}

impl Registration {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Start a registration from its entry DN, decoding the OID from the DN itself
    pub fn from_dn(dn: &str, profile: &DirectoryProfile) -> DirResult<Self> {
        let dot = dn_to_dot_notation(dn, profile)?;
        let mut registration = Self::new(dn.trim());
        registration.set_dot_notation(Some(dot.as_str()))?;
        if let Some(dot) = &registration.dot_notation {
            registration.n = Some(dot.leaf().clone());
        }
        Ok(registration)
    }

    pub fn fields() -> &'static FieldTable<Registration> {
        &REGISTRATION_FIELDS
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: impl Into<String>) {
        self.dn = dn.into();
    }

    /// Build and store the entry DN from the dotNotation, per the profile's dimension model
    pub fn derive_dn(&mut self, profile: &DirectoryProfile) -> DirResult<&str> {
        let dot = self.dot_notation.as_ref().ok_or_else(|| {
            DirError::NotationFormat("Registration has no dotNotation to derive a DN from".to_string())
        })?;
        self.dn = dot_notation_to_dn(&dot.to_string(), profile)?;
        Ok(&self.dn)
    }

    pub fn number_form(&self) -> Option<&NumberForm> {
        self.n.as_ref()
    }

    pub fn set_number_form(&mut self, raw: Option<&str>) -> DirResult<()> {
        self.n = raw.map(NumberForm::parse).transpose()?;
        Ok(())
    }

    pub fn dot_notation(&self) -> Option<&DotNotation> {
        self.dot_notation.as_ref()
    }

    pub fn set_dot_notation(&mut self, raw: Option<&str>) -> DirResult<()> {
        let dot = match raw {
            Some(raw) => DotNotation::parse(raw)?,
            None => {
                self.dot_notation = None;
                return Ok(());
            }
        };
        self.register_root(|| RegisteredRoot::from_dot(&dot));
        self.dot_notation = Some(dot);
        Ok(())
    }

    pub fn asn1_notation(&self) -> Option<&Asn1Notation> {
        self.asn1_notation.as_ref()
    }

    /// Store an ASN.1 notation and fill whichever derived attributes are still unset
    pub fn set_asn1_notation(&mut self, raw: Option<&str>) -> DirResult<()> {
        let notation = match raw {
            Some(raw) => Asn1Notation::parse(raw)?,
            None => {
                self.asn1_notation = None;
                return Ok(());
            }
        };

        if self.dot_notation.is_none() && notation.depth() > 1 {
            self.dot_notation = Some(notation.to_dot_notation());
        }
        if self.n.is_none() {
            self.n = Some(notation.leaf_number());
        }
        if let Some(leaf) = notation.leaf_identifier() {
            let identifier = Identifier::parse(&leaf)?;
            if self.name_and_number_form.is_none() {
                self.name_and_number_form = Some(NameAndNumberForm::new(
                    identifier.clone(),
                    notation.leaf_number(),
                ));
            }
            if self.identifier.is_none() {
                self.identifier = Some(identifier);
            }
        }

        self.register_root(|| RegisteredRoot::from_asn1(&notation));
        self.asn1_notation = Some(notation);
        Ok(())
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    pub fn set_identifier(&mut self, raw: Option<&str>) -> DirResult<()> {
        self.identifier = raw.map(Identifier::parse).transpose()?;
        Ok(())
    }

    pub fn name_and_number_form(&self) -> Option<&NameAndNumberForm> {
        self.name_and_number_form.as_ref()
    }

    pub fn set_name_and_number_form(&mut self, raw: Option<&str>) -> DirResult<()> {
        self.name_and_number_form = raw.map(NameAndNumberForm::parse).transpose()?;
        Ok(())
    }

    pub fn long_arcs(&self) -> &[String] {
        &self.long_arcs
    }

    /// Replace the long arcs. Only registrations beneath joint-iso-itu-t may carry them.
    pub fn set_long_arcs(&mut self, values: Vec<String>) -> DirResult<()> {
        let values = values
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>();

        if values.is_empty() {
            self.long_arcs.clear();
            return Ok(());
        }

        self.check_long_arc_policy()?;
        for value in &values {
            check_long_arc_form(value)?;
        }
        self.long_arcs = values;
        Ok(())
    }

    pub fn add_long_arc(&mut self, value: &str) -> DirResult<()> {
        let value = value.trim();
        self.check_long_arc_policy()?;
        check_long_arc_form(value)?;
        if !self.long_arcs.iter().any(|arc| arc == value) {
            self.long_arcs.push(value.to_string());
        }
        Ok(())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn created_generalized(&self) -> Option<String> {
        self.created.as_ref().map(time_to_generalized_time)
    }

    pub fn set_created(&mut self, raw: Option<&str>) -> DirResult<()> {
        self.created = raw.map(generalized_time_to_time).transpose()?;
        Ok(())
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    pub fn modified_generalized(&self) -> Option<String> {
        self.modified.as_ref().map(time_to_generalized_time)
    }

    pub fn set_modified(&mut self, raw: Option<&str>) -> DirResult<()> {
        self.modified = raw.map(generalized_time_to_time).transpose()?;
        Ok(())
    }

    pub fn registered_root(&self) -> Option<&RegisteredRoot> {
        self.registered_root.as_ref()
    }

    fn register_root(&mut self, derive: impl FnOnce() -> RegisteredRoot) {
        if self.registered_root.is_none() {
            let root = derive();
            debug!(
                "Registered root for {}: n={} depth={}",
                self.dn, root.n, root.depth
            );
            self.registered_root = Some(root);
        }
    }

    fn check_long_arc_policy(&self) -> DirResult<()> {
        match &self.registered_root {
            Some(root) if root.permits_long_arc() => Ok(()),
            Some(root) => Err(DirError::IllegalArc(format!(
                "Long arcs require a joint-iso-itu-t registration below the root (n={}, depth={})",
                root.n, root.depth
            ))),
            None => Err(DirError::IllegalArc(
                "Long arcs require a notation to be set first".to_string(),
            )),
        }
    }
}

fn check_long_arc_form(value: &str) -> DirResult<()> {
    if value.len() < 2 || !value.starts_with('/') {
        return Err(DirError::IllegalArc(format!(
            "Long arc must be a /-prefixed Unicode label: {:?}",
            value
        )));
    }
    Ok(())
}

impl Cacheable for Registration {
    const KIND: CacheKind = CacheKind::Registration;

    fn cache_key(&self) -> &str {
        &self.dn
    }

    fn is_unset(&self) -> bool {
        self.dn.trim().is_empty()
            && self.dot_notation.is_none()
            && self.asn1_notation.is_none()
            && self.n.is_none()
    }

    fn store_mut(maps: &mut CacheMaps) -> &mut KindStore<Self> {
        &mut maps.registrations
    }
}
