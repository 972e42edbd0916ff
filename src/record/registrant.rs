/// Registrant (OID owner/contact) record
use super::{optional, single_value, FieldTable};
use crate::cache::{CacheKind, CacheMaps, Cacheable, KindStore};
use crate::config::DirectoryProfile;
use crate::error::{DirError, DirResult};
use crate::time::{generalized_time_to_time, time_to_generalized_time};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

const ID_ATTRIBUTE: &str = "registrantID";

lazy_static! {
    static ref REGISTRANT_FIELDS: FieldTable<Registrant> = FieldTable::<Registrant>::new()
        .register(
            ID_ATTRIBUTE,
            |r| optional(&r.registrant_id),
            |r, v| {
                r.registrant_id = single_value(ID_ATTRIBUTE, v)?;
                Ok(())
            },
        )
        .register(
            "cn",
            |r| optional(&r.common_name),
            |r, v| {
                r.common_name = single_value("cn", v)?;
                Ok(())
            },
        )
        .register("email", |r| r.emails.clone(), |r, v| r.set_emails(v))
        .register(
            "registrantCreated",
            |r| r.created_generalized().into_iter().collect(),
            |r, v| r.set_created(single_value("registrantCreated", v)?.as_deref()),
        );
}

/// The party responsible for one or more registrations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Registrant {
    dn: String,
    registrant_id: Option<String>,
    common_name: Option<String>,
    emails: Vec<String>,
    created: Option<DateTime<Utc>>,
}

impl Registrant {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// `registrantID=<id>,<registrant base>`
    pub fn with_id(id: &str, profile: &DirectoryProfile) -> DirResult<Self> {
        let id = id.trim();
        if id.is_empty() || id.contains(|c: char| c == ',' || c == '=' || c == '+') {
            return Err(DirError::NotationFormat(format!(
                "Registrant ID is not usable as an RDN value: {:?}",
                id
            )));
        }
        if profile.registrant_base.trim().is_empty() {
            return Err(DirError::DirectoryProfile(
                "No registrant base configured".to_string(),
            ));
        }

        Ok(Self {
            dn: format!("{}={},{}", ID_ATTRIBUTE, id, profile.registrant_base.trim()),
            registrant_id: Some(id.to_string()),
            ..Self::default()
        })
    }

    pub fn fields() -> &'static FieldTable<Registrant> {
        &REGISTRANT_FIELDS
    }

    pub fn dn(&self) -> &str {
        &self.dn
    }

    pub fn set_dn(&mut self, dn: impl Into<String>) {
        self.dn = dn.into();
    }

    pub fn registrant_id(&self) -> Option<&str> {
        self.registrant_id.as_deref()
    }

    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    pub fn set_common_name(&mut self, cn: Option<String>) {
        self.common_name = cn;
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Replace the mail addresses, dropping blanks and case-insensitive duplicates
    pub fn set_emails(&mut self, values: Vec<String>) -> DirResult<()> {
        let mut emails: Vec<String> = Vec::new();
        for value in values {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if !value.contains('@') {
                return Err(DirError::NotationFormat(format!(
                    "Not a mail address: {}",
                    value
                )));
            }
            if !emails.iter().any(|e| e.eq_ignore_ascii_case(value)) {
                emails.push(value.to_string());
            }
        }
        self.emails = emails;
        Ok(())
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
}

impl Cacheable for Registrant {
    const KIND: CacheKind = CacheKind::Registrant;

    fn cache_key(&self) -> &str {
        &self.dn
    }

    fn is_unset(&self) -> bool {
        self.dn.trim().is_empty() && self.registrant_id.is_none()
    }

    fn store_mut(maps: &mut CacheMaps) -> &mut KindStore<Self> {
        &mut maps.registrants
    }
}
