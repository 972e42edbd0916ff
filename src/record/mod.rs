/// Directory records and their attribute field tables
///
/// Each record type registers its attributes once in a `FieldTable`: a
/// case-insensitive attribute name mapped to a getter/setter pair over plain
/// string lists. Callers that speak in directory attribute terms (an LDAP
/// entry, a JSON document) go through the table; Rust callers use the typed
/// setters directly.
mod registrant;
mod registration;

pub use registrant::Registrant;
pub use registration::Registration;

use crate::error::{DirError, DirResult};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Reads an attribute as a list of strings; empty when unset
pub type Getter<R> = fn(&R) -> Vec<String>;

/// Writes an attribute from a list of strings; an empty list clears it
pub type Setter<R> = fn(&mut R, Vec<String>) -> DirResult<()>;

/// Caller-supplied rewrite applied to raw values on the way in or out
pub type ValueTransform = dyn Fn(Vec<String>) -> DirResult<Vec<String>> + Send + Sync;

struct Field<R> {
    name: &'static str,
    getter: Getter<R>,
    setter: Setter<R>,
}

/// Attribute name to accessor registry for one record type
pub struct FieldTable<R> {
    fields: HashMap<String, Field<R>>,
    order: Vec<&'static str>,
}

impl<R> FieldTable<R> {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register an attribute; re-registering a name replaces its accessors
    pub fn register(mut self, name: &'static str, getter: Getter<R>, setter: Setter<R>) -> Self {
        let key = name.to_lowercase();
        if !self.fields.contains_key(&key) {
            self.order.push(name);
        }
        self.fields.insert(
            key,
            Field {
                name,
                getter,
                setter,
            },
        );
        self
    }

    /// Attribute names in registration order
    pub fn names(&self) -> &[&'static str] {
        &self.order
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_lowercase())
    }

    pub fn get(&self, record: &R, name: &str) -> DirResult<Vec<String>> {
        self.get_with(record, name, None)
    }

    pub fn get_with(
        &self,
        record: &R,
        name: &str,
        transform: Option<&ValueTransform>,
    ) -> DirResult<Vec<String>> {
        let field = self.field(name)?;
        let values = (field.getter)(record);
        match transform {
            Some(transform) => transform(values),
            None => Ok(values),
        }
    }

    pub fn set(&self, record: &mut R, name: &str, values: Vec<String>) -> DirResult<()> {
        self.set_with(record, name, values, None)
    }

    pub fn set_with(
        &self,
        record: &mut R,
        name: &str,
        values: Vec<String>,
        transform: Option<&ValueTransform>,
    ) -> DirResult<()> {
        let field = self.field(name)?;
        let values = match transform {
            Some(transform) => transform(values)?,
            None => values,
        };
        (field.setter)(record, values)
    }

    /// Set every attribute present in `attributes`; names without a field are skipped
    pub fn apply<'a, I>(&self, record: &mut R, attributes: I) -> DirResult<usize>
    where
        I: IntoIterator<Item = (&'a str, Vec<String>)>,
    {
        let mut applied = 0;
        for (name, values) in attributes {
            if self.contains(name) {
                self.set(record, name, values)?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    /// Populated attributes as a JSON object; single values as strings, multi values as arrays
    pub fn to_json(&self, record: &R) -> Value {
        let mut map = Map::new();
        for name in &self.order {
            let field = match self.fields.get(&name.to_lowercase()) {
                Some(field) => field,
                None => continue,
            };
            let mut values = (field.getter)(record);
            match values.len() {
                0 => continue,
                1 => {
                    map.insert(field.name.to_string(), Value::String(values.remove(0)));
                }
                _ => {
                    map.insert(
                        field.name.to_string(),
                        Value::Array(values.into_iter().map(Value::String).collect()),
                    );
                }
            }
        }
        Value::Object(map)
    }

    fn field(&self, name: &str) -> DirResult<&Field<R>> {
        self.fields
            .get(&name.to_lowercase())
            .ok_or_else(|| DirError::UnknownField(name.to_string()))
    }
}

impl<R> Default for FieldTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// At most one non-blank value for a single-valued attribute
pub(crate) fn single_value(name: &str, values: Vec<String>) -> DirResult<Option<String>> {
    let mut values = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>();

    if values.len() > 1 {
        return Err(DirError::NotationFormat(format!(
            "{} is single-valued, got {} values",
            name,
            values.len()
        )));
    }
    Ok(values.pop())
}

pub(crate) fn optional<T: ToString>(value: &Option<T>) -> Vec<String> {
    value.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        title: Option<String>,
        tags: Vec<String>,
    }

    fn table() -> FieldTable<Probe> {
        FieldTable::<Probe>::new()
            .register(
                "title",
                |p| optional(&p.title),
                |p, v| {
                    p.title = single_value("title", v)?;
                    Ok(())
                },
            )
            .register(
                "tagList",
                |p| p.tags.clone(),
                |p, v| {
                    p.tags = v;
                    Ok(())
                },
            )
    }

    #[test]
    fn test_case_insensitive_names() {
        let table = table();
        let mut probe = Probe::default();

        table.set(&mut probe, "TITLE", vec!["hello".to_string()]).unwrap();
        assert_eq!(table.get(&probe, "Title").unwrap(), vec!["hello"]);
        assert!(table.contains("taglist"));
        assert_eq!(table.names(), &["title", "tagList"]);
    }

    #[test]
    fn test_unknown_field() {
        let table = table();
        let mut probe = Probe::default();
        let err = table.set(&mut probe, "missing", vec![]).unwrap_err();
        assert_eq!(err.kind(), "unknown_field");
    }

    #[test]
    fn test_transforms() {
        let table = table();
        let mut probe = Probe::default();
        let upper: &ValueTransform =
            &|v: Vec<String>| Ok(v.into_iter().map(|s| s.to_uppercase()).collect());

        table
            .set_with(&mut probe, "tagList", vec!["a".into(), "b".into()], Some(upper))
            .unwrap();
        assert_eq!(probe.tags, vec!["A", "B"]);

        let reject: &ValueTransform =
            &|_: Vec<String>| Err(DirError::NotationFormat("rejected".to_string()));
        assert!(table.get_with(&probe, "tagList", Some(reject)).is_err());
    }

    #[test]
    fn test_single_value_rules() {
        assert_eq!(single_value("x", vec![]).unwrap(), None);
        assert_eq!(single_value("x", vec!["  ".into()]).unwrap(), None);
        assert_eq!(single_value("x", vec![" v ".into()]).unwrap(), Some("v".to_string()));
        assert!(single_value("x", vec!["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn test_to_json_and_apply() {
        let table = table();
        let mut probe = Probe::default();
        let applied = table
            .apply(
                &mut probe,
                vec![
                    ("title", vec!["t".to_string()]),
                    ("tagList", vec!["a".to_string(), "b".to_string()]),
                    ("ignored", vec!["z".to_string()]),
                ],
            )
            .unwrap();

        assert_eq!(applied, 2);
        assert_eq!(
            table.to_json(&probe),
            serde_json::json!({"title": "t", "tagList": ["a", "b"]})
        );
    }
}
