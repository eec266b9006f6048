// src/models/credential.rs
//! Attribute, credential and presentation data model.
//!
//! These are the values an issuer shares through tickets:
//! - `Attribute`: a named personal attribute, optionally backed by a credential
//! - `Credential`: an issuer-held proof (e.g. a signed token), never shared
//! - `Presentation`: a shareable proof derived from a credential
//!
//! Each is stored in the zone as a JSON payload inside a typed record. Ids are
//! replaced by building a new value with `with_id`, never by editing bytes.

use crate::errors::Result;
use crate::models::identifier::Identifier;
use crate::models::record::{Expiration, Record, RecordType};
use crate::utils::serialization::{deserialize, serialize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A personal attribute of an identity.
///
/// Stored under the issuer's zone at the label of `id` as an ATTRIBUTE record.
///
/// # Fields
/// - `id`: Random identifier; also the attribute's address
/// - `credential_id`: Backing credential, or `Identifier::ZERO` if none
/// - `name`: Attribute name, e.g. "email"
/// - `attribute_type`: Library-defined type code of `data`
/// - `data`: Raw attribute value
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub id: Identifier,
    pub credential_id: Identifier,
    pub name: String,
    pub attribute_type: u32,
    pub data: Vec<u8>,
}

impl Attribute {
    /// Creates a plain (not credential-backed) attribute with a fresh id.
    pub fn new(name: &str, attribute_type: u32, data: &[u8]) -> Self {
        Attribute {
            id: Identifier::random(),
            credential_id: Identifier::ZERO,
            name: name.to_string(),
            attribute_type,
            data: data.to_vec(),
        }
    }

    /// Returns a copy of this attribute backed by `credential_id`.
    pub fn backed_by(mut self, credential_id: Identifier) -> Self {
        self.credential_id = credential_id;
        self
    }

    /// Returns a copy of this attribute with its id replaced.
    pub fn with_id(&self, id: Identifier) -> Self {
        Attribute { id, ..self.clone() }
    }

    pub fn is_credential_backed(&self) -> bool {
        !self.credential_id.is_zero()
    }

    /// Serializes into an ATTRIBUTE record payload.
    pub fn to_record_data(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn from_record_data(data: &[u8]) -> Result<Self> {
        deserialize(data)
    }

    /// Builds the ATTRIBUTE record stored at the label of `id`.
    pub fn to_record(&self, expiration: Expiration) -> Result<Record> {
        Ok(Record::new(RecordType::Attribute, self.to_record_data()?, expiration))
    }
}

/// An issuer-held credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id: Identifier,
    pub name: String,
    pub credential_type: u32,
    pub data: Vec<u8>,
}

impl Credential {
    pub fn new(name: &str, credential_type: u32, data: &[u8]) -> Self {
        Credential {
            id: Identifier::random(),
            name: name.to_string(),
            credential_type,
            data: data.to_vec(),
        }
    }

    /// Returns a copy of this credential with its id replaced.
    pub fn with_id(&self, id: Identifier) -> Self {
        Credential { id, ..self.clone() }
    }

    pub fn to_record_data(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn from_record_data(data: &[u8]) -> Result<Self> {
        deserialize(data)
    }
}

/// A shareable proof tied to a credential.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub credential_id: Identifier,
    pub presentation_type: u32,
    pub data: Vec<u8>,
}

impl Presentation {
    pub fn new(credential_id: Identifier, presentation_type: u32, data: &[u8]) -> Self {
        Presentation {
            credential_id,
            presentation_type,
            data: data.to_vec(),
        }
    }

    pub fn to_record_data(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn from_record_data(data: &[u8]) -> Result<Self> {
        deserialize(data)
    }
}

/// Ordered collection of attributes; order carries no meaning.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList(pub Vec<Attribute>);

impl AttributeList {
    pub fn new() -> Self {
        AttributeList(Vec::new())
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    /// Set of attribute ids in this list.
    pub fn ids(&self) -> BTreeSet<Identifier> {
        self.0.iter().map(|attr| attr.id).collect()
    }

    /// Set of distinct nonzero credential ids backing attributes in this list.
    pub fn credential_ids(&self) -> BTreeSet<Identifier> {
        self.0
            .iter()
            .filter(|attr| attr.is_credential_backed())
            .map(|attr| attr.credential_id)
            .collect()
    }
}

impl From<Vec<Attribute>> for AttributeList {
    fn from(attributes: Vec<Attribute>) -> Self {
        AttributeList(attributes)
    }
}

impl IntoIterator for AttributeList {
    type Item = Attribute;
    type IntoIter = std::vec::IntoIter<Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Ordered collection of presentations; order carries no meaning.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationList(pub Vec<Presentation>);

impl PresentationList {
    pub fn new() -> Self {
        PresentationList(Vec::new())
    }

    pub fn push(&mut self, presentation: Presentation) {
        self.0.push(presentation);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Presentation> {
        self.0.iter()
    }

    /// First presentation for `credential_id`, if any.
    pub fn find(&self, credential_id: &Identifier) -> Option<&Presentation> {
        self.0.iter().find(|p| &p.credential_id == credential_id)
    }
}

impl From<Vec<Presentation>> for PresentationList {
    fn from(presentations: Vec<Presentation>) -> Self {
        PresentationList(presentations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_id_keeps_content() {
        let attr = Attribute::new("email", 1, b"a@b.com");
        let new_id = Identifier::random();
        let moved = attr.with_id(new_id);
        assert_eq!(moved.id, new_id);
        assert_eq!(moved.name, attr.name);
        assert_eq!(moved.data, attr.data);
        assert_eq!(moved.credential_id, attr.credential_id);
        assert_ne!(attr.id, new_id);
    }

    #[test]
    fn test_credential_with_id() {
        let credential = Credential::new("jwt", 2, b"header.payload.sig");
        let new_id = Identifier::random();
        let moved = credential.with_id(new_id);
        assert_eq!(moved.id, new_id);
        assert_eq!(moved.data, credential.data);
    }

    #[test]
    fn test_record_payload_parses_back() {
        let credential_id = Identifier::random();
        let attr = Attribute::new("age", 1, b"42").backed_by(credential_id);
        let parsed = Attribute::from_record_data(&attr.to_record_data().unwrap()).unwrap();
        assert_eq!(parsed, attr);
        assert!(parsed.is_credential_backed());
    }

    #[test]
    fn test_credential_ids_are_distinct_and_nonzero() {
        let credential_id = Identifier::random();
        let list = AttributeList::from(vec![
            Attribute::new("a", 1, b"1").backed_by(credential_id),
            Attribute::new("b", 1, b"2").backed_by(credential_id),
            Attribute::new("c", 1, b"3"),
        ]);
        let ids = list.credential_ids();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&credential_id));
        assert_eq!(list.ids().len(), 3);
    }

    #[test]
    fn test_presentation_list_find() {
        let credential_id = Identifier::random();
        let list = PresentationList::from(vec![Presentation::new(credential_id, 1, b"proof")]);
        assert!(list.find(&credential_id).is_some());
        assert!(list.find(&Identifier::random()).is_none());
    }
}
