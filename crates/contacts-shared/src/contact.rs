//! The contact record as exchanged between server, client and cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::ContactId;

/// A contact record.
///
/// Timestamps are assigned by the server. A provisional record created while
/// offline has none until it is replaced by the canonical one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Contact {
    /// Build a record without timestamps (provisional or optimistic copy).
    pub fn provisional(id: ContactId, input: &ContactInput) -> Self {
        Self {
            id,
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        self.id.is_temporary()
    }

    /// The user-editable fields of this record.
    pub fn input(&self) -> ContactInput {
        ContactInput {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    /// Copy of this record with the editable fields replaced.
    pub fn with_input(&self, input: &ContactInput) -> Self {
        Self {
            name: input.name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            ..self.clone()
        }
    }
}

/// Body of `POST /contacts` and `PUT /contacts/{id}`.
///
/// Absent fields decode as empty strings so that [`ContactInput::validate`]
/// reports them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl ContactInput {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    /// Presence check only: every field must be non-blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_input_is_valid() {
        let input = ContactInput::new("Ada", "ada@x.com", "123");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn blank_fields_are_rejected() {
        let input = ContactInput::new("Ada", "  ", "123");
        assert_eq!(
            input.validate(),
            Err(ValidationError::MissingField("email"))
        );

        let input = ContactInput::new("", "ada@x.com", "");
        assert_eq!(input.validate(), Err(ValidationError::MissingField("name")));
    }

    #[test]
    fn missing_json_fields_decode_as_empty() {
        let input: ContactInput = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(input.email, "");
        assert_eq!(input.validate(), Err(ValidationError::MissingField("email")));
    }

    #[test]
    fn provisional_record_has_no_timestamps() {
        let input = ContactInput::new("Ada", "ada@x.com", "123");
        let contact = Contact::provisional(ContactId::temporary(), &input);
        assert!(contact.is_provisional());
        assert!(contact.created_at.is_none());

        let json = serde_json::to_value(&contact).unwrap();
        assert!(json.get("updated_at").is_none());
    }

    #[test]
    fn with_input_keeps_identity_and_timestamps() {
        let contact = Contact {
            id: ContactId::from("7"),
            name: "Ada".into(),
            email: "ada@x.com".into(),
            phone: "123".into(),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        let edited = contact.with_input(&ContactInput::new("Ada L.", "ada@x.com", "456"));
        assert_eq!(edited.id, contact.id);
        assert_eq!(edited.created_at, contact.created_at);
        assert_eq!(edited.name, "Ada L.");
        assert_eq!(edited.phone, "456");
    }
}
