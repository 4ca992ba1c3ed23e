//! In-memory remote used by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use contacts_shared::{Contact, ContactId, ContactInput};

use crate::error::ApiError;
use crate::remote::RemoteContactApi;

#[derive(Default)]
struct Inner {
    contacts: BTreeMap<String, Contact>,
    next_id: u64,
    calls: Vec<String>,
    script: VecDeque<Option<ApiError>>,
    down: bool,
}

/// Server stand-in. Ids start at 42. Each mutating or reading call first
/// consumes one entry of the failure script, if any.
pub(crate) struct MockRemote {
    inner: Mutex<Inner>,
}

impl MockRemote {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 42,
                ..Inner::default()
            }),
        }
    }

    /// Make every call fail with a connectivity error until cleared.
    pub(crate) fn set_down(&self, down: bool) {
        self.inner.lock().unwrap().down = down;
    }

    /// Let the next call succeed (`None`) or fail with the given error.
    pub(crate) fn script(&self, outcome: Option<ApiError>) {
        self.inner.lock().unwrap().script.push_back(outcome);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub(crate) fn seed(&self, name: &str) -> Contact {
        insert(&mut self.inner.lock().unwrap(), &input(name))
    }

    pub(crate) fn stored(&self) -> Vec<Contact> {
        self.inner.lock().unwrap().contacts.values().cloned().collect()
    }

    fn begin(&self, call: String) -> Result<std::sync::MutexGuard<'_, Inner>, ApiError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.down {
            return Err(ApiError::Connectivity("connection refused".into()));
        }
        inner.calls.push(call);
        if let Some(Some(error)) = inner.script.pop_front() {
            return Err(error);
        }
        Ok(inner)
    }
}

pub(crate) fn input(name: &str) -> ContactInput {
    ContactInput::new(name, format!("{}@x.com", name.to_lowercase()), "123")
}

fn insert(inner: &mut Inner, input: &ContactInput) -> Contact {
    let now = Utc::now();
    let id = ContactId::new(inner.next_id.to_string());
    inner.next_id += 1;
    let contact = Contact {
        created_at: Some(now),
        updated_at: Some(now),
        ..Contact::provisional(id, input)
    };
    inner
        .contacts
        .insert(contact.id.to_string(), contact.clone());
    contact
}

fn not_found() -> ApiError {
    ApiError::NotFound("Contact not found".into())
}

#[async_trait]
impl RemoteContactApi for MockRemote {
    async fn list(&self) -> Result<Vec<Contact>, ApiError> {
        let inner = self.begin("list".into())?;
        Ok(inner.contacts.values().cloned().collect())
    }

    async fn get(&self, id: &ContactId) -> Result<Contact, ApiError> {
        let inner = self.begin(format!("get {id}"))?;
        inner.contacts.get(id.as_str()).cloned().ok_or_else(not_found)
    }

    async fn create(&self, input: &ContactInput) -> Result<Contact, ApiError> {
        let mut inner = self.begin(format!("create {}", input.name))?;
        Ok(insert(&mut inner, input))
    }

    async fn update(&self, id: &ContactId, input: &ContactInput) -> Result<Contact, ApiError> {
        let mut inner = self.begin(format!("update {id}"))?;
        let existing = inner.contacts.get_mut(id.as_str()).ok_or_else(not_found)?;
        *existing = Contact {
            updated_at: Some(Utc::now()),
            ..existing.with_input(input)
        };
        Ok(existing.clone())
    }

    async fn delete(&self, id: &ContactId) -> Result<(), ApiError> {
        let mut inner = self.begin(format!("delete {id}"))?;
        inner
            .contacts
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(not_found)
    }

    async fn ping(&self) -> Result<(), ApiError> {
        if self.inner.lock().unwrap().down {
            Err(ApiError::Connectivity("connection refused".into()))
        } else {
            Ok(())
        }
    }
}
