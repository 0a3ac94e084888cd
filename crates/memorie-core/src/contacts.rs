//! Write-through contact repository.
//!
//! Holds the in-memory mirror the UI reads from. Every mutation goes through
//! [`ContactRepository::commit`], which updates memory and then persists the
//! whole collection, so the two layers cannot drift.

use crate::remote::{ApiError, ContactSource};
use crate::store::Store;
use crate::types::{Contact, ContactUpdate, NewContact};
use chrono::{Local, NaiveTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Maximum length of the "recently seen" list.
pub const RECENT_LIMIT: usize = 4;

/// Separator between time and place in `last_seen`.
pub const LAST_SEEN_SEPARATOR: &str = " • ";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("{}", .0.message())]
    Api(ApiError),
}

/// Direction of a memory score change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreChange {
    Remembered,
    Forgot,
}

pub struct ContactRepository {
    store: Arc<Store>,
    contacts: Vec<Contact>,
    /// Ids of recently seen contacts, most recent first.
    recent: Vec<String>,
    loading: bool,
    error: Option<String>,
}

impl ContactRepository {
    /// Build the repository from the persisted copy. Never touches the network.
    pub fn hydrate(store: Arc<Store>) -> Self {
        let contacts = store.get_contacts();
        let recent = first_ids(&contacts);
        tracing::debug!(count = contacts.len(), "contacts hydrated from store");
        Self {
            store,
            contacts,
            recent,
            loading: false,
            error: None,
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Recently seen contacts, most recent first.
    pub fn recent(&self) -> Vec<&Contact> {
        self.recent.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message from the last failed refresh, cleared when a refresh starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Case-insensitive match on name or relationship.
    pub fn search(&self, term: &str) -> Vec<&Contact> {
        let needle = term.to_lowercase();
        self.contacts
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || c.relationship.to_lowercase().contains(&needle)
            })
            .collect()
    }

    fn commit(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
        self.recent.retain(|id| self.contacts.iter().any(|c| &c.id == id));
        self.store.set_contacts(&self.contacts);
    }

    /// Replace the collection with the server's trusted contacts for the signed-in user.
    ///
    /// On failure the error is recorded and existing state is left untouched.
    pub async fn refresh(&mut self, source: &dyn ContactSource) -> Result<usize, RefreshError> {
        self.loading = true;
        self.error = None;

        let result = self.fetch(source).await;
        self.loading = false;

        match result {
            Ok(contacts) => {
                let count = contacts.len();
                self.recent = first_ids(&contacts);
                self.commit(contacts);
                tracing::info!(count, "contacts refreshed from server");
                Ok(count)
            }
            Err(e) => {
                tracing::warn!(error = %e, "contact refresh failed");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch(&self, source: &dyn ContactSource) -> Result<Vec<Contact>, RefreshError> {
        let user = self
            .store
            .get_user()
            .filter(|u| !u.id.is_empty())
            .ok_or(RefreshError::NotAuthenticated)?;

        let trusted = source
            .get_trusted_contacts_by_user_id(&user.id)
            .await
            .map_err(RefreshError::Api)?;

        Ok(trusted.iter().map(Contact::from).collect())
    }

    /// Add a locally created contact. Does not call the network.
    pub fn add(&mut self, new: NewContact) -> Contact {
        let mut stamp = Utc::now().timestamp_millis();
        while self.get(&stamp.to_string()).is_some() {
            stamp += 1;
        }

        let contact = Contact {
            id: stamp.to_string(),
            name: new.name,
            relationship: new.relationship,
            avatar: new.avatar,
            last_seen: None,
            location: new.location,
            notes: new.notes,
            contact: new.contact,
            memory_score: None,
        };

        let mut contacts = self.contacts.clone();
        contacts.push(contact.clone());
        self.commit(contacts);
        tracing::info!(id = %contact.id, "contact added");
        contact
    }

    /// Shallow-merge `update` into the contact with `id`. Returns false if no such contact.
    pub fn update(&mut self, id: &str, update: &ContactUpdate) -> bool {
        let mut contacts = self.contacts.clone();
        let Some(target) = contacts.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        update.apply_to(target);
        self.commit(contacts);
        true
    }

    /// Remove the contact. The recent list restarts from the head of what remains.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.contacts.len();
        let contacts: Vec<Contact> = self.contacts.iter().filter(|c| c.id != id).cloned().collect();
        let removed = contacts.len() != before;
        self.recent = first_ids(&contacts);
        self.commit(contacts);
        if removed {
            tracing::info!(id, "contact deleted");
        }
        removed
    }

    /// Stamp `last_seen` with the current local time and promote the contact to the recent list.
    pub fn record_sighting(&mut self, id: &str, location: Option<&str>) -> bool {
        self.record_sighting_at(id, location, Local::now().time())
    }

    pub fn record_sighting_at(&mut self, id: &str, location: Option<&str>, at: NaiveTime) -> bool {
        let update = ContactUpdate {
            last_seen: Some(format_last_seen(at, location)),
            location: location.map(str::to_string),
            ..Default::default()
        };
        if !self.update(id, &update) {
            return false;
        }

        self.recent.retain(|r| r != id);
        self.recent.insert(0, id.to_string());
        self.recent.truncate(RECENT_LIMIT);
        true
    }

    /// Apply a memory score change through the store, then re-sync the mirror.
    pub fn apply_memory_score(&mut self, id: &str, change: ScoreChange) {
        match change {
            ScoreChange::Remembered => self.store.increment_memory_score(id),
            ScoreChange::Forgot => self.store.decrement_memory_score(id),
        }
        self.contacts = self.store.get_contacts();
    }
}

fn first_ids(contacts: &[Contact]) -> Vec<String> {
    contacts
        .iter()
        .take(RECENT_LIMIT)
        .map(|c| c.id.clone())
        .collect()
}

/// "9:05 AM • Park" or just "9:05 AM".
pub fn format_last_seen(at: NaiveTime, location: Option<&str>) -> String {
    let time = at.format("%-I:%M %p").to_string();
    match location {
        Some(place) => format!("{time}{LAST_SEEN_SEPARATOR}{place}"),
        None => time,
    }
}
