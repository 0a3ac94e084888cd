//! Derived views over the recognition log: today's sightings and memory scores.

use crate::types::{Contact, RecognitionLog};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Log entries whose timestamp falls on `today` (UTC date prefix).
pub fn todays_logs(logs: &[RecognitionLog], today: NaiveDate) -> Vec<&RecognitionLog> {
    let prefix = today.format("%Y-%m-%d").to_string();
    logs.iter()
        .filter(|log| log.timestamp.starts_with(&prefix))
        .collect()
}

/// Latest sighting per contact, newest first, at most `limit` entries.
pub fn recently_seen(logs: &[RecognitionLog], limit: usize) -> Vec<&RecognitionLog> {
    let mut seen = HashSet::new();
    logs.iter()
        .filter(|log| seen.insert(log.contact_id.as_str()))
        .take(limit)
        .collect()
}

fn seen_count(logs: &[RecognitionLog], contact_id: &str) -> usize {
    logs.iter().filter(|l| l.contact_id == contact_id).count()
}

/// One row of the per-contact score list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactScore<'a> {
    pub contact: &'a Contact,
    pub score: i64,
    pub seen: usize,
}

/// Every contact that appears in the log at least once, in collection order.
pub fn per_contact<'a>(contacts: &'a [Contact], logs: &[RecognitionLog]) -> Vec<ContactScore<'a>> {
    contacts
        .iter()
        .filter_map(|contact| {
            let seen = seen_count(logs, &contact.id);
            (seen > 0).then(|| ContactScore {
                contact,
                score: contact.score(),
                seen,
            })
        })
        .collect()
}

/// Contacts with at least one log entry and a positive memory score.
pub fn contacts_with_logs<'a>(contacts: &'a [Contact], logs: &[RecognitionLog]) -> Vec<&'a Contact> {
    per_contact(contacts, logs)
        .into_iter()
        .filter(|row| row.score > 0)
        .map(|row| row.contact)
        .collect()
}

/// Average recognition rate in percent, rounded. 0 when nothing qualifies.
pub fn memory_percent(contacts: &[Contact], logs: &[RecognitionLog]) -> i64 {
    let rows: Vec<_> = per_contact(contacts, logs)
        .into_iter()
        .filter(|row| row.score > 0)
        .collect();
    let total_score: i64 = rows.iter().map(|r| r.score).sum();
    let total_seen: usize = rows.iter().map(|r| r.seen).sum();
    if total_seen == 0 {
        return 0;
    }
    (total_score as f64 / total_seen as f64 * 100.0).round() as i64
}
