use std::collections::BTreeMap;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::{
    entities::{actor::Actor, status::ComplaintStatus},
    geo::Coordinates,
};

pub const STATUS_ACTION_PREFIX: &str = "Status Updated to ";
pub const EDIT_ACTION: &str = "Complaint Edited";
pub const CREATE_ACTION: &str = "Complaint Created";

fn now() -> DateTime {
    DateTime::now()
}

/// One immutable record in a complaint's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLogEntry {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default = "now")]
    pub timestamp: DateTime,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<ObjectId>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_from_original: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<BTreeMap<String, String>>,
}

impl UpdateLogEntry {
    pub fn new(action: impl Into<String>, actor: &Actor, description: impl Into<String>) -> Self {
        Self {
            id: Some(ObjectId::new()),
            timestamp: DateTime::now(),
            action: action.into(),
            user: actor.display_name(),
            user_id: actor.id,
            description: description.into(),
            after_photo: None,
            location: None,
            distance_from_original: None,
            changes: None,
        }
    }

    pub fn status_action(status: ComplaintStatus) -> String {
        format!("{}{}", STATUS_ACTION_PREFIX, status.label())
    }

    pub fn with_evidence(mut self, after_photo: String) -> Self {
        self.after_photo = Some(after_photo);
        self
    }

    pub fn with_location(mut self, location: Coordinates, distance: String) -> Self {
        self.location = Some(location);
        self.distance_from_original = Some(distance);
        self
    }

    pub fn with_changes(mut self, changes: BTreeMap<String, String>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Status written by this entry, if it is a status update.
    pub fn target_status(&self) -> Option<ComplaintStatus> {
        self.action
            .strip_prefix(STATUS_ACTION_PREFIX)
            .and_then(|label| label.trim().parse().ok())
    }

    /// A status update that closed the complaint and carries an after-photo.
    pub fn is_completion_evidence(&self) -> bool {
        self.after_photo.is_some()
            && self
                .target_status()
                .map_or(false, |status| status.is_terminal())
    }
}

/// Append-only, chronologically ordered audit trail.
///
/// Entries can only be added at the end; there is no way to reorder, edit
/// or drop one once it is in the log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateLog(Vec<UpdateLogEntry>);

impl UpdateLog {
    pub fn append(&mut self, entry: UpdateLogEntry) {
        self.0.push(entry);
    }

    pub fn append_all(&mut self, entries: impl IntoIterator<Item = UpdateLogEntry>) {
        self.0.extend(entries);
    }

    pub fn entries(&self) -> &[UpdateLogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&UpdateLogEntry> {
        self.0.last()
    }

    /// Last entry, in log order, that satisfies `predicate`.
    pub fn find_latest<P>(&self, predicate: P) -> Option<&UpdateLogEntry>
    where
        P: Fn(&UpdateLogEntry) -> bool,
    {
        self.0.iter().rev().find(|entry| predicate(entry))
    }

    pub fn completion_evidence(&self) -> Option<&UpdateLogEntry> {
        self.find_latest(UpdateLogEntry::is_completion_evidence)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson;

    use super::*;

    fn actor() -> Actor {
        Actor::new(ObjectId::new(), "volunteer")
    }

    fn status_entry(status: ComplaintStatus, photo: Option<&str>) -> UpdateLogEntry {
        let entry = UpdateLogEntry::new(UpdateLogEntry::status_action(status), &actor(), "work");
        match photo {
            Some(photo) => entry.with_evidence(photo.to_string()),
            None => entry,
        }
    }

    #[test]
    fn target_status_is_read_from_action() {
        let entry = status_entry(ComplaintStatus::PartialCompleted, None);
        assert_eq!(entry.action, "Status Updated to Partial-completed");
        assert_eq!(entry.target_status(), Some(ComplaintStatus::PartialCompleted));

        let edit = UpdateLogEntry::new(EDIT_ACTION, &actor(), "");
        assert_eq!(edit.target_status(), None);
    }

    #[test]
    fn partial_completion_is_not_completion_evidence() {
        assert!(!status_entry(ComplaintStatus::PartialCompleted, Some("p")).is_completion_evidence());
        assert!(!status_entry(ComplaintStatus::COMPLETED, None).is_completion_evidence());
        assert!(status_entry(ComplaintStatus::COMPLETED, Some("p")).is_completion_evidence());
        assert!(status_entry(ComplaintStatus::RESOLVED, Some("p")).is_completion_evidence());
    }

    #[test]
    fn find_latest_returns_last_match() {
        let mut log = UpdateLog::default();
        log.append(status_entry(ComplaintStatus::COMPLETED, Some("first")));
        log.append(status_entry(ComplaintStatus::InProgress, Some("between")));
        log.append(status_entry(ComplaintStatus::RESOLVED, Some("second")));
        log.append(status_entry(ComplaintStatus::COMPLETED, None));

        let found = log.completion_evidence().unwrap();
        assert_eq!(found.after_photo.as_deref(), Some("second"));
        assert!(log.find_latest(|entry| entry.action == "nothing").is_none());
    }

    #[test]
    fn append_all_keeps_order() {
        let mut log = UpdateLog::default();
        log.append(status_entry(ComplaintStatus::Pending, None));
        let first = log.entries()[0].clone();

        log.append_all(vec![
            status_entry(ComplaintStatus::InProgress, None),
            status_entry(ComplaintStatus::COMPLETED, None),
        ]);

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[0], first);
        assert_eq!(log.last().and_then(UpdateLogEntry::target_status), Some(ComplaintStatus::COMPLETED));
    }

    #[test]
    fn stored_field_names_are_preserved() {
        let entry = status_entry(ComplaintStatus::COMPLETED, Some("photo"))
            .with_location(Coordinates::new(19.0, 72.0), "0.030 km".to_string());
        let doc = bson::to_document(&entry).unwrap();

        for field in ["timestamp", "action", "user", "userId", "description", "afterPhoto", "location", "distanceFromOriginal"] {
            assert!(doc.contains_key(field), "missing {field}");
        }
        assert!(!doc.contains_key("changes"));
        assert_eq!(doc.get_document("location").unwrap().get_f64("lng").unwrap(), 72.0);
    }

    #[test]
    fn legacy_entry_without_timestamp_gets_one() {
        let entry: UpdateLogEntry = bson::from_document(bson::doc! {
            "action": CREATE_ACTION,
            "user": "Legacy User",
            "userId": null,
        })
        .unwrap();
        assert_eq!(entry.user_id, None);
        assert!(entry.timestamp.timestamp_millis() > 0);
    }
}
