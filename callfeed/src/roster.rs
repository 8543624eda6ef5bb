//! Privileged user roster, keyed by messaging-platform numeric id.
//!
//! Entries are written to [`ROLES_COLLECTION`] and mirrored into [`LEGACY_USERS_COLLECTION`]
//! without any cross-record transaction.

use crate::{
    document::{Fields, RawDocument, parse_text, parse_timestamp},
    error::RejectReason,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use derive_more::Display;

pub const ROLES_COLLECTION: &str = "roles";
pub const LEGACY_USERS_COLLECTION: &str = "telegramUsers";

/// `addedBy` recorded when a document carries none.
pub const UNKNOWN_ADDED_BY: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Deserialize, Serialize, Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    #[display("CALLER")]
    Caller,
    #[display("SHOT_CALLER")]
    ShotCaller,
}

impl Role {
    /// Lenient parse: anything other than `SHOT_CALLER` (any case) is a plain caller.
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("SHOT_CALLER") {
            Role::ShotCaller
        } else {
            Role::Caller
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Caller => "CALLER",
            Role::ShotCaller => "SHOT_CALLER",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub added_by: String,
    pub added_at: Option<DateTime<Utc>>,
}

impl RosterEntry {
    pub fn new(user_id: i64, username: impl Into<String>, role: Role, added_by: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            added_by: added_by.into(),
            added_at: Some(Utc::now()),
        }
    }

    /// Decode a roster document. Older writers used `name` instead of `username`.
    pub fn from_document(document: &RawDocument) -> Result<Self, RejectReason> {
        let user_id = document
            .id
            .trim()
            .parse::<i64>()
            .map_err(|_| RejectReason::InvalidUserId)?;

        let username = document
            .first_of(&["username", "name"])
            .and_then(parse_text)
            .ok_or(RejectReason::MissingField("username"))?
            .trim_start_matches('@')
            .to_string();

        let role = document
            .get("role")
            .and_then(Value::as_str)
            .map(Role::parse)
            .unwrap_or_default();

        let added_by = document
            .get("addedBy")
            .and_then(parse_text)
            .unwrap_or(UNKNOWN_ADDED_BY)
            .to_string();

        Ok(Self {
            user_id,
            username,
            role,
            added_by,
            added_at: document.get("addedAt").and_then(parse_timestamp),
        })
    }

    /// Document id under which the entry is stored.
    pub fn document_id(&self) -> String {
        self.user_id.to_string()
    }

    /// Document body, also carrying `name` for readers of the legacy shape.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("username".to_string(), Value::from(self.username.as_str()));
        fields.insert("name".to_string(), Value::from(self.username.as_str()));
        fields.insert("role".to_string(), Value::from(self.role.as_str()));
        fields.insert("addedBy".to_string(), Value::from(self.added_by.as_str()));
        if let Some(added_at) = self.added_at {
            fields.insert("addedAt".to_string(), Value::from(added_at.to_rfc3339()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(id: &str, fields: Value) -> RawDocument {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        RawDocument::new(id.to_string(), fields)
    }

    #[test]
    fn test_role_parse() {
        struct TestCase {
            input: &'static str,
            expected: Role,
        }

        let tests = vec![
            TestCase {
                // TC0: exact shot caller
                input: "SHOT_CALLER",
                expected: Role::ShotCaller,
            },
            TestCase {
                // TC1: lowercase shot caller
                input: "shot_caller",
                expected: Role::ShotCaller,
            },
            TestCase {
                // TC2: caller
                input: "caller",
                expected: Role::Caller,
            },
            TestCase {
                // TC3: unrecognised role falls back to caller
                input: "ADMIN",
                expected: Role::Caller,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            assert_eq!(Role::parse(test.input), test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_role_display_matches_wire_name() {
        assert_eq!(Role::Caller.to_string(), "CALLER");
        assert_eq!(Role::ShotCaller.to_string(), "SHOT_CALLER");
        assert_eq!(Role::parse(&Role::ShotCaller.to_string()), Role::ShotCaller);
    }

    #[test]
    fn test_roster_entry_from_document() {
        let entry = document(
            "191059284",
            json!({"name": "@bizonacci", "role": "shot_caller", "addedAt": {"seconds": 1744906800}}),
        );
        let entry = RosterEntry::from_document(&entry).unwrap();

        assert_eq!(entry.user_id, 191059284);
        assert_eq!(entry.username, "bizonacci");
        assert_eq!(entry.role, Role::ShotCaller);
        assert_eq!(entry.added_by, UNKNOWN_ADDED_BY);
        assert_eq!(entry.added_at, DateTime::from_timestamp(1744906800, 0));
    }

    #[test]
    fn test_roster_entry_rejects_non_numeric_id() {
        let entry = document("bizonacci", json!({"username": "bizonacci", "role": "CALLER"}));
        assert_eq!(RosterEntry::from_document(&entry), Err(RejectReason::InvalidUserId));

        let entry = document("374435895", json!({"role": "CALLER"}));
        assert_eq!(
            RosterEntry::from_document(&entry),
            Err(RejectReason::MissingField("username"))
        );
    }

    #[test]
    fn test_roster_entry_to_fields() {
        let entry = RosterEntry {
            user_id: 52381180,
            username: "ohcharlie".to_string(),
            role: Role::Caller,
            added_by: "admin-panel".to_string(),
            added_at: None,
        };
        let fields = entry.to_fields();

        assert_eq!(entry.document_id(), "52381180");
        assert_eq!(fields.get("username"), Some(&json!("ohcharlie")));
        assert_eq!(fields.get("name"), Some(&json!("ohcharlie")));
        assert_eq!(fields.get("role"), Some(&json!("CALLER")));
        assert_eq!(fields.get("addedBy"), Some(&json!("admin-panel")));
        assert!(!fields.contains_key("addedAt"));

        let decoded = RosterEntry::from_document(&RawDocument::new(entry.document_id(), fields)).unwrap();
        assert_eq!(decoded, entry);
    }
}
