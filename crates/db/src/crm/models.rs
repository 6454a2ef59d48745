use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Gmail,
    Calendar,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Calendar => "calendar",
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "gmail" => Ok(Self::Gmail),
            "calendar" => Ok(Self::Calendar),
            _ => Err(format!("unknown source: {value}")),
        }
    }
}

/// Raw provider item keyed by (tenant, source, external id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceItem {
    pub tenant_id: Uuid,
    pub source: Source,
    pub external_id: String,
    pub external_updated_at: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub payload_hash: String,
}

/// Outcome of an upsert-if-changed: `changed` gates all downstream
/// contact/interaction derivation.
#[derive(Debug, Clone, Copy)]
pub struct ItemUpsert {
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Email,
    Meeting,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Meeting => "meeting",
        }
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "email" => Ok(Self::Email),
            "meeting" => Ok(Self::Meeting),
            _ => Err(format!("unknown interaction kind: {value}")),
        }
    }
}

/// Derived event; append-only, one row per newly changed source item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub contact_id: Uuid,
    pub kind: InteractionKind,
    pub occurred_at: DateTime<Utc>,
    pub subject: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Coverage {
    pub contacts: i64,
    pub interactions: i64,
    pub source_items: i64,
}
