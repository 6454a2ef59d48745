use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

// ── Gmail wire types ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessageList {
    #[serde(default)]
    pub messages: Vec<GmailMessageRef>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailMessageRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    /// Epoch milliseconds, serialized as a string by the API.
    pub internal_date: Option<String>,
    #[serde(default)]
    pub snippet: String,
    pub payload: Option<GmailPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailPayload {
    #[serde(default)]
    pub headers: Vec<GmailHeader>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GmailHeader {
    pub name: String,
    pub value: String,
}

impl GmailMessage {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref()?.headers.iter().find_map(|h| {
            if h.name.eq_ignore_ascii_case(name) {
                Some(h.value.as_str())
            } else {
                None
            }
        })
    }

    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        let millis: i64 = self.internal_date.as_deref()?.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

/// Split an RFC 5322 mailbox like `Alex Example <alex@example.com>` into
/// (email, display name). A bare address doubles as its own name.
pub fn parse_mailbox(value: &str) -> Option<(String, String)> {
    let value = value.trim();
    if let Some(open) = value.rfind('<') {
        let close = value.rfind('>')?;
        if close <= open + 1 {
            return None;
        }
        let email = value[open + 1..close].trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return None;
        }
        let name = value[..open].trim().trim_matches('"').trim().to_string();
        let name = if name.is_empty() { email.clone() } else { name };
        return Some((email, name));
    }

    if value.contains('@') && !value.contains(char::is_whitespace) {
        return Some((value.to_string(), value.to_string()));
    }
    None
}

// ── Calendar wire types ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventList {
    #[serde(default)]
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: String,
    pub organizer: Option<CalendarOrganizer>,
    pub start: Option<CalendarEventTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarOrganizer {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEventTime {
    pub date_time: Option<DateTime<Utc>>,
    /// All-day events carry a bare `YYYY-MM-DD` date instead.
    pub date: Option<String>,
}

impl CalendarEventTime {
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        if let Some(at) = self.date_time {
            return Some(at);
        }
        let date: NaiveDate = self.date.as_deref()?.parse().ok()?;
        Some(date.and_hms_opt(0, 0, 0)?.and_utc())
    }
}
