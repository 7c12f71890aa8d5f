use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Represents a saved bookmark owned by a single user.
///
/// The `id` is chosen by the client at creation time and doubles as the
/// idempotency key when the backend echoes the insert back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    pub user_id: String,
    /// UNIX seconds. Accepts an RFC 3339 string on input, as the hosted
    /// backend sends `timestamptz` columns that way.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: i64,
}

impl Bookmark {
    /// Returns true when every required field is present and non-empty.
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && !self.title.is_empty() && !self.url.is_empty() && !self.user_id.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Seconds(i64),
    Fractional(f64),
    Text(String),
}

/// Reads `created_at` from an integer, a float, or an RFC 3339 / numeric
/// string. An unparseable string falls back to the current time since the
/// field is only used for display.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Seconds(secs) => secs,
        RawTimestamp::Fractional(secs) => secs as i64,
        RawTimestamp::Text(text) => chrono::DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.timestamp())
            .or_else(|_| text.trim().parse::<i64>())
            .unwrap_or_else(|_| {
                tracing::debug!(value = %text, "unparseable created_at; using current time");
                chrono::Utc::now().timestamp()
            }),
    };
    Ok(seconds)
}

/// A decoded change notification from the backend's change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Insert(Bookmark),
    Delete { id: String },
}

/// Table name carried by bookmark change payloads.
pub const BOOKMARKS_TABLE: &str = "bookmarks";

impl ChangeEvent {
    /// Decodes a raw change payload.
    ///
    /// Payloads follow the hosted backend's shape:
    /// `{"eventType":"INSERT","table":"bookmarks","new":{..},"old":{..}}`.
    /// Returns `None` for anything that is not a well-formed bookmark
    /// insert or delete.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        if let Some(table) = payload.get("table").and_then(|v| v.as_str()) {
            if table != BOOKMARKS_TABLE {
                return None;
            }
        }

        match payload.get("eventType").and_then(|v| v.as_str())? {
            "INSERT" => {
                let record = payload.get("new")?.clone();
                let bookmark: Bookmark = serde_json::from_value(record).ok()?;
                if !bookmark.is_well_formed() {
                    return None;
                }
                Some(ChangeEvent::Insert(bookmark))
            }
            "DELETE" => {
                let id = payload.get("old")?.get("id")?.as_str()?;
                if id.is_empty() {
                    return None;
                }
                Some(ChangeEvent::Delete { id: id.to_string() })
            }
            _ => None,
        }
    }

    /// Encodes the event into the wire payload shape accepted by `from_payload`.
    pub fn to_payload(&self) -> Value {
        match self {
            ChangeEvent::Insert(bookmark) => serde_json::json!({
                "eventType": "INSERT",
                "table": BOOKMARKS_TABLE,
                "new": bookmark,
                "old": {},
            }),
            ChangeEvent::Delete { id } => serde_json::json!({
                "eventType": "DELETE",
                "table": BOOKMARKS_TABLE,
                "new": {},
                "old": { "id": id },
            }),
        }
    }

    /// Returns the bookmark id this event refers to.
    pub fn id(&self) -> &str {
        match self {
            ChangeEvent::Insert(bookmark) => &bookmark.id,
            ChangeEvent::Delete { id } => id,
        }
    }
}
