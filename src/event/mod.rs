//! Community events with attendance tracking.

pub mod api;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Ongoing,
    Completed,
    Cancelled,
}

impl Default for EventStatus {
    fn default() -> Self {
        EventStatus::Upcoming
    }
}

/// A scheduled community event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Calendar day of the event; `time` holds the free-form start time.
    pub date: DateTime<Utc>,
    pub time: String,
    pub location: String,
    pub community: String,
    pub creator: String,
    /// User IDs attending. Toggle semantics; see the attend endpoint.
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: String,
        description: String,
        date: DateTime<Utc>,
        time: String,
        location: String,
        community: String,
        creator: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description,
            date,
            time,
            location,
            community,
            creator,
            attendees: Vec::new(),
            status: EventStatus::Upcoming,
            created_at: Utc::now(),
        }
    }
}
