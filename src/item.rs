//! The event record produced for every detail page
//!
//! One [`EventRecord`] becomes one row of the markdown table. Records are identified
//! by their canonical `event_url`; every other field is derived from the page.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an event is held, derived from its venue and address text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Neither venue nor address is known yet
    Undecided,
    Online,
    InPerson,
    /// Held at a venue and streamed at the same time
    Hybrid,
}

impl Mode {
    /// The label written into the table
    pub fn label(self) -> &'static str {
        match self {
            Mode::Undecided => "未定",
            Mode::Online => "オンライン",
            Mode::InPerson => "対面",
            Mode::Hybrid => "オンライン / 対面",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Event type used when the title names the series without a sub-brand
pub const MAIN_LINE_TYPE: &str = "本体";

/// Event type used when the title does not mention the series at all
pub const OTHER_TYPE: &str = "その他";

/// One harvested event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Canonical detail-page URL, unique across the dataset
    pub event_url: String,
    /// Series sequence number such as `vol.12`, or empty
    pub volume_label: String,
    /// Sub-brand label, [`MAIN_LINE_TYPE`] or [`OTHER_TYPE`]
    pub event_type: String,
    pub title: String,
    pub mode: Mode,
    pub venue_name: String,
    pub address: String,
    /// Tweet-summary links in discovery order
    pub tweet_urls: Vec<String>,
    /// Validated slide links in discovery order
    pub slide_urls: Vec<String>,
    pub participants: u32,
    /// `YYYY/MM/DD`
    pub date: String,
    pub weekday_ja: String,
    /// `HH:MM~HH:MM`, `HH:MM~` or empty
    pub time_range: String,
}

impl EventRecord {
    /// Key used to order records in the table
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.date, &self.time_range, &self.event_url)
    }
}
