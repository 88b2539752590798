//! Markdown table rendering
//!
//! The document is always rebuilt from scratch: deduplicate, sort, render, replace.
//! Column order and escaping are the contract with whatever reads the table back.

use std::{collections::HashSet, path::Path};

use crate::{EventRecord, HarvestError, cache::write_atomic};

/// Column headers, in order
pub const HEADERS: [&str; 14] = [
    "ID",
    "Vol",
    "種別",
    "タイトル",
    "開催形式",
    "会場",
    "住所",
    "イベントURL",
    "まとめ",
    "スライド",
    "参加者数",
    "日付",
    "曜日",
    "時間",
];

const ALIGNMENT: [&str; 14] = [
    "---:", ":---", ":---", ":---", ":---", ":---", ":---", ":---", ":---", ":---", "---:",
    ":---:", ":---:", ":---:",
];

/// Separator between the links of a multi-valued cell
pub const LINE_BREAK: &str = "<br>";

/// How the output document is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Regenerate the whole document
    #[default]
    Rebuild,
    /// Append rows for events not yet in the document (not supported)
    Append,
}

/// Keep the first record per event URL and order by date, time, then URL
pub fn dedup_and_sort(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut seen = HashSet::new();
    let mut unique: Vec<EventRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.event_url.clone()))
        .collect();
    unique.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    unique
}

/// Make `text` safe to place inside a table cell
pub fn escape_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "&#124;")
        .trim()
        .to_string()
}

fn join_links(links: &[String]) -> String {
    links
        .iter()
        .map(|l| escape_cell(l))
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

fn row(id: usize, record: &EventRecord) -> String {
    let cells = [
        id.to_string(),
        escape_cell(&record.volume_label),
        escape_cell(&record.event_type),
        escape_cell(&record.title),
        escape_cell(record.mode.label()),
        escape_cell(&record.venue_name),
        escape_cell(&record.address),
        escape_cell(&record.event_url),
        join_links(&record.tweet_urls),
        join_links(&record.slide_urls),
        record.participants.to_string(),
        escape_cell(&record.date),
        escape_cell(&record.weekday_ja),
        escape_cell(&record.time_range),
    ];
    format!("| {} |", cells.join(" | "))
}

/// Render the full document for records already deduplicated and sorted
///
/// Ids are positional and start at 1.
pub fn render(records: &[EventRecord]) -> String {
    let mut out = String::new();
    out.push_str(&format!("| {} |\n", HEADERS.join(" | ")));
    out.push_str(&format!("|{}|\n", ALIGNMENT.join("|")));
    for (i, record) in records.iter().enumerate() {
        out.push_str(&row(i + 1, record));
        out.push('\n');
    }
    out
}

/// Replace the document at `path` with the rendered table
pub fn write_table(path: &Path, records: &[EventRecord]) -> Result<(), HarvestError> {
    write_atomic(path, render(records).as_bytes()).map_err(|source| HarvestError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Wrote {} events to {}", records.len(), path.display());
    Ok(())
}
