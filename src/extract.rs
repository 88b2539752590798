//! Pattern-based field extractors for connpass event pages
//!
//! Every extractor is an independent pure function from page text to an optional
//! value. They share no state, so one can be fixed when the markup drifts without
//! touching the others.
//!
//! # Examples
//!
//! ```ignore
//! use iotlt_harvest::extract;
//!
//! let schedule = extract::extract_schedule(&html).ok_or(MissingDate)?;
//! let venue = extract::extract_venue(&html);
//! let mode = extract::infer_mode(&venue, &extract::extract_address(&html));
//! ```

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

use crate::{
    item::{MAIN_LINE_TYPE, Mode, OTHER_TYPE},
    links::{UrlNormalizer, decode_entities, known_domains, normalize_link},
};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

static SCRIPT_OR_STYLE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?is)<script\b.*?</script>|<style\b.*?</style>"));
static TAG: LazyLock<Regex> = LazyLock::new(|| regex(r"(?s)<[^>]*>"));

/// Remove markup and decode entities, leaving the visible text
pub fn strip_tags(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let text = TAG.replace_all(&without_code, " ");
    decode_entities(&text)
}

/// Collapse every run of whitespace (including full-width spaces) to one space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace full-width digits with their ASCII counterparts
pub fn normalize_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from(b'0' + (c as u32 - '０' as u32) as u8),
            _ => c,
        })
        .collect()
}

fn page_text(html: &str) -> String {
    collapse_whitespace(&normalize_digits(&strip_tags(html)))
}

fn inner_text(fragment: &str) -> String {
    collapse_whitespace(&strip_tags(fragment))
}

// ---------------------------------------------------------------------------
// Title

static EVENT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    regex(r#"(?is)<h2\b[^>]*class\s*=\s*["'][^"']*\bevent_title\b[^"']*["'][^>]*>(.*?)</h2>"#)
});
static DOCUMENT_TITLE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?is)<title\b[^>]*>(.*?)</title>"));

const TITLE_SITE_SUFFIX: &str = " - connpass";

/// Event heading, falling back to the document title
pub fn extract_title(html: &str) -> Option<String> {
    if let Some(title) = EVENT_TITLE
        .captures(html)
        .map(|c| inner_text(&c[1]))
        .filter(|t| !t.is_empty())
    {
        return Some(title);
    }

    DOCUMENT_TITLE
        .captures(html)
        .map(|c| inner_text(&c[1]))
        .map(|t| t.strip_suffix(TITLE_SITE_SUFFIX).map(str::to_string).unwrap_or(t))
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Date and time

/// Date, weekday and time range of an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// `YYYY/MM/DD`
    pub date: String,
    /// Single-character weekday such as `金`, or empty
    pub weekday: String,
    /// `HH:MM~HH:MM`, `HH:MM~` when only the start is known, or empty
    pub time_range: String,
}

const DATE: &str = r"(\d{4})/(\d{1,2})/(\d{1,2})";
const WEEKDAY: &str = r"\s*[(（]\s*([月火水木金土日])(?:曜日?)?\s*[)）]";
const TIME: &str = r"(\d{1,2}):(\d{2})";

static DATE_WEEKDAY_RANGE: LazyLock<Regex> =
    LazyLock::new(|| regex(&format!(r"{DATE}{WEEKDAY}\s*{TIME}\s*[~〜～\-－]\s*{TIME}")));
static DATE_WEEKDAY_START: LazyLock<Regex> =
    LazyLock::new(|| regex(&format!(r"{DATE}{WEEKDAY}\s*{TIME}")));
static DATE_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| regex(&format!(r"{DATE}{WEEKDAY}")));
static DATE_ONLY: LazyLock<Regex> = LazyLock::new(|| regex(DATE));

fn format_date(year: &str, month: &str, day: &str) -> Option<String> {
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{year}/{month:02}/{day:02}"))
}

fn format_time(hour: &str, minute: &str) -> String {
    let hour: u32 = hour.parse().unwrap_or_default();
    format!("{hour:02}:{minute}")
}

/// Event date with weekday and time range when the page provides them
///
/// Shapes are tried from most to least specific, so a page that lists both a full
/// schedule and a bare "updated" date yields the schedule.
pub fn extract_schedule(html: &str) -> Option<Schedule> {
    let text = page_text(html);

    if let Some(c) = DATE_WEEKDAY_RANGE.captures(&text)
        && let Some(date) = format_date(&c[1], &c[2], &c[3])
    {
        return Some(Schedule {
            date,
            weekday: c[4].to_string(),
            time_range: format!(
                "{}~{}",
                format_time(&c[5], &c[6]),
                format_time(&c[7], &c[8])
            ),
        });
    }

    if let Some(c) = DATE_WEEKDAY_START.captures(&text)
        && let Some(date) = format_date(&c[1], &c[2], &c[3])
    {
        return Some(Schedule {
            date,
            weekday: c[4].to_string(),
            time_range: format!("{}~", format_time(&c[5], &c[6])),
        });
    }

    if let Some(c) = DATE_WEEKDAY.captures(&text)
        && let Some(date) = format_date(&c[1], &c[2], &c[3])
    {
        return Some(Schedule {
            date,
            weekday: c[4].to_string(),
            time_range: String::new(),
        });
    }

    DATE_ONLY.captures_iter(&text).find_map(|c| {
        format_date(&c[1], &c[2], &c[3]).map(|date| Schedule {
            date,
            weekday: String::new(),
            time_range: String::new(),
        })
    })
}

// ---------------------------------------------------------------------------
// Venue and address

static VENUE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r#"(?is)<(?:p|div|span)\b[^>]*class\s*=\s*["'][^"']*\bplace_name\b[^"']*["'][^>]*>(.*?)</(?:p|div|span)>"#,
    )
});
static ADDRESS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r#"(?is)<(?:p|div|span)\b[^>]*class\s*=\s*["'][^"']*\badr\b[^"']*["'][^>]*>(.*?)</(?:p|div|span)>"#,
    )
});

/// Venue name, or an empty string when the page has none
pub fn extract_venue(html: &str) -> String {
    VENUE_BLOCK
        .captures(html)
        .map(|c| inner_text(&c[1]))
        .unwrap_or_default()
}

/// Street address, or an empty string when the page has none
pub fn extract_address(html: &str) -> String {
    ADDRESS_BLOCK
        .captures(html)
        .map(|c| inner_text(&c[1]))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Participants

static PARTICIPANT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"参加者\s*[（(]\s*(\d+)\s*人?\s*[)）]",
        r"参加者数\s*[:：]?\s*(\d+)",
        r"(\d+)\s*人\s*参加",
        r"申込者\s*[（(]\s*(\d+)\s*人?\s*[)）]",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

const NO_RSVP_MARKERS: &[&str] = &["申し込み不要", "申込不要"];

/// Participant count, `Some(0)` for events that need no RSVP
pub fn extract_participants(html: &str) -> Option<u32> {
    let text = page_text(html);

    for pattern in PARTICIPANT_PATTERNS.iter() {
        if let Some(count) = pattern
            .captures(&text)
            .and_then(|c| c[1].parse::<u32>().ok())
        {
            return Some(count);
        }
    }

    if NO_RSVP_MARKERS.iter().any(|m| text.contains(m)) {
        return Some(0);
    }

    None
}

// ---------------------------------------------------------------------------
// Mode

/// Japanese markers, matched anywhere in the text
const ONLINE_MARKERS: &[&str] = &["オンライン", "配信"];

// Service names only count as whole words: "Gathering" or "Remote" are venues
static ONLINE_SERVICES: LazyLock<Regex> = LazyLock::new(|| {
    regex(
        r"(?i)(?:^|[^a-z0-9])(?:zoom|youtube|teams|google\s*meet|meet\.google|discord|streamyard|ovice|gather|remo)(?:$|[^a-z0-9])",
    )
});

fn mentions_online(text: &str) -> bool {
    ONLINE_MARKERS.iter().any(|m| text.contains(m)) || ONLINE_SERVICES.is_match(text)
}

/// Derive how the event is held from its venue and address
pub fn infer_mode(venue: &str, address: &str) -> Mode {
    let venue = venue.trim();
    let address = address.trim();

    if venue.is_empty() && address.is_empty() {
        return Mode::Undecided;
    }

    let online = mentions_online(venue) || mentions_online(address);
    let in_person = if address.is_empty() {
        !venue.is_empty() && !mentions_online(venue)
    } else {
        !mentions_online(address)
    };

    match (online, in_person) {
        (true, true) => Mode::Hybrid,
        (true, false) => Mode::Online,
        _ => Mode::InPerson,
    }
}

// ---------------------------------------------------------------------------
// Series type and volume

static VOLUME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)vol\s*\.?\s*(\d+)",
        r"(?i)IoTLT\s*#\s*(\d+)",
        r"(?i)IoTLT\s*第\s*(\d+)\s*回",
        r"(?i)IoTLT\s*(\d{1,3})\b",
        r"第\s*(\d+)\s*回",
        r"#\s*(\d+)",
    ]
    .into_iter()
    .map(regex)
    .collect()
});

const BRAND: &str = "iotlt";

static BRAND_TOKEN: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)iotlt"));

// Ordinals glued to the brand ("第48回IoTLT", "vol48IoTLT") are not sub-brands
static LEADING_ORDINAL: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(?:第\d+回|(?i:vol)\d+|\d+)+"));

fn is_hiragana(c: char) -> bool {
    ('\u{3041}'..='\u{309f}').contains(&c)
}

/// Sub-brand labels such as `ヘルスケアIoTLT`, in title order
///
/// The prefix of each brand occurrence is the run of letters and digits right before
/// it. The run never reaches back past an earlier occurrence and stops at hiragana,
/// which in titles are particles ("IoTLTとヘルスケアIoTLT").
fn sub_brands(title: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut floor = 0;

    for brand in BRAND_TOKEN.find_iter(title) {
        let before = &title[floor..brand.start()];
        let start = before
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_alphanumeric() && !is_hiragana(*c))
            .last()
            .map_or(before.len(), |(i, _)| i);
        let prefix = LEADING_ORDINAL.replace(&before[start..], "");
        if !prefix.is_empty() {
            labels.push(format!("{prefix}{}", brand.as_str()));
        }
        floor = brand.end();
    }

    labels
}

/// Sequence label such as `vol.48`, or an empty string
pub fn infer_volume(title: &str) -> String {
    let title = normalize_digits(title);

    VOLUME_PATTERNS
        .iter()
        .find_map(|pattern| {
            pattern
                .captures(&title)
                .and_then(|c| c[1].parse::<u32>().ok())
        })
        .map(|n| format!("vol.{n}"))
        .unwrap_or_default()
}

/// Sub-brand label of the event, [`MAIN_LINE_TYPE`] or [`OTHER_TYPE`]
pub fn infer_event_type(title: &str) -> String {
    if !title.to_lowercase().contains(BRAND) {
        return OTHER_TYPE.to_string();
    }

    let mut seen = HashSet::new();
    let tokens: Vec<String> = sub_brands(title)
        .into_iter()
        .filter(|token| seen.insert(token.clone()))
        .collect();

    if tokens.is_empty() {
        MAIN_LINE_TYPE.to_string()
    } else {
        tokens.join("/")
    }
}

// ---------------------------------------------------------------------------
// Links

static HREF: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#));

static FREE_TEXT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    // Printable ASCII only, so Japanese text right after a URL is not swallowed
    const URL_CHARS: &str = r#"[\x21-\x7E&&[^"'<>\\]]"#;
    let hosts = known_domains()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|");
    regex(&format!(
        r"(?i)https?://{URL_CHARS}+|\b(?:[a-z0-9-]+\.)*(?:{hosts})/{URL_CHARS}*"
    ))
});

/// Every outbound link on the page, normalized and deduplicated
///
/// Anchor hrefs are collected first, then URLs written as plain text. The two
/// passes are merged in first-seen order.
pub fn extract_links(html: &str) -> Vec<String> {
    let text = strip_tags(html);
    let from_anchors = HREF.captures_iter(html).map(|c| c[1].to_string());
    let from_text = FREE_TEXT_LINK
        .find_iter(&text)
        .map(|m| m.as_str().to_string());

    let mut seen = HashSet::new();
    from_anchors
        .chain(from_text)
        .filter_map(|raw| normalize_link(&raw))
        .filter(|link| seen.insert(UrlNormalizer::normalize(link)))
        .collect()
}
