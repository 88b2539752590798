use iotlt_harvest::{
    EventRecord, Mode,
    table::{HEADERS, dedup_and_sort, escape_cell, render, write_table},
};
use proptest::prelude::*;
use tempfile::TempDir;

fn record(id: u32, date: &str, time_range: &str) -> EventRecord {
    EventRecord {
        event_url: format!("https://iotlt.connpass.com/event/{id}/"),
        volume_label: format!("vol.{id}"),
        event_type: "本体".to_string(),
        title: format!("IoTLT vol.{id}"),
        mode: Mode::Online,
        venue_name: "オンライン".to_string(),
        address: String::new(),
        tweet_urls: Vec::new(),
        slide_urls: Vec::new(),
        participants: 10,
        date: date.to_string(),
        weekday_ja: "金".to_string(),
        time_range: time_range.to_string(),
    }
}

#[cfg(test)]
mod escaping_tests {
    use super::*;

    #[test]
    fn test_pipe_is_replaced() {
        assert_eq!(escape_cell("A|B"), "A&#124;B");
    }

    #[test]
    fn test_line_breaks_become_spaces() {
        assert_eq!(escape_cell("line1\nline2\r\nline3"), "line1 line2 line3");
    }

    #[test]
    fn test_title_with_pipe_stays_in_one_cell() {
        let mut r = record(1, "2024/05/10", "19:00~21:00");
        r.title = "IoTLT | 特別回".to_string();
        let doc = render(&[r]);
        let row = doc.lines().nth(2).unwrap();
        assert!(row.contains("IoTLT &#124; 特別回"));
        assert_eq!(row.matches(" | ").count(), HEADERS.len() - 1);
    }
}

#[cfg(test)]
mod ordering_tests {
    use super::*;

    #[test]
    fn test_sorted_by_date_then_time_then_url() {
        let records = vec![
            record(3, "2024/06/01", "19:00~21:00"),
            record(2, "2024/05/10", "19:00~21:00"),
            record(1, "2024/05/10", "13:00~15:00"),
            record(4, "2024/05/10", "19:00~21:00"),
        ];
        let sorted = dedup_and_sort(records);
        let urls: Vec<&str> = sorted.iter().map(|r| r.event_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://iotlt.connpass.com/event/1/",
                "https://iotlt.connpass.com/event/2/",
                "https://iotlt.connpass.com/event/4/",
                "https://iotlt.connpass.com/event/3/",
            ]
        );
    }

    #[test]
    fn test_first_record_per_url_wins() {
        let mut later = record(1, "2024/05/10", "19:00~21:00");
        later.title = "duplicate".to_string();
        let sorted = dedup_and_sort(vec![record(1, "2024/05/10", "19:00~21:00"), later]);
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].title, "IoTLT vol.1");
    }
}

#[cfg(test)]
mod render_tests {
    use super::*;

    #[test]
    fn test_header_and_alignment_rows() {
        let doc = render(&[]);
        let mut lines = doc.lines();
        assert_eq!(
            lines.next().unwrap(),
            "| ID | Vol | 種別 | タイトル | 開催形式 | 会場 | 住所 | イベントURL | まとめ | スライド | 参加者数 | 日付 | 曜日 | 時間 |"
        );
        let alignment = lines.next().unwrap();
        assert_eq!(alignment.matches('|').count(), HEADERS.len() + 1);
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_row_layout() {
        let mut r = record(7, "2024/05/10", "19:00~21:00");
        r.mode = Mode::Hybrid;
        r.venue_name = "会議室A".to_string();
        r.address = "東京都渋谷区1-2-3".to_string();
        r.tweet_urls = vec!["https://togetter.com/li/1".to_string()];
        r.slide_urls = vec![
            "https://speakerdeck.com/a/b".to_string(),
            "https://www.docswell.com/s/c/d".to_string(),
        ];
        r.participants = 42;

        let doc = render(&[r]);
        assert_eq!(
            doc.lines().nth(2).unwrap(),
            "| 1 | vol.7 | 本体 | IoTLT vol.7 | オンライン / 対面 | 会議室A | 東京都渋谷区1-2-3 \
             | https://iotlt.connpass.com/event/7/ | https://togetter.com/li/1 \
             | https://speakerdeck.com/a/b<br>https://www.docswell.com/s/c/d | 42 \
             | 2024/05/10 | 金 | 19:00~21:00 |"
        );
    }

    #[test]
    fn test_ids_are_positional() {
        let doc = render(&[
            record(30, "2024/01/01", ""),
            record(10, "2024/02/01", ""),
        ]);
        let ids: Vec<&str> = doc
            .lines()
            .skip(2)
            .map(|l| l.split(" | ").next().unwrap().trim_start_matches("| "))
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}

#[test]
fn test_write_table_replaces_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("README.md");
    std::fs::write(&path, "old content that must disappear\n").unwrap();

    let records = vec![record(1, "2024/05/10", "19:00~21:00")];
    write_table(&path, &records).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render(&records));
    assert!(!written.contains("old content"));
}

#[test]
fn test_write_table_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docs").join("events.md");

    write_table(&path, &[]).unwrap();

    assert!(path.exists());
}

proptest! {
    #[test]
    fn prop_escaped_cells_never_break_the_row(text in "\\PC*") {
        let escaped = escape_cell(&text);
        prop_assert!(!escaped.contains('|'));
        prop_assert!(!escaped.contains('\n'));
        prop_assert!(!escaped.contains('\r'));
    }

    #[test]
    fn prop_sorted_output_is_unique_and_ordered(
        entries in prop::collection::vec((1u32..40, 1u32..29, 0u32..24), 0..30)
    ) {
        let records: Vec<EventRecord> = entries
            .iter()
            .map(|(id, day, hour)| {
                record(*id, &format!("2024/05/{day:02}"), &format!("{hour:02}:00~"))
            })
            .collect();

        let sorted = dedup_and_sort(records);

        for pair in sorted.windows(2) {
            prop_assert!(pair[0].sort_key() <= pair[1].sort_key());
            prop_assert_ne!(&pair[0].event_url, &pair[1].event_url);
        }
        let mut urls: Vec<&str> = sorted.iter().map(|r| r.event_url.as_str()).collect();
        urls.sort();
        urls.dedup();
        prop_assert_eq!(urls.len(), sorted.len());
    }
}
