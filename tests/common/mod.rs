#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use iotlt_harvest::{HarvestError, HttpBackend, Page, ProbeMethod};

pub const BASE_URL: &str = "https://iotlt.connpass.com";

pub fn event_url(id: u32) -> String {
    format!("{BASE_URL}/event/{id}/")
}

#[derive(Clone)]
enum Reply {
    Page(u16, String),
    Fail,
}

/// In-memory backend: unknown pages answer 404, unknown probes fail
#[derive(Default)]
pub struct FakeBackend {
    pages: Mutex<HashMap<String, Reply>>,
    redirects: Mutex<HashMap<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn page(&self, url: &str, status: u16, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), Reply::Page(status, body.to_string()));
    }

    pub fn fail(&self, url: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), Reply::Fail);
    }

    pub fn redirect(&self, from: &str, to: &str) {
        self.redirects
            .lock()
            .unwrap()
            .insert(from.to_string(), to.to_string());
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str, url: &str) -> usize {
        let needle = format!("{prefix} {url}");
        self.requests().iter().filter(|r| **r == needle).count()
    }

    fn log(&self, entry: String) {
        self.requests.lock().unwrap().push(entry);
    }

    fn reply(&self, url: &str) -> Result<Page, HarvestError> {
        match self.pages.lock().unwrap().get(url).cloned() {
            Some(Reply::Page(status, body)) => Ok(Page::new(status, url, body)),
            Some(Reply::Fail) => Err(HarvestError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            }),
            None => Ok(Page::new(404, url, "<title>Not Found</title>")),
        }
    }
}

#[async_trait::async_trait]
impl HttpBackend for FakeBackend {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<Page, HarvestError> {
        self.log(format!("GET {url}"));
        self.reply(url)
    }

    async fn get_prefix(
        &self,
        url: &str,
        max_bytes: usize,
        _timeout: Duration,
    ) -> Result<Page, HarvestError> {
        self.log(format!("RANGE {url}"));
        let mut page = self.reply(url)?;
        if page.body.len() > max_bytes {
            let mut cut = max_bytes;
            while !page.body.is_char_boundary(cut) {
                cut -= 1;
            }
            page.body.truncate(cut);
        }
        Ok(page)
    }

    async fn probe(
        &self,
        url: &str,
        method: ProbeMethod,
        _timeout: Duration,
    ) -> Result<Page, HarvestError> {
        let verb = match method {
            ProbeMethod::Head => "HEAD",
            ProbeMethod::Get => "PROBE",
        };
        self.log(format!("{verb} {url}"));
        match self.redirects.lock().unwrap().get(url) {
            Some(target) => Ok(Page::new(200, target.clone(), "")),
            None => Err(HarvestError::Transport {
                url: url.to_string(),
                message: "timed out".to_string(),
            }),
        }
    }
}

/// Fields of a synthetic connpass detail page
pub struct DetailPage<'a> {
    pub title: &'a str,
    pub schedule: &'a str,
    pub venue: Option<&'a str>,
    pub address: Option<&'a str>,
    pub participants: &'a str,
    pub body: &'a str,
}

impl Default for DetailPage<'_> {
    fn default() -> Self {
        Self {
            title: "IoTLT vol.100",
            schedule: "2024/05/10(金) 19:00 〜 21:00",
            venue: None,
            address: None,
            participants: "参加者（42人）",
            body: "",
        }
    }
}

impl DetailPage<'_> {
    pub fn render(&self) -> String {
        let venue = self
            .venue
            .map(|v| format!(r#"<p class="place_name">{v}</p>"#))
            .unwrap_or_default();
        let address = self
            .address
            .map(|a| format!(r#"<p class="adr">{a}</p>"#))
            .unwrap_or_default();
        format!(
            r#"<html><head><title>{title} - connpass</title></head>
<body>
<h2 class="event_title">{title}</h2>
<div class="event_schedule_area"><p class="ymd">{schedule}</p></div>
<div class="event_place_area">{venue}{address}</div>
<div class="participation_table_area"><p>{participants}</p></div>
<div class="event_description">{body}</div>
</body></html>"#,
            title = self.title,
            schedule = self.schedule,
            participants = self.participants,
            body = self.body,
        )
    }
}

/// A listing page announcing `total` events and linking `ids`
pub fn list_page(total: u32, ids: &[u32]) -> String {
    let blocks: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="event_list vevent"><a class="summary url" href="{}">event {id}</a></div>"#,
                event_url(*id)
            )
        })
        .collect();
    format!(
        r#"<html><body><p class="main_h2 event_count"><span class="amount"><span>{total}</span>件</span></p>{blocks}</body></html>"#
    )
}

pub fn slide_page(title: &str) -> String {
    format!("<html><head><title>{title}</title></head><body>deck</body></html>")
}
