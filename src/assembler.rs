//! Builds one [`EventRecord`] from one event detail page

use std::{collections::HashSet, sync::Arc};

use crate::{
    EventRecord, ExtractionError, HarvestError, HttpBackend, SlideCache,
    crawler::Timeouts,
    extract,
    links::{LinkKind, UrlNormalizer, canonical_event_url, classify, normalize_link},
    resolver::ShortenerResolver,
    validator::SlideValidator,
};

/// Runs extractors, resolver and validator against a detail page
pub struct EventAssembler {
    backend: Arc<dyn HttpBackend>,
    timeouts: Timeouts,
    resolver: ShortenerResolver,
    validator: SlideValidator,
}

impl EventAssembler {
    pub fn new(backend: Arc<dyn HttpBackend>, timeouts: Timeouts) -> Self {
        Self {
            resolver: ShortenerResolver::new(backend.clone(), timeouts.shortener),
            validator: SlideValidator::new(backend.clone(), timeouts.slide),
            backend,
            timeouts,
        }
    }

    /// Fetch and assemble the event at `detail_url`
    ///
    /// Fails when the page does not answer 200, has no date, or declares no
    /// participant count on either the page or its participation page. Every other
    /// missing field degrades to an empty value.
    pub async fn assemble(
        &self,
        cache: &mut SlideCache,
        detail_url: &str,
    ) -> Result<EventRecord, HarvestError> {
        let event_url =
            canonical_event_url(detail_url).unwrap_or_else(|| detail_url.trim().to_string());

        let page = self.backend.get(&event_url, self.timeouts.detail).await?;
        if !page.is_ok() {
            return Err(HarvestError::Status {
                url: event_url,
                status: page.status,
            });
        }
        let html = page.body;

        let schedule =
            extract::extract_schedule(&html).ok_or_else(|| ExtractionError::MissingDate {
                url: event_url.clone(),
            })?;

        let participants = match extract::extract_participants(&html) {
            Some(count) => count,
            None => self.participants_fallback(&event_url).await?,
        };

        let title = extract::extract_title(&html).unwrap_or_default();
        let venue_name = extract::extract_venue(&html);
        let address = extract::extract_address(&html);
        let (tweet_urls, slide_urls) = self.collect_links(cache, &html).await;

        Ok(EventRecord {
            volume_label: extract::infer_volume(&title),
            event_type: extract::infer_event_type(&title),
            mode: extract::infer_mode(&venue_name, &address),
            event_url,
            title,
            venue_name,
            address,
            tweet_urls,
            slide_urls,
            participants,
            date: schedule.date,
            weekday_ja: schedule.weekday,
            time_range: schedule.time_range,
        })
    }

    /// Read the count from the participation sub-page
    ///
    /// A sub-page that does not answer 200 (or does not answer at all) counts as 0.
    async fn participants_fallback(&self, event_url: &str) -> Result<u32, HarvestError> {
        let url = format!("{}/participation/", event_url.trim_end_matches('/'));
        tracing::debug!("No participant count on {}, trying {}", event_url, url);

        let page = match self.backend.get(&url, self.timeouts.participation).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("{}, assuming 0 participants", e);
                return Ok(0);
            }
        };
        if !page.is_ok() {
            tracing::info!("{} answered {}, assuming 0 participants", url, page.status);
            return Ok(0);
        }

        extract::extract_participants(&page.body).ok_or_else(|| {
            ExtractionError::MissingParticipants {
                url: event_url.to_string(),
            }
            .into()
        })
    }

    /// Split outbound links into tweet summaries and validated slides
    async fn collect_links(
        &self,
        cache: &mut SlideCache,
        html: &str,
    ) -> (Vec<String>, Vec<String>) {
        let mut tweets = Vec::new();
        let mut slides = Vec::new();
        let mut seen = HashSet::new();

        for mut link in extract::extract_links(html) {
            let mut kind = classify(&link);

            if kind == LinkKind::Shortener {
                let resolution = self.resolver.resolve(&link).await;
                if resolution.is_resolved() {
                    link = normalize_link(&resolution.url).unwrap_or(resolution.url);
                    kind = classify(&link);
                }
            }

            if !seen.insert(UrlNormalizer::normalize(&link)) {
                continue;
            }

            match kind {
                LinkKind::TweetSummary => tweets.push(link),
                LinkKind::SlideCandidate => {
                    if self.validator.validate(cache, &link).await {
                        slides.push(link);
                    }
                }
                LinkKind::Shortener | LinkKind::Other => {}
            }
        }

        (tweets, slides)
    }
}
