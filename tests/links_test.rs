use iotlt_harvest::links::{canonical_event_url, classify, normalize_link};
use iotlt_harvest::{LinkKind, UrlNormalizer};

#[cfg(test)]
mod normalize_link_tests {
    use super::*;

    #[test]
    fn test_keeps_absolute_urls() {
        assert_eq!(
            normalize_link("https://speakerdeck.com/foo/bar").as_deref(),
            Some("https://speakerdeck.com/foo/bar")
        );
    }

    #[test]
    fn test_strips_wrappers_and_trailing_punctuation() {
        assert_eq!(
            normalize_link("  <https://speakerdeck.com/foo/bar>  ").as_deref(),
            Some("https://speakerdeck.com/foo/bar")
        );
        assert_eq!(
            normalize_link("\"https://togetter.com/li/12345\"").as_deref(),
            Some("https://togetter.com/li/12345")
        );
        assert_eq!(
            normalize_link("https://speakerdeck.com/foo/bar).").as_deref(),
            Some("https://speakerdeck.com/foo/bar")
        );
        assert_eq!(
            normalize_link("https://togetter.com/li/1;").as_deref(),
            Some("https://togetter.com/li/1")
        );
    }

    #[test]
    fn test_decodes_entities() {
        assert_eq!(
            normalize_link("https://docs.google.com/presentation/d/x/edit?usp=sharing&amp;a=1")
                .as_deref(),
            Some("https://docs.google.com/presentation/d/x/edit?usp=sharing&a=1")
        );
    }

    #[test]
    fn test_expands_protocol_relative() {
        assert_eq!(
            normalize_link("//www.slideshare.net/foo/bar").as_deref(),
            Some("https://www.slideshare.net/foo/bar")
        );
    }

    #[test]
    fn test_accepts_known_bare_domains() {
        assert_eq!(
            normalize_link("speakerdeck.com/foo/bar").as_deref(),
            Some("https://speakerdeck.com/foo/bar")
        );
        assert_eq!(
            normalize_link("www.docswell.com/s/foo/ABC").as_deref(),
            Some("https://www.docswell.com/s/foo/ABC")
        );
    }

    #[test]
    fn test_drops_unrecognized_shapes() {
        assert_eq!(normalize_link("example.com/page"), None);
        assert_eq!(normalize_link("mailto:someone@example.com"), None);
        assert_eq!(normalize_link("/event/123/"), None);
        assert_eq!(normalize_link("   "), None);
        assert_eq!(normalize_link("#top"), None);
    }
}

#[cfg(test)]
mod classify_tests {
    use super::*;

    #[test]
    fn test_togetter_primary_host_requires_list_path() {
        assert_eq!(classify("https://togetter.com/li/1234567"), LinkKind::TweetSummary);
        assert_eq!(classify("https://togetter.com/id/iotlt"), LinkKind::TweetSummary);
        assert_eq!(classify("https://www.togetter.com/li/1"), LinkKind::TweetSummary);
        assert_eq!(classify("https://togetter.com/t/iotlt"), LinkKind::Other);
    }

    #[test]
    fn test_togetter_subdomains() {
        assert_eq!(classify("https://min.togetter.com/abc"), LinkKind::TweetSummary);
        assert_eq!(classify("https://matome.togetter.com/"), LinkKind::TweetSummary);
        assert_eq!(classify("https://api.togetter.com/li/1"), LinkKind::Other);
    }

    #[test]
    fn test_other_tweet_summary_domain() {
        assert_eq!(classify("https://posfie.com/@user/p/abc"), LinkKind::TweetSummary);
    }

    #[test]
    fn test_slide_hosts() {
        assert_eq!(classify("https://speakerdeck.com/a/b"), LinkKind::SlideCandidate);
        assert_eq!(classify("https://www.slideshare.net/a/b"), LinkKind::SlideCandidate);
        assert_eq!(classify("https://www.docswell.com/s/a/b"), LinkKind::SlideCandidate);
    }

    #[test]
    fn test_documents_host_needs_presentation_path() {
        assert_eq!(
            classify("https://docs.google.com/presentation/d/abc/edit"),
            LinkKind::SlideCandidate
        );
        assert_eq!(
            classify("https://docs.google.com/document/d/abc/edit"),
            LinkKind::Other
        );
        assert_eq!(
            classify("https://docs.google.com/spreadsheets/d/abc"),
            LinkKind::Other
        );
    }

    #[test]
    fn test_shorteners() {
        assert_eq!(classify("https://bit.ly/3abc"), LinkKind::Shortener);
        assert_eq!(classify("https://t.co/xyz"), LinkKind::Shortener);
    }

    #[test]
    fn test_suffix_match_respects_label_boundary() {
        assert_eq!(classify("https://notspeakerdeck.com/a"), LinkKind::Other);
        assert_eq!(classify("https://connpass.com/event/1/"), LinkKind::Other);
    }
}

#[cfg(test)]
mod url_normalizer_tests {
    use super::*;

    #[test]
    fn test_normalize_removes_fragment() {
        let normalized = UrlNormalizer::normalize("https://speakerdeck.com/a/b#slide=3");
        assert_eq!(normalized, "https://speakerdeck.com/a/b");
    }

    #[test]
    fn test_normalize_removes_trailing_slash_from_path() {
        let normalized = UrlNormalizer::normalize("https://togetter.com/li/1/");
        assert_eq!(normalized, "https://togetter.com/li/1");
    }

    #[test]
    fn test_normalize_keeps_trailing_slash_for_root() {
        let normalized = UrlNormalizer::normalize("https://posfie.com/");
        assert_eq!(normalized, "https://posfie.com/");
    }

    #[test]
    fn test_normalize_query_params_with_trailing_slash() {
        let normalized = UrlNormalizer::normalize("https://speakerdeck.com/a/?x=1/2");
        assert_eq!(normalized, "https://speakerdeck.com/a?x=1/2");
    }
}

#[test]
fn test_canonical_event_url_is_idempotent() {
    let once = canonical_event_url("https://iotlt.connpass.com/event/987/?utm=x").unwrap();
    let twice = canonical_event_url(&once).unwrap();
    assert_eq!(once, "https://iotlt.connpass.com/event/987/");
    assert_eq!(once, twice);
}
