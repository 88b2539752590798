mod common;

use std::time::Duration;

use common::FakeBackend;
use iotlt_harvest::{ConfigError, Crawler, Timeouts, WriteMode};

#[test]
fn test_zero_end_page_rejected() {
    let result = Crawler::builder().end_page(0).build();

    assert!(result.is_err());
    match result {
        Err(ConfigError::InvalidEndPage(0)) => {}
        _ => panic!("Expected InvalidEndPage error"),
    }
}

#[test]
fn test_end_page_after_start_page_rejected() {
    let result = Crawler::builder().start_page(2).end_page(5).build();

    match result {
        Err(ConfigError::InvalidPageRange { start: 2, end: 5 }) => {}
        _ => panic!("Expected InvalidPageRange error"),
    }
}

#[test]
fn test_invalid_base_url_rejected() {
    let result = Crawler::builder().base_url("iotlt.connpass.com").build();

    match result {
        Err(ConfigError::InvalidBaseUrl(url)) => assert_eq!(url, "iotlt.connpass.com"),
        _ => panic!("Expected InvalidBaseUrl error"),
    }
}

#[test]
fn test_zero_timeout_rejected() {
    let timeouts = Timeouts {
        slide: Duration::ZERO,
        ..Timeouts::default()
    };
    let result = Crawler::builder().timeouts(timeouts).build();

    match result {
        Err(ConfigError::InvalidTimeout(name)) => assert_eq!(name, "slide validation"),
        _ => panic!("Expected InvalidTimeout error"),
    }
}

#[test]
fn test_append_mode_rejected() {
    let result = Crawler::builder().write_mode(WriteMode::Append).build();

    match result {
        Err(ConfigError::IncrementalModeUnsupported) => {}
        _ => panic!("Expected IncrementalModeUnsupported error"),
    }
}

#[test]
fn test_valid_configuration_accepted() {
    let result = Crawler::builder()
        .base_url("https://iotlt.connpass.com/")
        .start_page(40)
        .end_page(1)
        .timeouts(Timeouts::uniform(Duration::from_secs(3)))
        .request_delay(Duration::from_millis(100))
        .in_memory_cache()
        .output_path("out/README.md")
        .backend(FakeBackend::new())
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_equal_start_and_end_accepted() {
    let result = Crawler::builder()
        .start_page(3)
        .end_page(3)
        .backend(FakeBackend::new())
        .build();

    assert!(result.is_ok());
}

#[test]
fn test_default_configuration_valid() {
    let result = Crawler::builder().build();
    assert!(result.is_ok());
}

#[test]
fn test_default_timeouts() {
    let timeouts = Timeouts::default();
    assert_eq!(timeouts.list, Duration::from_secs(30));
    assert_eq!(timeouts.detail, Duration::from_secs(30));
    assert_eq!(timeouts.slide, Duration::from_secs(15));
    assert_eq!(timeouts.shortener, Duration::from_secs(10));
    assert_eq!(timeouts.participation, Duration::from_secs(30));
}
