#![no_main]

use libfuzzer_sys::fuzz_target;
use url::Url;

use linksummary::config::SummarySettings;
use linksummary::scanner::{UrlFilter, extract_urls};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let site = Url::parse("https://www.example.com").unwrap();
    let filter = UrlFilter::new(&site, &SummarySettings::default());

    // Extraction and filtering must never panic on arbitrary content.
    let candidates = extract_urls(&text);
    for url in filter.eligible(&candidates) {
        assert!(filter.is_remote(&url));
    }
});
