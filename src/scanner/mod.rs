//! Find-step of a scan: lexical URL extraction, eligibility filtering and
//! content-type probing.

pub mod extract;
pub mod filter;
pub mod probe;

pub use extract::extract_urls;
pub use filter::UrlFilter;
pub use probe::Prober;
