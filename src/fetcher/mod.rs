pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{HttpClient, HttpSettings, ReqwestClient};
pub use errors::FetchError;
pub use pipeline::decode_body;
pub use types::{DecodedBody, HeadResponse, PageResponse};

#[cfg(test)]
pub use client::MockHttpClient;
