//! Configuration module

mod site;

pub use site::PrismicConfig;
pub use site::SiteConfig;
pub use site::{ACCESS_TOKEN_ENV, ENDPOINT_ENV};
