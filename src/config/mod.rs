//! Configuration module

mod site;

pub use site::ContentServiceConfig;
pub use site::DateFormatConfig;
pub use site::SiteConfig;
pub use site::{ENV_ACCESS_TOKEN, ENV_API_ENDPOINT};
