//! Helper functions shared by the generators, templates and server

mod date;
mod url;

pub use date::*;
pub use url::*;
