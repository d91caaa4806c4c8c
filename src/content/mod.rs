//! Content module - post view models and their derivation from documents

pub mod adjacency;
mod post;
mod projection;
mod reading_time;

pub use adjacency::adjacent;
pub use post::{
    Adjacency, Banner, ContentBlock, DetailData, NavPost, PostDetail, PostSummary,
    PostsPagination, SummaryData,
};
pub use projection::{content_blocks, Projector};
pub use reading_time::{count_words, reading_time, WORDS_PER_MINUTE};
