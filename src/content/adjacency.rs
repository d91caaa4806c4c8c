//! Previous/next navigation

use super::{Adjacency, NavPost};

/// Neighbours of `current` in `posts`: previous is the entry before it,
/// next the entry after it. Both are absent when `current` is not listed.
pub fn adjacent(current: &str, posts: &[NavPost]) -> Adjacency {
    let Some(pos) = posts.iter().position(|p| p.uid == current) else {
        return Adjacency::default();
    };

    Adjacency {
        prev_post: pos.checked_sub(1).map(|i| posts[i].clone()),
        next_post: posts.get(pos + 1).cloned(),
    }
}

/// Append `extra` to `posts`, skipping uids already present
pub fn merge(mut posts: Vec<NavPost>, extra: Vec<NavPost>) -> Vec<NavPost> {
    for post in extra {
        if !posts.iter().any(|p| p.uid == post.uid) {
            posts.push(post);
        }
    }
    posts
}
