/// Redis caching for post-service
pub mod post_cache;

pub use post_cache::{CacheLookup, PostCache};
