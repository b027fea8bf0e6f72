mod mock;

use anyhow::Result;
use async_trait::async_trait;

use crate::article::{Article, FeedQuery};

pub use self::mock::MockSource;

/// A paged supplier of articles.
///
/// Implementations make no promise about latency or about returning the same articles twice for
/// the same arguments.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Returns page `page` (1-based) of the articles matching `query`.
    ///
    /// An empty page means there is nothing more to load for the query.
    async fn list(&self, page: u32, query: &FeedQuery) -> Result<Vec<Article>>;

    /// Returns a short, unpaged list of trending articles.
    async fn trending(&self) -> Result<Vec<Article>>;
}
