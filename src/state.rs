use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bookmarks::{BookmarkEvent, BookmarkStore};
use crate::config::Config;
use crate::feed::Feed;
use crate::insight::Insights;
use crate::search::Suggester;
use crate::share::Sharer;
use crate::source::{ArticleSource, MockSource};
use crate::storage::Storage;

#[derive(Clone)]
pub struct State {
    pub cfg: Arc<Config>,
    pub bookmarks: Arc<BookmarkStore>,
    pub feed: Feed,
    pub insights: Insights,
    pub suggester: Suggester,
    pub sharer: Sharer,
}

impl State {
    pub async fn new(cfg: Config) -> Result<Self> {
        let storage = Arc::new(Storage::new(&cfg.db_path).await?);
        let source: Arc<dyn ArticleSource> = Arc::new(MockSource::from_cfg(&cfg.source));
        let insights = Insights::from_cfg(&cfg.insight, &cfg.search)?;

        let state = Self::with_parts(cfg, storage, source, insights).await;

        // nothing to wait for: the first page lands whenever the source answers.
        drop(state.feed.set_query(state.cfg.feed.clone()));

        Ok(state)
    }

    pub async fn with_parts(
        cfg: Config,
        storage: Arc<Storage>,
        source: Arc<dyn ArticleSource>,
        insights: Insights,
    ) -> Self {
        let bookmarks = Arc::new(BookmarkStore::load(storage).await);
        let suggester = Suggester::new(insights.clone(), &cfg.search);

        State {
            cfg: Arc::new(cfg),
            bookmarks,
            feed: Feed::new(source),
            insights,
            suggester,
            sharer: Sharer::default(),
        }
    }
}

/// Reports bookmark changes until cancelled.
pub async fn announce_bookmarks(bookmarks: Arc<BookmarkStore>, cancel: CancellationToken) {
    let mut events = bookmarks.subscribe();

    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => event,
        };

        match event {
            Ok(BookmarkEvent::Added(id)) => info!(%id, "Article saved to bookmarks"),
            Ok(BookmarkEvent::Removed(id)) => info!(%id, "Article removed from bookmarks"),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                info!("Missed {n} bookmark notifications")
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}
