mod controller;
mod trending;

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::article::{Article, FeedQuery};
use crate::source::ArticleSource;

pub use self::controller::FeedSnapshot;

use self::controller::{Applied, FeedController, FetchRequest};
use self::trending::TrendingPanel;

/// Fetches started by a feed operation.
#[derive(Default)]
pub struct Pending(Vec<JoinHandle<()>>);

impl Pending {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Waits until every fetch has been applied (or discarded).
    #[cfg(test)]
    pub async fn wait(self) {
        for task in self.0 {
            if let Err(e) = task.await {
                error!("A fetch task did not finish: {e}");
            }
        }
    }
}

/// Runs the fetches requested by the feed controller and the trending panel.
#[derive(Clone)]
pub struct Feed {
    source: Arc<dyn ArticleSource>,
    controller: Arc<Mutex<FeedController>>,
    trending: Arc<Mutex<TrendingPanel>>,
}

impl Feed {
    pub fn new(source: Arc<dyn ArticleSource>) -> Self {
        Self {
            source,
            controller: Default::default(),
            trending: Default::default(),
        }
    }

    /// Switches the feed to `query`; does nothing if it is already the current query.
    pub fn set_query(&self, query: FeedQuery) -> Pending {
        let request = self.controller.lock().unwrap().set_query(query);

        let Some(request) = request else {
            debug!("The query has not changed");

            return Pending::default();
        };

        info!(
            epoch = request.epoch,
            category = %request.query.category,
            text = %request.query.text,
            sort = %request.query.sort,
            range = %request.query.range,
            "Starting a new feed epoch",
        );

        Pending(vec![self.spawn_fetch(request), self.spawn_trending()])
    }

    /// Requests the next page; does nothing unless the feed is idle and has more pages.
    pub fn load_more(&self) -> Pending {
        let request = self.controller.lock().unwrap().load_more();

        match request {
            Some(request) => Pending(vec![self.spawn_fetch(request)]),
            None => Pending::default(),
        }
    }

    /// Reloads the first page and the trending list for the current query.
    pub fn refresh(&self) -> Pending {
        let request = self.controller.lock().unwrap().refresh();

        match request {
            Some(request) => Pending(vec![self.spawn_fetch(request), self.spawn_trending()]),
            None => Pending::default(),
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.controller.lock().unwrap().snapshot()
    }

    pub fn trending(&self) -> Vec<Article> {
        self.trending.lock().unwrap().articles().to_vec()
    }

    pub fn trending_loading(&self) -> bool {
        self.trending.lock().unwrap().is_loading()
    }

    /// Looks an article up among the ones currently displayed.
    pub fn find(&self, id: &str) -> Option<Article> {
        if let Some(article) = self.controller.lock().unwrap().find(id) {
            return Some(article.clone());
        }

        self.trending.lock().unwrap().find(id).cloned()
    }

    fn spawn_fetch(&self, request: FetchRequest) -> JoinHandle<()> {
        let source = self.source.clone();
        let controller = self.controller.clone();
        let span = info_span!(
            "fetch",
            epoch = request.epoch,
            page = request.page,
            kind = ?request.kind,
        );

        tokio::spawn(
            async move {
                let result = source.list(request.page, &request.query).await;
                let applied = controller.lock().unwrap().apply(&request, result);

                match applied {
                    Applied::Stale => debug!("Discarding a superseded result"),
                    Applied::Replaced(count) => debug!("Replaced the feed with {count} articles"),
                    Applied::Appended(count) => debug!("Appended {count} articles"),
                    Applied::Exhausted => info!("Reached the end of the feed"),

                    Applied::Failed(e) => error!("Could not fetch articles: {e}"),
                }
            }
            .instrument(span),
        )
    }

    fn spawn_trending(&self) -> JoinHandle<()> {
        let source = self.source.clone();
        let trending = self.trending.clone();
        let generation = trending.lock().unwrap().begin();

        tokio::spawn(
            async move {
                let result = source.trending().await;

                if let Err(e) = &result {
                    warn!("Could not fetch trending articles, keeping the old ones: {e:#}");
                }

                if !trending.lock().unwrap().apply(generation, result) {
                    debug!("Discarding a superseded trending list");
                }
            }
            .instrument(info_span!("trending", generation)),
        )
    }
}
