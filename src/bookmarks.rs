use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::article::Article;
use crate::storage::Storage;

const SLOT_NAME: &str = "bookmarks";
const EVENT_CAPACITY: usize = 64;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
pub enum BookmarkEvent {
    Added(String),
    Removed(String),
}

/// Saved articles in the order they were saved.
///
/// Each entry is a full snapshot, so a saved article outlives the source dropping it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BookmarkSet {
    articles: Vec<Article>,
}

impl BookmarkSet {
    /// Builds a set from persisted articles; later duplicates of an id are dropped.
    pub fn from_articles(articles: Vec<Article>) -> Self {
        let mut seen = HashSet::with_capacity(articles.len());
        let articles = articles
            .into_iter()
            .filter(|article| seen.insert(article.id.clone()))
            .collect();

        Self { articles }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.articles.iter().any(|article| article.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Returns the set with `article` removed if it was present, or added otherwise.
    pub fn toggled(&self, article: Article) -> (Self, BookmarkEvent) {
        let mut next = self.clone();

        if let Some(idx) = next.articles.iter().position(|a| a.id == article.id) {
            next.articles.remove(idx);

            (next, BookmarkEvent::Removed(article.id))
        } else {
            let id = article.id.clone();
            next.articles.push(article);

            (next, BookmarkEvent::Added(id))
        }
    }
}

/// The persisted bookmark set shared by every part of the reader.
pub struct BookmarkStore {
    storage: Arc<Storage>,
    set: Mutex<BookmarkSet>,
    events: broadcast::Sender<BookmarkEvent>,
}

impl BookmarkStore {
    /// Loads the persisted set.
    ///
    /// A missing, unreadable or malformed slot yields an empty set.
    pub async fn load(storage: Arc<Storage>) -> Self {
        let set = match Self::read(&storage).await {
            Ok(Some(set)) => {
                info!("Loaded {} bookmarks", set.len());
                set
            }

            Ok(None) => {
                debug!("No bookmarks were saved yet");
                Default::default()
            }

            Err(e) => {
                warn!("Could not load saved bookmarks, starting with none: {e:#}");
                Default::default()
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            storage,
            set: Mutex::new(set),
            events,
        }
    }

    async fn read(storage: &Storage) -> Result<Option<BookmarkSet>> {
        let mut tx = storage.begin().await?;
        let slot = tx.load_slot(SLOT_NAME).await?;
        tx.commit().await?;

        let Some(slot) = slot else {
            return Ok(None);
        };

        debug!(updated = %slot.updated, "Found saved bookmarks");
        let articles: Vec<Article> =
            serde_json::from_str(&slot.value).context("the saved bookmarks are malformed")?;

        Ok(Some(BookmarkSet::from_articles(articles)))
    }

    async fn write(&self, set: &BookmarkSet) -> Result<()> {
        let value =
            serde_json::to_string(set.articles()).context("could not serialize bookmarks")?;

        let mut tx = self.storage.begin().await?;
        tx.store_slot(SLOT_NAME, &value).await?;
        tx.commit().await
    }

    /// Adds the article if it is not saved yet, removes it otherwise, and persists the result.
    ///
    /// The in-memory set only changes once the new set has been written. Returns whether the
    /// article is bookmarked afterwards.
    pub async fn toggle(&self, article: Article) -> Result<bool> {
        let mut set = self.set.lock().await;
        let (next, event) = set.toggled(article);

        if let Err(e) = self.write(&next).await {
            error!("Could not save bookmarks: {e:#}");

            return Err(e);
        }

        *set = next;
        drop(set);

        debug!(?event, "Bookmarks changed");
        let bookmarked = matches!(event, BookmarkEvent::Added(_));

        // nobody listening is fine.
        let _ = self.events.send(event);

        Ok(bookmarked)
    }

    pub async fn is_bookmarked(&self, id: &str) -> bool {
        self.set.lock().await.contains(id)
    }

    pub async fn get(&self, id: &str) -> Option<Article> {
        self.set.lock().await.get(id).cloned()
    }

    pub async fn list(&self) -> Vec<Article> {
        self.set.lock().await.articles().to_vec()
    }

    pub async fn len(&self) -> usize {
        self.set.lock().await.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }
}
