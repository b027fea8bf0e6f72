use anyhow::Result;
use serde::Serialize;

use crate::article::{Article, FeedQuery};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    LoadingInitial,
    LoadingMore,
    Exhausted,
    Refreshing,
}

impl Phase {
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            Self::LoadingInitial | Self::LoadingMore | Self::Refreshing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    More,
    Refresh,
}

impl FetchKind {
    fn phase(self) -> Phase {
        match self {
            Self::Initial => Phase::LoadingInitial,
            Self::More => Phase::LoadingMore,
            Self::Refresh => Phase::Refreshing,
        }
    }
}

/// A page fetch the controller wants performed.
///
/// The result must be handed back through [`FeedController::apply`] together with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub epoch: u64,
    pub seq: u64,
    pub page: u32,
    pub kind: FetchKind,
    pub query: FeedQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The request belongs to a superseded epoch or is no longer in flight.
    Stale,

    Replaced(usize),
    Appended(usize),

    /// The fetch returned nothing: the feed has no more pages.
    Exhausted,

    /// The fetch failed; carries the error message.
    Failed(String),
}

#[derive(Serialize, Debug, Clone)]
pub struct FeedSnapshot {
    pub query: Option<FeedQuery>,
    pub epoch: u64,
    pub phase: Phase,
    pub loading: bool,
    pub page: u32,
    pub has_more: bool,
    pub articles: Vec<Article>,
}

/// Pagination state of the feed.
///
/// Every change of the query starts a new epoch. Requests carry the epoch they were issued in,
/// and results from an older epoch are dropped. At most one request per epoch is in flight.
#[derive(Debug)]
pub struct FeedController {
    query: Option<FeedQuery>,
    epoch: u64,
    phase: Phase,
    page: u32,
    has_more: bool,
    articles: Vec<Article>,
    next_seq: u64,
    in_flight: Option<u64>,
}

impl Default for FeedController {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedController {
    pub fn new() -> Self {
        Self {
            query: None,
            epoch: 0,
            phase: Phase::Idle,
            page: 1,
            has_more: true,
            articles: vec![],
            next_seq: 0,
            in_flight: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        FeedSnapshot {
            query: self.query.clone(),
            epoch: self.epoch,
            phase: self.phase,
            loading: self.phase.is_loading(),
            page: self.page,
            has_more: self.has_more,
            articles: self.articles.clone(),
        }
    }

    fn request(&mut self, kind: FetchKind, page: u32) -> Option<FetchRequest> {
        let query = self.query.clone()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.in_flight = Some(seq);
        self.phase = kind.phase();

        Some(FetchRequest {
            epoch: self.epoch,
            seq,
            page,
            kind,
            query,
        })
    }

    /// Starts a new epoch for `query` unless it is already the current one.
    ///
    /// Works from any phase: whatever is in flight becomes stale.
    pub fn set_query(&mut self, query: FeedQuery) -> Option<FetchRequest> {
        if self.query.as_ref() == Some(&query) {
            return None;
        }

        self.epoch += 1;
        self.query = Some(query);
        self.page = 1;
        self.has_more = true;
        self.articles.clear();

        self.request(FetchKind::Initial, 1)
    }

    /// Called when the last displayed article comes into view.
    pub fn load_more(&mut self) -> Option<FetchRequest> {
        if self.phase != Phase::Idle || !self.has_more || self.articles.is_empty() {
            return None;
        }

        let request = self.request(FetchKind::More, self.page + 1)?;
        self.page += 1;

        Some(request)
    }

    /// Reloads the first page of the current query, keeping the displayed list until it arrives.
    pub fn refresh(&mut self) -> Option<FetchRequest> {
        if !matches!(self.phase, Phase::Idle | Phase::Exhausted) {
            return None;
        }

        self.request(FetchKind::Refresh, 1)
    }

    fn settle(&mut self) {
        self.phase = if self.has_more {
            Phase::Idle
        } else {
            Phase::Exhausted
        };
    }

    pub fn apply(&mut self, request: &FetchRequest, result: Result<Vec<Article>>) -> Applied {
        if request.epoch != self.epoch || self.in_flight != Some(request.seq) {
            return Applied::Stale;
        }

        self.in_flight = None;

        let articles = match result {
            Ok(articles) => articles,

            Err(e) => {
                if request.kind == FetchKind::More {
                    self.page -= 1;
                }

                self.settle();

                return Applied::Failed(format!("{e:#}"));
            }
        };

        let count = articles.len();

        match request.kind {
            FetchKind::Initial | FetchKind::Refresh => {
                self.articles = articles;
                self.page = 1;
                self.has_more = count > 0;
                self.settle();

                if count == 0 {
                    Applied::Exhausted
                } else {
                    Applied::Replaced(count)
                }
            }

            FetchKind::More if count == 0 => {
                self.page -= 1;
                self.has_more = false;
                self.settle();

                Applied::Exhausted
            }

            FetchKind::More => {
                self.articles.extend(articles);
                self.settle();

                Applied::Appended(count)
            }
        }
    }
}
