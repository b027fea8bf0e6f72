use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{debug, instrument};

use crate::article::{Article, Category, FeedQuery, Outlet, SortMode};
use crate::config::SourceConfig;

use super::ArticleSource;

const IMAGES: &[&str] = &[
    "https://picsum.photos/seed/news1/800/450",
    "https://picsum.photos/seed/news2/800/450",
    "https://picsum.photos/seed/news3/800/450",
    "https://picsum.photos/seed/news4/800/450",
    "https://picsum.photos/seed/news5/800/450",
];

/// Generates plausible-looking articles after a simulated network delay.
pub struct MockSource {
    page_size: u32,
    trending_size: usize,
    max_pages: Option<u32>,
    page_latency: Duration,
    trending_latency: Duration,
    jitter: Duration,
    rng: Mutex<SmallRng>,
}

impl MockSource {
    pub fn from_cfg(cfg: &SourceConfig) -> Self {
        Self {
            page_size: cfg.page_size,
            trending_size: cfg.trending_size,
            max_pages: cfg.max_pages,
            page_latency: cfg.page_latency.into(),
            trending_latency: cfg.trending_latency.into(),
            jitter: cfg.jitter.into(),
            rng: Mutex::new(
                SmallRng::from_rng(thread_rng()).unwrap_or_else(|_| SmallRng::seed_from_u64(0)),
            ),
        }
    }

    async fn delay(&self, base: Duration) {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            self.rng.lock().unwrap().gen_range(Duration::ZERO..self.jitter)
        };
        let delay = base + jitter;

        if !delay.is_zero() {
            sleep(delay).await;
        }
    }

    fn generate(
        &self,
        page: u32,
        category: Category,
        sort: SortMode,
        now: OffsetDateTime,
    ) -> Vec<Article> {
        let kind = if sort == SortMode::Newest {
            "Breaking"
        } else {
            "Top"
        };

        (0..self.page_size)
            .map(|idx| {
                let id = format!("article-{page}-{idx}-{category}-{sort}");
                let age_hours = idx + (page - 1) * self.page_size;

                Article {
                    title: format!(
                        "{} {kind} Story: New Insights Revealed",
                        category.as_str().to_uppercase(),
                    ),
                    description: format!(
                        "New data suggests a massive shift in the upcoming quarter for the \
                            {category} sector. Experts are analyzing these trends to determine \
                            long-term impact."
                    ),
                    content: "This is a comprehensive report on the latest developments. \
                        Researchers highlight significant anomalies in current market trends. \
                        The study voices concerns regarding the long-term sustainability of \
                        current models..."
                        .into(),
                    url: format!("https://example.com/{id}"),
                    image: IMAGES[idx as usize % IMAGES.len()].into(),
                    published_at: now - time::Duration::hours(age_hours.into()),
                    source: Outlet {
                        name: "Horizon Global".into(),
                        id: None,
                    },
                    author: "Alex Sterling".into(),
                    category: category.as_str().into(),
                    id,
                }
            })
            .collect()
    }
}

#[async_trait]
impl ArticleSource for MockSource {
    #[instrument(level = "DEBUG", skip(self))]
    async fn list(&self, page: u32, query: &FeedQuery) -> Result<Vec<Article>> {
        self.delay(self.page_latency).await;

        if page == 0 || self.max_pages.is_some_and(|max_pages| page > max_pages) {
            debug!("Page is past the end of the feed");

            return Ok(vec![]);
        }

        let now = OffsetDateTime::now_utc();
        let mut articles = self.generate(page, query.category, query.sort, now);

        if let Some(window) = query.range.window() {
            articles.retain(|article| now - article.published_at < window);
        }

        debug!(count = articles.len(), "Generated a page of articles");

        Ok(articles)
    }

    #[instrument(level = "DEBUG", skip(self))]
    async fn trending(&self) -> Result<Vec<Article>> {
        self.delay(self.trending_latency).await;

        let now = OffsetDateTime::now_utc();

        Ok(self
            .generate(1, Category::Trending, SortMode::Popularity, now)
            .into_iter()
            .take(self.trending_size)
            .map(|mut article| {
                article.title = article.title.replace("TRENDING", "Global Trend");
                article
            })
            .collect())
    }
}
