mod gemini;

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::article::Article;
use crate::config::{InsightConfig, SearchConfig};

pub use self::gemini::GeminiInsight;

pub const NO_SUMMARY: &str = "No summary available.";
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate AI summary at this moment.";

/// A generative text service.
#[async_trait]
pub trait TextInsight: Send + Sync {
    /// A short summary of the article. May be empty.
    async fn summarize(&self, article: &Article) -> Result<String>;

    /// Search terms starting with or inspired by `prefix`.
    async fn suggest(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Used when no API key is configured.
pub struct Disabled;

#[async_trait]
impl TextInsight for Disabled {
    async fn summarize(&self, _article: &Article) -> Result<String> {
        bail!("the insight service is not configured")
    }

    async fn suggest(&self, _prefix: &str) -> Result<Vec<String>> {
        bail!("the insight service is not configured")
    }
}

/// Wraps a [`TextInsight`] so that callers always get something displayable.
#[derive(Clone)]
pub struct Insights {
    service: Arc<dyn TextInsight>,
    min_prefix_len: usize,
    max_suggestions: usize,
}

impl Insights {
    pub fn new(service: Arc<dyn TextInsight>, search: &SearchConfig) -> Self {
        Self {
            service,
            min_prefix_len: search.min_prefix_len,
            max_suggestions: search.max_suggestions,
        }
    }

    pub fn from_cfg(insight: &InsightConfig, search: &SearchConfig) -> Result<Self> {
        let service: Arc<dyn TextInsight> = match &insight.api_key {
            Some(api_key) => {
                info!(model = %insight.model, "Using Gemini for summaries and suggestions");
                Arc::new(GeminiInsight::new(api_key, insight)?)
            }

            None => {
                warn!("No API key configured; summaries and suggestions are disabled");
                Arc::new(Disabled)
            }
        };

        Ok(Self::new(service, search))
    }

    pub fn min_prefix_len(&self) -> usize {
        self.min_prefix_len
    }

    #[instrument(level = "DEBUG", skip_all, fields(article_id = %article.id))]
    pub async fn summary(&self, article: &Article) -> String {
        match self.service.summarize(article).await {
            Ok(summary) if summary.trim().is_empty() => NO_SUMMARY.into(),
            Ok(summary) => summary,

            Err(e) => {
                warn!("Could not summarize the article: {e:#}");
                SUMMARY_UNAVAILABLE.into()
            }
        }
    }

    /// Returns nothing for prefixes shorter than the minimum without asking the service.
    #[instrument(level = "DEBUG", skip(self))]
    pub async fn suggestions(&self, prefix: &str) -> Vec<String> {
        if prefix.chars().count() < self.min_prefix_len {
            return vec![];
        }

        match self.service.suggest(prefix).await {
            Ok(suggestions) => {
                let mut suggestions = suggestions
                    .into_iter()
                    .map(|s| s.trim().to_owned())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>();
                suggestions.truncate(self.max_suggestions);
                debug!(count = suggestions.len(), "Got search suggestions");

                suggestions
            }

            Err(e) => {
                warn!("Could not get search suggestions: {e:#}");
                vec![]
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use crate::article::tests::article;

    use super::*;

    /// Answers from a script and remembers every prefix it was asked about.
    #[derive(Default)]
    pub struct FakeInsight {
        pub summary: Option<String>,
        pub suggestions: Option<Vec<String>>,
        pub prefixes: Mutex<Vec<String>>,
    }

    impl FakeInsight {
        pub fn suggesting(suggestions: &[&str]) -> Self {
            Self {
                suggestions: Some(suggestions.iter().map(|&s| s.into()).collect()),
                ..Default::default()
            }
        }

        pub fn prefixes(&self) -> Vec<String> {
            self.prefixes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextInsight for FakeInsight {
        async fn summarize(&self, _article: &Article) -> Result<String> {
            match &self.summary {
                Some(summary) => Ok(summary.clone()),
                None => bail!("no summary scripted"),
            }
        }

        async fn suggest(&self, prefix: &str) -> Result<Vec<String>> {
            self.prefixes.lock().unwrap().push(prefix.into());

            match &self.suggestions {
                Some(suggestions) => Ok(suggestions.clone()),
                None => bail!("no suggestions scripted"),
            }
        }
    }

    fn wrap(fake: FakeInsight) -> (Arc<FakeInsight>, Insights) {
        let fake = Arc::new(fake);
        let insights = Insights::new(fake.clone(), &SearchConfig::default());

        (fake, insights)
    }

    #[tokio::test]
    async fn summaries_fall_back_to_placeholders() {
        let (_, insights) = wrap(FakeInsight {
            summary: Some("- one\n- two\n- three".into()),
            ..Default::default()
        });
        assert_eq!(insights.summary(&article("a1")).await, "- one\n- two\n- three");

        let (_, insights) = wrap(FakeInsight {
            summary: Some("  \n".into()),
            ..Default::default()
        });
        assert_eq!(insights.summary(&article("a1")).await, NO_SUMMARY);

        let (_, insights) = wrap(FakeInsight::default());
        assert_eq!(insights.summary(&article("a1")).await, SUMMARY_UNAVAILABLE);

        let insights = Insights::new(Arc::new(Disabled), &SearchConfig::default());
        assert_eq!(insights.summary(&article("a1")).await, SUMMARY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn short_prefixes_are_not_sent() {
        let (fake, insights) = wrap(FakeInsight::suggesting(&["tech"]));

        assert!(insights.suggestions("te").await.is_empty());
        assert!(fake.prefixes().is_empty());

        assert_eq!(insights.suggestions("tec").await, ["tech"]);
        assert_eq!(fake.prefixes(), ["tec"]);
    }

    #[tokio::test]
    async fn suggestions_are_cleaned_up_and_capped() {
        let (_, insights) = wrap(FakeInsight::suggesting(&[
            " tech ", "", "technology", "tech stocks", "  ", "tech layoffs", "tech ai", "techno",
        ]));

        assert_eq!(
            insights.suggestions("tech").await,
            ["tech", "technology", "tech stocks", "tech layoffs", "tech ai"],
        );
    }

    #[tokio::test]
    async fn failed_suggestions_are_empty() {
        let (_, insights) = wrap(FakeInsight::default());

        assert!(insights.suggestions("space").await.is_empty());
    }
}
