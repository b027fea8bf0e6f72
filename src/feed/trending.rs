use anyhow::Result;

use crate::article::Article;

/// The unpaged trending list.
///
/// A failed load keeps whatever was shown before. Only the most recently started load may
/// replace the list.
#[derive(Debug, Default)]
pub struct TrendingPanel {
    articles: Vec<Article>,
    generation: u64,
    loading: bool,
}

impl TrendingPanel {
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn find(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|article| article.id == id)
    }

    /// Starts a load and returns its generation.
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;

        self.generation
    }

    /// Returns whether the result was for the latest load.
    pub fn apply(&mut self, generation: u64, result: Result<Vec<Article>>) -> bool {
        if generation != self.generation {
            return false;
        }

        self.loading = false;

        if let Ok(articles) = result {
            self.articles = articles;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use crate::article::tests::article;

    use super::*;

    #[test]
    fn failure_keeps_the_previous_list() {
        let mut panel = TrendingPanel::default();

        let generation = panel.begin();
        assert!(panel.is_loading());
        assert!(panel.apply(generation, Ok(vec![article("t1"), article("t2")])));
        assert!(!panel.is_loading());

        let generation = panel.begin();
        assert!(panel.apply(generation, Err(anyhow!("offline"))));
        assert_eq!(panel.articles().len(), 2);
        assert!(panel.find("t2").is_some());
    }

    #[test]
    fn only_the_latest_load_wins() {
        let mut panel = TrendingPanel::default();

        let older = panel.begin();
        let newer = panel.begin();

        assert!(panel.apply(newer, Ok(vec![article("new")])));
        assert!(!panel.apply(older, Ok(vec![article("old")])));
        assert_eq!(panel.articles()[0].id, "new");
    }
}
