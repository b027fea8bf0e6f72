use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::article::Article;

pub const COPIED: &str = "Link copied to clipboard!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl From<&Article> for ShareLink {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            text: article.description.clone(),
            url: article.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetResult {
    Shared,

    /// The user closed the sheet without sharing.
    Dismissed,
}

/// A platform share dialog.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn share(&self, link: &ShareLink) -> Result<SheetResult>;
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn copy(&self, text: &str) -> Result<()>;
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "outcome", content = "message", rename_all = "kebab-case")]
pub enum ShareOutcome {
    Shared,
    Dismissed,
    Copied(String),

    /// Nothing could share the link; the message carries it for the user to copy by hand.
    Manual(String),
}

/// Shares articles with whatever the host offers: the share sheet if there is one, otherwise the
/// clipboard, and a message with the raw link when neither works.
///
/// The HTTP server has neither a share sheet nor a clipboard, so the reader it serves always gets
/// the [`ShareOutcome::Manual`] message.
#[derive(Default, Clone)]
pub struct Sharer {
    sheet: Option<Arc<dyn ShareSheet>>,
    clipboard: Option<Arc<dyn Clipboard>>,
}

impl Sharer {
    #[cfg(test)]
    pub fn new(sheet: Option<Arc<dyn ShareSheet>>, clipboard: Option<Arc<dyn Clipboard>>) -> Self {
        Self { sheet, clipboard }
    }

    pub async fn share(&self, article: &Article) -> ShareOutcome {
        let link = ShareLink::from(article);

        if let Some(sheet) = &self.sheet {
            match sheet.share(&link).await {
                Ok(SheetResult::Shared) => return ShareOutcome::Shared,
                Ok(SheetResult::Dismissed) => return ShareOutcome::Dismissed,

                // the clipboard is only for hosts without a share sheet.
                Err(e) => warn!("Could not share the article: {e:#}"),
            }
        } else if let Some(clipboard) = &self.clipboard {
            match clipboard.copy(&link.url).await {
                Ok(()) => return ShareOutcome::Copied(COPIED.into()),
                Err(e) => warn!("Could not copy the link: {e:#}"),
            }
        } else {
            debug!("No clipboard available");
        }

        ShareOutcome::Manual(format!("Failed to copy link. Here it is: {}", link.url))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::bail;

    use crate::article::tests::article;

    use super::*;

    struct Sheet(Option<SheetResult>);

    #[async_trait]
    impl ShareSheet for Sheet {
        async fn share(&self, _link: &ShareLink) -> Result<SheetResult> {
            match self.0 {
                Some(result) => Ok(result),
                None => bail!("sharing is not supported"),
            }
        }
    }

    #[derive(Default)]
    struct MemoryClipboard {
        broken: bool,
        contents: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Clipboard for MemoryClipboard {
        async fn copy(&self, text: &str) -> Result<()> {
            if self.broken {
                bail!("permission denied");
            }

            *self.contents.lock().unwrap() = Some(text.into());

            Ok(())
        }
    }

    #[tokio::test]
    async fn share_sheet_comes_first() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let sharer = Sharer::new(
            Some(Arc::new(Sheet(Some(SheetResult::Shared)))),
            Some(clipboard.clone()),
        );

        assert_eq!(sharer.share(&article("a1")).await, ShareOutcome::Shared);
        assert!(clipboard.contents.lock().unwrap().is_none());

        let sharer = Sharer::new(Some(Arc::new(Sheet(Some(SheetResult::Dismissed)))), None);
        assert_eq!(sharer.share(&article("a1")).await, ShareOutcome::Dismissed);
    }

    #[tokio::test]
    async fn falls_back_to_the_clipboard() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let sharer = Sharer::new(None, Some(clipboard.clone()));

        assert_eq!(
            sharer.share(&article("a1")).await,
            ShareOutcome::Copied(COPIED.into()),
        );
        assert_eq!(
            clipboard.contents.lock().unwrap().as_deref(),
            Some("https://example.com/a1"),
        );
    }

    #[tokio::test]
    async fn failing_share_sheet_does_not_touch_the_clipboard() {
        let clipboard = Arc::new(MemoryClipboard::default());
        let sharer = Sharer::new(Some(Arc::new(Sheet(None))), Some(clipboard.clone()));

        let ShareOutcome::Manual(message) = sharer.share(&article("a1")).await else {
            panic!("expected a manual share");
        };

        assert!(message.contains("https://example.com/a1"));
        assert!(clipboard.contents.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn shows_the_link_when_nothing_else_works() {
        let broken = Arc::new(MemoryClipboard {
            broken: true,
            ..Default::default()
        });

        for sharer in [Sharer::default(), Sharer::new(None, Some(broken))] {
            let ShareOutcome::Manual(message) = sharer.share(&article("a1")).await else {
                panic!("expected a manual share");
            };

            assert!(message.contains("https://example.com/a1"));
        }
    }
}
