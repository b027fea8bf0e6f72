use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::select;
use tokio::sync::watch;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, trace, Instrument};

use crate::config::SearchConfig;
use crate::insight::Insights;

#[derive(Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct Suggestions {
    pub prefix: String,
    pub items: Vec<String>,
}

struct Inner {
    pending: Option<CancellationToken>,
    suggestions: watch::Sender<Suggestions>,
}

/// Turns keystrokes into suggestion lookups once the input has settled.
///
/// Each keystroke cancels the lookup armed by the previous one, so only the latest input is ever
/// looked up and published.
#[derive(Clone)]
pub struct Suggester {
    insights: Insights,
    quiet: Duration,
    inner: Arc<Mutex<Inner>>,
    current: watch::Receiver<Suggestions>,
}

impl Suggester {
    pub fn new(insights: Insights, cfg: &SearchConfig) -> Self {
        let (suggestions, current) = watch::channel(Suggestions::default());

        Self {
            insights,
            quiet: cfg.debounce.into(),
            inner: Arc::new(Mutex::new(Inner {
                pending: None,
                suggestions,
            })),
            current,
        }
    }

    pub fn current(&self) -> Suggestions {
        self.current.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<Suggestions> {
        self.current.clone()
    }

    pub fn input(&self, text: &str) {
        let mut inner = self.inner.lock().unwrap();

        if let Some(previous) = inner.pending.take() {
            trace!("Cancelling the previous lookup");
            previous.cancel();
        }

        if text.chars().count() < self.insights.min_prefix_len() {
            inner.suggestions.send_if_modified(|suggestions| {
                let modified = !suggestions.items.is_empty();
                *suggestions = Suggestions::default();

                modified
            });

            return;
        }

        let cancel = CancellationToken::new();
        inner.pending = Some(cancel.clone());
        drop(inner);

        let prefix = text.to_owned();
        let quiet = self.quiet;
        let insights = self.insights.clone();
        let inner = self.inner.clone();
        let span = debug_span!("suggest", %prefix);

        tokio::spawn(
            async move {
                select! {
                    _ = cancel.cancelled() => return,
                    _ = sleep(quiet) => {}
                }

                let items = insights.suggestions(&prefix).await;
                let inner = inner.lock().unwrap();

                if cancel.is_cancelled() {
                    debug!("Discarding suggestions for a superseded input");

                    return;
                }

                inner.suggestions.send_replace(Suggestions { prefix, items });
            }
            .instrument(span),
        );
    }
}
