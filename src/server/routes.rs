use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Result;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::article::{Article, FeedQuery};
use crate::feed::{FeedSnapshot, Pending};
use crate::search::Suggestions;
use crate::server::convert_errors;
use crate::share::ShareOutcome;
use crate::state::State as AppState;

use super::responses::{ArticleNotFound, Bookmarked, Issued, Summary, Toggled, Trending};

fn issued(pending: Pending) -> Json<Issued> {
    Json(Issued {
        issued: !pending.is_empty(),
    })
}

/// Looks the article up among the displayed ones first, then among the bookmarks.
async fn find_article(state: &AppState, id: String) -> Result<Article, ArticleNotFound> {
    if let Some(article) = state.feed.find(&id) {
        return Ok(article);
    }

    state
        .bookmarks
        .get(&id)
        .await
        .ok_or(ArticleNotFound { id })
}

pub async fn get_feed(State(state): State<AppState>) -> Json<FeedSnapshot> {
    Json(state.feed.snapshot())
}

pub async fn set_query(
    State(state): State<AppState>,
    Json(query): Json<FeedQuery>,
) -> Json<Issued> {
    issued(state.feed.set_query(query))
}

pub async fn load_more(State(state): State<AppState>) -> Json<Issued> {
    issued(state.feed.load_more())
}

pub async fn refresh(State(state): State<AppState>) -> Json<Issued> {
    issued(state.feed.refresh())
}

pub async fn get_trending(State(state): State<AppState>) -> Json<Trending> {
    Json(Trending {
        loading: state.feed.trending_loading(),
        articles: state.feed.trending(),
    })
}

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Article>> {
    Ok(Json(find_article(&state, id).await?))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Summary>> {
    let article = find_article(&state, id).await?;
    let summary = state.insights.summary(&article).await;

    Ok(Json(Summary { summary }))
}

pub async fn share_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShareOutcome>> {
    let article = find_article(&state, id).await?;

    Ok(Json(state.sharer.share(&article).await))
}

pub async fn get_bookmarks(State(state): State<AppState>) -> Json<Vec<Article>> {
    Json(state.bookmarks.list().await)
}

pub async fn toggle_bookmark(
    State(state): State<AppState>,
    Json(article): Json<Article>,
) -> Result<Json<Toggled>> {
    convert_errors(async move {
        let bookmarked = state.bookmarks.toggle(article).await?;
        let count = state.bookmarks.len().await;

        Ok(Json(Toggled { bookmarked, count }))
    })
    .await
}

pub async fn is_bookmarked(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<Bookmarked> {
    Json(Bookmarked {
        bookmarked: state.bookmarks.is_bookmarked(&id).await,
    })
}

#[derive(Deserialize, Debug)]
pub struct SearchInput {
    text: String,
}

pub async fn search_input(
    State(state): State<AppState>,
    Json(input): Json<SearchInput>,
) -> StatusCode {
    debug!(text = %input.text, "Search input changed");
    state.suggester.input(&input.text);

    StatusCode::ACCEPTED
}

pub async fn get_suggestions(State(state): State<AppState>) -> Json<Suggestions> {
    Json(state.suggester.current())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use axum::Router;
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tokio::time::sleep;
    use tower::ServiceExt;

    use crate::article::tests::article;
    use crate::config::{self, Config, SearchConfig, SourceConfig};
    use crate::insight::tests::FakeInsight;
    use crate::insight::Insights;
    use crate::server::router;
    use crate::source::MockSource;
    use crate::storage::tests::temp_storage;

    use super::*;

    async fn app(fake: FakeInsight) -> (TempDir, AppState, Router) {
        let (dir, storage) = temp_storage().await;
        let source = MockSource::from_cfg(&SourceConfig {
            page_latency: config::Duration::from_secs(0),
            trending_latency: config::Duration::from_secs(0),
            jitter: config::Duration::from_secs(0),
            ..Default::default()
        });
        let insights = Insights::new(Arc::new(fake), &SearchConfig::default());
        let state = AppState::with_parts(
            Config::default(),
            Arc::new(storage),
            Arc::new(source),
            insights,
        )
        .await;
        state.feed.set_query(FeedQuery::default()).wait().await;

        let app = router(state.clone());

        (dir, state, app)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        (status, body)
    }

    async fn settle(state: &AppState) {
        for _ in 0..400 {
            if !state.feed.snapshot().loading {
                return;
            }

            sleep(Duration::from_millis(5)).await;
        }

        panic!("the feed did not settle");
    }

    fn first_id(feed: &Value) -> String {
        feed["articles"][0]["id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn feed_pages_through_the_source() {
        let (_dir, state, app) = app(FakeInsight::default()).await;

        let (status, feed) = call(&app, Method::GET, "/feed", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(feed["phase"], "idle");
        assert_eq!(feed["loading"], false);
        assert_eq!(feed["page"], 1);
        assert_eq!(feed["articles"].as_array().unwrap().len(), 12);

        let (_, trending) = call(&app, Method::GET, "/trending", None).await;
        assert_eq!(trending["loading"], false);
        assert_eq!(trending["articles"].as_array().unwrap().len(), 5);

        let (_, more) = call(&app, Method::POST, "/feed/more", None).await;
        assert_eq!(more, json!({ "issued": true }));
        settle(&state).await;

        let (_, feed) = call(&app, Method::GET, "/feed", None).await;
        assert_eq!(feed["page"], 2);
        assert_eq!(feed["articles"].as_array().unwrap().len(), 24);

        let (_, refresh) = call(&app, Method::POST, "/feed/refresh", None).await;
        assert_eq!(refresh, json!({ "issued": true }));
        settle(&state).await;
        assert_eq!(state.feed.snapshot().articles.len(), 12);
    }

    #[tokio::test]
    async fn changing_the_query_starts_over() {
        let (_dir, state, app) = app(FakeInsight::default()).await;

        let query = json!({ "category": "technology", "sort": "publishedAt" });
        let (_, response) = call(&app, Method::PUT, "/feed/query", Some(query.clone())).await;
        assert_eq!(response, json!({ "issued": true }));
        settle(&state).await;

        let (_, feed) = call(&app, Method::GET, "/feed", None).await;
        assert_eq!(feed["epoch"], 2);
        assert_eq!(feed["query"]["sort"], "newest");
        assert!(feed["articles"]
            .as_array()
            .unwrap()
            .iter()
            .all(|article| article["category"] == "technology"));

        let (_, response) = call(&app, Method::PUT, "/feed/query", Some(query)).await;
        assert_eq!(response, json!({ "issued": false }));

        let (status, _) = call(
            &app,
            Method::PUT,
            "/feed/query",
            Some(json!({ "colour": "red" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn bookmarks_are_toggled() {
        let (_dir, _state, app) = app(FakeInsight::default()).await;
        let a1 = serde_json::to_value(article("a1")).unwrap();

        let (_, response) = call(&app, Method::POST, "/bookmarks", Some(a1.clone())).await;
        assert_eq!(response, json!({ "bookmarked": true, "count": 1 }));

        let (_, response) = call(&app, Method::GET, "/bookmarks/a1", None).await;
        assert_eq!(response, json!({ "bookmarked": true }));

        let (_, bookmarks) = call(&app, Method::GET, "/bookmarks", None).await;
        assert_eq!(bookmarks, json!([a1.clone()]));

        let (_, response) = call(&app, Method::POST, "/bookmarks", Some(a1)).await;
        assert_eq!(response, json!({ "bookmarked": false, "count": 0 }));

        let (_, response) = call(&app, Method::GET, "/bookmarks/a1", None).await;
        assert_eq!(response, json!({ "bookmarked": false }));
    }

    #[tokio::test]
    async fn bookmarked_articles_stay_reachable() {
        let (_dir, state, app) = app(FakeInsight::default()).await;

        let (_, feed) = call(&app, Method::GET, "/feed", None).await;
        let id = first_id(&feed);

        let (status, found) = call(&app, Method::GET, &format!("/articles/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        call(&app, Method::POST, "/bookmarks", Some(found.clone())).await;

        call(
            &app,
            Method::PUT,
            "/feed/query",
            Some(json!({ "category": "sports" })),
        )
        .await;
        settle(&state).await;
        assert!(state.feed.find(&id).is_none());

        let (status, again) = call(&app, Method::GET, &format!("/articles/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, found);

        let (status, _) = call(&app, Method::GET, "/articles/no-such-article", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn summaries_and_shares() {
        let (_dir, _state, app) = app(FakeInsight {
            summary: Some("- one\n- two\n- three".into()),
            ..Default::default()
        })
        .await;

        let (_, feed) = call(&app, Method::GET, "/feed", None).await;
        let id = first_id(&feed);

        let (_, summary) = call(&app, Method::GET, &format!("/articles/{id}/summary"), None).await;
        assert_eq!(summary, json!({ "summary": "- one\n- two\n- three" }));

        let (_, shared) = call(&app, Method::POST, &format!("/articles/{id}/share"), None).await;
        assert_eq!(shared["outcome"], "manual");
        assert!(shared["message"]
            .as_str()
            .unwrap()
            .contains(&format!("https://example.com/{id}")));

        let (status, _) = call(&app, Method::GET, "/articles/missing/summary", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn search_input_produces_suggestions() {
        let fake = FakeInsight::suggesting(&["technology", "tech stocks"]);
        let (_dir, _state, app) = app(fake).await;

        let (status, _) = call(
            &app,
            Method::PUT,
            "/search/input",
            Some(json!({ "text": "tec" })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let mut suggestions = Value::Null;

        for _ in 0..200 {
            (_, suggestions) = call(&app, Method::GET, "/search/suggestions", None).await;

            if suggestions["items"].as_array().is_some_and(|items| !items.is_empty()) {
                break;
            }

            sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(
            suggestions,
            json!({ "prefix": "tec", "items": ["technology", "tech stocks"] }),
        );
    }
}
