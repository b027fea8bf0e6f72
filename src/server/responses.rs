use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::article::Article;

#[derive(Debug, Clone)]
pub struct ArticleNotFound {
    pub id: String,
}

impl IntoResponse for ArticleNotFound {
    fn into_response(self) -> Response {
        let id = self.id;

        IntoResponse::into_response((
            StatusCode::NOT_FOUND,
            format!("The article `{id}` is neither displayed nor bookmarked"),
        ))
    }
}

/// Whether a feed operation started a fetch.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct Issued {
    pub issued: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct Trending {
    pub loading: bool,
    pub articles: Vec<Article>,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Toggled {
    pub bookmarked: bool,
    pub count: usize,
}

#[derive(Serialize, Debug, Clone, Copy)]
pub struct Bookmarked {
    pub bookmarked: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct Summary {
    pub summary: String,
}
