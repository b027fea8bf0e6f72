use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub image: String,

    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,

    pub source: Outlet,
    pub author: String,

    /// A free-form tag; sources are not limited to the categories the feed can be filtered by.
    pub category: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Outlet {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    #[default]
    General,
    Business,
    Technology,
    Entertainment,
    Health,
    Science,
    Sports,
    Trending,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Business => "business",
            Self::Technology => "technology",
            Self::Entertainment => "entertainment",
            Self::Health => "health",
            Self::Science => "science",
            Self::Sports => "sports",
            Self::Trending => "trending",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    #[serde(alias = "relevancy")]
    Relevance,

    Popularity,

    #[serde(alias = "publishedAt")]
    Newest,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Popularity => "popularity",
            Self::Newest => "newest",
        }
    }
}

impl Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    #[default]
    All,
    Today,
    Week,
    Month,
}

impl DateRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// How far back an article may have been published to fall within the range.
    pub fn window(&self) -> Option<time::Duration> {
        match self {
            Self::All => None,
            Self::Today => Some(time::Duration::days(1)),
            Self::Week => Some(time::Duration::weeks(1)),
            Self::Month => Some(time::Duration::days(30)),
        }
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_str().fmt(f)
    }
}

/// Everything that determines the contents of the feed.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FeedQuery {
    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub sort: SortMode,

    #[serde(default)]
    pub range: DateRange,
}
