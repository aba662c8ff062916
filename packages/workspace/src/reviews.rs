//! Short customer reviews from an external places API.
//!
//! Fetching never fails from the caller's point of view: transport errors,
//! error statuses and unexpected bodies all produce an empty list and a
//! warning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub author: String,
    pub rating: f32,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_time: Option<String>,
}

#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn fetch(&self) -> Vec<Review>;
}

/// Fixed reviews; an empty one stands in when no API is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticReviewSource {
    reviews: Vec<Review>,
}

impl StaticReviewSource {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self { reviews }
    }
}

#[async_trait]
impl ReviewSource for StaticReviewSource {
    async fn fetch(&self) -> Vec<Review> {
        self.reviews.clone()
    }
}

pub struct HttpReviewSource {
    client: reqwest::Client,
    endpoint: String,
    place_id: String,
    api_key: Option<String>,
    limit: usize,
}

#[derive(Deserialize)]
struct PlaceDetails {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    result: Option<PlaceResult>,
}

#[derive(Deserialize)]
struct PlaceResult {
    #[serde(default)]
    reviews: Vec<PlaceReview>,
}

#[derive(Deserialize)]
struct PlaceReview {
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    rating: f32,
    #[serde(default)]
    text: String,
    #[serde(default)]
    relative_time_description: Option<String>,
}

impl HttpReviewSource {
    pub fn new(
        endpoint: impl Into<String>,
        place_id: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        limit: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            place_id: place_id.into(),
            api_key,
            limit,
        })
    }

    async fn request(&self) -> Result<PlaceDetails, String> {
        let mut query = vec![("place_id", self.place_id.as_str()), ("fields", "reviews")];
        if let Some(key) = &self.api_key {
            query.push(("key", key.as_str()));
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("status {}", status));
        }

        resp.json::<PlaceDetails>()
            .await
            .map_err(|e| format!("unexpected body: {}", e))
    }
}

#[async_trait]
impl ReviewSource for HttpReviewSource {
    async fn fetch(&self) -> Vec<Review> {
        let details = match self.request().await {
            Ok(details) => details,
            Err(reason) => {
                tracing::warn!(place_id = %self.place_id, %reason, "review fetch failed, serving none");
                return Vec::new();
            }
        };

        if let Some(status) = details.status.as_deref().filter(|s| *s != "OK") {
            tracing::warn!(place_id = %self.place_id, status, "review API returned an error status");
            return Vec::new();
        }

        details
            .result
            .map(|r| r.reviews)
            .unwrap_or_default()
            .into_iter()
            .take(self.limit)
            .map(|r| Review {
                author: r.author_name,
                rating: r.rating,
                text: r.text,
                relative_time: r.relative_time_description,
            })
            .collect()
    }
}
