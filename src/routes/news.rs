use axum::extract::{Query, State};
use axum::{Json, Router};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::NewsItem;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_news))
        .route("/breaking", post(publish_breaking))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    pub symbol: Option<String>,
}

/// Cached headlines, fetching once when nothing has been polled yet.
pub async fn get_news(
    Query(query): Query<NewsQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<NewsItem>>, AppError> {
    info!("GET /api/news - symbol: {:?}", query.symbol);

    let cached = state.news.latest();
    if !cached.is_empty() {
        return Ok(Json(cached));
    }

    let items = state.news.fetch_latest(query.symbol.as_deref()).await?;
    Ok(Json(items))
}

#[derive(Debug, Deserialize)]
pub struct BreakingNewsRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Push an operator-supplied breaking headline to every subscriber.
pub async fn publish_breaking(
    State(state): State<AppState>,
    Json(body): Json<BreakingNewsRequest>,
) -> Result<Json<NewsItem>, AppError> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Breaking news needs a title".to_string()));
    }
    info!("POST /api/news/breaking - {}", title);

    Ok(Json(state.news.publish_breaking(title, body.description.trim())))
}

#[cfg(test)]
mod tests {
    use crate::app::create_app;
    use crate::state::test_support::state_with;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_news_fetches_when_cache_empty() {
        let state = state_with(None);
        let news = state.news.clone();
        assert!(news.latest().is_empty());

        let response = create_app(state)
            .oneshot(Request::get("/api/news?symbol=TCS.NS").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let items: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let count = items.as_array().unwrap().len();
        assert!((4..=6).contains(&count));
        assert_eq!(news.latest().len(), count);
        assert!(items[0]["publishedAt"].is_string());
    }

    #[tokio::test]
    async fn test_breaking_news_lands_first_in_cache() {
        let state = state_with(None);
        let news = state.news.clone();

        let request = Request::post("/api/news/breaking")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title": "RBI cuts repo rate", "description": "25 bps cut"}"#))
            .unwrap();
        let response = create_app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let latest = news.latest();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].title, "RBI cuts repo rate");
        assert!(latest[0].is_breaking);
    }

    #[tokio::test]
    async fn test_breaking_news_requires_title() {
        let request = Request::post("/api/news/breaking")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title": "   "}"#))
            .unwrap();
        let response = create_app(state_with(None)).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
