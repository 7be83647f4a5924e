use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    error::{FlowError, StoreError},
    flows::AiFlows,
    models::{
        CategoryTotal, ClassificationRequest, ClassificationResult, CommunityPost, ImageGenerationRequest,
        ImageGenerationResult, LocationType, MapLocation, NearestLocation, NewCommunityPost, NewUpcycleIdea,
        NewWasteItem, NewWasteReport, ReuseSuggestionRequest, ReuseSuggestionResult, UpcycleIdea, WasteItem,
        WasteReport,
    },
    store::Stores,
};

#[derive(Clone)]
pub struct AppState {
    pub stores: Arc<Stores>,
    pub flows: Arc<AiFlows>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/classify", post(classify_waste))
        .route("/api/reuse-suggestions", post(suggest_reuses))
        .route("/api/images", post(generate_image))
        .route("/api/waste-log", get(list_waste_log).post(add_waste_item))
        .route("/api/waste-log/summary", get(waste_log_summary))
        .route("/api/waste-log/:id", put(update_waste_item).delete(remove_waste_item))
        .route("/api/reports", get(list_reports).post(add_report))
        .route("/api/reports/:id", get(get_report))
        .route("/api/reports/:id/directions", get(report_directions))
        .route("/api/locations", get(list_locations))
        .route("/api/locations/nearest", get(nearest_location))
        .route("/api/posts", get(search_posts).post(add_post))
        .route("/api/posts/:id/like", post(like_post))
        .route("/api/ideas", get(list_ideas).post(add_idea))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

// --- AI flows ---

pub async fn classify_waste(
    State(state): State<AppState>,
    Json(body): Json<ClassificationRequest>,
) -> Result<Json<ClassificationResult>, FlowError> {
    state.flows.classify_waste(&body).await.map(Json)
}

pub async fn suggest_reuses(
    State(state): State<AppState>,
    Json(body): Json<ReuseSuggestionRequest>,
) -> Result<Json<ReuseSuggestionResult>, FlowError> {
    state.flows.suggest_reuses(&body).await.map(Json)
}

pub async fn generate_image(
    State(state): State<AppState>,
    Json(body): Json<ImageGenerationRequest>,
) -> Result<Json<ImageGenerationResult>, FlowError> {
    state.flows.generate_image(&body.prompt).await.map(Json)
}

// --- Waste log ---

pub async fn list_waste_log(State(state): State<AppState>) -> Json<Vec<WasteItem>> {
    Json(state.stores.waste_log.list())
}

pub async fn add_waste_item(
    State(state): State<AppState>,
    Json(body): Json<NewWasteItem>,
) -> Result<(StatusCode, Json<WasteItem>), StoreError> {
    let item = state.stores.waste_log.add(body)?;
    tracing::info!("📝 Logged {} {} of {}", item.quantity, item.category, item.name);
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_waste_item(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(body): Json<NewWasteItem>,
) -> Result<Json<WasteItem>, StoreError> {
    state.stores.waste_log.update(id, body).map(Json)
}

pub async fn remove_waste_item(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, StoreError> {
    state.stores.waste_log.remove(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn waste_log_summary(State(state): State<AppState>) -> Json<Vec<CategoryTotal>> {
    Json(state.stores.waste_log.summary())
}

// --- Waste collection reports ---

#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub async fn list_reports(State(state): State<AppState>) -> Json<Vec<WasteReport>> {
    Json(state.stores.reports.list())
}

pub async fn add_report(
    State(state): State<AppState>,
    Json(body): Json<NewWasteReport>,
) -> Result<(StatusCode, Json<WasteReport>), StoreError> {
    let report = state.stores.reports.add(body)?;
    tracing::info!("📍 Collection report {} for '{}' at {},{}", report.id, report.item_name, report.latitude, report.longitude);
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_report(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<WasteReport>, StoreError> {
    state.stores.reports.get(id).map(Json)
}

pub async fn report_directions(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(origin): Query<CoordinatesQuery>,
) -> Result<Json<serde_json::Value>, StoreError> {
    let url = state.stores.reports.directions_url(id, origin.lat.zip(origin.lon))?;
    Ok(Json(serde_json::json!({ "url": url })))
}

// --- Map locations ---

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<LocationType>,
}

pub async fn list_locations(State(state): State<AppState>, Query(query): Query<LocationQuery>) -> Json<Vec<MapLocation>> {
    Json(state.stores.locations.filter(query.q.as_deref(), query.kind))
}

pub async fn nearest_location(
    State(state): State<AppState>,
    Query(query): Query<CoordinatesQuery>,
) -> Result<Json<NearestLocation>, StoreError> {
    let (lat, lon) = query
        .lat
        .zip(query.lon)
        .ok_or_else(|| StoreError::InvalidInput("lat and lon are required".into()))?;
    let nearest = state
        .stores
        .locations
        .nearest(lat, lon)?
        .ok_or_else(|| StoreError::NotFound("no locations available".into()))?;
    tracing::info!("🧭 Nearest location {} is {:.2} km away", nearest.location.name, nearest.distance_km);
    Ok(Json(nearest))
}

// --- Community ---

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search_posts(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> Json<Vec<CommunityPost>> {
    Json(state.stores.posts.search(query.q.as_deref()))
}

pub async fn add_post(
    State(state): State<AppState>,
    Json(body): Json<NewCommunityPost>,
) -> Result<(StatusCode, Json<CommunityPost>), StoreError> {
    let post = state.stores.posts.add(body)?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn like_post(Path(id): Path<Uuid>, State(state): State<AppState>) -> Result<Json<CommunityPost>, StoreError> {
    state.stores.posts.like(id).map(Json)
}

pub async fn list_ideas(State(state): State<AppState>) -> Json<Vec<UpcycleIdea>> {
    Json(state.stores.ideas.list())
}

pub async fn add_idea(
    State(state): State<AppState>,
    Json(body): Json<NewUpcycleIdea>,
) -> Result<(StatusCode, Json<UpcycleIdea>), StoreError> {
    let idea = state.stores.ideas.add(body)?;
    Ok((StatusCode::CREATED, Json(idea)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, flows::fake::ScriptedModel, gemini::GeminiError};
    use axum::{body::Body, http::Request};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(model: ScriptedModel) -> (Router, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        let config = Config::from_lookup(|_| None).unwrap();
        let state = AppState {
            stores: Arc::new(Stores::in_memory()),
            flows: Arc::new(AiFlows::new(model.clone(), &config)),
        };
        (router(state), model)
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn classify_rejects_malformed_uri_with_400() {
        let (app, model) = app(ScriptedModel::default());
        let (status, body) = call(&app, "POST", "/api/classify", Some(json!({ "photoDataUri": "not-a-data-uri" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("photoDataUri"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn classify_returns_validated_result() {
        let (app, _) = app(ScriptedModel::with_json(vec![Ok(json!({
            "recyclability": "unsure",
            "reuseSuggestions": [],
            "recycleChannels": [],
            "donateSuggestions": ["Clothing bank"]
        }))]));
        let (status, body) = call(&app, "POST", "/api/classify", Some(json!({ "photoDataUri": "data:image/jpeg;base64,/9j/4AAQ" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recyclability"], "unsure");
        assert_eq!(body["donateSuggestions"], json!(["Clothing bank"]));
    }

    #[tokio::test]
    async fn generation_failure_maps_to_bad_gateway() {
        let (app, _) = app(ScriptedModel::with_json(vec![Err(GeminiError::Status { status: 400, body: "quota".into() })]));
        let (status, body) = call(&app, "POST", "/api/reuse-suggestions", Some(json!({ "wasteItem": "plastic bottle" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(!body["error"].as_str().unwrap().contains("quota"));
    }

    #[tokio::test]
    async fn waste_log_crud_over_http() {
        let (app, _) = app(ScriptedModel::default());
        let (status, first) = call(&app, "POST", "/api/waste-log", Some(json!({ "name": "Cans", "category": "Metal", "quantity": 3 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, second) = call(&app, "POST", "/api/waste-log", Some(json!({ "name": "Jars", "category": "Glass", "quantity": 2 }))).await;

        let uri = format!("/api/waste-log/{}", first["id"].as_str().unwrap());
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, listed) = call(&app, "GET", "/api/waste-log", None).await;
        assert_eq!(listed, json!([second]));
        let (_, summary) = call(&app, "GET", "/api/waste-log/summary", None).await;
        assert_eq!(summary, json!([{ "category": "Glass", "quantity": 2.0 }]));
    }

    #[tokio::test]
    async fn locations_filter_and_nearest() {
        let (app, _) = app(ScriptedModel::default());
        let (_, recyclers) = call(&app, "GET", "/api/locations?type=Recycler", None).await;
        assert_eq!(recyclers.as_array().unwrap().len(), 2);
        let (_, nearest) = call(&app, "GET", "/api/locations/nearest?lat=12.9293&lon=77.5824", None).await;
        assert_eq!(nearest["location"]["name"], "Jayanagar E-Waste Collection");
        let (status, _) = call(&app, "GET", "/api/locations/nearest?lat=12.9", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn posts_and_ideas_are_prepended() {
        let (app, _) = app(ScriptedModel::default());
        let (status, post) = call(&app, "POST", "/api/posts", Some(json!({ "content": "Composted 2kg this week" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, found) = call(&app, "GET", "/api/posts?q=composted", None).await;
        assert_eq!(found[0]["id"], post["id"]);

        let (status, _) = call(&app, "POST", "/api/ideas", Some(json!({ "itemName": "Tyre", "ideaDescription": "Garden seat" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (_, ideas) = call(&app, "GET", "/api/ideas", None).await;
        assert_eq!(ideas[0]["itemName"], "Tyre");
    }
}
