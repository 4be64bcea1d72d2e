//! # API Handlers
//!
//! Axum handlers for the tours resource. Every body is JSend:
//! `{"status": "success", "data": {...}}` on success, see [`AppError`]
//! for failures.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, RawQuery, State},
    http::{Method, StatusCode, Uri},
    Json,
};
use nt_query::{ListQueryBuilder, Predicate, QueryHandle, QueryParameters};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::tours::{self, stats};
use crate::AppState;

type ApiResult<T> = Result<T, AppError>;

const TOUR_NOT_FOUND: &str = "No tour found with that ID";

// =============================================================================
// Listing
// =============================================================================

/// `GET /api/v1/tours?difficulty=easy&price[lt]=1000&sort=-price&fields=name&page=2&limit=10`
pub async fn get_all_tours(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Json<Value>> {
    let params = QueryParameters::parse(raw.as_deref().unwrap_or_default());
    list_tours(&state, params).await
}

/// `GET /api/v1/tours/top-5-cheap`: the list endpoint with its query
/// pre-filled. Filters from the client still apply.
pub async fn top_five_cheap(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> ApiResult<Json<Value>> {
    let mut params = QueryParameters::parse(raw.as_deref().unwrap_or_default());
    params.insert("limit", "5");
    params.insert("sort", "-ratingsAverage,price");
    params.insert("fields", "name,price,ratingsAverage,summary,difficulty");
    list_tours(&state, params).await
}

async fn list_tours(state: &AppState, params: QueryParameters) -> ApiResult<Json<Value>> {
    let query = state.tours.find().with_filter(tours::public_filter());

    let docs = ListQueryBuilder::new(query, params)
        .filter()
        .sort()
        .limit_fields()
        .paginate()
        .into_query()
        .exec()
        .await?;

    // An empty page is not an error
    let tours: Vec<Value> = docs.into_iter().map(tours::present).collect();
    Ok(Json(json!({
        "status": "success",
        "results": tours.len(),
        "data": { "tours": tours },
    })))
}

// =============================================================================
// Single tours
// =============================================================================

pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let tour = find_public(&state, &id).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "tour": tours::present(tour) },
    })))
}

pub async fn create_tour(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(body) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    let doc = tours::prepare_new(body).map_err(|errors| AppError::validation(&errors))?;
    let tour = state.tours.insert(doc).await?;

    let id = tour.get(nt_store::ID_FIELD).cloned().unwrap_or_default();
    tracing::info!("Created tour {}", id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "tour": tours::present(tour) },
        })),
    ))
}

pub async fn update_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    find_public(&state, &id).await?;

    let patch = tours::prepare_patch(body).map_err(|errors| AppError::validation(&errors))?;
    let tour = state.tours.update_by_id(&id, patch).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "tour": tours::present(tour) },
    })))
}

pub async fn delete_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    find_public(&state, &id).await?;
    state.tours.delete_by_id(&id).await?;
    tracing::info!("Deleted tour {}", id);
    Ok(StatusCode::NO_CONTENT)
}

async fn find_public(state: &AppState, id: &str) -> ApiResult<nt_store::Document> {
    let filter = tours::public_filter().and(Predicate::eq(nt_store::ID_FIELD, id));
    state
        .tours
        .find_one(&filter)
        .await?
        .ok_or_else(|| AppError::not_found(TOUR_NOT_FOUND))
}

// =============================================================================
// Aggregations
// =============================================================================

pub async fn get_tour_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let docs = state.tours.documents(&tours::public_filter()).await?;
    let stats = stats::tour_stats(&docs);
    Ok(Json(json!({
        "status": "success",
        "data": { "stats": stats },
    })))
}

pub async fn get_monthly_plan(
    State(state): State<Arc<AppState>>,
    Path(year): Path<String>,
) -> ApiResult<Json<Value>> {
    let year: i32 = year
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid year: {}.", year)))?;

    let docs = state.tours.documents(&tours::public_filter()).await?;
    let plan = stats::monthly_plan(&docs, year);
    Ok(Json(json!({
        "status": "success",
        "data": { "plan": plan },
    })))
}

// =============================================================================
// Fallback
// =============================================================================

pub async fn not_found(method: Method, uri: Uri) -> AppError {
    AppError::not_found(format!("Can't find {} {} on this server!", method, uri))
}
