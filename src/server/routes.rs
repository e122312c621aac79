use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::alerts::{Alert, AlertCondition, AlertStatus};
use crate::dashboard::{self, MarketMovers, MarketSummary, Opportunity};
use crate::error::PipelineError;
use crate::export;
use crate::model::{Recommendation, Stock};
use crate::pipeline::{self, FilterConfig, PageConfig, RangeBound, SortConfig, SortDirection, SortKey};
use crate::portfolio::PortfolioReport;
use crate::screener::Preset;
use crate::sectors::{self, SectorBreakdown};

use super::metrics::MetricsEvent;
use super::ws;
use super::AppState;

pub(super) fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/summary", get(get_summary))
        .route("/api/stocks", get(list_stocks))
        .route("/api/stocks/:symbol", get(get_stock))
        .route("/api/sectors", get(get_sectors))
        .route("/api/screener/presets", get(get_presets))
        .route("/api/movers", get(get_movers))
        .route("/api/opportunities", get(get_opportunities))
        .route("/api/watchlist", get(get_watchlist).post(add_watchlist))
        .route("/api/watchlist/:symbol", axum::routing::delete(remove_watchlist))
        .route("/api/alerts", get(get_alerts).post(create_alert))
        .route(
            "/api/alerts/:id",
            axum::routing::put(update_alert).delete(delete_alert),
        )
        .route("/api/portfolio", get(get_portfolio).post(add_position))
        .route("/api/portfolio/:symbol", axum::routing::delete(remove_position))
        .route("/api/export/screener.csv", get(export_screener))
        .route("/api/export/watchlist.csv", get(export_watchlist))
        .route("/api/refresh", post(force_refresh))
        .route("/ws", get(ws::websocket_upgrade))
        .with_state(state)
}

#[derive(Debug)]
pub(super) enum ApiError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_summary(State(state): State<AppState>) -> Json<MarketSummary> {
    let store = state.store.read().await;
    Json(dashboard::market_summary(&store))
}

/// Query-string view of the filter/sort/page configuration, mirroring the
/// parameters the dashboard front end sends.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(super) struct StocksQuery {
    pub q: Option<String>,
    pub recommendation: Option<Recommendation>,
    pub sector: Option<String>,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_change_pct: Option<f64>,
    pub max_change_pct: Option<f64>,
    pub min_volume: Option<f64>,
    pub min_market_cap: Option<f64>,
    pub max_market_cap: Option<f64>,
    pub min_rsi: Option<f64>,
    pub max_rsi: Option<f64>,
    pub max_pe_ratio: Option<f64>,
    pub min_dividend_yield: Option<f64>,
    pub sort_by: Option<SortKey>,
    pub sort_order: Option<SortDirection>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl StocksQuery {
    fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            query: self.q.clone(),
            recommendation: self.recommendation,
            sector: self.sector.clone(),
            price: RangeBound {
                min: self.min_price,
                max: self.max_price,
            },
            score: RangeBound {
                min: self.min_score,
                max: self.max_score,
            },
            change_pct: RangeBound {
                min: self.min_change_pct,
                max: self.max_change_pct,
            },
            volume: RangeBound {
                min: self.min_volume,
                max: None,
            },
            market_cap: RangeBound {
                min: self.min_market_cap,
                max: self.max_market_cap,
            },
            rsi: RangeBound {
                min: self.min_rsi,
                max: self.max_rsi,
            },
            pe_ratio: RangeBound {
                min: None,
                max: self.max_pe_ratio,
            },
            dividend_yield: RangeBound {
                min: self.min_dividend_yield,
                max: None,
            },
        }
    }

    fn sort_config(&self) -> SortConfig {
        let default = SortConfig::default();
        SortConfig {
            key: self.sort_by.unwrap_or(default.key),
            direction: self.sort_order.unwrap_or(default.direction),
        }
    }

    fn page_config(&self, default_page_size: usize) -> PageConfig {
        PageConfig {
            size: self.per_page.unwrap_or(default_page_size),
            index: self.page.unwrap_or(1),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct StocksResponse {
    pub stocks: Vec<Stock>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub pages: usize,
}

async fn list_stocks(
    State(state): State<AppState>,
    Query(query): Query<StocksQuery>,
) -> Result<Json<StocksResponse>, ApiError> {
    let snapshot = {
        let store = state.store.read().await;
        store.snapshot()
    };
    let page = query.page_config(state.default_page_size);
    let output = pipeline::run(&snapshot, &query.filter_config(), &query.sort_config(), &page)?;

    Ok(Json(StocksResponse {
        stocks: output.visible,
        total: output.total_matching,
        page: page.index,
        per_page: page.size,
        pages: output.total_pages,
    }))
}

async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Stock>, ApiError> {
    let store = state.store.read().await;
    store
        .get(&symbol)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown symbol {symbol}")))
}

async fn get_sectors(State(state): State<AppState>) -> Json<Vec<SectorBreakdown>> {
    let store = state.store.read().await;
    Json(sectors::breakdown(&store))
}

#[derive(Debug, Serialize)]
pub(super) struct PresetInfo {
    pub name: Preset,
    pub description: &'static str,
    pub filters: FilterConfig,
}

async fn get_presets() -> Json<Vec<PresetInfo>> {
    Json(
        Preset::ALL
            .into_iter()
            .map(|preset| PresetInfo {
                name: preset,
                description: preset.describe(),
                filters: preset.filters(),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct MoversQuery {
    pub count: usize,
}

impl Default for MoversQuery {
    fn default() -> Self {
        Self { count: 5 }
    }
}

async fn get_movers(
    State(state): State<AppState>,
    Query(query): Query<MoversQuery>,
) -> Json<MarketMovers> {
    let store = state.store.read().await;
    Json(dashboard::movers(&store, query.count))
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct OpportunitiesQuery {
    pub limit: usize,
    pub min_score: f64,
}

impl Default for OpportunitiesQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            min_score: 80.0,
        }
    }
}

async fn get_opportunities(
    State(state): State<AppState>,
    Query(query): Query<OpportunitiesQuery>,
) -> Json<Vec<Opportunity>> {
    let store = state.store.read().await;
    Json(dashboard::top_opportunities(&store, query.limit, query.min_score))
}

async fn get_watchlist(State(state): State<AppState>) -> Json<Vec<Stock>> {
    let store = state.store.read().await;
    Json(store.watched_stocks())
}

#[derive(Debug, Deserialize)]
pub(super) struct WatchlistRequest {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub(super) struct WatchlistChange {
    pub symbol: String,
    pub watched: bool,
}

async fn add_watchlist(
    State(state): State<AppState>,
    Json(request): Json<WatchlistRequest>,
) -> Result<Json<WatchlistChange>, ApiError> {
    let mut store = state.store.write().await;
    if !store.contains(&request.symbol) {
        return Err(ApiError::NotFound(format!(
            "unknown symbol {}",
            request.symbol
        )));
    }
    store.watchlist.add(request.symbol.clone());
    Ok(Json(WatchlistChange {
        symbol: request.symbol,
        watched: true,
    }))
}

async fn remove_watchlist(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<WatchlistChange>, ApiError> {
    let mut store = state.store.write().await;
    if !store.watchlist.remove(&symbol) {
        return Err(ApiError::NotFound(format!("{symbol} is not watched")));
    }
    Ok(Json(WatchlistChange {
        symbol,
        watched: false,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct AlertsQuery {
    pub status: Option<AlertStatus>,
}

async fn get_alerts(
    State(state): State<AppState>,
    Query(query): Query<AlertsQuery>,
) -> Json<Vec<Alert>> {
    let store = state.store.read().await;
    Json(store.alerts.list(query.status).into_iter().cloned().collect())
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateAlert {
    pub symbol: String,
    #[serde(flatten)]
    pub condition: AlertCondition,
    #[serde(default)]
    pub message: String,
}

async fn create_alert(
    State(state): State<AppState>,
    Json(request): Json<CreateAlert>,
) -> Result<Json<Alert>, ApiError> {
    let mut store = state.store.write().await;
    if !store.contains(&request.symbol) {
        return Err(ApiError::NotFound(format!(
            "unknown symbol {}",
            request.symbol
        )));
    }
    let id = store.alerts.create(
        request.symbol,
        request.condition,
        request.message,
        Utc::now(),
    );
    let alert = store.alerts.get(id).cloned().ok_or_else(|| {
        ApiError::BadRequest("alert vanished after creation".to_string())
    })?;
    Ok(Json(alert))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateAlert {
    pub enabled: bool,
}

async fn update_alert(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateAlert>,
) -> Result<Json<Alert>, ApiError> {
    let mut store = state.store.write().await;
    if !store.alerts.set_enabled(id, request.enabled) {
        return Err(ApiError::NotFound(format!("unknown alert {id}")));
    }
    let alert = store
        .alerts
        .get(id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("unknown alert {id}")))?;
    Ok(Json(alert))
}

async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.store.write().await;
    if !store.alerts.remove(id) {
        return Err(ApiError::NotFound(format!("unknown alert {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_portfolio(State(state): State<AppState>) -> Json<PortfolioReport> {
    let store = state.store.read().await;
    Json(store.portfolio.report(store.quotes()))
}

#[derive(Debug, Deserialize)]
pub(super) struct AddPosition {
    pub symbol: String,
    pub shares: f64,
    pub cost_basis: f64,
}

async fn add_position(
    State(state): State<AppState>,
    Json(request): Json<AddPosition>,
) -> Result<Json<PortfolioReport>, ApiError> {
    if !(request.shares > 0.0) {
        return Err(ApiError::BadRequest("shares must be positive".to_string()));
    }
    if request.cost_basis < 0.0 {
        return Err(ApiError::BadRequest(
            "cost basis cannot be negative".to_string(),
        ));
    }

    let mut store = state.store.write().await;
    if !store.contains(&request.symbol) {
        return Err(ApiError::NotFound(format!(
            "unknown symbol {}",
            request.symbol
        )));
    }
    store
        .portfolio
        .add(request.symbol, request.shares, request.cost_basis, Utc::now());
    Ok(Json(store.portfolio.report(store.quotes())))
}

async fn remove_position(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PortfolioReport>, ApiError> {
    let mut store = state.store.write().await;
    if !store.portfolio.remove(&symbol) {
        return Err(ApiError::NotFound(format!("no position in {symbol}")));
    }
    Ok(Json(store.portfolio.report(store.quotes())))
}

async fn export_screener(
    State(state): State<AppState>,
    Query(query): Query<StocksQuery>,
) -> Result<Response, ApiError> {
    let snapshot = {
        let store = state.store.read().await;
        store.snapshot()
    };
    // Export always covers the full matching set; page parameters are for
    // the on-screen table only.
    let page = PageConfig {
        size: snapshot.len().max(1),
        index: 1,
    };
    let output = pipeline::run(&snapshot, &query.filter_config(), &query.sort_config(), &page)?;
    let body = export::screener_csv(&output.visible);

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"screener.csv\"",
            ),
        ],
        body,
    )
        .into_response())
}

async fn export_watchlist(State(state): State<AppState>) -> Response {
    let watched = {
        let store = state.store.read().await;
        store.watched_stocks()
    };
    let body = export::watchlist_csv(&watched);

    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"watchlist.csv\"",
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub(super) struct RefreshResponse {
    pub updated: usize,
    pub triggered_alerts: usize,
}

async fn force_refresh(State(state): State<AppState>) -> Json<RefreshResponse> {
    let outcome = {
        let mut store = state.store.write().await;
        let mut rng = StdRng::from_entropy();
        store.refresh(&mut rng)
    };

    state.metrics.report(MetricsEvent::RefreshBatch {
        quotes: outcome.batch.quotes.len(),
    });
    if !outcome.triggered_alerts.is_empty() {
        state.metrics.report(MetricsEvent::AlertsTriggered {
            count: outcome.triggered_alerts.len(),
        });
    }

    let updated = outcome.batch.quotes.len();
    let triggered = outcome.triggered_alerts.len();
    let _ = state.batches.send(outcome.batch);

    Json(RefreshResponse {
        updated,
        triggered_alerts: triggered,
    })
}
