//! HTTP routes for the econ-watch service.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use econ_common::security::verify_token;

use crate::pipeline::{CycleError, Evaluation};
use crate::WatchState;

/// Header carrying the shared trigger secret.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Requests carry no meaningful body; anything larger is rejected.
const MAX_BODY_BYTES: usize = 16 * 1024;

// ============================================================================
// Errors
// ============================================================================

/// Error returned by handlers, rendered as JSON with a matching status.
#[derive(Debug)]
pub struct ApiError(pub econ_common::Error);

impl From<econ_common::Error> for ApiError {
    fn from(err: econ_common::Error) -> Self {
        Self(err)
    }
}

impl From<CycleError> for ApiError {
    fn from(err: CycleError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({
            "success": false,
            "error": self.0.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

fn authorize(state: &WatchState, headers: &HeaderMap) -> Result<(), ApiError> {
    let presented = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());
    if verify_token(state.config.trigger_token(), presented) {
        Ok(())
    } else {
        tracing::warn!(has_token = presented.is_some(), "Rejected unauthorized request");
        Err(econ_common::Error::Auth("Unauthorized".to_string()).into())
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub time: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub data_source: String,
    pub fred_configured: bool,
    pub notifier: String,
    pub notifier_enabled: bool,
    pub indicators: usize,
    pub scheduler_running: bool,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub status: String,
    pub market_phase: String,
    pub risk_level: String,
    pub risk_percent: u8,
    pub delivered: bool,
}

#[derive(Debug, Serialize)]
pub struct TestResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleEntry {
    pub task: String,
    pub next_run: String,
    pub next_run_local: String,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub enabled: bool,
    pub timezone: String,
    pub schedules: Vec<ScheduleEntry>,
}

// ============================================================================
// Router
// ============================================================================

pub fn build_router(state: Arc<WatchState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/trigger", post(trigger))
        .route("/test", post(send_test))
        .route("/api/v1/analysis", get(get_analysis))
        .route("/api/v1/schedule", get(get_schedule))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn index(State(state): State<Arc<WatchState>>) -> Json<IndexResponse> {
    let offset = state.pipeline.formatter().offset();
    Json(IndexResponse {
        service: "econ-watch".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        time: format!(
            "{} {}",
            Utc::now().with_timezone(&offset).format("%Y-%m-%d %H:%M:%S"),
            state.config.schedule.timezone_label
        ),
    })
}

async fn health(State(state): State<Arc<WatchState>>) -> Json<HealthResponse> {
    let scheduler_running =
        state.scheduler.get_state().await == crate::scheduler::SchedulerState::Running;

    Json(HealthResponse {
        status: "healthy".to_string(),
        components: ComponentStatus {
            data_source: state.pipeline.source().name().to_string(),
            fred_configured: state.config.fred_api_key().is_some(),
            notifier: state.pipeline.notifier().name().to_string(),
            notifier_enabled: state.pipeline.notifier().is_enabled(),
            indicators: state.pipeline.catalog().len(),
            scheduler_running,
        },
    })
}

/// Run the daily report now.
async fn trigger(
    State(state): State<Arc<WatchState>>,
    headers: HeaderMap,
) -> Result<Json<TriggerResponse>, Response> {
    authorize(&state, &headers).map_err(IntoResponse::into_response)?;

    match state.pipeline.run_daily_report().await {
        Ok(report) => Ok(Json(TriggerResponse {
            status: "success".to_string(),
            market_phase: report.analysis.market_phase.label().to_string(),
            risk_level: report.analysis.risk.tier.label().to_string(),
            risk_percent: report.analysis.risk.percent,
            delivered: report.delivered,
        })),
        Err(e) => {
            tracing::error!(error = %e, "Manual report trigger failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "status": "error", "error": e.to_string() })),
            )
                .into_response())
        }
    }
}

async fn send_test(
    State(state): State<Arc<WatchState>>,
    headers: HeaderMap,
) -> Result<Json<TestResponse>, ApiError> {
    authorize(&state, &headers)?;

    let delivered = state.pipeline.send_test_message().await;
    Ok(Json(TestResponse {
        status: if delivered { "success" } else { "failed" }.to_string(),
    }))
}

/// Evaluate without sending anything.
async fn get_analysis(
    State(state): State<Arc<WatchState>>,
    headers: HeaderMap,
) -> Result<Json<Evaluation>, ApiError> {
    authorize(&state, &headers)?;
    Ok(Json(state.pipeline.evaluate().await?))
}

async fn get_schedule(State(state): State<Arc<WatchState>>) -> Json<ScheduleResponse> {
    let offset = state.scheduler.offset();
    let schedules = state
        .scheduler
        .get_next_schedules()
        .into_iter()
        .map(|(task, next)| ScheduleEntry {
            task: task.name().to_string(),
            next_run: next.to_rfc3339(),
            next_run_local: next.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    Json(ScheduleResponse {
        enabled: state.config.schedule.enabled,
        timezone: state.config.schedule.timezone_label.clone(),
        schedules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSource, SeriesPoint, SourceError};
    use crate::notification::Notifier;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::NaiveDate;
    use econ_common::Config;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct UnemploymentOnly;

    #[async_trait]
    impl DataSource for UnemploymentOnly {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn health_check(&self) -> Result<(), SourceError> {
            Ok(())
        }

        async fn fetch_series(&self, code: &str) -> Result<Vec<SeriesPoint>, SourceError> {
            let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
            match code {
                "UNRATE" => Ok(vec![SeriesPoint::new(date, 4.2)]),
                _ => Err(SourceError::NoData(code.to_string())),
            }
        }
    }

    struct EmptySource;

    #[async_trait]
    impl DataSource for EmptySource {
        fn name(&self) -> &'static str {
            "empty"
        }

        async fn health_check(&self) -> Result<(), SourceError> {
            Err(SourceError::Network("down".into()))
        }

        async fn fetch_series(&self, code: &str) -> Result<Vec<SeriesPoint>, SourceError> {
            Err(SourceError::NoData(code.to_string()))
        }
    }

    struct AcceptingNotifier;

    #[async_trait]
    impl Notifier for AcceptingNotifier {
        fn name(&self) -> &'static str {
            "accepting"
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn send(&self, _text: &str) -> bool {
            true
        }
    }

    fn config(token: Option<&str>) -> Config {
        let mut config = Config::default();
        config.secrets.trigger_token = token.map(String::from);
        config
    }

    fn app_with(source: Arc<dyn DataSource>, token: Option<&str>) -> Router {
        let state = WatchState::with_components(config(token), source, Arc::new(AcceptingNotifier))
            .unwrap();
        build_router(Arc::new(state))
    }

    fn test_app() -> Router {
        app_with(Arc::new(UnemploymentOnly), Some("s3cret"))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTH_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_index() {
        let response = test_app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], "econ-watch");
        assert!(json["time"].as_str().unwrap().ends_with("KST"));
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["components"]["indicators"], 26);
        assert_eq!(json["components"]["notifier_enabled"], true);
        assert_eq!(json["components"]["fred_configured"], false);
    }

    #[tokio::test]
    async fn test_trigger_requires_token() {
        let response = test_app().oneshot(post("/trigger", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = test_app().oneshot(post("/trigger", Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_trigger_rejected_when_no_token_configured() {
        let app = app_with(Arc::new(UnemploymentOnly), None);
        let response = app.oneshot(post("/trigger", Some(""))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_trigger_runs_report() {
        let response = test_app().oneshot(post("/trigger", Some("s3cret"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["market_phase"], "Transition");
        assert_eq!(json["delivered"], true);
    }

    #[tokio::test]
    async fn test_trigger_cycle_error_is_500() {
        let app = app_with(Arc::new(EmptySource), Some("s3cret"));
        let response = app.oneshot(post("/trigger", Some("s3cret"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
    }

    #[tokio::test]
    async fn test_send_test_message() {
        let response = test_app().oneshot(post("/test", Some("s3cret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "success");
    }

    #[tokio::test]
    async fn test_analysis_preview() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/analysis")
                    .header(AUTH_HEADER, "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["analysis"]["summary"]["updated"], 1);
        assert_eq!(json["analysis"]["assessments"][0]["code"], "UNRATE");
        assert!(json["yield_curve"].is_null());
    }

    #[tokio::test]
    async fn test_analysis_without_data_is_unavailable() {
        let app = app_with(Arc::new(EmptySource), Some("s3cret"));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/analysis")
                    .header(AUTH_HEADER, "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_schedule() {
        let response = test_app()
            .oneshot(Request::builder().uri("/api/v1/schedule").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["timezone"], "KST");
        assert_eq!(json["schedules"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_api_error_status() {
        let response = ApiError(econ_common::Error::Auth("nope".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
