// HTTP request handlers
use crate::application::chart_controller::{ChartState, ChartUpdate};
use crate::application::chart_editor::ChartEditor;
use crate::application::dashboard_view::{DashboardView, ViewCommand};
use crate::application::errors::FetchError;
use crate::application::layout_store::DashboardSnapshot;
use crate::application::live_refresh::RefreshState;
use crate::application::pipeline_runner::PipelineRunner;
use crate::application::request_lifecycle::FetchScope;
use crate::application::view_registry::ViewId;
use crate::domain::chart::Chart;
use crate::domain::dashboard::{Dashboard, LayoutEntry, LayoutMismatch};
use crate::domain::pipeline::{Pipeline, PipelineSummary};
use crate::domain::series::{Series, SeriesGrouper};
use crate::infrastructure::chunked_json::chunked_json_stream;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SeriesQuery {
    pub limit: Option<usize>,
    pub grouping: Option<String>,
}

#[derive(Deserialize)]
pub struct LiveQuery {
    pub live: Option<bool>,
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub pipeline_id: Option<String>,
}

#[derive(Deserialize)]
pub struct LayoutUpdate {
    pub charts_layout: Vec<LayoutEntry>,
}

#[derive(Deserialize)]
pub struct SwitchRequest {
    pub dashboard_id: String,
}

#[derive(Deserialize)]
pub struct SaveChartRequest {
    pub chart_id: String,
    pub name: String,
    pub pipeline_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct RefreshAccepted {
    charts: usize,
}

/// One frame of a dashboard stream
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ViewEvent {
    /// Sent first, and again whenever the dashboard or its layout changes
    Skeleton {
        view_id: ViewId,
        dashboard: Dashboard,
        reconciled: Option<LayoutMismatch>,
        refresh: RefreshState,
    },
    Refresh(RefreshState),
    Chart(ChartUpdate),
}

impl ViewEvent {
    fn skeleton(view_id: ViewId, snapshot: DashboardSnapshot, refresh: RefreshState) -> Self {
        ViewEvent::Skeleton {
            view_id,
            dashboard: snapshot.dashboard,
            reconciled: snapshot.reconciled,
            refresh,
        }
    }
}

#[derive(Serialize)]
struct EditorBody<'a> {
    chart: &'a Chart,
    pipelines: &'a [PipelineSummary],
    pipeline: Option<&'a Pipeline>,
    preview: ChartState,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/", get(list_pipelines))
        .route("/pipelines/:id", get(pipeline_detail))
        .route("/pipelines/:id/series", get(pipeline_series))
        .route("/dashboards/:id/stream", get(stream_dashboard))
        .route("/dashboards/:dashboard_id/charts", post(save_chart))
        .route(
            "/dashboards/:dashboard_id/charts/:chart_id",
            delete(delete_chart),
        )
        .route(
            "/dashboards/:dashboard_id/charts/:chart_id/preview",
            get(preview_chart),
        )
        .route("/views/:view_id/live", post(set_live))
        .route("/views/:view_id/refresh", post(refresh_view))
        .route("/views/:view_id/layout", patch(update_layout))
        .route("/views/:view_id/dashboard", post(switch_dashboard))
        .with_state(state)
}

fn error_status(err: &FetchError) -> StatusCode {
    match err {
        FetchError::NotFound(_) => StatusCode::NOT_FOUND,
        FetchError::ExecutionFailed(_) => StatusCode::BAD_GATEWAY,
        FetchError::IntegrityMismatch(_) => StatusCode::UNPROCESSABLE_ENTITY,
        // Local state was kept; only the server copy is stale
        FetchError::LayoutPersistFailed(_) => StatusCode::ACCEPTED,
        FetchError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, compress: bool) -> Response {
    match json_response(status, data, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn error_response(err: FetchError, compress: bool) -> Response {
    let body = ErrorBody {
        error: err.to_string(),
    };
    respond(error_status(&err), &body, compress).await
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all pipelines. Also the landing page for dashboards that do not exist.
pub async fn list_pipelines(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let compress = accepts_brotli(&headers);
    let scope = FetchScope::new(state.view_config.soft_timeout);

    let pipelines = match state.catalog.list_pipelines(&scope).await {
        Ok(pipelines) => pipelines,
        Err(e) => {
            tracing::warn!("Error listing pipelines: {}", e);
            // Return empty list on error
            Vec::new()
        }
    };
    respond(StatusCode::OK, &pipelines, compress).await
}

pub async fn pipeline_detail(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let scope = FetchScope::new(state.view_config.soft_timeout);

    match state.catalog.pipeline(&id, &scope).await {
        Ok(pipeline) => respond(StatusCode::OK, &pipeline, compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

/// Run a pipeline once and return its rows grouped into series
pub async fn pipeline_series(
    Path(id): Path<String>,
    Query(query): Query<SeriesQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let config = &state.view_config;
    let scope = FetchScope::new(config.soft_timeout);
    let runner = PipelineRunner::new(state.api.clone(), config.row_limit);

    match runner.run(&id, query.limit, &scope).await {
        Ok(rows) => {
            let mut series = SeriesGrouper::new(config.missing_values).group(&rows);
            if let Some(grouping) = &query.grouping {
                series.retain(|s| &s.name == grouping);
            }
            respond::<Vec<Series>>(StatusCode::OK, &series, compress).await
        }
        Err(e) => error_response(e, compress).await,
    }
}

/// Stream a dashboard (progressive loading).
///
/// The connection is the view: the first frame is the dashboard skeleton
/// carrying the view id that `/views/:view_id/*` commands address, then one
/// frame per chart state change, refresh state change or layout change.
/// Closing the connection unregisters the view, which unmounts it: pending
/// fetches are cancelled and the live timer stops.
pub async fn stream_dashboard(
    Path(id): Path<String>,
    Query(query): Query<LiveQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let mut view = match DashboardView::mount(state.api.clone(), &id, state.view_config.clone()).await {
        Ok(view) => view,
        Err(FetchError::NotFound(what)) => {
            tracing::info!("{} not found, redirecting to pipeline list", what);
            return Redirect::to("/").into_response();
        }
        Err(e) => return error_response(e, compress).await,
    };

    if query.live.unwrap_or(false) {
        view.set_live(true);
    }

    let (registration, commands) = state.views.register();
    let view_id = registration.id();
    let feed = view.updates();
    let mut refresh = view.subscribe_refresh();
    let mut snapshots = view.subscribe_snapshot();
    let skeleton = ViewEvent::skeleton(view_id, view.snapshot(), view.refresh_state());
    tokio::spawn(view.serve(commands));

    let events = async_stream::stream! {
        let _registration = registration;
        yield skeleton;
        loop {
            // Layout and dashboard changes go out before the chart frames that follow them
            let event = tokio::select! {
                biased;
                changed = snapshots.changed() => match changed {
                    Ok(()) => {
                        let snapshot = snapshots.borrow_and_update().clone();
                        let current = refresh.borrow().clone();
                        ViewEvent::skeleton(view_id, snapshot, current)
                    }
                    Err(_) => break,
                },
                changed = refresh.changed() => match changed {
                    Ok(()) => {
                        let current = refresh.borrow_and_update().clone();
                        ViewEvent::Refresh(current)
                    }
                    Err(_) => break,
                },
                update = feed.next() => ViewEvent::Chart(update),
            };
            yield event;
        }
    };

    match chunked_json_stream(events, compress).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Turn live refresh on or off (`?live=`), or flip it when no value is given
pub async fn set_live(
    Path(view_id): Path<ViewId>,
    Query(query): Query<LiveQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let result = state
        .views
        .send(view_id, |reply| ViewCommand::SetLive {
            live: query.live,
            reply,
        })
        .await;
    match result {
        Ok(refresh) => respond(StatusCode::OK, &refresh, compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

pub async fn refresh_view(
    Path(view_id): Path<ViewId>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    match state
        .views
        .send(view_id, |reply| ViewCommand::RefreshNow { reply })
        .await
    {
        Ok(charts) => respond(StatusCode::ACCEPTED, &RefreshAccepted { charts }, compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

/// Apply a dragged/resized layout to a mounted view
pub async fn update_layout(
    Path(view_id): Path<ViewId>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<LayoutUpdate>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let result = state
        .views
        .send(view_id, |reply| ViewCommand::UpdateLayout {
            layout: body.charts_layout,
            reply,
        })
        .await
        .and_then(|outcome| outcome);
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e, compress).await,
    }
}

/// Show another dashboard in a mounted view. A missing dashboard leaves the
/// view on the one it shows.
pub async fn switch_dashboard(
    Path(view_id): Path<ViewId>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SwitchRequest>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let result = state
        .views
        .send(view_id, |reply| ViewCommand::SwitchDashboard {
            dashboard_id: body.dashboard_id,
            reply,
        })
        .await
        .and_then(|outcome| outcome);
    match result {
        Ok(snapshot) => respond(StatusCode::OK, &snapshot, compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

/// Open a chart in the editor and return its preview, optionally against
/// another pipeline
pub async fn preview_chart(
    Path((dashboard_id, chart_id)): Path<(String, String)>,
    Query(query): Query<PreviewQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let mut editor =
        match ChartEditor::open(state.catalog.clone(), &dashboard_id, &chart_id, &state.view_config).await {
            Ok(editor) => editor,
            Err(e) => return error_response(e, compress).await,
        };
    if let Some(pipeline_id) = &query.pipeline_id {
        if let Err(e) = editor.select_pipeline(pipeline_id).await {
            return error_response(e, compress).await;
        }
    }

    let body = EditorBody {
        chart: editor.chart(),
        pipelines: editor.pipelines(),
        pipeline: editor.pipeline(),
        preview: editor.preview(),
    };
    respond(StatusCode::OK, &body, compress).await
}

pub async fn save_chart(
    Path(dashboard_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(body): Json<SaveChartRequest>,
) -> Response {
    let compress = accepts_brotli(&headers);

    let mut editor =
        match ChartEditor::open(state.catalog.clone(), &dashboard_id, &body.chart_id, &state.view_config).await
        {
            Ok(editor) => editor,
            Err(e) => return error_response(e, compress).await,
        };
    if let Some(pipeline_id) = &body.pipeline_id {
        if pipeline_id != &editor.chart().pipeline_id {
            if let Err(e) = editor.select_pipeline(pipeline_id).await {
                return error_response(e, compress).await;
            }
        }
    }

    match editor.save(&body.name).await {
        Ok(chart) => respond(StatusCode::OK, chart, compress).await,
        Err(e) => error_response(e, compress).await,
    }
}

pub async fn delete_chart(
    Path((dashboard_id, chart_id)): Path<(String, String)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let compress = accepts_brotli(&headers);
    let scope = FetchScope::new(state.view_config.soft_timeout);

    match state.catalog.delete_chart(&dashboard_id, &chart_id, &scope).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e, compress).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_view::ViewConfig;
    use crate::application::test_support::{FakeDashboardApi, dashboard_with_charts};
    use crate::domain::pipeline::PipelineResultRow;
    use serde_json::{Value, json};
    use std::time::Duration;

    struct Server {
        base: String,
        api: Arc<FakeDashboardApi>,
        state: Arc<AppState>,
    }

    fn fake_api() -> FakeDashboardApi {
        FakeDashboardApi::default()
            .with_dashboard(dashboard_with_charts("d1", &["p1", "p2"]))
            .with_dashboard(dashboard_with_charts("d2", &["p1"]))
            .with_pipeline("p1", "Temperatures")
            .with_pipeline("p2", "Salinity")
            .with_rows(
                "p1",
                vec![
                    PipelineResultRow::new(1, 5, Some("a")),
                    PipelineResultRow::new(1, 6, Some("b")),
                    PipelineResultRow::new(2, 7, Some("a")),
                ],
            )
            .with_run_failure("p2", "stage 2 invalid")
    }

    async fn serve_with(api: FakeDashboardApi, config: ViewConfig) -> Server {
        let api = Arc::new(api);
        let state = Arc::new(AppState::new(api.clone(), config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Server {
            base: format!("http://{addr}"),
            api,
            state,
        }
    }

    async fn serve(api: FakeDashboardApi) -> Server {
        serve_with(api, ViewConfig::default()).await
    }

    /// Reader over the length-prefixed frames of a dashboard stream
    struct Frames {
        response: reqwest::Response,
        buf: Vec<u8>,
    }

    impl Frames {
        async fn open(url: String) -> Self {
            let response = reqwest::get(url).await.unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::OK);
            Self {
                response,
                buf: Vec::new(),
            }
        }

        async fn next(&mut self) -> Value {
            tokio::time::timeout(Duration::from_secs(5), async {
                loop {
                    if self.buf.len() >= 4 {
                        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
                        if self.buf.len() >= 4 + len {
                            let frame: Vec<u8> = self.buf.drain(..4 + len).skip(4).collect();
                            return serde_json::from_slice(&frame).unwrap();
                        }
                    }
                    let chunk = self.response.chunk().await.unwrap().expect("stream ended");
                    self.buf.extend_from_slice(&chunk);
                }
            })
            .await
            .expect("no frame within 5s")
        }

        /// Skip frames until one matches
        async fn until(&mut self, matches: impl Fn(&Value) -> bool) -> Value {
            for _ in 0..50 {
                let frame = self.next().await;
                if matches(&frame) {
                    return frame;
                }
            }
            panic!("no matching frame in 50 frames");
        }
    }

    #[tokio::test]
    async fn test_series_endpoint_status_codes() {
        let server = serve(fake_api()).await;
        let base = &server.base;

        let ok: Value = reqwest::get(format!("{base}/pipelines/p1/series"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(
            ok,
            json!([
                {"name": "a", "x": [1, 2], "y": [5, 7]},
                {"name": "b", "x": [1], "y": [6]}
            ])
        );

        let filtered: Value = reqwest::get(format!("{base}/pipelines/p1/series?grouping=b"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(filtered.as_array().unwrap().len(), 1);

        let failed = reqwest::get(format!("{base}/pipelines/p2/series")).await.unwrap();
        assert_eq!(failed.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: Value = failed.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("stage 2 invalid"));

        let missing = reqwest::get(format!("{base}/pipelines/p9/series")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stream_sends_skeleton_then_chart_frames() {
        let server = serve(fake_api()).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream", server.base)).await;

        let skeleton = frames.next().await;
        assert_eq!(skeleton["type"], "skeleton");
        assert!(skeleton["view_id"].as_u64().is_some());
        assert_eq!(skeleton["dashboard"]["charts"].as_array().unwrap().len(), 2);
        assert_eq!(skeleton["reconciled"], Value::Null);
        assert_eq!(skeleton["refresh"]["is_live"], false);

        let chart = frames.next().await;
        assert_eq!(chart["type"], "chart");
        assert!(chart["chart_id"] == "c0" || chart["chart_id"] == "c1");
    }

    #[tokio::test]
    async fn test_stream_of_missing_dashboard_redirects_to_pipeline_list() {
        let server = serve(fake_api()).await;

        let response = reqwest::get(format!("{}/dashboards/d9/stream", server.base)).await.unwrap();

        assert_eq!(response.url().path(), "/");
        let pipelines: Value = response.json().await.unwrap();
        assert_eq!(pipelines.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_live_toggle_reaches_the_streamed_view() {
        let server = serve(fake_api()).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream", server.base)).await;
        let view_id = frames.next().await["view_id"].as_u64().unwrap();
        let client = reqwest::Client::new();

        let on: Value = client
            .post(format!("{}/views/{view_id}/live", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(on["is_live"], true);
        let frame = frames.until(|f| f["type"] == "refresh").await;
        assert_eq!(frame["is_live"], true);

        let off: Value = client
            .post(format!("{}/views/{view_id}/live?live=false", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(off["is_live"], false);
        let frame = frames.until(|f| f["type"] == "refresh").await;
        assert_eq!(frame["is_live"], false);
    }

    #[tokio::test]
    async fn test_manual_refresh_reaches_the_streamed_view() {
        let server = serve(fake_api()).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream", server.base)).await;
        let view_id = frames.next().await["view_id"].as_u64().unwrap();

        let response = reqwest::Client::new()
            .post(format!("{}/views/{view_id}/refresh", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        assert_eq!(response.json::<Value>().await.unwrap()["charts"], 2);

        let fresh = frames
            .until(|f| f["type"] == "chart" && f["chart_id"] == "c0" && !f["last_updated"].is_null())
            .await;
        assert_eq!(fresh["state"]["status"], "ready");
        assert_eq!(
            server.api.run_calls().iter().filter(|p| *p == "p1").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_layout_update_reaches_the_streamed_view() {
        let server = serve(fake_api()).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream", server.base)).await;
        let view_id = frames.next().await["view_id"].as_u64().unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/views/{view_id}/layout", server.base);

        let short = client
            .patch(&url)
            .json(&json!({"charts_layout": [{"i": "c0", "x": 0, "y": 0, "w": 6, "h": 4}]}))
            .send()
            .await
            .unwrap();
        assert_eq!(short.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(server.api.patches().is_empty());

        let layout = json!({"charts_layout": [
            {"i": "c0", "x": 0, "y": 0, "w": 12, "h": 4},
            {"i": "c1", "x": 0, "y": 4, "w": 12, "h": 4}
        ]});
        let ok = client.patch(&url).json(&layout).send().await.unwrap();
        assert_eq!(ok.status(), reqwest::StatusCode::NO_CONTENT);
        assert_eq!(server.api.dashboard("d1").unwrap().charts_layout[1].y, 4);

        let skeleton = frames.until(|f| f["type"] == "skeleton").await;
        assert_eq!(skeleton["dashboard"]["charts_layout"], layout["charts_layout"]);
    }

    #[tokio::test]
    async fn test_layout_persist_failure_keeps_view_layout() {
        let server = serve(fake_api().failing_patches()).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream", server.base)).await;
        let view_id = frames.next().await["view_id"].as_u64().unwrap();
        let layout = json!({"charts_layout": [
            {"i": "c0", "x": 6, "y": 0, "w": 6, "h": 4},
            {"i": "c1", "x": 0, "y": 0, "w": 6, "h": 4}
        ]});

        let response = reqwest::Client::new()
            .patch(format!("{}/views/{view_id}/layout", server.base))
            .json(&layout)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("connection reset"));
        let skeleton = frames.until(|f| f["type"] == "skeleton").await;
        assert_eq!(skeleton["dashboard"]["charts_layout"], layout["charts_layout"]);
    }

    #[tokio::test]
    async fn test_switch_dashboard_in_the_streamed_view() {
        let server = serve(fake_api()).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream", server.base)).await;
        let view_id = frames.next().await["view_id"].as_u64().unwrap();
        let client = reqwest::Client::new();
        let url = format!("{}/views/{view_id}/dashboard", server.base);

        let missing = client
            .post(&url)
            .json(&json!({"dashboard_id": "d9"}))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let switched = client
            .post(&url)
            .json(&json!({"dashboard_id": "d2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(switched.status(), reqwest::StatusCode::OK);
        assert_eq!(switched.json::<Value>().await.unwrap()["dashboard"]["id"], "d2");

        let skeleton = frames.until(|f| f["type"] == "skeleton").await;
        assert_eq!(skeleton["dashboard"]["id"], "d2");
        assert_eq!(skeleton["view_id"], view_id);
        assert_eq!(skeleton["dashboard"]["charts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_view_is_not_found() {
        let server = serve(fake_api()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/views/999/refresh", server.base))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_disconnect_unmounts_the_view() {
        let config = ViewConfig {
            refresh_interval: Duration::from_millis(20),
            ..ViewConfig::default()
        };
        let server = serve_with(fake_api(), config).await;
        let mut frames = Frames::open(format!("{}/dashboards/d1/stream?live=true", server.base)).await;
        let skeleton = frames.next().await;
        assert_eq!(skeleton["refresh"]["is_live"], true);
        assert_eq!(server.state.views.len(), 1);

        drop(frames);

        let mut unregistered = false;
        for _ in 0..100 {
            if server.state.views.is_empty() {
                unregistered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(unregistered);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = server.api.run_calls().len();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(server.api.run_calls().len(), settled);
    }

    #[tokio::test]
    async fn test_chart_editor_endpoints() {
        let server = serve(fake_api().with_rows("p2", vec![])).await;
        let (base, api) = (&server.base, &server.api);
        let client = reqwest::Client::new();

        let preview: Value = client
            .get(format!("{base}/dashboards/d1/charts/c0/preview?pipeline_id=p2"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(preview["chart"]["pipeline_id"], "p2");
        assert_eq!(preview["pipeline"]["name"], "Salinity");
        assert_eq!(preview["preview"]["status"], "empty");

        let saved = client
            .post(format!("{base}/dashboards/d1/charts"))
            .json(&json!({"chart_id": "c0", "name": "Salinity trend", "pipeline_id": "p2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(saved.status(), reqwest::StatusCode::OK);
        assert_eq!(api.dashboard("d1").unwrap().charts[0].name, "Salinity trend");

        let deleted = client
            .delete(format!("{base}/dashboards/d1/charts/c1"))
            .send()
            .await
            .unwrap();
        assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);
        assert_eq!(api.dashboard("d1").unwrap().charts.len(), 1);
    }
}
