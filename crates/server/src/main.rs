use std::fs::OpenOptions;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::{get, post}, Json, Router};
use anyhow::Context;
use dotenvy::dotenv;
use lightctl_core::{plugin_api_route, API_KEY_HEADER};
use serde_json::{json, Value};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod gcode;
mod models;
mod services;

use config::ServerConfig;
use gcode::{GcodeSink, LogSink, WriterSink};
use models::{parse_pwm, parse_state, parse_target, CommandRequest};
use services::LightService;

#[derive(Clone)]
struct AppState {
    service: LightService,
    config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let cfg = ServerConfig::from_env();
    let service = LightService::new(cfg.gcode.clone(), open_sink(&cfg)?);
    on_after_startup(&service).await;

    let addr = cfg.http_addr;
    let state = AppState { service, config: Arc::new(cfg) };
    let app = app(state);

    info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/version", get(version))
        .route(plugin_api_route(), post(api_plugin_command))
        .with_state(state)
}

fn open_sink(cfg: &ServerConfig) -> anyhow::Result<Arc<dyn GcodeSink>> {
    let Some(path) = &cfg.gcode_output else {
        info!("No LIGHTCTL_GCODE_OUTPUT set; G-code is only logged");
        return Ok(Arc::new(LogSink));
    };
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening G-code output {}", path.display()))?;
    info!(path = %path.display(), "Writing G-code to device");
    Ok(Arc::new(WriterSink::new(file)))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,axum=info,hyper=info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn on_after_startup(service: &LightService) {
    let gcode = service.settings();
    info!(
        on = %gcode.gcode_on,
        off = %gcode.gcode_off,
        toggle = %gcode.gcode_toggle,
        "Light control loaded"
    );
    tracing::debug!("Running initial status query");
    service.query_status().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(?err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => { term.recv().await; }
            Err(err) => {
                tracing::error!(?err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn healthz() -> &'static str { "ok" }

async fn version() -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"ok": false, "error": message.into()}))).into_response()
}

// ----- Plugin command API -----

async fn api_plugin_command(
    Path(plugin_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if plugin_id != state.config.plugin_id {
        return error_response(StatusCode::NOT_FOUND, format!("unknown plugin '{}'", plugin_id));
    }
    if let Some(expected) = &state.config.api_key {
        let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            tracing::warn!("Rejected command with missing or invalid API key");
            return error_response(StatusCode::FORBIDDEN, "invalid api key");
        }
    }

    if !body.is_object() {
        return error_response(StatusCode::BAD_REQUEST, "expected a JSON object");
    }
    let Ok(req) = serde_json::from_value::<CommandRequest>(body) else {
        return error_response(StatusCode::BAD_REQUEST, "missing command");
    };
    let Some(required) = req.required_params() else {
        return error_response(StatusCode::BAD_REQUEST, "unknown command");
    };
    if let Some(param) = req.missing_param(required) {
        return error_response(StatusCode::BAD_REQUEST, format!("missing parameter: {}", param));
    }
    tracing::debug!(command = %req.command, "Plugin command");

    match req.command.as_str() {
        "toggle" => {
            let target = parse_target(req.param("target"));
            let pwm = parse_pwm(req.param("pwm"));
            Json(state.service.handle_toggle(target, pwm).await).into_response()
        }
        "set_state" => {
            let Some(target) = parse_state(req.param("state")) else {
                return error_response(StatusCode::BAD_REQUEST, "state must be 'on' or 'off'");
            };
            let pwm = parse_pwm(req.param("pwm"));
            Json(state.service.handle_set(target, pwm).await).into_response()
        }
        "query_status" => {
            let (ok, is_on) = state.service.query_status().await;
            Json(json!({"ok": ok, "is_on": is_on})).into_response()
        }
        _ => error_response(StatusCode::BAD_REQUEST, "unknown command"),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
