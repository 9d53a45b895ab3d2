//!
//! rollcall HTTP server
//! --------------------
//! This module defines the Axum-based HTTP API for the roster service.
//!
//! Responsibilities:
//! - Open registration endpoints for scouts, leaders and groups.
//! - Login endpoint exchanging a credential pair for a signed token.
//! - Self-scoped record routes where the acting subject always comes from
//!   the presented token, never from a request parameter.
//! - Group-scoped routes gated by a leader token plus a live group check.
//!
//! Tokens travel in the `Authorization` header as the bare serialized form,
//! no scheme prefix. Every denied request receives the same 403 body.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::config::{Config, SecretKey};
use crate::error::{ApiError, ApiResult};
use crate::identity::{Authenticator, Role, TokenCodec};
use crate::roster::validate::{self, ValidationError};
use crate::roster::{GroupId, RosterStore};

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RosterStore>,
    pub auth: Arc<Authenticator>,
}

/// Start the rollcall HTTP server with the given configuration.
///
/// Opens the roster under the configured data root, generates the process
/// secret key and mounts all routes. The key never leaves this function
/// except inside the token codec; a restart invalidates every outstanding
/// token.
pub async fn run_with_config(cfg: Config) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cfg.db_root)
        .with_context(|| format!("Failed to create or access data root: {}", cfg.db_root))?;
    let store = Arc::new(
        RosterStore::open(&cfg.db_root)
            .with_context(|| format!("While opening roster under: {}", cfg.db_root))?,
    );

    let key = SecretKey::generate()?;
    let codec = TokenCodec::new(&key, cfg.token_lifespan_days);
    let auth = Arc::new(Authenticator::new(codec, store.clone()));

    let app = router(AppState { store, auth });
    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point reading `ROLLCALL_*` settings from the environment.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(Config::from_env()).await
}

/// Mount all routes over the given state. Split out so tests can serve the
/// same router on an ephemeral port.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "rollcall ok" }))
        .route("/login", post(login))
        .route("/scout", post(create_scout).delete(delete_scout))
        .route("/scout/name", get(scout_name).put(put_scout_name))
        .route("/scout/email", get(scout_email).put(put_scout_email))
        .route("/scout/pwd", put(put_scout_pwd))
        .route("/scout/age", get(scout_age).put(put_scout_age))
        .route("/scout/rank", get(scout_rank).put(put_scout_rank))
        .route("/scout/mb", get(scout_badges).put(put_scout_badge).delete(delete_scout_badge))
        .route(
            "/scout/req",
            get(scout_requirements).put(put_scout_requirement).delete(delete_scout_requirement),
        )
        .route("/scout/group", get(scout_group).put(put_scout_group))
        .route("/leader", post(create_leader).delete(delete_leader))
        .route("/leader/name", get(leader_name).put(put_leader_name))
        .route("/leader/email", get(leader_email).put(put_leader_email))
        .route("/leader/pwd", put(put_leader_pwd))
        .route("/leader/group", get(leader_group).put(put_leader_group))
        .route("/group", post(create_group))
        .route("/group/{id}/name", get(group_name).put(put_group_name))
        .route("/group/{id}/scouts", get(group_scouts))
        .route("/group/{id}/leaders", get(group_leaders))
        .with_state(state)
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn require_str<'a>(body: &'a Value, field: &'static str) -> Result<&'a str, ApiError> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::malformed(format!("missing or invalid field: {}", field)))
}

fn require_param<'a>(params: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str, ApiError> {
    params
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ApiError::malformed(format!("missing query parameter: {}", key)))
}

fn require_age(body: &Value) -> Result<u8, ApiError> {
    let age = body
        .get("age")
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::malformed("missing or invalid field: age"))?;
    u8::try_from(age).map_err(|_| ValidationError::AgeOutOfRange.into())
}

// --- login ---

async fn login(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let role = params
        .get("role")
        .and_then(|s| Role::parse(s))
        .ok_or_else(|| ApiError::malformed("role must be scout or leader"))?;
    let email = require_str(&body, "email")?;
    let password_hash = require_str(&body, "password_hash")?;
    let token = state.auth.login(email, password_hash, role)?;
    Ok(Json(json!({"status":"ok","token": token})))
}

// --- registration ---

async fn create_scout(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Json<Value>> {
    let name = require_str(&body, "name")?;
    let email = require_str(&body, "email")?;
    let password_hash = require_str(&body, "password_hash")?;
    let age = require_age(&body)?;
    let rank = body.get("rank").and_then(Value::as_str);
    let group = require_str(&body, "group")?;
    validate::name(name)?;
    validate::email(email)?;
    validate::password_hash(password_hash)?;
    validate::age(age)?;
    let id = state.store.add_scout(name, email, password_hash, age, rank, group)?;
    Ok(Json(json!({"status":"ok","id": id})))
}

async fn create_leader(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Json<Value>> {
    let name = require_str(&body, "name")?;
    let email = require_str(&body, "email")?;
    let password_hash = require_str(&body, "password_hash")?;
    let group = require_str(&body, "group")?;
    validate::name(name)?;
    validate::email(email)?;
    validate::password_hash(password_hash)?;
    let id = state.store.add_leader(name, email, password_hash, group)?;
    Ok(Json(json!({"status":"ok","id": id})))
}

async fn create_group(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Json<Value>> {
    let name = require_str(&body, "name")?;
    validate::group_name(name)?;
    let id = state.store.add_group(name)?;
    Ok(Json(json!({"status":"ok","id": id})))
}

// --- scout self-scoped routes ---

async fn scout_name(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let scout = state.store.scout(id)?;
    Ok(Json(json!({"status":"ok","name": scout.name})))
}

async fn put_scout_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let name = require_param(&params, "name")?;
    validate::name(name)?;
    state.store.update_scout_name(id, name)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn scout_email(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let scout = state.store.scout(id)?;
    Ok(Json(json!({"status":"ok","email": scout.email})))
}

async fn put_scout_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let email = require_param(&params, "email")?;
    validate::email(email)?;
    state.store.update_scout_email(id, email)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn put_scout_pwd(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let pwd = require_param(&params, "pwd")?;
    validate::password_hash(pwd)?;
    state.store.update_scout_password_hash(id, pwd)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn scout_age(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let scout = state.store.scout(id)?;
    Ok(Json(json!({"status":"ok","age": scout.age})))
}

async fn put_scout_age(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let age = params
        .get("age")
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or_else(|| ApiError::malformed("missing or invalid parameter: age"))?;
    validate::age(age)?;
    state.store.update_scout_age(id, age)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn scout_rank(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let scout = state.store.scout(id)?;
    Ok(Json(json!({"status":"ok","rank": scout.rank})))
}

async fn put_scout_rank(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let rank = require_param(&params, "rank")?;
    state.store.update_scout_rank(id, rank)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn scout_badges(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let badges = state.store.scout_badges(id)?;
    Ok(Json(json!({"status":"ok","badges": badges})))
}

async fn put_scout_badge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let name = require_param(&params, "name")?;
    validate::badge_name(name)?;
    state.store.add_scout_badge(id, name)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn delete_scout_badge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let name = require_param(&params, "name")?;
    state.store.remove_scout_badge(id, name)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn scout_requirements(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let requirements = state.store.scout_requirements(id)?;
    Ok(Json(json!({"status":"ok","requirements": requirements})))
}

async fn put_scout_requirement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let name = require_param(&params, "name")?;
    let rank = require_param(&params, "rank")?;
    validate::requirement(name, rank)?;
    state.store.add_scout_requirement(id, name, rank)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn delete_scout_requirement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let name = require_param(&params, "name")?;
    let rank = require_param(&params, "rank")?;
    state.store.remove_scout_requirement(id, name, rank)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn scout_group(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let scout = state.store.scout(id)?;
    let group = state.store.group(scout.group_id)?;
    Ok(Json(json!({"status":"ok","group": group.name})))
}

async fn put_scout_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    let group = require_param(&params, "group")?;
    state.store.update_scout_group(id, group)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn delete_scout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Scout, token_from_headers(&headers))?;
    state.store.delete_scout(id)?;
    Ok(Json(json!({"status":"ok"})))
}

// --- leader self-scoped routes ---

async fn leader_name(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let leader = state.store.leader(id)?;
    Ok(Json(json!({"status":"ok","name": leader.name})))
}

async fn put_leader_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let name = require_param(&params, "name")?;
    validate::name(name)?;
    state.store.update_leader_name(id, name)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn leader_email(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let leader = state.store.leader(id)?;
    Ok(Json(json!({"status":"ok","email": leader.email})))
}

async fn put_leader_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let email = require_param(&params, "email")?;
    validate::email(email)?;
    state.store.update_leader_email(id, email)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn put_leader_pwd(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let pwd = require_param(&params, "pwd")?;
    validate::password_hash(pwd)?;
    state.store.update_leader_password_hash(id, pwd)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn leader_group(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let leader = state.store.leader(id)?;
    let group = state.store.group(leader.group_id)?;
    Ok(Json(json!({"status":"ok","group": group.name})))
}

async fn put_leader_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    let group = require_param(&params, "group")?;
    state.store.update_leader_group(id, group)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn delete_leader(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Value>> {
    let id = state.auth.authenticate_as(Role::Leader, token_from_headers(&headers))?;
    state.store.delete_leader(id)?;
    Ok(Json(json!({"status":"ok"})))
}

// --- group-scoped routes (leader token + live group check) ---

async fn group_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let group = GroupId(id);
    state.auth.authenticate_group_leader(token_from_headers(&headers), group)?;
    let record = state.store.group(group)?;
    Ok(Json(json!({"status":"ok","name": record.name})))
}

async fn put_group_name(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let group = GroupId(id);
    state.auth.authenticate_group_leader(token_from_headers(&headers), group)?;
    let name = require_param(&params, "name")?;
    validate::group_name(name)?;
    state.store.update_group_name(group, name)?;
    Ok(Json(json!({"status":"ok"})))
}

async fn group_scouts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let group = GroupId(id);
    state.auth.authenticate_group_leader(token_from_headers(&headers), group)?;
    let scouts = state.store.group_scouts(group)?;
    Ok(Json(json!({"status":"ok","scouts": scouts})))
}

async fn group_leaders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let group = GroupId(id);
    state.auth.authenticate_group_leader(token_from_headers(&headers), group)?;
    let leaders = state.store.group_leaders(group)?;
    Ok(Json(json!({"status":"ok","leaders": leaders})))
}
