use anyhow::{Context, Result};
use std::time::Duration;

use tower_http::services::ServeDir;
use tracing::{debug, info};

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use super::extract::{deserialize_id, JsonBody};
use super::{log_requests, state::*, ServerConfig};
use crate::user::{NewPlaylist, NewSong, NewUser};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub backend: String,
    pub version: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    #[serde(default)]
    pub secret_code: String,
}

#[derive(Deserialize, Debug)]
struct SecretCodeQuery {
    #[serde(default)]
    pub secret_code: String,
}

#[derive(Deserialize, Debug)]
struct PlaylistQuery {
    #[serde(default)]
    pub secret_code: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub playlist_id: String,
}

#[derive(Deserialize, Debug)]
struct AddSongBody {
    #[serde(default)]
    pub secret_code: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub playlist_id: String,
    pub song: NewSong,
}

#[derive(Deserialize, Debug)]
struct PlaylistRef {
    #[serde(default)]
    pub secret_code: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub playlist_id: String,
}

#[derive(Deserialize, Debug)]
struct SongRef {
    #[serde(default)]
    pub secret_code: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub playlist_id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub song_id: String,
}

fn require_secret_code(secret_code: &str) -> Result<&str, ApiError> {
    let trimmed = secret_code.trim();
    if trimmed.is_empty() {
        return Err(ApiError::missing_secret_code());
    }
    Ok(trimmed)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        backend: state.user_store.backend_name().to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
    };
    Json(stats)
}

async fn register(
    State(user_store): State<GuardedUserStore>,
    JsonBody(new_user): JsonBody<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    if new_user.email.trim().is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_owned()));
    }
    let user = user_store.register_user(new_user)?;
    debug!("Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(user_store): State<GuardedUserStore>,
    JsonBody(body): JsonBody<LoginBody>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_code = require_secret_code(&body.secret_code)?;
    user_store
        .login(secret_code)
        .map_err(ApiError::from_user_lookup)?;
    Ok((StatusCode::CREATED, Json("welcome to the Music API")))
}

async fn view_profile(
    State(user_store): State<GuardedUserStore>,
    query: Result<Query<SecretCodeQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let secret_code = require_secret_code(&query.secret_code)?;
    let user = user_store
        .get_user_profile(secret_code)
        .map_err(ApiError::from_user_lookup)?;
    Ok(Json(user))
}

async fn create_playlist(
    State(user_store): State<GuardedUserStore>,
    query: Result<Query<SecretCodeQuery>, QueryRejection>,
    JsonBody(new_playlist): JsonBody<NewPlaylist>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let secret_code = require_secret_code(&query.secret_code)?;
    let playlist = user_store.create_playlist(secret_code, new_playlist)?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

async fn add_song_to_playlist(
    State(user_store): State<GuardedUserStore>,
    JsonBody(body): JsonBody<AddSongBody>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_code = require_secret_code(&body.secret_code)?;
    let playlist = user_store.add_song_to_playlist(secret_code, &body.playlist_id, body.song)?;
    Ok(Json(playlist))
}

async fn get_all_songs_of_playlist(
    State(user_store): State<GuardedUserStore>,
    query: Result<Query<PlaylistQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let secret_code = require_secret_code(&query.secret_code)?;
    let songs = user_store.get_playlist_songs(secret_code, &query.playlist_id)?;
    Ok(Json(songs))
}

async fn delete_song_from_playlist(
    State(user_store): State<GuardedUserStore>,
    JsonBody(body): JsonBody<SongRef>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_code = require_secret_code(&body.secret_code)?;
    let song =
        user_store.delete_song_from_playlist(secret_code, &body.playlist_id, &body.song_id)?;
    Ok(Json(song))
}

async fn delete_playlist(
    State(user_store): State<GuardedUserStore>,
    JsonBody(body): JsonBody<PlaylistRef>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_code = require_secret_code(&body.secret_code)?;
    let playlist = user_store.delete_playlist(secret_code, &body.playlist_id)?;
    debug!("Deleted playlist {} ({})", playlist.id, playlist.name);
    Ok("Playlist deleted successfully")
}

async fn get_song_detail(
    State(user_store): State<GuardedUserStore>,
    JsonBody(body): JsonBody<SongRef>,
) -> Result<impl IntoResponse, ApiError> {
    let secret_code = require_secret_code(&body.secret_code)?;
    let song = user_store.get_song(secret_code, &body.playlist_id, &body.song_id)?;
    Ok(Json(song))
}

pub fn make_app(config: ServerConfig, user_store: GuardedUserStore) -> Router {
    let state = ServerState::new(config.clone(), user_store);

    let api_routes: Router = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/viewProfile", get(view_profile))
        .route("/createPlaylist", post(create_playlist))
        .route("/addSongToPlaylist", post(add_song_to_playlist))
        .route("/getAllSongsOfPlaylist", get(get_all_songs_of_playlist))
        .route("/deleteSongFromPlaylist", post(delete_song_from_playlist))
        .route("/deletePlaylist", post(delete_playlist))
        .route("/getSongDetail", post(get_song_detail))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .merge(api_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub async fn run_server(config: ServerConfig, user_store: GuardedUserStore) -> Result<()> {
    let address = format!("{}:{}", config.bind_address, config.port);
    let app = make_app(config, user_store);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
