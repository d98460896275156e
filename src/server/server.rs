use anyhow::Result;
use std::time::{Duration, Instant, SystemTime};

use tracing::error;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use super::api::{failure, ApiError, Envelope};
use super::session::Session;
use super::{log_requests, metrics, state::*, ServerConfig};
use crate::favorites::{FavoriteSong, MostFavoritedSong, SongFavoriteStats, ToggleAction};
use crate::user::{AuthToken, AuthTokenValue};

const USER_FAVORITES_DEFAULT_LIMIT: u32 = 20;
const USER_FAVORITES_MAX_LIMIT: u32 = 100;
const TOP_SONGS_DEFAULT_LIMIT: u32 = 10;
const TOP_SONGS_MAX_LIMIT: u32 = 50;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub server_time: String,
    pub hash: String,
    pub session_token: Option<String>,
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
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginData {
    token: String,
}

#[derive(Deserialize, Debug)]
struct FavoritesPageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TopSongsQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct ToggleData {
    song_id: i64,
    favorite: bool,
    action: ToggleAction,
}

#[derive(Serialize)]
struct IsLikedData {
    song_id: i64,
    favorite: bool,
}

#[derive(Serialize)]
struct AddFavoriteData {
    song_id: i64,
    was_added: bool,
    total_favorites: u64,
}

#[derive(Serialize)]
struct RemoveFavoriteData {
    song_id: i64,
    was_removed: bool,
    total_favorites: u64,
}

#[derive(Serialize)]
struct PaginationInfo {
    total_items: u64,
    limit: u32,
    offset: u64,
}

#[derive(Serialize)]
struct FavoritesPageData {
    favorites: Vec<FavoriteSong>,
    pagination: PaginationInfo,
}

#[derive(Serialize)]
struct TopSongsData {
    songs: Vec<MostFavoritedSong>,
}

fn parse_song_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!(
            "Song id must be a positive integer, got '{}'",
            raw
        ))),
    }
}

fn bounded_limit(requested: Option<u32>, default: u32, max: u32) -> Result<u32, ApiError> {
    let limit = requested.unwrap_or(default);
    if !(1..=max).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}, got {}",
            max, limit
        )));
    }
    Ok(limit)
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        server_time: chrono::Utc::now().to_rfc3339(),
        hash: state.hash.clone(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn toggle_song_like(
    session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ToggleData>>, ApiError> {
    let song_id = parse_song_id(&id)?;
    let toggle = favorites_store.toggle_favorite(session.user_id, song_id)?;

    let message = match toggle.action {
        ToggleAction::Added => {
            metrics::record_favorite_added();
            "Song added to favorites"
        }
        ToggleAction::Removed => {
            metrics::record_favorite_removed();
            "Song removed from favorites"
        }
    };

    Ok(Envelope::with_message(
        message,
        ToggleData {
            song_id,
            favorite: toggle.favorite,
            action: toggle.action,
        },
    ))
}

async fn get_song_is_liked(
    session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<IsLikedData>>, ApiError> {
    let song_id = parse_song_id(&id)?;
    let favorite = favorites_store.is_song_favorite(session.user_id, song_id)?;
    Ok(Envelope::data(IsLikedData { song_id, favorite }))
}

async fn add_favorite(
    session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Path(song_id): Path<String>,
) -> Result<Json<Envelope<AddFavoriteData>>, ApiError> {
    let song_id = parse_song_id(&song_id)?;
    let was_added = favorites_store.add_to_favorites(session.user_id, song_id)?;
    if was_added {
        metrics::record_favorite_added();
    }
    let stats = favorites_store.get_song_favorite_stats(song_id)?;

    let message = if was_added {
        "Song added to favorites"
    } else {
        "Song was already in favorites"
    };
    Ok(Envelope::with_message(
        message,
        AddFavoriteData {
            song_id,
            was_added,
            total_favorites: stats.total_favorites,
        },
    ))
}

async fn remove_favorite(
    session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Path(song_id): Path<String>,
) -> Result<Json<Envelope<RemoveFavoriteData>>, ApiError> {
    let song_id = parse_song_id(&song_id)?;
    let was_removed = favorites_store.remove_from_favorites(session.user_id, song_id)?;
    if was_removed {
        metrics::record_favorite_removed();
    }
    let stats = favorites_store.get_song_favorite_stats(song_id)?;

    let message = if was_removed {
        "Song removed from favorites"
    } else {
        "Song was not in favorites"
    };
    Ok(Envelope::with_message(
        message,
        RemoveFavoriteData {
            song_id,
            was_removed,
            total_favorites: stats.total_favorites,
        },
    ))
}

async fn get_favorites(
    session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Query(query): Query<FavoritesPageQuery>,
) -> Result<Json<Envelope<FavoritesPageData>>, ApiError> {
    let limit = bounded_limit(
        query.limit,
        USER_FAVORITES_DEFAULT_LIMIT,
        USER_FAVORITES_MAX_LIMIT,
    )?;
    let offset = query.offset.unwrap_or(0);

    let favorites = favorites_store.get_user_favorites(session.user_id, limit, offset)?;
    let total_items = favorites_store.get_user_favorites_count(session.user_id)?;

    Ok(Envelope::data(FavoritesPageData {
        favorites,
        pagination: PaginationInfo {
            total_items,
            limit,
            offset,
        },
    }))
}

async fn get_top_favorites(
    _session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Query(query): Query<TopSongsQuery>,
) -> Result<Json<Envelope<TopSongsData>>, ApiError> {
    let limit = bounded_limit(query.limit, TOP_SONGS_DEFAULT_LIMIT, TOP_SONGS_MAX_LIMIT)?;
    let songs = favorites_store.get_most_favorited_songs(limit)?;
    Ok(Envelope::data(TopSongsData { songs }))
}

async fn get_favorite_stats(
    _session: Session,
    State(favorites_store): State<GuardedFavoritesStore>,
    Path(song_id): Path<String>,
) -> Result<Json<Envelope<SongFavoriteStats>>, ApiError> {
    let song_id = parse_song_id(&song_id)?;
    let stats = favorites_store.get_song_favorite_stats(song_id)?;
    Ok(Envelope::data(stats))
}

async fn login(State(user_store): State<GuardedUserStore>, Json(body): Json<LoginBody>) -> Response {
    let credentials = match user_store.get_user_auth_credentials(&body.user_handle) {
        Ok(credentials) => credentials,
        Err(err) => return ApiError::Internal(err).into_response(),
    };

    let password_credentials = match credentials.as_ref().and_then(|c| c.username_password.as_ref())
    {
        Some(pw) => pw,
        None => return failure(StatusCode::FORBIDDEN, "Invalid credentials"),
    };

    match password_credentials
        .hasher
        .verify(body.password.as_str(), password_credentials.hash.as_str())
    {
        Ok(true) => {}
        _ => return failure(StatusCode::FORBIDDEN, "Invalid credentials"),
    }

    let auth_token = AuthToken {
        user_id: password_credentials.user_id,
        created: SystemTime::now(),
        last_used: None,
        value: AuthTokenValue::generate(),
    };
    if let Err(err) = user_store.add_user_auth_token(auth_token.clone()) {
        error!("Error storing auth token: {}", err);
        return ApiError::Internal(err).into_response();
    }

    let response_body = Envelope {
        success: true,
        message: None,
        data: Some(LoginData {
            token: auth_token.value.0.clone(),
        }),
    };
    let response_body = match serde_json::to_string(&response_body) {
        Ok(body) => body,
        Err(err) => return ApiError::Internal(err.into()).into_response(),
    };

    let cookie_value = match HeaderValue::from_str(&format!(
        "session_token={}; Path=/; HttpOnly",
        auth_token.value.0
    )) {
        Ok(value) => value,
        Err(err) => return ApiError::Internal(err.into()).into_response(),
    };
    response::Builder::new()
        .status(StatusCode::CREATED)
        .header(header::SET_COOKIE, cookie_value)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(response_body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn logout(State(user_store): State<GuardedUserStore>, session: Session) -> Response {
    match user_store.delete_user_auth_token(&AuthTokenValue(session.token)) {
        Ok(_) => {
            let cookie_value = Cookie::build(Cookie::new("session_token", ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            (
                StatusCode::OK,
                [(header::SET_COOKIE, cookie_value.to_string())],
                Json(Envelope::<()> {
                    success: true,
                    message: Some("Logged out".to_string()),
                    data: None,
                }),
            )
                .into_response()
        }
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub fn make_app(
    config: ServerConfig,
    song_store: GuardedSongStore,
    favorites_store: GuardedFavoritesStore,
    user_store: GuardedUserStore,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        song_store,
        favorites_store,
        user_store,
        hash: env!("GIT_HASH").to_string(),
    };

    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let song_routes: Router = Router::new()
        .route("/{id}/like", put(toggle_song_like))
        .route("/{id}/is-liked", get(get_song_is_liked))
        .with_state(state.clone());

    let favorites_routes: Router = Router::new()
        .route("/", get(get_favorites))
        .route("/top", get(get_top_favorites))
        .route("/{song_id}", post(add_favorite))
        .route("/{song_id}", delete(remove_favorite))
        .route("/{song_id}/stats", get(get_favorite_stats))
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

    let app: Router = home_router
        .nest("/api/auth", auth_routes)
        .nest("/api/songs", song_routes)
        .nest("/api/favorites", favorites_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    song_store: GuardedSongStore,
    favorites_store: GuardedFavoritesStore,
    user_store: GuardedUserStore,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, song_store, favorites_store, user_store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
