//! HTTP API over the arena.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::engine::{EngineError, ErrorKind};
use crate::games::tictactoe::{Cell, Game, GameStatus};
use crate::ids::{GameId, UserId};
use crate::service::Arena;
use crate::stats::{LeaderboardEntry, Metric, UserStats};

/// Leaderboard length when the request does not say.
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 3;

/// Longest accepted user name, in characters.
pub const MAX_NAME_CHARS: usize = 64;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Arena serving every request.
    pub arena: Arc<Arena>,
}

/// Builds the API router.
pub fn router(arena: Arc<Arena>) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}/stats", get(user_stats))
        .route("/game", post(create_game))
        .route("/game/{id}", get(get_game))
        .route("/game/{id}/join", post(join_game))
        .route("/game/{id}/move", post(make_move))
        .route("/leaderboard", get(leaderboard))
        .with_state(AppState { arena })
}

/// Binds `host:port` and serves until the process exits.
#[instrument(skip(arena))]
pub async fn serve(arena: Arc<Arena>, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(address = %listener.local_addr()?, "Arena API listening");
    axum::serve(listener, router(arena)).await?;
    Ok(())
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
}

/// Response of `POST /users`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    /// Assigned id.
    pub user_id: UserId,
}

/// Body of `POST /game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameRequest {
    /// User taking the X seat.
    pub creator_user_id: UserId,
}

/// Response of `POST /game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameResponse {
    /// Assigned id.
    pub game_id: GameId,
}

/// Body of `POST /game/{id}/join`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinGameRequest {
    /// User taking the O seat.
    pub user_id: UserId,
}

/// Body of `POST /game/{id}/move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    /// Moving user.
    pub user_id: UserId,
    /// Target row.
    pub row: usize,
    /// Target column.
    pub col: usize,
}

/// Query of `GET /leaderboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeaderboardQuery {
    /// Metric name; `win_ratio` when absent.
    pub metric: Option<String>,
    /// Number of rows.
    pub limit: Option<usize>,
}

/// Game as rendered to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameView {
    /// Game id.
    pub id: GameId,
    /// Lifecycle state.
    pub status: GameStatus,
    /// Rows of cells, each holding the occupying user's id or null.
    pub board: Vec<Vec<Option<UserId>>>,
    /// User expected to move next, while in progress.
    pub next_player_id: Option<UserId>,
    /// Seated users, creator first.
    pub players: Vec<UserId>,
    /// Winner, once completed with a line.
    pub winner_id: Option<UserId>,
    /// Accepted moves so far.
    pub move_count: u32,
}

impl From<&Game> for GameView {
    fn from(game: &Game) -> Self {
        let board = game
            .board()
            .rows()
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Cell::Empty => None,
                        Cell::Occupied(mark) => game.user_of(mark),
                    })
                    .collect()
            })
            .collect();
        Self {
            id: game.id(),
            status: game.status(),
            board,
            next_player_id: game.turn_holder(),
            players: game.players(),
            winner_id: game.winner(),
            move_count: game.move_count(),
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error kind name.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// Engine or service failure.
    Engine(EngineError),
    /// Request failed validation before reaching the engine.
    Validation(String),
    /// Unrecognised leaderboard metric.
    UnknownMetric(String),
}

impl From<EngineError> for ApiError {
    fn from(error: EngineError) -> Self {
        ApiError::Engine(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Engine(err) => {
                let kind = err.kind();
                let status = match kind {
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidState | ErrorKind::CellOccupied | ErrorKind::NotYourTurn => {
                        StatusCode::CONFLICT
                    }
                    ErrorKind::NotParticipant => StatusCode::FORBIDDEN,
                    ErrorKind::SelfJoin | ErrorKind::OutOfBounds => StatusCode::BAD_REQUEST,
                    ErrorKind::Contention => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, kind.to_string(), err.to_string())
            }
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                "validation".to_string(),
                message.clone(),
            ),
            ApiError::UnknownMetric(name) => (
                StatusCode::BAD_REQUEST,
                "unknown_metric".to_string(),
                format!("unknown metric '{}'", name),
            ),
        };

        if status.is_server_error() {
            error!(%status, error = %kind, detail = %message, "Request failed");
        } else {
            debug!(%status, error = %kind, detail = %message, "Request rejected");
        }
        (status, Json(ErrorBody { error: kind, message })).into_response()
    }
}

#[instrument(skip(state))]
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateUserResponse>), ApiError> {
    let Json(body) = payload?;
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::Validation(format!(
            "name must be at most {} characters",
            MAX_NAME_CHARS
        )));
    }
    let user = state.arena.create_user(name).await?;
    debug!(user_id = %user.id(), "User created via API");
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user_id: *user.id(),
        }),
    ))
}

#[instrument(skip(state))]
async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateGameResponse>), ApiError> {
    let Json(body) = payload?;
    let game = state.arena.create_game(body.creator_user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateGameResponse { game_id: game.id() }),
    ))
}

#[instrument(skip(state))]
async fn join_game(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<JoinGameRequest>, JsonRejection>,
) -> Result<Json<GameView>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let game = state
        .arena
        .join_game(GameId::new(id), body.user_id)
        .await
        .inspect_err(|e| warn!(game_id = id, user_id = %body.user_id, error = %e, "Join failed"))?;
    Ok(Json(GameView::from(&game)))
}

#[instrument(skip(state))]
async fn make_move(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<GameView>, ApiError> {
    let Path(id) = id?;
    let Json(body) = payload?;
    let transition = state
        .arena
        .submit_move(GameId::new(id), body.user_id, body.row, body.col)
        .await?;
    Ok(Json(GameView::from(transition.game())))
}

#[instrument(skip(state))]
async fn get_game(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<GameView>, ApiError> {
    let Path(id) = id?;
    let game = state.arena.game(GameId::new(id)).await?;
    Ok(Json(GameView::from(&game)))
}

#[instrument(skip(state))]
async fn leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let Query(query) = query?;
    let metric = match query.metric.as_deref() {
        None => Metric::WinRatio,
        Some(name) => {
            Metric::from_str(name).map_err(|_| ApiError::UnknownMetric(name.to_string()))?
        }
    };
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    Ok(Json(state.arena.top_k(metric, limit)))
}

#[instrument(skip(state))]
async fn user_stats(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<UserStats>, ApiError> {
    let Path(id) = id?;
    Ok(Json(state.arena.stats_for(UserId::new(id)).await?))
}
