//! Flashcard Management API
//!
//! Admin CRUD for flashcard decks and their ordered cards.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::api::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct Deck {
    pub id: Uuid,
    pub course_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, FromRow, utoipa::ToSchema)]
pub struct Card {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub front: String,
    pub back: String,
    pub position: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct DeckDetail {
    #[serde(flatten)]
    pub deck: Deck,
    pub cards: Vec<Card>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateDeckRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCardRequest {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateCardRequest {
    pub front: Option<String>,
    pub back: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ReorderCardsRequest {
    pub card_ids: Vec<Uuid>,
}

// ============================================================================
// Constants
// ============================================================================

const MAX_CARDS_PER_DECK: i64 = 500;
const MAX_SIDE_LENGTH: usize = 2000;
const MAX_NAME_LENGTH: usize = 100;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FlashcardsError {
    #[error("Deck not found")]
    DeckNotFound,
    #[error("Card not found")]
    CardNotFound,
    #[error("Maximum cards per deck reached (500)")]
    LimitExceeded,
    #[error("Card side exceeds maximum length")]
    SideTooLong,
    #[error("Name exceeds maximum length")]
    NameTooLong,
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for FlashcardsError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            Self::DeckNotFound => (StatusCode::NOT_FOUND, "DECK_NOT_FOUND", "Deck not found"),
            Self::CardNotFound => (StatusCode::NOT_FOUND, "CARD_NOT_FOUND", "Card not found"),
            Self::LimitExceeded => (
                StatusCode::BAD_REQUEST,
                "LIMIT_EXCEEDED",
                "Maximum cards per deck reached (500)",
            ),
            Self::SideTooLong => (
                StatusCode::BAD_REQUEST,
                "SIDE_TOO_LONG",
                "Card side exceeds maximum length",
            ),
            Self::NameTooLong => (
                StatusCode::BAD_REQUEST,
                "NAME_TOO_LONG",
                "Name exceeds maximum length",
            ),
            Self::Database(err) => {
                tracing::error!("Database error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Database error",
                )
            }
        };
        (
            status,
            Json(serde_json::json!({ "error": code, "message": message })),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/decks - List decks
#[utoipa::path(
    get,
    path = "/api/decks",
    tag = "flashcards",
    responses((status = 200, description = "List of decks")),
    security(("bearer_auth" = [])),
)]
pub async fn list_decks(
    State(state): State<AppState>,
) -> Result<Json<Vec<Deck>>, FlashcardsError> {
    let decks = sqlx::query_as::<_, Deck>(
        "SELECT * FROM flashcard_decks ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(decks))
}

/// POST /api/decks - Create a deck
#[utoipa::path(
    post,
    path = "/api/decks",
    tag = "flashcards",
    request_body = CreateDeckRequest,
    responses((status = 201, description = "Deck created", body = Deck)),
    security(("bearer_auth" = [])),
)]
pub async fn create_deck(
    State(state): State<AppState>,
    Json(request): Json<CreateDeckRequest>,
) -> Result<(StatusCode, Json<Deck>), FlashcardsError> {
    if request.name.is_empty() || request.name.len() > MAX_NAME_LENGTH {
        return Err(FlashcardsError::NameTooLong);
    }

    let deck = sqlx::query_as::<_, Deck>(
        r"
        INSERT INTO flashcard_decks (id, course_id, name, description)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(request.course_id)
    .bind(&request.name)
    .bind(&request.description)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(deck)))
}

/// GET /api/decks/:id - Deck with its ordered cards
#[utoipa::path(
    get,
    path = "/api/decks/{id}",
    tag = "flashcards",
    params(("id" = Uuid, Path, description = "Deck ID")),
    responses((status = 200, description = "Deck detail", body = DeckDetail)),
    security(("bearer_auth" = [])),
)]
pub async fn get_deck(
    State(state): State<AppState>,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<DeckDetail>, FlashcardsError> {
    let deck = sqlx::query_as::<_, Deck>("SELECT * FROM flashcard_decks WHERE id = $1")
        .bind(deck_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(FlashcardsError::DeckNotFound)?;

    let cards = sqlx::query_as::<_, Card>(
        "SELECT * FROM flashcards WHERE deck_id = $1 ORDER BY position ASC, created_at ASC",
    )
    .bind(deck_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(DeckDetail { deck, cards }))
}

/// DELETE /api/decks/:id - Delete a deck (cards cascade)
#[utoipa::path(
    delete,
    path = "/api/decks/{id}",
    tag = "flashcards",
    params(("id" = Uuid, Path, description = "Deck ID")),
    responses((status = 204, description = "Deck deleted")),
    security(("bearer_auth" = [])),
)]
pub async fn delete_deck(
    State(state): State<AppState>,
    Path(deck_id): Path<Uuid>,
) -> Result<StatusCode, FlashcardsError> {
    let result = sqlx::query("DELETE FROM flashcard_decks WHERE id = $1")
        .bind(deck_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FlashcardsError::DeckNotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/decks/:id/cards - Create a card
#[utoipa::path(
    post,
    path = "/api/decks/{id}/cards",
    tag = "flashcards",
    params(("id" = Uuid, Path, description = "Deck ID")),
    request_body = CreateCardRequest,
    responses((status = 201, description = "Card created", body = Card)),
    security(("bearer_auth" = [])),
)]
pub async fn create_card(
    State(state): State<AppState>,
    Path(deck_id): Path<Uuid>,
    Json(request): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<Card>), FlashcardsError> {
    if request.front.len() > MAX_SIDE_LENGTH || request.back.len() > MAX_SIDE_LENGTH {
        return Err(FlashcardsError::SideTooLong);
    }

    let deck_exists: (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM flashcard_decks WHERE id = $1)")
            .bind(deck_id)
            .fetch_one(&state.db)
            .await?;
    if !deck_exists.0 {
        return Err(FlashcardsError::DeckNotFound);
    }

    // Check card count limit
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM flashcards WHERE deck_id = $1")
        .bind(deck_id)
        .fetch_one(&state.db)
        .await?;

    if count.0 >= MAX_CARDS_PER_DECK {
        return Err(FlashcardsError::LimitExceeded);
    }

    // Get next position
    let max_pos: (Option<i32>,) =
        sqlx::query_as("SELECT MAX(position) FROM flashcards WHERE deck_id = $1")
            .bind(deck_id)
            .fetch_one(&state.db)
            .await?;

    let next_position = max_pos.0.map_or(1, |v| v + 1);

    let card = sqlx::query_as::<_, Card>(
        r"
        INSERT INTO flashcards (id, deck_id, front, back, position)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        ",
    )
    .bind(Uuid::now_v7())
    .bind(deck_id)
    .bind(&request.front)
    .bind(&request.back)
    .bind(next_position)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

/// PUT /api/cards/:id - Update a card
#[utoipa::path(
    put,
    path = "/api/cards/{id}",
    tag = "flashcards",
    params(("id" = Uuid, Path, description = "Card ID")),
    request_body = UpdateCardRequest,
    responses((status = 200, description = "Card updated", body = Card)),
    security(("bearer_auth" = [])),
)]
pub async fn update_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
    Json(request): Json<UpdateCardRequest>,
) -> Result<Json<Card>, FlashcardsError> {
    if request.front.as_ref().is_some_and(|s| s.len() > MAX_SIDE_LENGTH)
        || request.back.as_ref().is_some_and(|s| s.len() > MAX_SIDE_LENGTH)
    {
        return Err(FlashcardsError::SideTooLong);
    }

    let card = sqlx::query_as::<_, Card>(
        r"
        UPDATE flashcards
        SET front = COALESCE($2, front),
            back = COALESCE($3, back)
        WHERE id = $1
        RETURNING *
        ",
    )
    .bind(card_id)
    .bind(&request.front)
    .bind(&request.back)
    .fetch_optional(&state.db)
    .await?
    .ok_or(FlashcardsError::CardNotFound)?;

    Ok(Json(card))
}

/// DELETE /api/cards/:id - Delete a card
#[utoipa::path(
    delete,
    path = "/api/cards/{id}",
    tag = "flashcards",
    params(("id" = Uuid, Path, description = "Card ID")),
    responses((status = 204, description = "Card deleted")),
    security(("bearer_auth" = [])),
)]
pub async fn delete_card(
    State(state): State<AppState>,
    Path(card_id): Path<Uuid>,
) -> Result<StatusCode, FlashcardsError> {
    let result = sqlx::query("DELETE FROM flashcards WHERE id = $1")
        .bind(card_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(FlashcardsError::CardNotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/decks/:id/reorder - Reorder cards within a deck
#[utoipa::path(
    put,
    path = "/api/decks/{id}/reorder",
    tag = "flashcards",
    params(("id" = Uuid, Path, description = "Deck ID")),
    request_body = ReorderCardsRequest,
    responses((status = 204, description = "Cards reordered")),
    security(("bearer_auth" = [])),
)]
pub async fn reorder_cards(
    State(state): State<AppState>,
    Path(deck_id): Path<Uuid>,
    Json(request): Json<ReorderCardsRequest>,
) -> Result<StatusCode, FlashcardsError> {
    // Positions are rewritten for the whole deck in request order inside a
    // transaction; ids missing from the deck simply update zero rows.
    let mut tx = state.db.begin().await?;

    for (index, card_id) in request.card_ids.iter().enumerate() {
        sqlx::query("UPDATE flashcards SET position = $3 WHERE id = $1 AND deck_id = $2")
            .bind(card_id)
            .bind(deck_id)
            .bind(index as i32 + 1)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router
// ============================================================================

/// Create the flashcards router. Mounted behind auth + admin middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/decks", get(list_decks).post(create_deck))
        .route("/decks/{id}", get(get_deck).delete(delete_deck))
        .route("/decks/{id}/cards", post(create_card))
        .route("/decks/{id}/reorder", put(reorder_cards))
        .route("/cards/{id}", put(update_card).delete(delete_card))
}
