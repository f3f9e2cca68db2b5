use axum::extract::State;
use tracing::instrument;

use crate::error::AppResult;
use crate::models::{ApiResponse, ContentItem, ContentQuery};
use crate::state::AppState;
use crate::validation::ValidatedQuery;

/// `GET /api/content` - filtered, paginated content listing, newest first.
///
/// Query: `page`, `limit`, `category`, `status`, `search` (case-insensitive
/// over title, excerpt and body), `tags` (repeatable; any match).
#[instrument(skip(state))]
pub async fn list_content(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ContentQuery>,
) -> AppResult<ApiResponse<Vec<ContentItem>>> {
    let page = state.stores.content.list(&query).await?;
    Ok(ApiResponse::paginated(page.items, page.pagination))
}
