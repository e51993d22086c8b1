//! Team management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::api::middleware::{require_permission, RequireClaims};
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, MemberResponse, TeamResponse};
use crate::domain::TeamId;
use crate::infrastructure::team::{CreateTeamRequest, RenameTeamRequest};

pub const TEAM_READ: &str = "team::read::*";
pub const TEAM_DELETE: &str = "team::delete::*";

pub fn create_teams_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teams).post(create_team))
        .route(
            "/{team_id}",
            get(get_team).put(rename_team).delete(delete_team),
        )
}

#[derive(Debug, Deserialize)]
pub struct TeamBody {
    pub name: String,
}

fn parse_team_id(raw: &str) -> Result<TeamId, ApiError> {
    raw.parse::<TeamId>().map_err(ApiError::from)
}

/// POST /teams
pub async fn create_team(
    State(state): State<AppState>,
    RequireClaims { user_id, .. }: RequireClaims,
    Json(body): Json<TeamBody>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    let team = state
        .team_service
        .create(CreateTeamRequest {
            user_id,
            name: body.name,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(TeamResponse::from(&team))))
}

/// GET /teams
pub async fn list_teams(
    State(state): State<AppState>,
    RequireClaims { user_id, .. }: RequireClaims,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let members = state.team_service.list_for_user(&user_id).await?;
    Ok(Json(members.iter().map(MemberResponse::from).collect()))
}

/// GET /teams/{team_id}
pub async fn get_team(
    State(state): State<AppState>,
    RequireClaims { claims, .. }: RequireClaims,
    Path(team_id): Path<String>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team_id = parse_team_id(&team_id)?;
    require_permission(&state, &claims, &team_id, TEAM_READ)?;

    let team = state.team_service.get(&team_id).await?;
    Ok(Json(TeamResponse::from(&team)))
}

/// PUT /teams/{team_id}
pub async fn rename_team(
    State(state): State<AppState>,
    RequireClaims { user_id, .. }: RequireClaims,
    Path(team_id): Path<String>,
    Json(body): Json<TeamBody>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state
        .team_service
        .rename(RenameTeamRequest {
            user_id,
            team_id: parse_team_id(&team_id)?,
            name: body.name,
        })
        .await?;

    Ok(Json(TeamResponse::from(&team)))
}

/// DELETE /teams/{team_id}
pub async fn delete_team(
    State(state): State<AppState>,
    RequireClaims { user_id, claims }: RequireClaims,
    Path(team_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let team_id = parse_team_id(&team_id)?;
    require_permission(&state, &claims, &team_id, TEAM_DELETE)?;

    state.team_service.delete(&user_id, &team_id).await?;
    debug!(team_id = %team_id, "Team deleted over HTTP");

    Ok(StatusCode::NO_CONTENT)
}
