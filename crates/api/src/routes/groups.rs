//! Group routes: lifecycle, membership and timeline.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use groupbuy_core::group::{GroupChanges, GroupStatus, NewGroup};
use groupbuy_db::repositories::GroupFilter;

use super::error::{bad_request, map_group_error};
use crate::AppState;
use crate::middleware::AuthUser;

/// Creates group routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route(
            "/groups/{group_id}",
            get(get_group).patch(update_group).delete(delete_group),
        )
        .route("/groups/{group_id}/join", post(join_group))
        .route("/groups/{group_id}/withdraw", post(withdraw_from_group))
        .route("/groups/{group_id}/commit", post(commit_to_group))
        .route("/groups/{group_id}/members", get(list_members))
        .route("/groups/{group_id}/timeline", get(get_timeline))
}

/// Query parameters for listing groups.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGroupsQuery {
    /// Restrict to one project.
    pub project_id: Option<Uuid>,
    /// Restrict to one status, case-insensitive.
    pub status: Option<String>,
}

/// GET /groups
async fn list_groups(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<ListGroupsQuery>,
) -> Response {
    let status = match query.status.as_deref() {
        None => None,
        Some(raw) => match GroupStatus::parse(raw) {
            Some(status) => Some(status),
            None => return bad_request(format!("Unknown group status: {raw}")),
        },
    };
    let filter = GroupFilter {
        project_id: query.project_id,
        status,
    };

    match state.groups().list_groups(&identity, filter).await {
        Ok(groups) => Json(groups).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// POST /groups
async fn create_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(input): Json<NewGroup>,
) -> Response {
    match state.groups().create_group(&identity, input).await {
        Ok(group) => (StatusCode::CREATED, Json(group)).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// GET /groups/{group_id}
async fn get_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.groups().get_group_detail(&identity, group_id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// PATCH /groups/{group_id}
async fn update_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
    Json(changes): Json<GroupChanges>,
) -> Response {
    match state.groups().update_group(&identity, group_id, changes).await {
        Ok(group) => Json(group).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// DELETE /groups/{group_id}
async fn delete_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.groups().deactivate_group(&identity, group_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// POST /groups/{group_id}/join
async fn join_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.memberships().join(&identity, group_id).await {
        Ok(member) => (StatusCode::CREATED, Json(member)).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// POST /groups/{group_id}/withdraw
async fn withdraw_from_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.memberships().withdraw(&identity, group_id).await {
        Ok(member) => Json(member).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// POST /groups/{group_id}/commit
async fn commit_to_group(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.memberships().commit(&identity, group_id).await {
        Ok(member) => Json(member).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// GET /groups/{group_id}/members
async fn list_members(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.memberships().list_members(&identity, group_id).await {
        Ok(members) => Json(members).into_response(),
        Err(e) => map_group_error(&e),
    }
}

/// GET /groups/{group_id}/timeline
async fn get_timeline(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Response {
    match state.timeline().list(&identity, group_id).await {
        Ok(milestones) => Json(milestones).into_response(),
        Err(e) => map_group_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth_middleware;
    use crate::test_support::{bearer, test_state};
    use axum::{body::Body, http::Request, middleware};
    use groupbuy_core::access::Role;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = test_state();
        Router::new()
            .merge(routes())
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/groups").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "missing_token");
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/groups")
                    .header("authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "invalid_token");
    }

    #[tokio::test]
    async fn test_unknown_role_is_unauthorized() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/groups")
                    .header("authorization", bearer("AUDITOR"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_status_filter_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/groups?status=pending")
                    .header("authorization", bearer(Role::Buyer.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_buyer_cannot_create_group() {
        let body = serde_json::json!({
            "projectId": Uuid::new_v4(),
            "name": "Tower B bulk buy",
            "targetBuyersCount": 10
        });
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/groups")
                    .header("authorization", bearer(Role::Buyer.as_str()))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_partner_admin_cannot_join() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/groups/{}/join", Uuid::new_v4()))
                    .header("authorization", bearer(Role::PartnerAdmin.as_str()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri(format!("/groups/{}", Uuid::new_v4()))
                    .header("authorization", bearer(Role::Organizer.as_str()))
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
