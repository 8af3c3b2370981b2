//! Course groups and their members.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::validate_text;
use crate::db::{
    non_blank, CourseGroup, CreateGroupRequest, GroupCreated, GroupMemberQuery,
    GroupMemberRequest, GroupMemberWithUser, GroupQuery, MessageResponse,
};
use crate::AppState;

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<GroupQuery>,
) -> Result<Json<Vec<CourseGroup>>, ApiError> {
    let course_id = query
        .course_id
        .ok_or_else(|| ApiError::bad_request("Missing courseId"))?;

    let groups = sqlx::query_as::<_, CourseGroup>(
        "SELECT * FROM course_groups WHERE course_id = ? ORDER BY group_id",
    )
    .bind(course_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupCreated>), ApiError> {
    let (Some(course_id), Some(group_name)) = (req.course_id, non_blank(&req.group_name)) else {
        return Err(ApiError::bad_request("Missing courseId or groupName"));
    };
    validate_text(group_name, "Group name").map_err(|e| ApiError::validation_field("groupName", e))?;

    let result = sqlx::query("INSERT INTO course_groups (course_id, group_name) VALUES (?, ?)")
        .bind(course_id)
        .bind(group_name)
        .execute(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(GroupCreated {
            group_id: result.last_insert_rowid(),
        }),
    ))
}

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    ApiPath(group_id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    let result = sqlx::query("DELETE FROM course_groups WHERE group_id = ?")
        .bind(group_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Group not found"));
    }

    Ok(Json(MessageResponse::new("Group deleted")))
}

/// Members of one group with their names and emails
pub async fn list_group_members(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<GroupMemberQuery>,
) -> Result<Json<Vec<GroupMemberWithUser>>, ApiError> {
    let group_id = query
        .group_id
        .ok_or_else(|| ApiError::bad_request("Missing groupId"))?;

    let members = sqlx::query_as::<_, GroupMemberWithUser>(
        r#"
        SELECT gm.user_id, u.first_name, u.last_name, u.email
        FROM group_members gm
        JOIN users u ON gm.user_id = u.user_id
        WHERE gm.group_id = ?
        ORDER BY u.last_name, u.first_name
        "#,
    )
    .bind(group_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(members))
}

fn member_ids(req: &GroupMemberRequest) -> Result<(i64, i64), ApiError> {
    match (req.group_id, req.user_id) {
        (Some(group_id), Some(user_id)) => Ok((group_id, user_id)),
        _ => Err(ApiError::bad_request("Missing groupId or userId")),
    }
}

pub async fn add_group_member(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GroupMemberRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let (group_id, user_id) = member_ids(&req)?;

    sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES (?, ?)")
        .bind(group_id)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User added to group")),
    ))
}

pub async fn remove_group_member(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<GroupMemberRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (group_id, user_id) = member_ids(&req)?;

    let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
        .bind(group_id)
        .bind(user_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Membership not found"));
    }

    Ok(Json(MessageResponse::new("User removed from group")))
}
