use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::admin_dto::{
        AssignOwnerPayload, BootstrapOtpPayload, CompleteBootstrapPayload, CreatePropertyPayload,
        CreateUserPayload, CreatedUserResponse, PropertyListQuery, PropertyListResponse,
        PropertyResponse, SetAccountantPropertiesPayload, StatementQuery, StatementResponse,
        UserListQuery, UserListResponse, UserResponse,
    },
    error::Result,
    models::property::PropertyRef,
    utils::time::parse_date,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/admin/bootstrap/otp",
    request_body = BootstrapOtpPayload,
    responses(
        (status = 202, description = "Verification code sent"),
        (status = 409, description = "An administrator already exists")
    )
)]
#[axum::debug_handler]
pub async fn request_bootstrap_code(
    State(state): State<AppState>,
    Json(payload): Json<BootstrapOtpPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .admin_service
        .request_admin_bootstrap(&payload.email)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "code_sent" }))))
}

#[utoipa::path(
    post,
    path = "/api/admin/bootstrap",
    request_body = CompleteBootstrapPayload,
    responses(
        (status = 201, description = "Administrator created", body = Json<UserResponse>),
        (status = 400, description = "Invalid or expired code"),
        (status = 409, description = "An administrator already exists")
    )
)]
#[axum::debug_handler]
pub async fn complete_bootstrap(
    State(state): State<AppState>,
    Json(payload): Json<CompleteBootstrapPayload>,
) -> Result<impl IntoResponse> {
    let admin = state.admin_service.complete_admin_bootstrap(payload).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(admin))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUserPayload,
    responses(
        (status = 201, description = "Owner or accountant created; auxiliary failures are listed in warnings", body = Json<CreatedUserResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .admin_service
        .create_owner_or_accountant(payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(outcome.map(CreatedUserResponse::from)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("role" = Option<String>, Query, description = "admin, owner or accountant")
    ),
    responses(
        (status = 200, description = "Users", body = Json<UserListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse> {
    let items: Vec<UserResponse> = state
        .admin_service
        .list_users(query.role)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(UserListResponse {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/owners/{id}",
    params(
        ("id" = Uuid, Path, description = "Owner ID")
    ),
    responses(
        (status = 200, description = "Owner, their properties and api keys deleted"),
        (status = 404, description = "Owner not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_owner(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.admin_service.delete_owner(id).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    delete,
    path = "/api/admin/accountants/{id}",
    params(
        ("id" = Uuid, Path, description = "Accountant ID")
    ),
    responses(
        (status = 200, description = "Accountant deleted and unassigned"),
        (status = 404, description = "Accountant not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_accountant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let summary = state.admin_service.delete_accountant(id).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    put,
    path = "/api/admin/accountants/{id}/properties",
    params(
        ("id" = Uuid, Path, description = "Accountant ID")
    ),
    request_body = SetAccountantPropertiesPayload,
    responses(
        (status = 200, description = "Assignments replaced"),
        (status = 404, description = "Accountant not found")
    )
)]
#[axum::debug_handler]
pub async fn set_accountant_properties(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetAccountantPropertiesPayload>,
) -> Result<impl IntoResponse> {
    let assignment = state
        .admin_service
        .set_accountant_assignments(id, &payload.property_ids)
        .await?;
    Ok(Json(assignment))
}

#[utoipa::path(
    post,
    path = "/api/admin/properties",
    request_body = CreatePropertyPayload,
    responses(
        (status = 201, description = "Property created", body = Json<PropertyResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Owner not found"),
        (status = 409, description = "Property id already in use")
    )
)]
#[axum::debug_handler]
pub async fn create_property(
    State(state): State<AppState>,
    Json(payload): Json<CreatePropertyPayload>,
) -> Result<impl IntoResponse> {
    let property = state.admin_service.create_property(payload).await?;
    Ok((StatusCode::CREATED, Json(PropertyResponse::from(property))))
}

#[utoipa::path(
    get,
    path = "/api/admin/properties",
    params(
        ("owner_id" = Option<Uuid>, Query, description = "Only properties of this owner")
    ),
    responses(
        (status = 200, description = "Properties", body = Json<PropertyListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_properties(
    State(state): State<AppState>,
    Query(query): Query<PropertyListQuery>,
) -> Result<impl IntoResponse> {
    let items: Vec<PropertyResponse> = state
        .admin_service
        .list_properties(query.owner_id)
        .await?
        .into_iter()
        .map(PropertyResponse::from)
        .collect();
    Ok(Json(PropertyListResponse {
        total: items.len(),
        items,
    }))
}

#[utoipa::path(
    get,
    path = "/api/admin/properties/{property_id}",
    params(
        ("property_id" = String, Path, description = "Storage UUID or numeric property id")
    ),
    responses(
        (status = 200, description = "Property found", body = Json<PropertyResponse>),
        (status = 404, description = "Property not found")
    )
)]
#[axum::debug_handler]
pub async fn get_property(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse> {
    let property = state
        .admin_service
        .get_property(PropertyRef::parse(&property_id)?)
        .await?;
    Ok(Json(PropertyResponse::from(property)))
}

#[utoipa::path(
    delete,
    path = "/api/admin/properties/{property_id}",
    params(
        ("property_id" = String, Path, description = "Storage UUID or numeric property id")
    ),
    responses(
        (status = 200, description = "Property deleted"),
        (status = 404, description = "Property not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_property(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> Result<impl IntoResponse> {
    let outcome = state
        .admin_service
        .delete_property(PropertyRef::parse(&property_id)?)
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/admin/properties/{property_id}/owner",
    params(
        ("property_id" = i64, Path, description = "Numeric property id")
    ),
    request_body = AssignOwnerPayload,
    responses(
        (status = 200, description = "Ownership reassigned", body = Json<PropertyResponse>),
        (status = 404, description = "Property or owner not found")
    )
)]
#[axum::debug_handler]
pub async fn assign_owner(
    State(state): State<AppState>,
    Path(property_id): Path<i64>,
    Json(payload): Json<AssignOwnerPayload>,
) -> Result<impl IntoResponse> {
    let property = state
        .admin_service
        .assign_property_to_owner(property_id, payload.owner)
        .await?;
    Ok(Json(PropertyResponse::from(property)))
}

#[utoipa::path(
    get,
    path = "/api/admin/properties/{property_id}/statement",
    params(
        ("property_id" = i64, Path, description = "Numeric property id"),
        ("start_date" = String, Query, description = "First day, YYYY-MM-DD"),
        ("end_date" = String, Query, description = "Last day, YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "Commission breakdown and invoices", body = Json<StatementResponse>),
        (status = 400, description = "Invalid date range"),
        (status = 404, description = "Property not found")
    )
)]
#[axum::debug_handler]
pub async fn owner_statement(
    State(state): State<AppState>,
    Path(property_id): Path<i64>,
    Query(query): Query<StatementQuery>,
) -> Result<impl IntoResponse> {
    let start = parse_date("start_date", &query.start_date)?;
    let end = parse_date("end_date", &query.end_date)?;
    let statement = state
        .admin_service
        .generate_owner_statement(property_id, start, end)
        .await?;
    Ok(Json(StatementResponse::from(statement)))
}
