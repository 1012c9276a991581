//! HTTP handlers for the supplier and institution registries

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::partner::{CreatePartnerInput, Partner, PartnerService};
use crate::AppState;

pub async fn create_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreatePartnerInput>,
) -> AppResult<(StatusCode, Json<Partner>)> {
    let supplier = PartnerService::suppliers(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Partner>>> {
    let suppliers = PartnerService::suppliers(state.db).list().await?;
    Ok(Json(suppliers))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Partner>> {
    let supplier = PartnerService::suppliers(state.db).get(supplier_id).await?;
    Ok(Json(supplier))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    PartnerService::suppliers(state.db).delete(supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_institution(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<CreatePartnerInput>,
) -> AppResult<(StatusCode, Json<Partner>)> {
    let institution = PartnerService::institutions(state.db).create(input).await?;
    Ok((StatusCode::CREATED, Json(institution)))
}

pub async fn list_institutions(State(state): State<AppState>) -> AppResult<Json<Vec<Partner>>> {
    let institutions = PartnerService::institutions(state.db).list().await?;
    Ok(Json(institutions))
}

pub async fn get_institution(
    State(state): State<AppState>,
    Path(institution_id): Path<Uuid>,
) -> AppResult<Json<Partner>> {
    let institution = PartnerService::institutions(state.db)
        .get(institution_id)
        .await?;
    Ok(Json(institution))
}

pub async fn delete_institution(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(institution_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    PartnerService::institutions(state.db)
        .delete(institution_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
