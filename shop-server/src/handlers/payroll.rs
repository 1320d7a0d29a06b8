//! Employees and monthly payroll sheets. Admin only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use shop_core::ability::{subjects, Act};
use shop_core::storage::PayrollStore;
use shop_core::{
    Employee, EmployeeUpdate, ListParams, MonthlyRecord, MonthlyRecordFilter, MonthlyRecordUpdate, NewEmployee,
    NewMonthlyRecord, NewPenalty, NewPrepayment, Page, Penalty, Prepayment,
};
use tracing::info;

use crate::auth::CurrentAdmin;
use crate::error::ApiResult;
use crate::extract::{Params, Valid};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/employees", get(list_employees).post(create_employee))
        .route(
            "/employees/:id",
            get(get_employee).patch(update_employee).delete(delete_employee),
        )
        .route("/monthly-records", get(list_records).post(create_record))
        .route(
            "/monthly-records/:id",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .route("/monthly-records/:id/penalties", get(list_penalties).post(add_penalty))
        .route("/monthly-records/:id/prepayments", get(list_prepayments).post(add_prepayment))
        .route("/penalties/:id", delete(delete_penalty))
        .route("/prepayments/:id", delete(delete_prepayment))
}

async fn list_employees(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<Employee>>> {
    admin.require(Act::Read, subjects::EMPLOYEE)?;
    Ok(Json(state.storage.list_employees(params).await?))
}

async fn get_employee(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<Employee>> {
    admin.require(Act::Read, subjects::EMPLOYEE)?;
    Ok(Json(state.storage.get_employee(id).await?))
}

async fn create_employee(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewEmployee>,
) -> ApiResult<(StatusCode, Json<Employee>)> {
    admin.require(Act::Create, subjects::EMPLOYEE)?;
    let employee = state.storage.create_employee(input).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn update_employee(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<EmployeeUpdate>,
) -> ApiResult<Json<Employee>> {
    admin.require(Act::Update, subjects::EMPLOYEE)?;
    Ok(Json(state.storage.update_employee(id, input).await?))
}

async fn delete_employee(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::EMPLOYEE)?;
    state.storage.delete_employee(id).await?;
    info!(admin_id = admin.admin.id, employee_id = id, "Employee deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_records(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Params(filter): Params<MonthlyRecordFilter>,
    Params(params): Params<ListParams>,
) -> ApiResult<Json<Page<MonthlyRecord>>> {
    admin.require(Act::Read, subjects::PAYROLL)?;
    Ok(Json(state.storage.list_monthly_records(filter, params).await?))
}

async fn get_record(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<Json<MonthlyRecord>> {
    admin.require(Act::Read, subjects::PAYROLL)?;
    Ok(Json(state.storage.get_monthly_record(id).await?))
}

async fn create_record(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Valid(input): Valid<NewMonthlyRecord>,
) -> ApiResult<(StatusCode, Json<MonthlyRecord>)> {
    admin.require(Act::Create, subjects::PAYROLL)?;
    let record = state.storage.create_monthly_record(input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
    Valid(input): Valid<MonthlyRecordUpdate>,
) -> ApiResult<Json<MonthlyRecord>> {
    admin.require(Act::Update, subjects::PAYROLL)?;
    Ok(Json(state.storage.update_monthly_record(id, input).await?))
}

async fn delete_record(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::PAYROLL)?;
    state.storage.delete_monthly_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_penalties(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(record_id): Path<i64>,
) -> ApiResult<Json<Vec<Penalty>>> {
    admin.require(Act::Read, subjects::PAYROLL)?;
    Ok(Json(state.storage.list_penalties(record_id).await?))
}

async fn add_penalty(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(record_id): Path<i64>,
    Valid(input): Valid<NewPenalty>,
) -> ApiResult<(StatusCode, Json<Penalty>)> {
    admin.require(Act::Create, subjects::PAYROLL)?;
    let penalty = state.storage.add_penalty(record_id, input).await?;
    Ok((StatusCode::CREATED, Json(penalty)))
}

async fn delete_penalty(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::PAYROLL)?;
    state.storage.delete_penalty(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_prepayments(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(record_id): Path<i64>,
) -> ApiResult<Json<Vec<Prepayment>>> {
    admin.require(Act::Read, subjects::PAYROLL)?;
    Ok(Json(state.storage.list_prepayments(record_id).await?))
}

async fn add_prepayment(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(record_id): Path<i64>,
    Valid(input): Valid<NewPrepayment>,
) -> ApiResult<(StatusCode, Json<Prepayment>)> {
    admin.require(Act::Create, subjects::PAYROLL)?;
    let prepayment = state.storage.add_prepayment(record_id, input).await?;
    Ok((StatusCode::CREATED, Json(prepayment)))
}

async fn delete_prepayment(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    admin.require(Act::Delete, subjects::PAYROLL)?;
    state.storage.delete_prepayment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
