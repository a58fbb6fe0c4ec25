// rest_api/src/handlers.rs

use axum::extract::{FromRequest, FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use lib::services::appointments::{self, AppointmentInput, PatientLookup, QueueEntry, TodayStats};
use lib::services::auth::{self, LoginInput, LoginResponse};
use lib::services::departments::{self, DepartmentInput, SpecialtyInput};
use lib::services::doctors::{self, DoctorInput};
use lib::services::receptionists::{self, ReceptionistInput};
use lib::services::users::{self, UserInput};
use lib::services::{AppointmentQuery, DirectoryQuery, ListingParams, Page};
use models::{AppointmentRecord, DepartmentRecord, DoctorRecord, ReceptionistRecord, Specialty, UserProfile};

use crate::auth::{AdminOnly, AnyRole, Authorized, FrontDesk};
use crate::error::{ApiResult, RestApiError};
use crate::forms::StaffForm;
use crate::AppState;

/// JSON body whose rejections render as API errors.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(RestApiError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections render as API errors.
#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(RestApiError))]
pub struct ApiQuery<T>(pub T);

type Created<T> = (StatusCode, Json<T>);

fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "service": "clinic-backend" }))
}

// Auth and users

pub async fn login(
    State(state): State<AppState>, ApiJson(input): ApiJson<LoginInput>,
) -> ApiResult<Json<LoginResponse>> {
    Ok(Json(auth::login(state.store.as_ref(), &state.tokens, input).await?))
}

pub async fn me(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<AnyRole>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(users::me(state.store.as_ref(), &actor).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    _: Authorized<AdminOnly>,
    ApiJson(input): ApiJson<UserInput>,
) -> ApiResult<Created<UserProfile>> {
    Ok(created(users::create_user(state.store.as_ref(), input).await?))
}

pub async fn list_users(State(state): State<AppState>, _: Authorized<AdminOnly>) -> ApiResult<Json<Vec<UserProfile>>> {
    Ok(Json(users::list_users(state.store.as_ref()).await?))
}

// Departments

pub async fn list_departments(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<AnyRole>,
) -> ApiResult<Json<Vec<DepartmentRecord>>> {
    Ok(Json(departments::list_departments(state.store.as_ref(), &actor).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    _: Authorized<AdminOnly>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> ApiResult<Created<DepartmentRecord>> {
    Ok(created(departments::create_department(state.store.as_ref(), input).await?))
}

pub async fn delete_department(
    State(state): State<AppState>,
    _: Authorized<AdminOnly>,
    Path(department_id): Path<String>,
) -> ApiResult<StatusCode> {
    departments::delete_department(state.store.as_ref(), &department_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_specialties(
    State(state): State<AppState>,
    _: Authorized<AnyRole>,
    Path(department_id): Path<String>,
) -> ApiResult<Json<Vec<Specialty>>> {
    Ok(Json(departments::list_specialties(state.store.as_ref(), &department_id).await?))
}

pub async fn create_specialty(
    State(state): State<AppState>,
    _: Authorized<AdminOnly>,
    Path(department_id): Path<String>,
    ApiJson(input): ApiJson<SpecialtyInput>,
) -> ApiResult<Created<Specialty>> {
    Ok(created(departments::create_specialty(state.store.as_ref(), &department_id, input).await?))
}

// Staff directories

pub async fn list_doctors(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<FrontDesk>,
    ApiQuery(params): ApiQuery<ListingParams>,
) -> ApiResult<Json<Page<DoctorRecord>>> {
    let query = DirectoryQuery::from_params(&params)?;
    Ok(Json(doctors::list_doctors(state.store.as_ref(), &actor, query).await?))
}

pub async fn create_doctor(
    State(state): State<AppState>,
    _: Authorized<FrontDesk>,
    form: StaffForm<DoctorInput>,
) -> ApiResult<Created<DoctorRecord>> {
    let record = doctors::create_doctor(state.store.as_ref(), state.images.as_deref(), form.fields, form.image).await?;
    Ok(created(record))
}

pub async fn list_receptionists(
    State(state): State<AppState>,
    _: Authorized<AnyRole>,
    ApiQuery(params): ApiQuery<ListingParams>,
) -> ApiResult<Json<Page<ReceptionistRecord>>> {
    let query = DirectoryQuery::from_params(&params)?;
    Ok(Json(receptionists::list_receptionists(state.store.as_ref(), query).await?))
}

pub async fn create_receptionist(
    State(state): State<AppState>,
    _: Authorized<AdminOnly>,
    form: StaffForm<ReceptionistInput>,
) -> ApiResult<Created<ReceptionistRecord>> {
    let record =
        receptionists::create_receptionist(state.store.as_ref(), state.images.as_deref(), form.fields, form.image).await?;
    Ok(created(record))
}

// Appointments

#[derive(Debug, Default, Deserialize)]
pub struct PatientParams {
    #[serde(rename = "contactNumber", alias = "contact_number")]
    pub contact_number: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusInput {
    pub status: Option<String>,
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<FrontDesk>,
    ApiQuery(params): ApiQuery<ListingParams>,
) -> ApiResult<Json<Page<AppointmentRecord>>> {
    let query = AppointmentQuery::from_params(&params)?;
    Ok(Json(appointments::list_appointments(state.store.as_ref(), &actor, query).await?))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    _: Authorized<FrontDesk>,
    ApiJson(input): ApiJson<AppointmentInput>,
) -> ApiResult<Created<AppointmentRecord>> {
    let record = appointments::create_appointment(state.store.as_ref(), state.notifier.as_ref(), input).await?;
    Ok(created(record))
}

pub async fn find_patient(
    State(state): State<AppState>,
    _: Authorized<AnyRole>,
    ApiQuery(params): ApiQuery<PatientParams>,
) -> ApiResult<Json<PatientLookup>> {
    let lookup = appointments::find_patient_by_contact(state.store.as_ref(), params.contact_number.as_deref()).await?;
    Ok(Json(lookup))
}

pub async fn today_stats(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<AnyRole>,
) -> ApiResult<Json<TodayStats>> {
    Ok(Json(appointments::today_stats(state.store.as_ref(), &actor, today()).await?))
}

pub async fn next_patient_queue(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<FrontDesk>,
) -> ApiResult<Json<Vec<QueueEntry>>> {
    Ok(Json(appointments::next_patient_queue(state.store.as_ref(), &actor, today()).await?))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    Authorized(actor, _): Authorized<AnyRole>,
    Path(appointment_id): Path<String>,
    ApiJson(input): ApiJson<StatusInput>,
) -> ApiResult<Json<AppointmentRecord>> {
    let record =
        appointments::update_status(state.store.as_ref(), &actor, &appointment_id, input.status.as_deref()).await?;
    Ok(Json(record))
}
