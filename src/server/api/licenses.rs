use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{NaiveDate, Utc};

use super::access::require_with;
use crate::auth::{Action, RequireSession, TenantContext};
use crate::license::{LicenseInput, LicensePatch, SerialOptions, Verification, format_iso_date};
use crate::server::AppState;
use crate::server::dto::{
    CheckLicenseRequest, CheckLicenseResponse, CreateLicenseRequest, GenerateLicenseRequest,
    LicenseResponse, LicensesResponse, SerialPreviewParams, SerialPreviewResponse,
    SuccessResponse, UpdateLicenseRequest,
};
use crate::server::response::{ApiError, JsonBody, StoreOptionExt};
use crate::server::validation::{
    parse_date_field, parse_license_status, parse_plan, parse_timestamp,
};
use crate::types::{LicenseStatus, PlanType, Tenant};

fn admin_only(session: &RequireSession, message: &'static str) -> Result<(), ApiError> {
    require_with(&session.user, Action::ManageLicenses, None, message)
}

fn random_length(value: Option<f64>) -> Option<i64> {
    value.map(|len| len.floor() as i64)
}

/// Start date from the request, or `today`; expiry explicit or one plan period later.
fn resolve_dates(
    state: &AppState,
    plan: PlanType,
    today: NaiveDate,
    start: Option<&str>,
    expiry: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let start = match start {
        Some(s) => parse_date_field(s, "startDate")?,
        None => today,
    };
    let explicit = expiry
        .map(|s| parse_date_field(s, "expiryDate"))
        .transpose()?;
    let expiry = state.licenses.compute_expiry(start, plan, explicit)?;
    Ok((start, expiry))
}

pub async fn list_licenses(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LicensesResponse>, ApiError> {
    admin_only(&session, "Only admins can list licenses")?;

    let licenses = state.licenses.list(&session.tenant)?;
    Ok(Json(LicensesResponse { licenses }))
}

pub async fn create_license(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<LicenseResponse>), ApiError> {
    admin_only(&session, "Only admins can create licenses")?;

    if req.auto_generate {
        return auto_generate(&state, &session.tenant, req);
    }

    let (Some(serial_number), Some(user_name), Some(plan), Some(start_date), Some(expiry_date)) = (
        req.serial_number,
        req.user_name,
        req.plan_type,
        req.start_date,
        req.expiry_date,
    ) else {
        return Err(ApiError::bad_request("Missing required license fields"));
    };

    let plan_type = parse_plan(&plan)?;
    let status = req
        .status
        .as_deref()
        .map(parse_license_status)
        .transpose()?
        .unwrap_or(LicenseStatus::Active);

    let license = state.licenses.insert(
        &session.tenant,
        LicenseInput {
            serial_number: serial_number.trim().to_string(),
            user_name,
            plan_type,
            start_date,
            expiry_date,
            status,
            notes: req.notes,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(LicenseResponse {
            license,
            generated: false,
        }),
    ))
}

fn auto_generate(
    state: &AppState,
    tenant: &Tenant,
    req: CreateLicenseRequest,
) -> Result<(StatusCode, Json<LicenseResponse>), ApiError> {
    let plan = req
        .plan_type
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("planType is required when autoGenerate=true"))?;
    let plan = parse_plan(plan)?;
    let status = req
        .status
        .as_deref()
        .map(parse_license_status)
        .transpose()?
        .unwrap_or(LicenseStatus::Active);
    let today = Utc::now().date_naive();

    let serial_number = state.licenses.generate_serial(
        tenant,
        &SerialOptions {
            prefix: req.prefix.as_deref(),
            user_name: req.user_name.as_deref(),
            plan,
            issued_on: today,
            random_length: random_length(req.random_length),
        },
    )?;

    let (start, expiry) = resolve_dates(
        state,
        plan,
        today,
        req.start_date.as_deref(),
        req.expiry_date.as_deref(),
    )?;

    let license = state.licenses.insert(
        tenant,
        LicenseInput {
            serial_number,
            user_name: req
                .user_name
                .unwrap_or_else(|| state.licenses.unassigned_user().to_string()),
            plan_type: plan,
            start_date: format_iso_date(start),
            expiry_date: format_iso_date(expiry),
            status,
            notes: req.notes,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(LicenseResponse {
            license,
            generated: true,
        }),
    ))
}

pub async fn generate_license(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<GenerateLicenseRequest>,
) -> Result<(StatusCode, Json<LicenseResponse>), ApiError> {
    admin_only(&session, "Only admins can generate licenses")?;

    let plan = req
        .plan_type
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("planType is required"))?;
    let plan = parse_plan(plan)?;
    let today = Utc::now().date_naive();

    let (start, expiry) = resolve_dates(
        &state,
        plan,
        today,
        req.start_date.as_deref(),
        req.expiry_date.as_deref(),
    )?;

    let serial_number = state.licenses.generate_serial(
        &session.tenant,
        &SerialOptions {
            prefix: req.prefix.as_deref(),
            user_name: req.user_name.as_deref(),
            plan,
            issued_on: today,
            random_length: random_length(req.random_length),
        },
    )?;

    let license = state.licenses.insert(
        &session.tenant,
        LicenseInput {
            serial_number,
            user_name: req
                .user_name
                .unwrap_or_else(|| state.licenses.unassigned_user().to_string()),
            plan_type: plan,
            start_date: format_iso_date(start),
            expiry_date: format_iso_date(expiry),
            status: LicenseStatus::Active,
            notes: req.notes,
        },
    )?;

    Ok((
        StatusCode::CREATED,
        Json(LicenseResponse {
            license,
            generated: false,
        }),
    ))
}

fn preview(
    state: &AppState,
    tenant: &Tenant,
    params: &SerialPreviewParams,
    allow_overrides: bool,
) -> Result<SerialPreviewResponse, ApiError> {
    let plan = parse_plan(params.plan_type.as_deref().unwrap_or("monthly"))?;

    let issued_on = match params.issued_at.as_deref().filter(|_| allow_overrides) {
        Some(raw) => parse_timestamp(raw)
            .ok_or_else(|| ApiError::bad_request("issuedAt must be a valid date"))?
            .date_naive(),
        None => Utc::now().date_naive(),
    };

    let serial_number = state.licenses.generate_serial(
        tenant,
        &SerialOptions {
            prefix: params.prefix.as_deref(),
            user_name: params.user_name.as_deref(),
            plan,
            issued_on,
            random_length: params
                .random_length
                .as_deref()
                .and_then(|s| s.trim().parse().ok()),
        },
    )?;

    let (start_date, expiry_date) = if allow_overrides {
        resolve_dates(
            state,
            plan,
            issued_on,
            params.start_date.as_deref().filter(|s| !s.is_empty()),
            params.expiry_date.as_deref().filter(|s| !s.is_empty()),
        )?
    } else {
        resolve_dates(state, plan, issued_on, None, None)?
    };

    Ok(SerialPreviewResponse {
        serial_number,
        plan_type: plan,
        start_date,
        expiry_date,
        preview: true,
    })
}

/// Dry run of `generate` starting today. Nothing is persisted.
pub async fn preview_generated(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SerialPreviewParams>,
) -> Result<Json<SerialPreviewResponse>, ApiError> {
    admin_only(&session, "Only admins can generate licenses")?;
    preview(&state, &session.tenant, &params, false).map(Json)
}

pub async fn preview_serial(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SerialPreviewParams>,
) -> Result<Json<SerialPreviewResponse>, ApiError> {
    admin_only(&session, "Only admins can preview serials")?;
    preview(&state, &session.tenant, &params, true).map(Json)
}

pub async fn update_license(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateLicenseRequest>,
) -> Result<Json<LicenseResponse>, ApiError> {
    admin_only(&session, "Only admins can modify licenses")?;

    let existing = state
        .licenses
        .get(&session.tenant, &id)?
        .or_not_found("License not found")?;

    let patch = LicensePatch {
        serial_number: req.serial_number.map(|s| s.trim().to_string()),
        user_name: req.user_name,
        plan_type: req.plan_type.as_deref().map(parse_plan).transpose()?,
        start_date: req.start_date,
        expiry_date: req.expiry_date,
        status: req
            .status
            .as_deref()
            .map(parse_license_status)
            .transpose()?,
        notes: req.notes,
    };

    let license = state.licenses.update(&session.tenant, existing, patch)?;
    Ok(Json(LicenseResponse {
        license,
        generated: false,
    }))
}

pub async fn delete_license(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    admin_only(&session, "Only admins can delete licenses")?;

    if !state.licenses.delete(&session.tenant, &id)? {
        return Err(ApiError::not_found("License not found"));
    }

    Ok(Json(SuccessResponse::ok()))
}

/// Public entitlement check; needs tenant headers but no session.
pub async fn check_license(
    State(state): State<Arc<AppState>>,
    TenantContext(tenant): TenantContext,
    JsonBody(req): JsonBody<CheckLicenseRequest>,
) -> Result<(StatusCode, Json<CheckLicenseResponse>), ApiError> {
    let serial = req
        .serial
        .ok_or_else(|| ApiError::bad_request("Serial is required"))?;

    let outcome = state.licenses.verify(&tenant, &serial, Utc::now())?;

    let response = match outcome {
        Verification::InvalidSerial => (
            StatusCode::NOT_FOUND,
            CheckLicenseResponse {
                reason: Some("Invalid serial"),
                ..CheckLicenseResponse::default()
            },
        ),
        Verification::Inactive { status } => (
            StatusCode::FORBIDDEN,
            CheckLicenseResponse {
                reason: Some("License inactive"),
                status: Some(status),
                ..CheckLicenseResponse::default()
            },
        ),
        Verification::Expired { expiry } => (
            StatusCode::FORBIDDEN,
            CheckLicenseResponse {
                reason: Some("License expired"),
                expiry: Some(expiry),
                ..CheckLicenseResponse::default()
            },
        ),
        Verification::Valid {
            user,
            expiry,
            plan,
            status,
        } => (
            StatusCode::OK,
            CheckLicenseResponse {
                valid: true,
                user: Some(user),
                expiry: Some(expiry),
                plan: Some(plan),
                status: Some(status),
                ..CheckLicenseResponse::default()
            },
        ),
    };

    Ok((response.0, Json(response.1)))
}
