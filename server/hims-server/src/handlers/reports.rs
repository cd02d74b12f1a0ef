use auth_identity::StaffRole;
use axum::{extract::State, Json};
use billing_service::{financial_report, FinancialReport};
use chrono::{NaiveDate, Utc};
use error_common::reporting::Period;
use reception_service::{patient_statistics as demographics, PatientStatistics};
use serde::Deserialize;
use uuid::Uuid;
use ward_service::{occupancy_by_ward, WardOccupancy};

use super::ok;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::extract::Params;
use crate::middleware::AuthContext;
use crate::reports::{
    dashboard_stats, doctor_performance as performance, operational_report, DashboardStats,
    DoctorPerformanceReport, OperationalReport,
};
use crate::server::HimsServer;

#[derive(Debug, Deserialize)]
pub struct ReportPeriod {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DoctorReportQuery {
    pub doctor_id: Option<Uuid>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    #[serde(default = "default_dashboard_days")]
    pub days: i64,
}

fn default_dashboard_days() -> i64 {
    30
}

/// Gender, age band and monthly registration counts
pub async fn patient_statistics(
    State(server): State<HimsServer>,
    _auth: AuthContext,
) -> ApiResult<Json<ApiResponse<PatientStatistics>>> {
    Ok(ok(demographics(&server.db, Utc::now().date_naive()).await?))
}

/// Revenue and outstanding balances; defaults to the last 30 days
pub async fn financial(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Params(period): Params<ReportPeriod>,
) -> ApiResult<Json<ApiResponse<FinancialReport>>> {
    auth.require_role(&[StaffRole::Accountant])?;
    Ok(ok(financial_report(&server.db, period.start, period.end).await?))
}

/// Appointments, beds, lab work and dispensing over a period
pub async fn operational(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(period): Params<ReportPeriod>,
) -> ApiResult<Json<ApiResponse<OperationalReport>>> {
    let period = Period::resolve(period.start, period.end)?;
    Ok(ok(operational_report(&server, period).await?))
}

/// A doctor's appointments and billed revenue; doctors may read their own,
/// administrators anyone's
pub async fn doctor_performance(
    State(server): State<HimsServer>,
    auth: AuthContext,
    Params(query): Params<DoctorReportQuery>,
) -> ApiResult<Json<ApiResponse<DoctorPerformanceReport>>> {
    let doctor_id = query
        .doctor_id
        .ok_or_else(|| ApiError::bad_request("Doctor ID is required"))?;
    if auth.principal.user_id != doctor_id {
        auth.require_role(&[])?;
    }
    let period = Period::resolve(query.start, query.end)?;
    Ok(ok(performance(&server, doctor_id, period).await?))
}

/// Occupancy of every active ward
pub async fn ward_occupancy(
    State(server): State<HimsServer>,
    _auth: AuthContext,
) -> ApiResult<Json<ApiResponse<Vec<WardOccupancy>>>> {
    Ok(ok(occupancy_by_ward(&server.db).await?))
}

pub async fn dashboard(
    State(server): State<HimsServer>,
    _auth: AuthContext,
    Params(query): Params<DashboardQuery>,
) -> ApiResult<Json<ApiResponse<DashboardStats>>> {
    Ok(ok(dashboard_stats(&server, query.days).await?))
}
