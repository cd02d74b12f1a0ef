//! Reports that draw on more than one service
//!
//! Each service answers for its own records (appointments, beds, lab results,
//! dispenses, payments). The functions here only combine those answers.

use auth_identity::{StaffProfile, StaffRole};
use billing_service::{clinician_revenue, revenue_on};
use chrono::{Duration, NaiveDate, Utc};
use clinical_service::{lab_results_by_status, LabStatusCount};
use error_common::reporting::{percentage, Period};
use error_common::{HimsError, Result};
use pharmacy_service::dispensed_count;
use reception_service::{appointment_summary, patient_counts, AppointmentSummary};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use ward_service::{
    active_stay_count, average_stay_hours, bed_summary, occupancy_by_ward, BedSummary,
    WardOccupancy,
};

use crate::server::HimsServer;

/// Longest dashboard look-back accepted
pub const MAX_DASHBOARD_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize)]
pub struct OperationalReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub appointments: AppointmentSummary,
    pub ward_occupancy: Vec<WardOccupancy>,
    /// Mean length of the stays admitted and discharged in the period
    pub average_stay_hours: Decimal,
    pub lab_results: Vec<LabStatusCount>,
    pub medications_dispensed: usize,
}

pub async fn operational_report(server: &HimsServer, period: Period) -> Result<OperationalReport> {
    let db = &server.db;
    Ok(OperationalReport {
        period_start: period.start,
        period_end: period.end,
        appointments: appointment_summary(db, period, None).await?,
        ward_occupancy: occupancy_by_ward(db).await?,
        average_stay_hours: average_stay_hours(db, period).await?,
        lab_results: lab_results_by_status(db, period).await?,
        medications_dispensed: dispensed_count(db, period).await?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct DoctorPerformanceReport {
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub department: Option<String>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub appointments: AppointmentSummary,
    /// Billed value of items credited to the doctor on paid or part-paid
    /// invoices issued in the period
    pub revenue_generated: Decimal,
}

pub async fn doctor_performance(
    server: &HimsServer,
    doctor_id: Uuid,
    period: Period,
) -> Result<DoctorPerformanceReport> {
    let doctor: StaffProfile = server
        .identity
        .get_staff(doctor_id)
        .await
        .map_err(HimsError::from)?;
    if doctor.role != StaffRole::Doctor {
        return Err(HimsError::not_found("Doctor", doctor_id));
    }
    let db = &server.db;
    Ok(DoctorPerformanceReport {
        doctor_id,
        doctor_name: format!("Dr. {} {}", doctor.first_name, doctor.last_name),
        department: doctor.department,
        period_start: period.start,
        period_end: period.end,
        appointments: appointment_summary(db, period, Some(doctor_id)).await?,
        revenue_generated: clinician_revenue(db, doctor_id, period).await?,
    })
}

/// Headline figures for the landing page
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Look-back used for `new_patients`
    pub days: i64,
    pub total_patients: usize,
    pub new_patients: usize,
    /// New patients as a percentage of all patients
    pub new_patient_rate: Decimal,
    pub beds: BedSummary,
    pub revenue_today: Decimal,
    pub revenue_yesterday: Decimal,
    /// Percentage change against yesterday; zero when nothing came in yesterday
    pub revenue_change: Decimal,
    /// Patients currently admitted
    pub active_cases: usize,
}

pub async fn dashboard_stats(server: &HimsServer, days: i64) -> Result<DashboardStats> {
    if !(1..=MAX_DASHBOARD_DAYS).contains(&days) {
        return Err(HimsError::validation(format!(
            "Days must be between 1 and {}",
            MAX_DASHBOARD_DAYS
        )));
    }
    let db = &server.db;
    let today = Utc::now().date_naive();
    let patients = patient_counts(db, today - Duration::days(days)).await?;
    let revenue_today = revenue_on(db, today).await?;
    let revenue_yesterday = revenue_on(db, today - Duration::days(1)).await?;

    Ok(DashboardStats {
        days,
        total_patients: patients.total,
        new_patients: patients.registered_since,
        new_patient_rate: percentage(patients.registered_since, patients.total),
        beds: bed_summary(db).await?,
        revenue_today,
        revenue_yesterday,
        revenue_change: revenue_change(revenue_today, revenue_yesterday)?,
        active_cases: active_stay_count(db).await?,
    })
}

fn revenue_change(today: Decimal, yesterday: Decimal) -> Result<Decimal> {
    if yesterday <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    (today - yesterday)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.checked_div(yesterday))
        .map(|change| change.round_dp(2))
        .ok_or_else(|| HimsError::validation("Revenue change is out of range"))
}
