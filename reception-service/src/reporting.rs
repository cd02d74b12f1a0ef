use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use database_layer::{Database, Versioned};
use error_common::reporting::{percentage, Period};
use error_common::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, Gender, Patient};

/// Upper age bound (inclusive) and label of each age band; the last band is
/// open-ended
const AGE_BANDS: [(u32, &str); 5] = [
    (18, "0-18"),
    (35, "19-35"),
    (50, "36-50"),
    (65, "51-65"),
    (u32::MAX, "65+"),
];

/// Registrations trend window
const TREND_DAYS: i64 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeBandCount {
    pub band: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: usize,
}

/// Demographics of every registered patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientStatistics {
    pub total_patients: usize,
    pub gender_distribution: Vec<GenderCount>,
    pub age_distribution: Vec<AgeBandCount>,
    /// Registrations per month over the last year, oldest first
    pub registration_trend: Vec<MonthlyCount>,
}

fn age_band(age: u32) -> &'static str {
    AGE_BANDS
        .iter()
        .find(|(upper, _)| age <= *upper)
        .map_or("65+", |(_, label)| label)
}

/// Patient counts by gender, age band (ages taken on `today`) and month of
/// registration
pub async fn patient_statistics(db: &Database, today: NaiveDate) -> Result<PatientStatistics> {
    let patients: Vec<Patient> = db
        .all::<Patient>()
        .await?
        .into_iter()
        .map(Versioned::into_inner)
        .collect();

    let mut by_gender: BTreeMap<Gender, usize> = BTreeMap::new();
    let mut by_band: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut by_month: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    let trend_start = today - Duration::days(TREND_DAYS);
    for patient in &patients {
        *by_gender.entry(patient.gender).or_default() += 1;
        *by_band.entry(age_band(patient.age_on(today))).or_default() += 1;
        let registered = patient.registration_date.date_naive();
        if registered >= trend_start && registered <= today {
            *by_month
                .entry((registered.year(), registered.month()))
                .or_default() += 1;
        }
    }

    Ok(PatientStatistics {
        total_patients: patients.len(),
        gender_distribution: by_gender
            .into_iter()
            .map(|(gender, count)| GenderCount { gender, count })
            .collect(),
        age_distribution: AGE_BANDS
            .iter()
            .map(|(_, band)| AgeBandCount {
                band: band.to_string(),
                count: by_band.get(band).copied().unwrap_or(0),
            })
            .collect(),
        registration_trend: by_month
            .into_iter()
            .map(|((year, month), count)| MonthlyCount {
                month: format!("{year:04}-{month:02}"),
                count,
            })
            .collect(),
    })
}

/// Registered patients and how many of them registered on or after `since`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatientCounts {
    pub total: usize,
    pub registered_since: usize,
}

pub async fn patient_counts(db: &Database, since: NaiveDate) -> Result<PatientCounts> {
    let patients = db.all::<Patient>().await?;
    Ok(PatientCounts {
        total: patients.len(),
        registered_since: patients
            .iter()
            .filter(|patient| patient.registration_date.date_naive() >= since)
            .count(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Appointments scheduled within a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub total: usize,
    pub completed: usize,
    /// Completed as a percentage of the total, two decimal places
    pub completion_rate: Decimal,
    pub by_status: Vec<StatusCount>,
    pub by_day: Vec<DailyCount>,
}

/// Summarise appointments scheduled in `period`, optionally for one doctor
pub async fn appointment_summary(
    db: &Database,
    period: Period,
    doctor_id: Option<Uuid>,
) -> Result<AppointmentSummary> {
    let filter = match doctor_id {
        Some(doctor_id) => json!({ "doctor_id": doctor_id }),
        None => json!({}),
    };
    let appointments: Vec<Appointment> = db
        .find::<Appointment>(filter)
        .await?
        .into_iter()
        .map(Versioned::into_inner)
        .filter(|appointment| period.contains(appointment.scheduled_date))
        .collect();

    let mut by_status: BTreeMap<AppointmentStatus, usize> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for appointment in &appointments {
        *by_status.entry(appointment.status).or_default() += 1;
        *by_day.entry(appointment.scheduled_date).or_default() += 1;
    }
    let completed = by_status
        .get(&AppointmentStatus::Completed)
        .copied()
        .unwrap_or(0);

    Ok(AppointmentSummary {
        total: appointments.len(),
        completed,
        completion_rate: percentage(completed, appointments.len()),
        by_status: by_status
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        by_day: by_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::age_band;

    #[test]
    fn age_bands_have_inclusive_upper_bounds() {
        assert_eq!(age_band(0), "0-18");
        assert_eq!(age_band(18), "0-18");
        assert_eq!(age_band(19), "19-35");
        assert_eq!(age_band(50), "36-50");
        assert_eq!(age_band(65), "51-65");
        assert_eq!(age_band(66), "65+");
    }
}
