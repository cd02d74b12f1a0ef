use chrono::Duration;
use database_layer::Database;
use error_common::reporting::{percentage, Period};
use error_common::Result;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::{Bed, BedStatus, Ward, WardOccupancy, WardStay};

/// Bed usage across every active bed in the hospital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedSummary {
    pub total_beds: usize,
    pub occupied_beds: usize,
    pub available_beds: usize,
    pub occupancy_rate: Decimal,
}

pub async fn bed_summary(db: &Database) -> Result<BedSummary> {
    let beds = db.find::<Bed>(json!({ "is_active": true })).await?;
    let occupied = beds
        .iter()
        .filter(|bed| bed.status() == BedStatus::Occupied)
        .count();
    Ok(BedSummary {
        total_beds: beds.len(),
        occupied_beds: occupied,
        available_beds: beds
            .iter()
            .filter(|bed| bed.status() == BedStatus::Available)
            .count(),
        occupancy_rate: percentage(occupied, beds.len()),
    })
}

/// Occupancy of every active ward, by name
pub async fn occupancy_by_ward(db: &Database) -> Result<Vec<WardOccupancy>> {
    let mut wards = db.find::<Ward>(json!({ "is_active": true })).await?;
    wards.sort_by(|a, b| a.name.cmp(&b.name));
    let mut occupancy = Vec::with_capacity(wards.len());
    for ward in wards {
        let beds: Vec<Bed> = db
            .find::<Bed>(json!({ "ward_id": ward.id, "is_active": true }))
            .await?
            .into_iter()
            .map(|bed| bed.into_inner())
            .collect();
        occupancy.push(WardOccupancy::tally(&ward, &beds));
    }
    Ok(occupancy)
}

pub async fn active_stay_count(db: &Database) -> Result<usize> {
    Ok(db.find::<WardStay>(json!({ "is_active": true })).await?.len())
}

/// Mean length in hours of the stays admitted and discharged inside the
/// period, two decimal places; zero when there are none
pub async fn average_stay_hours(db: &Database, period: Period) -> Result<Decimal> {
    let durations: Vec<Duration> = db
        .find::<WardStay>(json!({ "is_active": false }))
        .await?
        .iter()
        .filter_map(|stay| {
            let discharged = stay.discharge_date?;
            (period.contains(stay.admission_date.date_naive())
                && period.contains(discharged.date_naive()))
            .then(|| discharged - stay.admission_date)
        })
        .collect();
    if durations.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let seconds: i64 = durations.iter().map(Duration::num_seconds).sum();
    let hours = Decimal::from(seconds) / Decimal::from(3600 * durations.len() as i64);
    Ok(hours.round_dp(2))
}
