use std::sync::Arc;

use auth_identity::{Principal, StaffMember, StaffRole};
use chrono::{Datelike, NaiveDate, NaiveTime, Utc};
use database_layer::Database;
use error_common::reporting::Period;
use error_common::HimsError;
use events_bus::NotificationHub;
use uuid::Uuid;

use crate::*;

struct Fixture {
    db: Database,
    hub: Arc<NotificationHub>,
    reception: ReceptionService,
    clerk: Principal,
}

fn fixture() -> Fixture {
    let db = Database::in_memory();
    let hub = Arc::new(NotificationHub::new(db.clone()));
    let reception = ReceptionService::new(db.clone(), hub.clone());
    Fixture {
        db,
        hub,
        reception,
        clerk: Principal::new(Uuid::new_v4(), StaffRole::Receptionist),
    }
}

fn registration(first: &str, last: &str, phone: &str) -> RegisterPatient {
    RegisterPatient {
        first_name: first.into(),
        last_name: last.into(),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 3, 12).unwrap(),
        gender: Gender::Female,
        blood_type: Some("O+".into()),
        phone_number: phone.into(),
        email: None,
        address: None,
        city: Some("Nairobi".into()),
        emergency_contact_name: None,
        emergency_contact_phone: None,
        allergies: None,
        chronic_conditions: None,
    }
}

async fn doctor(db: &Database, department: Option<&str>) -> StaffMember {
    let doctor = StaffMember::new(
        format!("{}@hims.test", Uuid::new_v4()),
        "Daniel",
        "Kim",
        StaffRole::Doctor,
        department.map(str::to_string),
        String::new(),
    );
    db.insert(&doctor).await.unwrap();
    doctor
}

async fn booked(f: &Fixture, department: Option<&str>) -> (Patient, StaffMember, Appointment) {
    let patient = f
        .reception
        .register_patient(&f.clerk, registration("Achieng", "Odhiambo", "0712000111"))
        .await
        .unwrap();
    let doctor = doctor(&f.db, department).await;
    let appointment = f
        .reception
        .schedule_appointment(
            &f.clerk,
            ScheduleAppointment {
                patient_id: patient.id,
                doctor_id: doctor.id,
                scheduled_date: Utc::now().date_naive(),
                scheduled_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                reason: "Persistent cough".into(),
                notes: None,
            },
        )
        .await
        .unwrap();
    (patient, doctor, appointment)
}

#[tokio::test]
async fn registration_assigns_patient_number() {
    let f = fixture();
    let patient = f
        .reception
        .register_patient(&f.clerk, registration("Jane", "Doe", "0700000000"))
        .await
        .unwrap();
    assert!(patient.patient_number.starts_with("PAT-"));
    assert!(patient.is_active);
    assert_eq!(patient.registered_by, f.clerk.user_id);
}

#[tokio::test]
async fn registration_validates_input() {
    let f = fixture();
    let err = f
        .reception
        .register_patient(&f.clerk, registration(" ", "Doe", "0700000000"))
        .await
        .unwrap_err();
    assert!(matches!(err, HimsError::Validation(_)));

    let mut future = registration("Jane", "Doe", "0700000000");
    future.date_of_birth = Utc::now().date_naive() + chrono::Duration::days(2);
    assert!(f.reception.register_patient(&f.clerk, future).await.is_err());
}

#[tokio::test]
async fn search_matches_name_number_and_phone() {
    let f = fixture();
    let jane = f
        .reception
        .register_patient(&f.clerk, registration("Jane", "Doe", "0711111111"))
        .await
        .unwrap();
    f.reception
        .register_patient(&f.clerk, registration("John", "Smith", "0722222222"))
        .await
        .unwrap();

    assert_eq!(f.reception.search_patients("jane doe").await.unwrap().len(), 1);
    assert_eq!(f.reception.search_patients("0722").await.unwrap().len(), 1);
    let by_number = f.reception.search_patients(&jane.patient_number).await.unwrap();
    assert_eq!(by_number[0].id, jane.id);
    assert!(matches!(
        f.reception.search_patients("  ").await,
        Err(HimsError::Validation(_))
    ));
}

#[tokio::test]
async fn update_and_deactivate_keep_the_record() {
    let f = fixture();
    let patient = f
        .reception
        .register_patient(&f.clerk, registration("Jane", "Doe", "0711111111"))
        .await
        .unwrap();
    let updated = f
        .reception
        .update_patient(
            patient.id,
            UpdatePatient {
                allergies: Some("Penicillin".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.allergies.as_deref(), Some("Penicillin"));

    f.reception.deactivate_patient(patient.id).await.unwrap();
    let inactive = f
        .reception
        .list_patients(&PatientFilter {
            is_active: Some(false),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(inactive.len(), 1);
    assert!(f
        .reception
        .enqueue(
            &f.clerk,
            Enqueue {
                patient_id: patient.id,
                department: "general".into(),
                priority: None,
            }
        )
        .await
        .is_err());
}

#[tokio::test]
async fn appointments_require_a_doctor() {
    let f = fixture();
    let patient = f
        .reception
        .register_patient(&f.clerk, registration("Jane", "Doe", "0711111111"))
        .await
        .unwrap();
    let nurse = StaffMember::new("n@hims.test", "N", "N", StaffRole::Nurse, None, String::new());
    f.db.insert(&nurse).await.unwrap();
    let err = f
        .reception
        .schedule_appointment(
            &f.clerk,
            ScheduleAppointment {
                patient_id: patient.id,
                doctor_id: nurse.id,
                scheduled_date: Utc::now().date_naive(),
                scheduled_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                reason: "Checkup".into(),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HimsError::Validation(_)));
}

#[tokio::test]
async fn check_in_queues_patient_in_doctor_department() {
    let f = fixture();
    let (patient, doctor, appointment) = booked(&f, Some("cardiology")).await;
    assert_eq!(f.hub.unread_count(doctor.id).await.unwrap(), 1);

    let entry = f.reception.check_in(&f.clerk, appointment.id).await.unwrap();
    assert_eq!(entry.department, "cardiology");
    assert_eq!(entry.priority, QueuePriority::Normal);
    assert_eq!(entry.status, QueueStatus::Waiting);

    let appointment = f.reception.get_appointment(appointment.id).await.unwrap();
    assert_eq!(appointment.status, AppointmentStatus::CheckedIn);
    assert_eq!(appointment.queue_entry_id, Some(entry.id));
    let patient = f.reception.get_patient(patient.id).await.unwrap();
    assert_eq!(patient.last_visit_date, Some(Utc::now().date_naive()));

    // the doctor is a member of cardiology and hears about the arrival
    assert_eq!(f.hub.unread_count(doctor.id).await.unwrap(), 2);

    let err = f.reception.check_in(&f.clerk, appointment.id).await.unwrap_err();
    assert!(matches!(err, HimsError::InvalidState(_)));
}

#[tokio::test]
async fn doctor_without_department_queues_in_general() {
    let f = fixture();
    let (_, _, appointment) = booked(&f, None).await;
    let entry = f.reception.check_in(&f.clerk, appointment.id).await.unwrap();
    assert_eq!(entry.department, "general");
    assert_eq!(f.reception.todays_appointments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancel_only_from_scheduled() {
    let f = fixture();
    let (_, _, appointment) = booked(&f, None).await;
    let cancelled = f.reception.cancel_appointment(appointment.id).await.unwrap();
    assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
    assert!(f.reception.check_in(&f.clerk, appointment.id).await.is_err());
    assert!(f.reception.cancel_appointment(appointment.id).await.is_err());
}

#[tokio::test]
async fn current_queue_serves_most_severe_first() {
    let f = fixture();
    let mut entries = Vec::new();
    for (name, priority) in [
        ("A", QueuePriority::Normal),
        ("B", QueuePriority::Urgent),
        ("C", QueuePriority::Normal),
        ("D", QueuePriority::Emergency),
    ] {
        let patient = f
            .reception
            .register_patient(&f.clerk, registration(name, "Patient", "0700000000"))
            .await
            .unwrap();
        let entry = f
            .reception
            .enqueue(
                &f.clerk,
                Enqueue {
                    patient_id: patient.id,
                    department: "OPD".into(),
                    priority: Some(priority),
                },
            )
            .await
            .unwrap();
        entries.push(entry);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let queue = f.reception.current_queue(Some("opd")).await.unwrap();
    let order: Vec<Uuid> = queue.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![entries[3].id, entries[1].id, entries[0].id, entries[2].id]);

    f.reception
        .update_priority(entries[2].id, QueuePriority::Urgent)
        .await
        .unwrap();
    f.reception.start_service(entries[3].id).await.unwrap();
    let queue = f.reception.current_queue(Some("opd")).await.unwrap();
    let order: Vec<Uuid> = queue.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![entries[1].id, entries[2].id, entries[0].id]);
}

#[tokio::test]
async fn queue_entry_lifecycle_and_duplicate_guard() {
    let f = fixture();
    let patient = f
        .reception
        .register_patient(&f.clerk, registration("Jane", "Doe", "0711111111"))
        .await
        .unwrap();
    let request = Enqueue {
        patient_id: patient.id,
        department: "general".into(),
        priority: None,
    };
    let entry = f.reception.enqueue(&f.clerk, request.clone()).await.unwrap();
    assert!(matches!(
        f.reception.enqueue(&f.clerk, request.clone()).await,
        Err(HimsError::InvalidState(_))
    ));

    assert!(f.reception.complete_service(entry.id).await.is_err());
    f.reception.start_service(entry.id).await.unwrap();
    let done = f.reception.complete_service(entry.id).await.unwrap();
    assert_eq!(done.status, QueueStatus::Completed);
    assert!(done.completed_at.is_some());

    // once served the patient can queue again
    f.reception.enqueue(&f.clerk, request).await.unwrap();
}

#[tokio::test]
async fn patient_statistics_bands_ages_and_trends_registrations() {
    let f = fixture();
    let today = Utc::now().date_naive();
    let mut child = registration("Amani", "Otieno", "0711000001");
    child.date_of_birth = today - chrono::Duration::days(365 * 10);
    child.gender = Gender::Male;
    f.reception.register_patient(&f.clerk, child).await.unwrap();
    let mut elder = registration("Wanjiru", "Mwangi", "0711000002");
    elder.date_of_birth = NaiveDate::from_ymd_opt(1940, 1, 1).unwrap();
    let elder = f.reception.register_patient(&f.clerk, elder).await.unwrap();
    let mut adult = registration("Jane", "Doe", "0711000003");
    adult.date_of_birth = today - chrono::Duration::days(365 * 40);
    f.reception.register_patient(&f.clerk, adult).await.unwrap();

    // registered two years ago: counted, but outside the yearly trend
    let mut old = f.db.require::<Patient>(elder.id).await.unwrap();
    old.registration_date = Utc::now() - chrono::Duration::days(730);
    f.db.update(&old).await.unwrap();

    let stats = patient_statistics(&f.db, today).await.unwrap();
    assert_eq!(stats.total_patients, 3);
    let females = stats
        .gender_distribution
        .iter()
        .find(|g| g.gender == Gender::Female)
        .unwrap();
    assert_eq!(females.count, 2);

    let bands: Vec<(&str, usize)> = stats
        .age_distribution
        .iter()
        .map(|band| (band.band.as_str(), band.count))
        .collect();
    assert_eq!(
        bands,
        vec![("0-18", 1), ("19-35", 0), ("36-50", 1), ("51-65", 0), ("65+", 1)]
    );

    let trend_total: usize = stats.registration_trend.iter().map(|m| m.count).sum();
    assert_eq!(trend_total, 2);
    assert_eq!(
        stats.registration_trend.last().unwrap().month,
        format!("{:04}-{:02}", today.year(), today.month())
    );

    let counts = patient_counts(&f.db, today - chrono::Duration::days(30))
        .await
        .unwrap();
    assert_eq!(counts.total, 3);
    assert_eq!(counts.registered_since, 2);
}

#[tokio::test]
async fn appointment_summary_counts_completion_per_doctor() {
    let f = fixture();
    let (patient, doctor, first) = booked(&f, Some("opd")).await;
    let other = self::doctor(&f.db, None).await;
    let second = f
        .reception
        .schedule_appointment(
            &f.clerk,
            ScheduleAppointment {
                patient_id: patient.id,
                doctor_id: doctor.id,
                scheduled_date: Utc::now().date_naive(),
                scheduled_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                reason: "Review".into(),
                notes: None,
            },
        )
        .await
        .unwrap();
    f.reception
        .schedule_appointment(
            &f.clerk,
            ScheduleAppointment {
                patient_id: patient.id,
                doctor_id: other.id,
                scheduled_date: Utc::now().date_naive(),
                scheduled_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                reason: "Second opinion".into(),
                notes: None,
            },
        )
        .await
        .unwrap();

    let mut done = f.db.require::<Appointment>(first.id).await.unwrap();
    done.status = AppointmentStatus::Completed;
    f.db.update(&done).await.unwrap();
    f.reception.cancel_appointment(second.id).await.unwrap();

    let period = Period::resolve(None, None).unwrap();
    let mine = appointment_summary(&f.db, period, Some(doctor.id)).await.unwrap();
    assert_eq!(mine.total, 2);
    assert_eq!(mine.completed, 1);
    assert_eq!(mine.completion_rate, rust_decimal::Decimal::from(50));
    assert_eq!(mine.by_day.len(), 1);
    assert_eq!(mine.by_day[0].count, 2);
    let statuses: Vec<AppointmentStatus> = mine.by_status.iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]
    );

    let everyone = appointment_summary(&f.db, period, None).await.unwrap();
    assert_eq!(everyone.total, 3);

    let last_year = Period::resolve(
        Some(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()),
        Some(NaiveDate::from_ymd_opt(2001, 12, 31).unwrap()),
    )
    .unwrap();
    let empty = appointment_summary(&f.db, last_year, None).await.unwrap();
    assert_eq!(empty.total, 0);
    assert_eq!(empty.completion_rate, rust_decimal::Decimal::ZERO);
}
