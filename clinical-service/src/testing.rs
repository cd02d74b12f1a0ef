use std::sync::Arc;

use auth_identity::{Principal, StaffMember, StaffRole};
use chrono::NaiveDate;
use database_layer::Database;
use events_bus::NotificationHub;
use reception_service::{Enqueue, Gender, Patient, QueueEntry, ReceptionService, RegisterPatient};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{ConsultationService, LabTest, LaboratoryService, NewLabTest, TriageService};

pub(crate) struct Clinic {
    pub db: Database,
    pub hub: Arc<NotificationHub>,
    pub reception: ReceptionService,
    pub triage: TriageService,
    pub consultations: ConsultationService,
    pub lab: LaboratoryService,
    pub nurse: Principal,
    pub doctor: Principal,
}

impl Clinic {
    pub fn new() -> Self {
        let db = Database::in_memory();
        let hub = Arc::new(NotificationHub::new(db.clone()));
        Self {
            reception: ReceptionService::new(db.clone(), hub.clone()),
            triage: TriageService::new(db.clone(), hub.clone()),
            consultations: ConsultationService::new(db.clone(), hub.clone()),
            lab: LaboratoryService::new(db.clone(), hub.clone()),
            nurse: Principal::new(Uuid::new_v4(), StaffRole::Nurse),
            doctor: Principal::new(Uuid::new_v4(), StaffRole::Doctor),
            db,
            hub,
        }
    }

    pub async fn staff(&self, role: StaffRole, department: Option<&str>) -> StaffMember {
        let member = StaffMember::new(
            format!("{}@hims.test", Uuid::new_v4()),
            "Grace",
            "Mutua",
            role,
            department.map(str::to_string),
            String::new(),
        );
        self.db.insert(&member).await.unwrap();
        member
    }

    pub async fn queued_patient(&self, department: &str) -> (Patient, QueueEntry) {
        let patient = self
            .reception
            .register_patient(
                &self.nurse,
                RegisterPatient {
                    first_name: "Peter".into(),
                    last_name: "Otieno".into(),
                    date_of_birth: NaiveDate::from_ymd_opt(1979, 8, 1).unwrap(),
                    gender: Gender::Male,
                    blood_type: None,
                    phone_number: "0722123456".into(),
                    email: None,
                    address: None,
                    city: None,
                    emergency_contact_name: None,
                    emergency_contact_phone: None,
                    allergies: Some("Penicillin".into()),
                    chronic_conditions: None,
                },
            )
            .await
            .unwrap();
        let entry = self
            .reception
            .enqueue(
                &self.nurse,
                Enqueue {
                    patient_id: patient.id,
                    department: department.into(),
                    priority: None,
                },
            )
            .await
            .unwrap();
        (patient, entry)
    }

    pub async fn catalogue_test(&self, code: &str) -> LabTest {
        self.lab
            .create_lab_test(NewLabTest {
                name: format!("{} panel", code.to_uppercase()),
                test_code: code.into(),
                category: "Hematology".into(),
                description: None,
                price: Decimal::new(85000, 2),
                sample_type: "Blood".into(),
                turnaround_hours: 6,
                requirements: None,
            })
            .await
            .unwrap()
    }
}
