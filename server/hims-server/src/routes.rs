pub mod paths;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    handlers::{
        auth, billing, clinical, health, insurance, laboratory, notifications, pharmacy, reception,
        reports, wards, websocket,
    },
    openapi,
    server::HimsServer,
};

/// Health check routes (no authentication required)
pub fn health_routes() -> Router<HimsServer> {
    Router::new()
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::VERSION, get(health::version_info))
}

/// Sign-in and staff administration
pub fn auth_routes() -> Router<HimsServer> {
    use paths::auth::*;
    Router::new()
        .route(LOGIN, post(auth::login))
        .route(ME, get(auth::me))
        .route(STAFF, get(auth::list_staff).post(auth::create_staff))
        .route(STAFF_BY_ID, get(auth::get_staff))
        .route(STAFF_ACTIVATE, post(auth::activate_staff))
        .route(STAFF_DEACTIVATE, post(auth::deactivate_staff))
}

pub fn notification_routes() -> Router<HimsServer> {
    use paths::notifications::*;
    Router::new()
        .route(NOTIFICATIONS, get(notifications::list_notifications))
        .route(UNREAD_COUNT, get(notifications::unread_count))
        .route(MARK_READ, post(notifications::mark_read))
        .route(MARK_ALL_READ, post(notifications::mark_all_read))
        .route(NOTIFICATION_BY_ID, get(notifications::get_notification))
        .route(DEPARTMENT_FEED, get(notifications::department_feed))
}

/// Patients, appointments and the department queue
pub fn reception_routes() -> Router<HimsServer> {
    use paths::reception::*;
    Router::new()
        .route(
            PATIENTS,
            get(reception::list_patients).post(reception::register_patient),
        )
        .route(PATIENT_SEARCH, get(reception::search_patients))
        .route(
            PATIENT_BY_ID,
            get(reception::get_patient).put(reception::update_patient),
        )
        .route(PATIENT_DEACTIVATE, post(reception::deactivate_patient))
        .route(
            APPOINTMENTS,
            get(reception::list_appointments).post(reception::schedule_appointment),
        )
        .route(APPOINTMENTS_TODAY, get(reception::todays_appointments))
        .route(APPOINTMENT_BY_ID, get(reception::get_appointment))
        .route(APPOINTMENT_CHECK_IN, post(reception::check_in))
        .route(APPOINTMENT_CANCEL, post(reception::cancel_appointment))
        .route(QUEUE, get(reception::current_queue).post(reception::enqueue))
        .route(QUEUE_ENTRY, get(reception::get_queue_entry))
        .route(QUEUE_PRIORITY, put(reception::update_priority))
        .route(QUEUE_START, post(reception::start_service))
        .route(QUEUE_COMPLETE, post(reception::complete_service))
}

/// Triage, consultations and their orders
pub fn clinical_routes() -> Router<HimsServer> {
    use paths::clinical::*;
    Router::new()
        .route(
            TRIAGE,
            get(clinical::list_triage).post(clinical::record_triage),
        )
        .route(TRIAGE_BY_ID, get(clinical::get_triage))
        .route(TRIAGE_NOTES, post(clinical::add_triage_note))
        .route(TRIAGE_COMPLETE, post(clinical::complete_triage))
        .route(
            CONSULTATIONS,
            get(clinical::list_consultations).post(clinical::start_consultation),
        )
        .route(
            CONSULTATION_BY_ID,
            get(clinical::get_consultation).put(clinical::update_consultation),
        )
        .route(CONSULTATION_COMPLETE, post(clinical::complete_consultation))
        .route(CONSULTATION_NOTES, post(clinical::add_consultation_note))
        .route(CONSULTATION_PRESCRIPTIONS, post(clinical::prescribe))
        .route(CONSULTATION_LAB_REQUESTS, post(clinical::request_lab))
        .route(PRESCRIPTIONS, get(clinical::list_prescriptions))
        .route(PRESCRIPTIONS_PENDING, get(pharmacy::pending_prescriptions))
        .route(PRESCRIPTION_BY_ID, get(clinical::get_prescription))
        .route(PRESCRIPTION_CANCEL, post(clinical::cancel_prescription))
        .route(LAB_REQUESTS, get(clinical::list_lab_requests))
        .route(LAB_REQUEST_BY_ID, get(clinical::get_lab_request))
        .route(LAB_REQUEST_CANCEL, post(clinical::cancel_lab_request))
}

/// Test catalogue, samples and results
pub fn laboratory_routes() -> Router<HimsServer> {
    use paths::laboratory::*;
    Router::new()
        .route(
            TESTS,
            get(laboratory::list_lab_tests).post(laboratory::create_lab_test),
        )
        .route(TEST_BY_ID, get(laboratory::get_lab_test))
        .route(TEST_ACTIVE, put(laboratory::set_lab_test_active))
        .route(
            REQUEST_SAMPLES,
            get(laboratory::samples_for_request).post(laboratory::collect_sample),
        )
        .route(REQUEST_RESULTS, post(laboratory::record_result))
        .route(SAMPLE_BY_ID, get(laboratory::get_sample))
        .route(SAMPLE_RECEIVE, post(laboratory::receive_sample))
        .route(SAMPLE_STATUS, put(laboratory::update_sample_status))
        .route(RESULTS, get(laboratory::list_results))
        .route(RESULT_BY_ID, get(laboratory::get_result))
        .route(RESULT_START, post(laboratory::start_processing))
        .route(RESULT_COMPLETE, post(laboratory::complete_result))
        .route(RESULT_VERIFY, post(laboratory::verify_result))
        .route(RESULT_DELIVER, post(laboratory::deliver_result))
}

pub fn pharmacy_routes() -> Router<HimsServer> {
    use paths::pharmacy::*;
    Router::new()
        .route(
            MEDICATIONS,
            get(pharmacy::list_medications).post(pharmacy::create_medication),
        )
        .route(MEDICATIONS_LOW_STOCK, get(pharmacy::low_stock))
        .route(MEDICATIONS_EXPIRING, get(pharmacy::expiring_soon))
        .route(
            MEDICATION_BY_ID,
            get(pharmacy::get_medication).put(pharmacy::update_medication),
        )
        .route(MEDICATION_RECEIVE, post(pharmacy::receive_stock))
        .route(MEDICATION_ADJUST, post(pharmacy::adjust_stock))
        .route(MEDICATION_TRANSACTIONS, get(pharmacy::stock_history))
        .route(
            DISPENSES,
            get(pharmacy::list_dispenses).post(pharmacy::create_dispense),
        )
        .route(DISPENSE_BY_ID, get(pharmacy::get_dispense))
        .route(DISPENSE_PREPARE, post(pharmacy::prepare_dispense))
        .route(DISPENSE_COMPLETE, post(pharmacy::complete_dispense))
        .route(DISPENSE_CANCEL, post(pharmacy::cancel_dispense))
}

/// Wards, beds, stays and inpatient care
pub fn ward_routes() -> Router<HimsServer> {
    use paths::wards::*;
    Router::new()
        .route(WARDS, get(wards::list_wards).post(wards::create_ward))
        .route(WARD_BY_ID, get(wards::get_ward))
        .route(WARD_BEDS, get(wards::list_beds).post(wards::add_bed))
        .route(WARD_OCCUPANCY, get(wards::ward_occupancy))
        .route(BED_BY_ID, get(wards::get_bed))
        .route(BED_STATUS, put(wards::change_bed_status))
        .route(STAYS, get(wards::list_stays).post(wards::admit))
        .route(STAY_BY_ID, get(wards::get_stay))
        .route(STAY_DISCHARGE, post(wards::discharge))
        .route(
            STAY_VITALS,
            get(wards::vitals_history).post(wards::record_vitals),
        )
        .route(STAY_LATEST_VITALS, get(wards::latest_vitals))
        .route(
            STAY_TASKS,
            get(wards::tasks_for_stay).post(wards::create_task),
        )
        .route(TASKS_UPCOMING, get(wards::upcoming_tasks))
        .route(TASK_START, post(wards::start_task))
        .route(TASK_COMPLETE, post(wards::complete_task))
        .route(TASK_CANCEL, post(wards::cancel_task))
}

pub fn billing_routes() -> Router<HimsServer> {
    use paths::billing::*;
    Router::new()
        .route(
            SERVICES,
            get(billing::list_services).post(billing::create_service),
        )
        .route(
            SERVICE_BY_ID,
            get(billing::get_service).put(billing::update_service),
        )
        .route(
            INVOICES,
            get(billing::list_invoices).post(billing::create_invoice),
        )
        .route(INVOICE_BY_ID, get(billing::get_invoice))
        .route(INVOICE_ITEMS, post(billing::add_item))
        .route(INVOICE_ITEM, delete(billing::remove_item))
        .route(INVOICE_FINALIZE, post(billing::finalize_invoice))
        .route(INVOICE_CANCEL, post(billing::cancel_invoice))
        .route(
            INVOICE_PAYMENTS,
            get(billing::list_payments).post(billing::record_payment),
        )
        .route(INVOICE_CLAIM, get(insurance::claim_for_invoice))
}

pub fn insurance_routes() -> Router<HimsServer> {
    use paths::insurance::*;
    Router::new()
        .route(
            CLAIMS,
            get(insurance::list_claims).post(insurance::create_claim),
        )
        .route(CLAIM_BY_ID, get(insurance::get_claim))
        .route(CLAIM_SUBMIT, post(insurance::submit_claim))
        .route(CLAIM_REVIEW, post(insurance::begin_review))
        .route(CLAIM_APPROVE, post(insurance::approve_claim))
        .route(CLAIM_REJECT, post(insurance::reject_claim))
}

pub fn report_routes() -> Router<HimsServer> {
    use paths::reports::*;
    Router::new()
        .route(PATIENT_STATISTICS, get(reports::patient_statistics))
        .route(FINANCIAL, get(reports::financial))
        .route(OPERATIONAL, get(reports::operational))
        .route(DOCTOR_PERFORMANCE, get(reports::doctor_performance))
        .route(WARD_OCCUPANCY, get(reports::ward_occupancy))
        .route(DASHBOARD, get(reports::dashboard))
}

/// API v1 routes; everything except login requires a bearer token
pub fn api_v1_routes() -> Router<HimsServer> {
    Router::new()
        .merge(auth_routes())
        .merge(notification_routes())
        .merge(reception_routes())
        .merge(clinical_routes())
        .merge(laboratory_routes())
        .merge(pharmacy_routes())
        .merge(ward_routes())
        .merge(billing_routes())
        .merge(insurance_routes())
        .merge(report_routes())
}

pub fn websocket_routes() -> Router<HimsServer> {
    Router::new().route(
        paths::websocket::NOTIFICATIONS,
        get(websocket::notifications_socket),
    )
}

/// Create the complete router
pub fn create_routes() -> Router<HimsServer> {
    Router::new()
        .merge(health_routes())
        .merge(openapi::create_docs_routes())
        .merge(websocket_routes())
        .nest(paths::API_V1, api_v1_routes())
}
