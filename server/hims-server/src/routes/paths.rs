//! Route path constants

pub const API_V1: &str = "/api/v1";

pub mod health {
    pub const HEALTH: &str = "/health";
    pub const VERSION: &str = "/version";
}

pub mod docs {
    pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";
}

pub mod websocket {
    pub const NOTIFICATIONS: &str = "/ws/notifications";
}

pub mod auth {
    pub const LOGIN: &str = "/auth/login";
    pub const ME: &str = "/auth/me";
    pub const STAFF: &str = "/staff";
    pub const STAFF_BY_ID: &str = "/staff/:id";
    pub const STAFF_ACTIVATE: &str = "/staff/:id/activate";
    pub const STAFF_DEACTIVATE: &str = "/staff/:id/deactivate";
}

pub mod notifications {
    pub const NOTIFICATIONS: &str = "/notifications";
    pub const NOTIFICATION_BY_ID: &str = "/notifications/:id";
    pub const UNREAD_COUNT: &str = "/notifications/unread-count";
    pub const MARK_READ: &str = "/notifications/mark-read";
    pub const MARK_ALL_READ: &str = "/notifications/mark-all-read";
    pub const DEPARTMENT_FEED: &str = "/departments/:department/notifications";
}

pub mod reception {
    pub const PATIENTS: &str = "/patients";
    pub const PATIENT_SEARCH: &str = "/patients/search";
    pub const PATIENT_BY_ID: &str = "/patients/:id";
    pub const PATIENT_DEACTIVATE: &str = "/patients/:id/deactivate";
    pub const APPOINTMENTS: &str = "/appointments";
    pub const APPOINTMENTS_TODAY: &str = "/appointments/today";
    pub const APPOINTMENT_BY_ID: &str = "/appointments/:id";
    pub const APPOINTMENT_CHECK_IN: &str = "/appointments/:id/check-in";
    pub const APPOINTMENT_CANCEL: &str = "/appointments/:id/cancel";
    pub const QUEUE: &str = "/queue";
    pub const QUEUE_ENTRY: &str = "/queue/:id";
    pub const QUEUE_PRIORITY: &str = "/queue/:id/priority";
    pub const QUEUE_START: &str = "/queue/:id/start";
    pub const QUEUE_COMPLETE: &str = "/queue/:id/complete";
}

pub mod clinical {
    pub const TRIAGE: &str = "/triage";
    pub const TRIAGE_BY_ID: &str = "/triage/:id";
    pub const TRIAGE_NOTES: &str = "/triage/:id/notes";
    pub const TRIAGE_COMPLETE: &str = "/triage/:id/complete";
    pub const CONSULTATIONS: &str = "/consultations";
    pub const CONSULTATION_BY_ID: &str = "/consultations/:id";
    pub const CONSULTATION_COMPLETE: &str = "/consultations/:id/complete";
    pub const CONSULTATION_NOTES: &str = "/consultations/:id/notes";
    pub const CONSULTATION_PRESCRIPTIONS: &str = "/consultations/:id/prescriptions";
    pub const CONSULTATION_LAB_REQUESTS: &str = "/consultations/:id/lab-requests";
    pub const PRESCRIPTIONS: &str = "/prescriptions";
    pub const PRESCRIPTIONS_PENDING: &str = "/prescriptions/pending";
    pub const PRESCRIPTION_BY_ID: &str = "/prescriptions/:id";
    pub const PRESCRIPTION_CANCEL: &str = "/prescriptions/:id/cancel";
    pub const LAB_REQUESTS: &str = "/lab/requests";
    pub const LAB_REQUEST_BY_ID: &str = "/lab/requests/:id";
    pub const LAB_REQUEST_CANCEL: &str = "/lab/requests/:id/cancel";
}

pub mod laboratory {
    pub const TESTS: &str = "/lab/tests";
    pub const TEST_BY_ID: &str = "/lab/tests/:id";
    pub const TEST_ACTIVE: &str = "/lab/tests/:id/active";
    pub const REQUEST_SAMPLES: &str = "/lab/requests/:id/samples";
    pub const REQUEST_RESULTS: &str = "/lab/requests/:id/results";
    pub const SAMPLE_BY_ID: &str = "/lab/samples/:id";
    pub const SAMPLE_RECEIVE: &str = "/lab/samples/:id/receive";
    pub const SAMPLE_STATUS: &str = "/lab/samples/:id/status";
    pub const RESULTS: &str = "/lab/results";
    pub const RESULT_BY_ID: &str = "/lab/results/:id";
    pub const RESULT_START: &str = "/lab/results/:id/start";
    pub const RESULT_COMPLETE: &str = "/lab/results/:id/complete";
    pub const RESULT_VERIFY: &str = "/lab/results/:id/verify";
    pub const RESULT_DELIVER: &str = "/lab/results/:id/deliver";
}

pub mod pharmacy {
    pub const MEDICATIONS: &str = "/pharmacy/medications";
    pub const MEDICATIONS_LOW_STOCK: &str = "/pharmacy/medications/low-stock";
    pub const MEDICATIONS_EXPIRING: &str = "/pharmacy/medications/expiring-soon";
    pub const MEDICATION_BY_ID: &str = "/pharmacy/medications/:id";
    pub const MEDICATION_RECEIVE: &str = "/pharmacy/medications/:id/receive";
    pub const MEDICATION_ADJUST: &str = "/pharmacy/medications/:id/adjust";
    pub const MEDICATION_TRANSACTIONS: &str = "/pharmacy/medications/:id/transactions";
    pub const DISPENSES: &str = "/pharmacy/dispenses";
    pub const DISPENSE_BY_ID: &str = "/pharmacy/dispenses/:id";
    pub const DISPENSE_PREPARE: &str = "/pharmacy/dispenses/:id/prepare";
    pub const DISPENSE_COMPLETE: &str = "/pharmacy/dispenses/:id/complete";
    pub const DISPENSE_CANCEL: &str = "/pharmacy/dispenses/:id/cancel";
}

pub mod wards {
    pub const WARDS: &str = "/wards";
    pub const WARD_BY_ID: &str = "/wards/:id";
    pub const WARD_BEDS: &str = "/wards/:id/beds";
    pub const WARD_OCCUPANCY: &str = "/wards/:id/occupancy";
    pub const BED_BY_ID: &str = "/beds/:id";
    pub const BED_STATUS: &str = "/beds/:id/status";
    pub const STAYS: &str = "/ward-stays";
    pub const STAY_BY_ID: &str = "/ward-stays/:id";
    pub const STAY_DISCHARGE: &str = "/ward-stays/:id/discharge";
    pub const STAY_VITALS: &str = "/ward-stays/:id/vitals";
    pub const STAY_LATEST_VITALS: &str = "/ward-stays/:id/vitals/latest";
    pub const STAY_TASKS: &str = "/ward-stays/:id/tasks";
    pub const TASKS_UPCOMING: &str = "/nursing-tasks/upcoming";
    pub const TASK_START: &str = "/nursing-tasks/:id/start";
    pub const TASK_COMPLETE: &str = "/nursing-tasks/:id/complete";
    pub const TASK_CANCEL: &str = "/nursing-tasks/:id/cancel";
}

pub mod billing {
    pub const SERVICES: &str = "/billing/services";
    pub const SERVICE_BY_ID: &str = "/billing/services/:id";
    pub const INVOICES: &str = "/invoices";
    pub const INVOICE_BY_ID: &str = "/invoices/:id";
    pub const INVOICE_ITEMS: &str = "/invoices/:id/items";
    pub const INVOICE_ITEM: &str = "/invoices/:id/items/:item_id";
    pub const INVOICE_FINALIZE: &str = "/invoices/:id/finalize";
    pub const INVOICE_CANCEL: &str = "/invoices/:id/cancel";
    pub const INVOICE_PAYMENTS: &str = "/invoices/:id/payments";
    pub const INVOICE_CLAIM: &str = "/invoices/:id/claim";
}

pub mod insurance {
    pub const CLAIMS: &str = "/insurance/claims";
    pub const CLAIM_BY_ID: &str = "/insurance/claims/:id";
    pub const CLAIM_SUBMIT: &str = "/insurance/claims/:id/submit";
    pub const CLAIM_REVIEW: &str = "/insurance/claims/:id/review";
    pub const CLAIM_APPROVE: &str = "/insurance/claims/:id/approve";
    pub const CLAIM_REJECT: &str = "/insurance/claims/:id/reject";
}

pub mod reports {
    pub const PATIENT_STATISTICS: &str = "/reports/patient-statistics";
    pub const FINANCIAL: &str = "/reports/financial";
    pub const OPERATIONAL: &str = "/reports/operational";
    pub const DOCTOR_PERFORMANCE: &str = "/reports/doctor-performance";
    pub const WARD_OCCUPANCY: &str = "/reports/ward-occupancy";
    pub const DASHBOARD: &str = "/dashboard/stats";
}
