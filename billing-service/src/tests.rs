use std::sync::Arc;
use std::time::Duration;

use auth_identity::{Principal, StaffMember, StaffRole};
use chrono::{NaiveDate, Utc};
use database_layer::{Database, RetryPolicy};
use error_common::reporting::Period;
use error_common::HimsError;
use events_bus::NotificationHub;
use reception_service::{Gender, Patient, ReceptionService, RegisterPatient};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::*;

struct Fixture {
    db: Database,
    hub: Arc<NotificationHub>,
    billing: BillingService,
    reception: ReceptionService,
    cashier: Principal,
}

fn fixture() -> Fixture {
    let db = Database::in_memory()
        .with_retry_policy(RetryPolicy::new(10, Duration::from_millis(1)));
    let hub = Arc::new(NotificationHub::new(db.clone()));
    Fixture {
        billing: BillingService::new(db.clone(), hub.clone()),
        reception: ReceptionService::new(db.clone(), hub.clone()),
        cashier: Principal::new(Uuid::new_v4(), StaffRole::Accountant),
        db,
        hub,
    }
}

async fn patient(f: &Fixture) -> Patient {
    f.reception
        .register_patient(
            &f.cashier,
            RegisterPatient {
                first_name: "Lucy".into(),
                last_name: "Achieng".into(),
                date_of_birth: NaiveDate::from_ymd_opt(1990, 2, 14).unwrap(),
                gender: Gender::Female,
                blood_type: None,
                phone_number: "0711222333".into(),
                email: None,
                address: None,
                city: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
                allergies: None,
                chronic_conditions: None,
            },
        )
        .await
        .unwrap()
}

async fn service(
    f: &Fixture,
    code: &str,
    service_type: ServiceType,
    cost: i64,
    tax: Option<i64>,
) -> BillableService {
    f.billing
        .create_service(NewService {
            name: format!("{} service", code),
            code: code.into(),
            service_type,
            description: None,
            cost: Decimal::from(cost),
            is_taxable: tax.is_some(),
            tax_rate: Decimal::from(tax.unwrap_or(0)),
        })
        .await
        .unwrap()
}

async fn draft(f: &Fixture) -> Invoice {
    let patient = patient(f).await;
    f.billing
        .create_invoice(
            &f.cashier,
            CreateInvoice {
                patient_id: patient.id,
                ward_stay_id: None,
                due_date: None,
                discount: None,
                notes: None,
            },
        )
        .await
        .unwrap()
}

fn cash(amount: i64) -> RecordPayment {
    RecordPayment {
        amount: Decimal::from(amount),
        payment_method: PaymentMethod::Cash,
        reference: None,
        notes: None,
    }
}

fn one(service: &BillableService) -> AddItem {
    AddItem {
        service_id: service.id,
        quantity: 1,
        description: None,
        performed_by: None,
    }
}

/// $150 taxed at 10% plus an untaxed $75: a $240 invoice
async fn worked_invoice(f: &Fixture) -> Invoice {
    let tag = Uuid::new_v4().simple().to_string();
    let xray_code = format!("XRAY-{}", &tag[..6]);
    let visit_code = format!("CONS-{}", &tag[..6]);
    let xray = service(f, &xray_code, ServiceType::Procedure, 150, Some(10)).await;
    let visit = service(f, &visit_code, ServiceType::Consultation, 75, None).await;
    let invoice = draft(f).await;
    f.billing.add_item(invoice.id, one(&xray)).await.unwrap();
    f.billing.add_item(invoice.id, one(&visit)).await.unwrap();
    f.billing.get_invoice(invoice.id).await.unwrap()
}

#[tokio::test]
async fn new_invoice_is_an_empty_draft() {
    let f = fixture();
    let invoice = draft(&f).await;
    assert!(invoice.invoice_number.starts_with("INV-"));
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.total_amount, Decimal::ZERO);
    assert_eq!(invoice.balance, Decimal::ZERO);
    assert_eq!(invoice.due_date, Utc::now().date_naive() + chrono::Duration::days(30));
}

#[tokio::test]
async fn items_total_from_price_snapshots() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    assert_eq!(invoice.amount, Decimal::from(225));
    assert_eq!(invoice.tax_amount, Decimal::from(15));
    assert_eq!(invoice.total_amount, Decimal::from(240));
    assert_eq!(invoice.balance, Decimal::from(240));

    let detail = f.billing.get_invoice_detail(invoice.id).await.unwrap();
    let xray = detail.items.iter().find(|i| i.unit_price == Decimal::from(150)).unwrap();
    f.billing
        .update_service(
            xray.service_id,
            UpdateService {
                cost: Some(Decimal::from(999)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let after = f.billing.get_invoice_detail(invoice.id).await.unwrap();
    assert_eq!(after.invoice.total_amount, Decimal::from(240));
    assert!(after.items.iter().all(|i| i.unit_price != Decimal::from(999)));
}

#[tokio::test]
async fn removing_an_item_re_totals() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    let detail = f.billing.get_invoice_detail(invoice.id).await.unwrap();
    let taxed = detail.items.iter().find(|i| i.tax_amount > Decimal::ZERO).unwrap();

    let updated = f.billing.remove_item(invoice.id, taxed.id).await.unwrap();
    assert_eq!(updated.amount, Decimal::from(75));
    assert_eq!(updated.tax_amount, Decimal::ZERO);
    assert_eq!(updated.total_amount, Decimal::from(75));
    assert!(matches!(
        f.billing.remove_item(invoice.id, taxed.id).await,
        Err(HimsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn items_are_frozen_after_finalize() {
    let f = fixture();
    let creator = StaffMember::new(
        "cashier@hims.test",
        "Cash",
        "Desk",
        StaffRole::Accountant,
        None,
        String::new(),
    );
    f.db.insert(&creator).await.unwrap();
    let f = Fixture {
        cashier: creator.principal(),
        ..f
    };

    let invoice = worked_invoice(&f).await;
    let lab = service(&f, "LAB", ServiceType::Laboratory, 40, None).await;
    let finalized = f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();
    assert_eq!(finalized.status, InvoiceStatus::Pending);
    assert_eq!(f.hub.unread_count(creator.id).await.unwrap(), 1);

    assert!(matches!(
        f.billing.add_item(invoice.id, one(&lab)).await,
        Err(HimsError::InvalidState(_))
    ));
    assert!(f.billing.finalize_invoice(&f.cashier, invoice.id).await.is_err());
}

#[tokio::test]
async fn full_payment_settles_the_invoice() {
    let f = fixture();
    let accountant = StaffMember::new(
        "acc@hims.test",
        "Ann",
        "Otieno",
        StaffRole::Accountant,
        Some("billing".into()),
        String::new(),
    );
    f.db.insert(&accountant).await.unwrap();
    let invoice = worked_invoice(&f).await;

    assert!(f.billing.record_payment(&f.cashier, invoice.id, cash(240)).await.is_err());
    f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();

    let (partial, _) = f.billing.record_payment(&f.cashier, invoice.id, cash(100)).await.unwrap();
    assert_eq!(partial.status, InvoiceStatus::Partial);
    assert_eq!(partial.balance, Decimal::from(140));
    assert!(matches!(
        f.billing.cancel_invoice(invoice.id).await,
        Err(HimsError::InvalidState(_))
    ));

    let (paid, payment) = f
        .billing
        .record_payment(&f.cashier, invoice.id, cash(140))
        .await
        .unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.balance, Decimal::ZERO);
    assert_eq!(paid.amount_paid, Decimal::from(240));
    assert_eq!(payment.amount, Decimal::from(140));
    assert_eq!(f.hub.unread_count(accountant.id).await.unwrap(), 2);
    assert_eq!(f.billing.list_payments(invoice.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn single_payment_of_the_total() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();
    let (paid, _) = f.billing.record_payment(&f.cashier, invoice.id, cash(240)).await.unwrap();
    assert_eq!(paid.balance, Decimal::ZERO);
    assert_eq!(paid.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn overpayment_and_zero_payments_are_rejected() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();
    assert!(matches!(
        f.billing.record_payment(&f.cashier, invoice.id, cash(241)).await,
        Err(HimsError::Validation(_))
    ));
    assert!(matches!(
        f.billing.record_payment(&f.cashier, invoice.id, cash(0)).await,
        Err(HimsError::Validation(_))
    ));
}

#[tokio::test]
async fn concurrent_payments_never_overdraw() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();

    let (a, b) = tokio::join!(
        f.billing.record_payment(&f.cashier, invoice.id, cash(150)),
        f.billing.record_payment(&f.cashier, invoice.id, cash(150)),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let invoice = f.billing.get_invoice(invoice.id).await.unwrap();
    assert_eq!(invoice.amount_paid, Decimal::from(150));
    assert_eq!(invoice.balance, Decimal::from(90));
}

#[tokio::test]
async fn cancel_only_before_payment() {
    let f = fixture();
    let untouched = draft(&f).await;
    assert_eq!(
        f.billing.cancel_invoice(untouched.id).await.unwrap().status,
        InvoiceStatus::Cancelled
    );

    let issued = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, issued.id).await.unwrap();
    assert_eq!(
        f.billing.cancel_invoice(issued.id).await.unwrap().status,
        InvoiceStatus::Cancelled
    );
}

#[tokio::test]
async fn service_codes_are_unique_and_inactive_services_unbillable() {
    let f = fixture();
    let svc = service(&f, "ECG", ServiceType::Procedure, 60, None).await;
    let dup = f
        .billing
        .create_service(NewService {
            name: "Another ECG".into(),
            code: "ecg".into(),
            service_type: ServiceType::Procedure,
            description: None,
            cost: Decimal::from(10),
            is_taxable: false,
            tax_rate: Decimal::ZERO,
        })
        .await;
    assert!(matches!(dup, Err(HimsError::Conflict(_))));

    f.billing
        .update_service(svc.id, UpdateService { is_active: Some(false), ..Default::default() })
        .await
        .unwrap();
    let invoice = draft(&f).await;
    assert!(f.billing.add_item(invoice.id, one(&svc)).await.is_err());
    assert!(f.billing.add_item(invoice.id, AddItem { quantity: 0, ..one(&svc) }).await.is_err());
}

#[tokio::test]
async fn financial_report_summarizes_the_period() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();
    f.billing.record_payment(&f.cashier, invoice.id, cash(100)).await.unwrap();
    f.billing
        .record_payment(
            &f.cashier,
            invoice.id,
            RecordPayment {
                amount: Decimal::from(140),
                payment_method: PaymentMethod::MobileMoney,
                reference: Some("MP-7781".into()),
                notes: None,
            },
        )
        .await
        .unwrap();

    let open = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, open.id).await.unwrap();
    f.billing.record_payment(&f.cashier, open.id, cash(40)).await.unwrap();

    let report = financial_report(&f.db, None, None).await.unwrap();
    assert_eq!(report.total_revenue, Decimal::from(280));
    assert_eq!(report.payment_count, 3);
    let cash_total = report
        .by_payment_method
        .iter()
        .find(|m| m.payment_method == PaymentMethod::Cash)
        .unwrap();
    assert_eq!(cash_total.total, Decimal::from(140));
    assert_eq!(cash_total.count, 2);
    assert_eq!(report.by_day.len(), 1);
    assert_eq!(report.outstanding_balance, Decimal::from(200));
    assert_eq!(report.outstanding_invoices, 1);

    let procedures = report
        .by_service_type
        .iter()
        .find(|s| s.service_type == ServiceType::Procedure)
        .unwrap();
    assert_eq!(procedures.total, Decimal::from(165));

    let today = Utc::now().date_naive();
    let empty = financial_report(
        &f.db,
        Some(today - chrono::Duration::days(10)),
        Some(today - chrono::Duration::days(5)),
    )
    .await
    .unwrap();
    assert_eq!(empty.total_revenue, Decimal::ZERO);
    let yesterday = today - chrono::Duration::days(1);
    assert!(financial_report(&f.db, Some(today), Some(yesterday))
        .await
        .is_err());
}

#[tokio::test]
async fn out_of_range_money_is_a_validation_error() {
    let f = fixture();
    let huge = Decimal::from_i128_with_scale(10i128.pow(20), 0);
    let err = f
        .billing
        .create_service(NewService {
            name: "Transplant".into(),
            code: "TX".into(),
            service_type: ServiceType::Procedure,
            description: None,
            cost: huge,
            is_taxable: false,
            tax_rate: Decimal::ZERO,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, HimsError::Validation(_)));

    let costly = service(&f, "ICU-DAY", ServiceType::Ward, 99_999_999, None).await;
    let invoice = draft(&f).await;
    let err = f
        .billing
        .add_item(
            invoice.id,
            AddItem {
                service_id: costly.id,
                quantity: u32::MAX,
                description: None,
                performed_by: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HimsError::Validation(_)));
    let unchanged = f.billing.get_invoice_detail(invoice.id).await.unwrap();
    assert!(unchanged.items.is_empty());
    assert_eq!(unchanged.invoice.total_amount, Decimal::ZERO);

    let patient = patient(&f).await;
    let err = f
        .billing
        .create_invoice(
            &f.cashier,
            CreateInvoice {
                patient_id: patient.id,
                ward_stay_id: None,
                due_date: None,
                discount: Some(huge),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HimsError::Validation(_)));
}

#[tokio::test]
async fn oversized_payment_is_rejected() {
    let f = fixture();
    let invoice = worked_invoice(&f).await;
    f.billing.finalize_invoice(&f.cashier, invoice.id).await.unwrap();

    let request = RecordPayment {
        amount: Decimal::from_i128_with_scale(10i128.pow(24), 0),
        ..cash(1)
    };
    let err = f
        .billing
        .record_payment(&f.cashier, invoice.id, request)
        .await
        .unwrap_err();
    assert!(matches!(err, HimsError::Validation(_)));
    assert_eq!(
        f.billing.get_invoice(invoice.id).await.unwrap().balance,
        Decimal::from(240)
    );
}

#[tokio::test]
async fn clinician_revenue_counts_credited_items_on_paid_invoices() {
    let f = fixture();
    let doctor = Uuid::new_v4();
    let tag = Uuid::new_v4().simple().to_string();
    let code = format!("CONS-{}", &tag[..6]);
    let visit = service(&f, &code, ServiceType::Consultation, 80, None).await;
    let credited = AddItem {
        performed_by: Some(doctor),
        ..one(&visit)
    };

    let paid = draft(&f).await;
    f.billing.add_item(paid.id, credited.clone()).await.unwrap();
    f.billing.add_item(paid.id, one(&visit)).await.unwrap();
    f.billing.finalize_invoice(&f.cashier, paid.id).await.unwrap();
    f.billing.record_payment(&f.cashier, paid.id, cash(60)).await.unwrap();

    // issued but unpaid: not yet revenue
    let unpaid = draft(&f).await;
    f.billing.add_item(unpaid.id, credited).await.unwrap();
    f.billing.finalize_invoice(&f.cashier, unpaid.id).await.unwrap();

    let period = Period::resolve(None, None).unwrap();
    assert_eq!(
        clinician_revenue(&f.db, doctor, period).await.unwrap(),
        Decimal::from(80)
    );
    assert_eq!(
        clinician_revenue(&f.db, Uuid::new_v4(), period).await.unwrap(),
        Decimal::ZERO
    );

    let today = Utc::now().date_naive();
    assert_eq!(revenue_on(&f.db, today).await.unwrap(), Decimal::from(60));
    assert_eq!(
        revenue_on(&f.db, today - chrono::Duration::days(1)).await.unwrap(),
        Decimal::ZERO
    );
}
