use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use auth_identity::IdentityService;
use billing_service::BillingService;
use clinical_service::{ConsultationService, LaboratoryService, TriageService};
use database_layer::Database;
use events_bus::NotificationHub;
use insurance_service::InsuranceService;
use pharmacy_service::PharmacyService;
use reception_service::ReceptionService;
use tracing::{info, warn};
use ward_service::WardService;

use crate::config::ServerSettings;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct HimsServer {
    pub settings: Arc<ServerSettings>,
    pub db: Database,
    pub hub: Arc<NotificationHub>,
    pub identity: Arc<IdentityService>,
    pub reception: Arc<ReceptionService>,
    pub triage: Arc<TriageService>,
    pub consultations: Arc<ConsultationService>,
    pub laboratory: Arc<LaboratoryService>,
    pub pharmacy: Arc<PharmacyService>,
    pub wards: Arc<WardService>,
    pub billing: Arc<BillingService>,
    pub insurance: Arc<InsuranceService>,
    started_at: Instant,
}

impl HimsServer {
    /// Connect to Postgres when a database URL is configured, otherwise run
    /// on the in-memory store
    pub async fn new(settings: ServerSettings) -> Result<Self> {
        let db = match settings.database.connection() {
            Some(connection) => Database::connect(&connection)
                .await
                .context("Failed to connect to the database")?,
            None => {
                warn!(
                    "No database URL configured; using the in-memory store, \
                     data is lost on restart"
                );
                Database::in_memory()
            }
        };
        Ok(Self::with_database(db, settings))
    }

    /// Server over the in-memory store, for tests
    pub fn in_memory() -> Self {
        Self::with_database(Database::in_memory(), ServerSettings::for_tests())
    }

    pub fn with_database(db: Database, settings: ServerSettings) -> Self {
        let db = db.with_retry_policy(settings.retry.policy());
        let hub = NotificationHub::new(db.clone()).with_logging(&settings.logging.redaction);
        let hub = Arc::new(hub);
        Self {
            identity: Arc::new(IdentityService::new(db.clone(), settings.auth.clone())),
            reception: Arc::new(ReceptionService::new(db.clone(), hub.clone())),
            triage: Arc::new(TriageService::new(db.clone(), hub.clone())),
            consultations: Arc::new(ConsultationService::new(db.clone(), hub.clone())),
            laboratory: Arc::new(LaboratoryService::new(db.clone(), hub.clone())),
            pharmacy: Arc::new(PharmacyService::new(db.clone(), hub.clone())),
            wards: Arc::new(WardService::new(db.clone(), hub.clone())),
            billing: Arc::new(BillingService::new(db.clone(), hub.clone())),
            insurance: Arc::new(InsuranceService::new(db.clone(), hub.clone())),
            settings: Arc::new(settings),
            hub,
            db,
            started_at: Instant::now(),
        }
    }

    /// Create the configured administrator account if it does not exist yet
    pub async fn bootstrap(&self) -> Result<()> {
        let Some(admin) = &self.settings.bootstrap_admin else {
            return Ok(());
        };
        let created = self
            .identity
            .ensure_bootstrap_admin(admin.request())
            .await
            .context("Failed to create the bootstrap administrator")?;
        if created {
            info!(email = %admin.email, "Bootstrap administrator created");
        }
        Ok(())
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
