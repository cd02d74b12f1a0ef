use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::Utc;
use database_layer::Database;
use tracing::info;
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::{IdentityError, Result};
use crate::models::*;
use crate::repository::{normalize_email, StaffRepository};
use crate::token::TokenService;

pub struct IdentityService {
    db: Database,
    staff: StaffRepository,
    tokens: TokenService,
    config: IdentityConfig,
    argon2: Argon2<'static>,
}

impl IdentityService {
    pub fn new(db: Database, config: IdentityConfig) -> Self {
        Self {
            staff: StaffRepository::new(db.clone()),
            tokens: TokenService::new(&config),
            argon2: hasher(&config),
            db,
            config,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn staff(&self) -> &StaffRepository {
        &self.staff
    }

    /// Create a staff account; admin only
    pub async fn register_staff(
        &self,
        principal: &Principal,
        request: CreateStaffRequest,
    ) -> Result<StaffProfile> {
        if !principal.is_admin() {
            return Err(IdentityError::AdminRequired);
        }
        let staff = self.create_staff(request).await?;
        info!(staff_id = %staff.id, role = %staff.role, "Staff account created");
        Ok(StaffProfile::from(&staff))
    }

    /// Create the first administrator if no account uses `request.email`
    pub async fn ensure_bootstrap_admin(&self, mut request: CreateStaffRequest) -> Result<bool> {
        if self.staff.find_by_email(&request.email).await?.is_some() {
            return Ok(false);
        }
        request.role = StaffRole::Admin;
        let staff = self.create_staff(request).await?;
        info!(staff_id = %staff.id, "Bootstrap administrator created");
        Ok(true)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let mut staff = self
            .staff
            .find_by_email(email)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !staff.is_active {
            return Err(IdentityError::AccountDisabled);
        }

        self.verify_password(password, &staff.password_hash)?;

        staff.last_login = Some(Utc::now());
        // a lost race on last_login is harmless
        if let Err(err) = self.db.update(&staff).await {
            tracing::debug!(staff_id = %staff.id, "Could not record last login: {}", err);
        }

        let (token, expires_at) = self.tokens.issue(&staff)?;
        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_at,
            staff: StaffProfile::from(&staff.value),
        })
    }

    pub async fn get_staff(&self, id: Uuid) -> Result<StaffProfile> {
        let staff = self
            .staff
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::StaffNotFound)?;
        Ok(StaffProfile::from(&staff.value))
    }

    pub async fn list_staff(
        &self,
        department: Option<&str>,
        role: Option<StaffRole>,
    ) -> Result<Vec<StaffProfile>> {
        Ok(self
            .staff
            .list(department, role)
            .await?
            .iter()
            .map(StaffProfile::from)
            .collect())
    }

    pub async fn set_active(
        &self,
        principal: &Principal,
        id: Uuid,
        active: bool,
    ) -> Result<StaffProfile> {
        if !principal.is_admin() {
            return Err(IdentityError::AdminRequired);
        }
        let mut staff = self
            .staff
            .find_by_id(id)
            .await?
            .ok_or(IdentityError::StaffNotFound)?;
        staff.is_active = active;
        staff.updated_at = Utc::now();
        self.db.update(&staff).await?;
        Ok(StaffProfile::from(&staff.value))
    }

    async fn create_staff(&self, request: CreateStaffRequest) -> Result<StaffMember> {
        let email = normalize_email(&request.email);
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        if self.staff.find_by_email(&email).await?.is_some() {
            return Err(IdentityError::EmailAlreadyInUse);
        }
        if request.password.chars().count() < self.config.password_min_length {
            return Err(IdentityError::WeakPassword(self.config.password_min_length));
        }

        let mut staff = StaffMember::new(
            email,
            request.first_name.trim(),
            request.last_name.trim(),
            request.role,
            request.department.map(|d| d.trim().to_lowercase()),
            self.hash_password(&request.password)?,
        );
        staff.employee_id = request.employee_id;
        staff.phone = request.phone;
        self.db.insert(&staff).await?;
        Ok(staff)
    }

    fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|_| IdentityError::HashingError)?
            .to_string();
        Ok(password_hash)
    }

    fn verify_password(&self, password: &str, hash: &str) -> Result<()> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| IdentityError::HashingError)?;
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| IdentityError::InvalidCredentials)
    }
}

fn hasher(config: &IdentityConfig) -> Argon2<'static> {
    match Params::new(config.hash_memory_kib, config.hash_iterations, 1, None) {
        Ok(params) => Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        Err(err) => {
            tracing::warn!("Invalid password hashing parameters, using defaults: {}", err);
            Argon2::default()
        }
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((user, domain)) => {
            !user.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}
