use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub token_ttl_minutes: i64,
    pub password_min_length: usize,
    /// Argon2id memory cost in KiB
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            issuer: "hims-engine".to_string(),
            token_ttl_minutes: 8 * 60,
            password_min_length: 8,
            hash_memory_kib: 19 * 1024,
            hash_iterations: 2,
        }
    }
}

impl IdentityConfig {
    /// Cheap hashing parameters for tests
    pub fn for_tests() -> Self {
        Self {
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..Self::default()
        }
    }
}
