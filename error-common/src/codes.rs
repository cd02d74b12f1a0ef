// Stable error codes exposed in API error bodies

pub const VALIDATION: &str = "validation_error";
pub const INVALID_STATE: &str = "invalid_state";
pub const NOT_FOUND: &str = "not_found";
pub const UNAUTHORIZED: &str = "unauthorized";
pub const FORBIDDEN: &str = "forbidden";
pub const CONFLICT: &str = "conflict";
pub const CONCURRENT_MODIFICATION: &str = "concurrent_modification";
pub const DATABASE: &str = "database_error";
pub const CONFIGURATION: &str = "configuration_error";
pub const INTERNAL: &str = "internal_error";
