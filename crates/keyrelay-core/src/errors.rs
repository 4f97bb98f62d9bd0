//! Error kind constants for logging.
//!
//! Every HTTP-facing failure is tagged with one of these so log queries can
//! group them without parsing messages.

/// Missing or malformed request field.
pub const ERROR_VALIDATION: &str = "validation";
/// Bad or missing admin credential or client key.
pub const ERROR_AUTH: &str = "auth";
/// Client key quota exhausted.
pub const ERROR_QUOTA: &str = "quota";
/// Unknown resource.
pub const ERROR_NOT_FOUND: &str = "not_found";
/// Required configuration or secret is missing.
pub const ERROR_CONFIG: &str = "config";
/// Non-success response from an upstream API.
pub const ERROR_UPSTREAM: &str = "upstream";
/// Anything unexpected.
pub const ERROR_INTERNAL: &str = "internal";
