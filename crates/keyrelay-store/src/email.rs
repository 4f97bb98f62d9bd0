//! Email normalisation shared by the HTTP service and the `users` CLI.

/// Why a submitted email was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    #[error("User email is required")]
    Missing,
    #[error("Valid user email is required")]
    Invalid,
}

/// Trim and lowercase a submitted email, rejecting blank or malformed input.
pub fn normalize_email(raw: Option<&str>) -> Result<String, EmailError> {
    let email = raw.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(EmailError::Missing);
    }
    if !is_valid_email(email) {
        return Err(EmailError::Invalid);
    }
    Ok(email.to_lowercase())
}

/// `local@domain.tld`: one `@`, no whitespace, and a dot inside the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}
