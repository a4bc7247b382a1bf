use std::time::{SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in seconds
pub fn get_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Validate email format (basic validation)
pub fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.') && email.len() > 3
}

/// Validate display name (2-100 chars, not blank)
pub fn is_valid_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.len() >= 2 && trimmed.len() <= 100
}

/// Validate password strength (6-72 chars, at least one letter, one number)
pub fn is_valid_password(password: &str) -> bool {
    if password.len() < 6 || password.len() > 72 {
        return false;
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_number = password.chars().any(|c| c.is_numeric());

    has_letter && has_number
}

/// Sanitize string for database (remove null bytes, trim)
pub fn sanitize_string(input: &str) -> String {
    input.replace('\0', "").trim().to_string()
}
