//! Input validation functions
//!
//! Field-level rules live on the request types via the `validator` derive.
//! The helpers here cover rules the derive cannot express.

use std::sync::OnceLock;

fn username_regex() -> &'static regex_lite::Regex {
    static RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex_lite::Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern is valid")
    })
}

/// Validate the username character set
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if !username_regex().is_match(username) {
        return Err(
            "Username may only contain letters, digits, '.', '_' and '-'".to_string(),
        );
    }
    Ok(())
}

/// Validate password content beyond its length
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.trim().is_empty() {
        return Err("Password cannot be blank".to_string());
    }
    if password.len() > 128 {
        return Err("Password too long".to_string());
    }
    Ok(())
}
