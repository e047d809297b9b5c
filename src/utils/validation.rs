use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

/// Name, email and phone a candidate must provide before the interview starts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ContactInfo {
    #[validate(custom(function = "validate_name"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: String,
}

impl ContactInfo {
    pub fn new(name: &str, email: &str, phone: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            phone: phone.trim().to_string(),
        }
    }
}

fn phone_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9\s\-().]+$").expect("phone regex"))
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if !(2..=100).contains(&len) {
        let mut err = ValidationError::new("name_length");
        err.message = Some("Name must be between 2 and 100 characters".into());
        return Err(err);
    }
    Ok(())
}

/// Accepts digits with optional leading `+`, spaces, dashes, dots and
/// parentheses, as long as there are 7 to 15 digits in total.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !phone_chars().is_match(phone) || !(7..=15).contains(&digits) {
        let mut err = ValidationError::new("phone");
        err.message = Some("Please enter a valid phone number".into());
        return Err(err);
    }
    Ok(())
}
