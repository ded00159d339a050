//! Input forms: field-by-field validation with user-facing messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::guest::PRIVATE_NUMBER_MAX;
use crate::validate::{self, INVALID_EMAIL, REQUIRED};

pub const PASSWORD_MIN: usize = 8;

/// Errors keyed by field name, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Account sign-up: private number, email and a confirmed password.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub private_number: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

/// Cleaned registration data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub private_number: String,
    pub email: String,
    pub password: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<ValidRegistration, FormErrors> {
        let mut errors = FormErrors::default();

        let private_number = self.private_number.trim();
        if private_number.is_empty() {
            errors.add("private_number", REQUIRED);
        } else if let Some(msg) = validate::max_chars_message(private_number, PRIVATE_NUMBER_MAX) {
            errors.add("private_number", msg);
        }

        let email = validate::normalize_email(&self.email);
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !validate::is_valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() && self.password1 != self.password2 {
            errors.add("password2", "The two password fields didn't match.");
        } else if !self.password1.is_empty() {
            for msg in password_problems(&self.password1, &[private_number, &email]) {
                errors.add("password2", msg);
            }
        }

        if errors.is_empty() {
            Ok(ValidRegistration {
                private_number: private_number.to_string(),
                email,
                password: self.password1.clone(),
            })
        } else {
            Err(errors)
        }
    }
}

fn password_problems(password: &str, attributes: &[&str]) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < PASSWORD_MIN {
        problems.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN} characters."
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    let lowered = password.to_lowercase();
    if attributes
        .iter()
        .filter(|a| !a.is_empty())
        .any(|a| a.to_lowercase() == lowered || a.split('@').next().is_some_and(|l| l.to_lowercase() == lowered))
    {
        problems.push("The password is too similar to your account details.".to_string());
    }
    problems
}

/// Email + password sign-in.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(String, &str), FormErrors> {
        let mut errors = FormErrors::default();
        let email = validate::normalize_email(&self.email);
        if email.is_empty() {
            errors.add("email", REQUIRED);
        } else if !validate::is_valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }

        if errors.is_empty() {
            Ok((email, &self.password))
        } else {
            Err(errors)
        }
    }
}
