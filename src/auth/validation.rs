use std::collections::BTreeMap;

use lazy_static::lazy_static;
use lettre::Address;
use regex::Regex;
use serde::Serialize;

use crate::auth::dto::SignUpRequest;

/// Key for errors that belong to the form as a whole.
pub const FORM: &str = "_form";

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 255;

/// Field-keyed error lists, serialised as `{ "field": ["msg", ...] }`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn form(message: impl Into<String>) -> Self {
        Self::single(FORM, message)
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Sign-up fields that passed validation, email normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Shape check plus lettre's RFC 5321 parser, so every accepted address can be mailed.
pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email) && email.parse::<Address>().is_ok()
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_length(errors: &mut FieldErrors, field: &str, value: &str) {
    let len = value.chars().count();
    if len < MIN_LEN {
        errors.add(
            field,
            format!("String must contain at least {MIN_LEN} character(s)"),
        );
    } else if len > MAX_LEN {
        errors.add(
            field,
            format!("String must contain at most {MAX_LEN} character(s)"),
        );
    }
}

pub fn validate_sign_up(req: &SignUpRequest) -> Result<SignUpInput, FieldErrors> {
    let mut errors = FieldErrors::default();
    let email = normalize_email(&req.email);

    check_length(&mut errors, "name", &req.name);
    if !is_valid_email(&email) {
        errors.add("email", "Invalid email");
    }
    check_length(&mut errors, "password", &req.password);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(SignUpInput {
        name: req.name.clone(),
        email,
        password: req.password.clone(),
    })
}
