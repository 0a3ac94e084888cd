//! Form validation that runs before any network call.

use crate::types::{Gender, Relationship, TrustedContactRequest, UserLoginRequest, UserRegistrationRequest};
use chrono::NaiveDate;
use thiserror::Error;

/// Minimum age, in whole years, to create an account.
pub const MINIMUM_AGE_YEARS: u32 = 13;
pub const MINIMUM_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Please fill in required fields")]
    MissingRequiredFields,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("You must be at least 13 years old to sign up")]
    Underage,
    #[error("Please enter a valid date of birth")]
    InvalidDateOfBirth,
    #[error("Please choose male or female")]
    InvalidGender,
    #[error("Please choose a valid relationship")]
    InvalidRelationship,
}

pub fn validate_login(email: &str, password: &str) -> Result<UserLoginRequest, ValidationError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    Ok(UserLoginRequest {
        email: email.trim().to_string(),
        password: password.to_string(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub phone: String,
}

pub fn validate_signup(
    form: &SignupForm,
    today: NaiveDate,
) -> Result<UserRegistrationRequest, ValidationError> {
    let required = [
        &form.name,
        &form.email,
        &form.password,
        &form.confirm_password,
        &form.gender,
        &form.date_of_birth,
        &form.phone,
    ];
    if required.iter().any(|f| f.trim().is_empty()) {
        return Err(ValidationError::MissingFields);
    }
    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if form.password.chars().count() < MINIMUM_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }

    let birth = NaiveDate::parse_from_str(form.date_of_birth.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDateOfBirth)?;
    match today.years_since(birth) {
        Some(age) if age >= MINIMUM_AGE_YEARS => {}
        _ => return Err(ValidationError::Underage),
    }

    let gender: Gender = form.gender.parse().map_err(|_| ValidationError::InvalidGender)?;

    Ok(UserRegistrationRequest {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
        gender,
        date_of_birth: birth.format("%Y-%m-%d").to_string(),
        phone: form.phone.trim().to_string(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct TrustedContactForm {
    pub name: String,
    pub relationship: String,
    pub location: String,
    pub phone: String,
    pub email: Option<String>,
    pub note: Option<String>,
}

/// Validate the add-contact form and attach the owning user.
pub fn validate_trusted_contact(
    form: &TrustedContactForm,
    user_id: &str,
) -> Result<TrustedContactRequest, ValidationError> {
    if form.name.trim().is_empty() || form.relationship.trim().is_empty() {
        return Err(ValidationError::MissingRequiredFields);
    }
    let relationship: Relationship = form
        .relationship
        .parse()
        .map_err(|_| ValidationError::InvalidRelationship)?;

    let non_empty = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(TrustedContactRequest {
        name: form.name.trim().to_string(),
        relationship,
        location: form.location.trim().to_string(),
        phone: form.phone.trim().to_string(),
        email: non_empty(&form.email),
        note: non_empty(&form.note),
        user: user_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn form() -> SignupForm {
        SignupForm {
            name: "Lee".into(),
            email: "lee@example.com".into(),
            password: "secret1".into(),
            confirm_password: "secret1".into(),
            gender: "female".into(),
            date_of_birth: "1997-01-01".into(),
            phone: "+16694657373".into(),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        assert_eq!(validate_login("", "x"), Err(ValidationError::MissingFields));
        assert_eq!(validate_login("a@b.com", ""), Err(ValidationError::MissingFields));
        let req = validate_login(" a@b.com ", "x").unwrap();
        assert_eq!(req.email, "a@b.com");
    }

    #[test]
    fn test_signup_valid() {
        let req = validate_signup(&form(), date("2025-06-01")).unwrap();
        assert_eq!(req.gender, Gender::Female);
        assert_eq!(req.date_of_birth, "1997-01-01");
    }

    #[test]
    fn test_signup_rejections_in_order() {
        let today = date("2025-06-01");

        let mut f = form();
        f.phone.clear();
        assert_eq!(validate_signup(&f, today), Err(ValidationError::MissingFields));

        let mut f = form();
        f.confirm_password = "other1".into();
        assert_eq!(validate_signup(&f, today), Err(ValidationError::PasswordMismatch));

        let mut f = form();
        f.password = "abc".into();
        f.confirm_password = "abc".into();
        assert_eq!(validate_signup(&f, today), Err(ValidationError::PasswordTooShort));

        let mut f = form();
        f.date_of_birth = "01/02/1990".into();
        assert_eq!(validate_signup(&f, today), Err(ValidationError::InvalidDateOfBirth));

        let mut f = form();
        f.gender = "other".into();
        assert_eq!(validate_signup(&f, today), Err(ValidationError::InvalidGender));
    }

    #[test]
    fn test_signup_age_boundary() {
        let mut f = form();
        f.date_of_birth = "2012-06-02".into();
        assert_eq!(validate_signup(&f, date("2025-06-01")), Err(ValidationError::Underage));
        f.date_of_birth = "2012-06-01".into();
        assert!(validate_signup(&f, date("2025-06-01")).is_ok());
        f.date_of_birth = "2030-01-01".into();
        assert_eq!(validate_signup(&f, date("2025-06-01")), Err(ValidationError::Underage));
    }

    #[test]
    fn test_trusted_contact_validation() {
        let mut f = TrustedContactForm {
            name: "Sam".into(),
            relationship: "brother".into(),
            email: Some("  ".into()),
            note: Some("tall".into()),
            ..Default::default()
        };
        let req = validate_trusted_contact(&f, "u1").unwrap();
        assert_eq!(req.relationship, Relationship::Brother);
        assert_eq!(req.email, None);
        assert_eq!(req.note.as_deref(), Some("tall"));
        assert_eq!(req.user, "u1");

        f.relationship = "neighbor".into();
        assert_eq!(
            validate_trusted_contact(&f, "u1"),
            Err(ValidationError::InvalidRelationship)
        );
        f.name.clear();
        assert_eq!(
            validate_trusted_contact(&f, "u1"),
            Err(ValidationError::MissingRequiredFields)
        );
    }
}
