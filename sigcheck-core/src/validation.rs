//! Form validation, applied before any network call.

use std::path::{Path, PathBuf};

use crate::error::{Result, SigcheckError};

const PASSWORD_MIN_CHARS: usize = 6;
const PASSWORD_MAX_CHARS: usize = 20;
const OTP_DIGITS: usize = 6;

pub const PASSWORD_POLICY_MESSAGE: &str = "Password must be 6-20 characters and contain at least 1 uppercase letter, 1 lowercase letter, and 1 number";

/// Sign-up screen fields.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accepted_terms: bool,
}

/// New-signature screen fields.
#[derive(Debug, Clone, Default)]
pub struct SignatureForm {
    pub title: String,
    pub author: String,
    pub original_image: Option<PathBuf>,
    pub scanned_image: Option<PathBuf>,
}

/// 6–20 characters with at least one digit, one lowercase and one
/// uppercase ASCII letter.
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len)
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SigcheckError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    require(email, "Email")?;
    if !is_plausible_email(email.trim()) {
        return Err(SigcheckError::validation("Enter a valid email address"));
    }
    Ok(())
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<()> {
    require(&form.name, "Name")?;
    validate_email(&form.email)?;
    if !is_valid_password(&form.password) {
        return Err(SigcheckError::validation(PASSWORD_POLICY_MESSAGE));
    }
    if form.password != form.confirm_password {
        return Err(SigcheckError::validation("Passwords do not match!"));
    }
    if !form.accepted_terms {
        return Err(SigcheckError::validation(
            "You must agree to the terms and conditions.",
        ));
    }
    Ok(())
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<()> {
    validate_email(email)?;
    require(password, "Password")
}

/// Strip whitespace and require exactly six digits.
pub fn normalize_otp(code: &str) -> Result<String> {
    let digits: String = code.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() != OTP_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(SigcheckError::validation(
            "Enter the 6-digit code sent to your email",
        ));
    }
    Ok(digits)
}

/// Check the new-signature form and return both image paths.
pub fn validate_signature_form(form: &SignatureForm) -> Result<(&Path, &Path)> {
    require(&form.title, "Title")?;
    require(&form.author, "Author")?;
    let original = form
        .original_image
        .as_deref()
        .ok_or_else(|| SigcheckError::validation("Original signature image is required"))?;
    let scanned = form
        .scanned_image
        .as_deref()
        .ok_or_else(|| SigcheckError::validation("Scanned signature image is required"))?;
    Ok((original, scanned))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> SignUpForm {
        SignUpForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "Secret1".into(),
            confirm_password: "Secret1".into(),
            accepted_terms: true,
        }
    }

    #[test]
    fn test_password_policy() {
        assert!(is_valid_password("Abc123"));
        assert!(is_valid_password("Abcdefghijklmnopqr12"));
        assert!(!is_valid_password("Ab1"));
        assert!(!is_valid_password("Abcdefghijklmnopqr123"));
        assert!(!is_valid_password("abcdef1"));
        assert!(!is_valid_password("ABCDEF1"));
        assert!(!is_valid_password("Abcdefg"));
    }

    #[test]
    fn test_valid_sign_up_passes() {
        assert!(validate_sign_up(&valid_form()).is_ok());
    }

    #[test]
    fn test_sign_up_rules_in_order() {
        let mut form = valid_form();
        form.password = "weak".into();
        form.confirm_password = "different".into();
        let err = validate_sign_up(&form).unwrap_err();
        assert_eq!(err.to_string(), PASSWORD_POLICY_MESSAGE);

        let mut form = valid_form();
        form.confirm_password = "Secret2".into();
        assert_eq!(
            validate_sign_up(&form).unwrap_err().to_string(),
            "Passwords do not match!"
        );

        let mut form = valid_form();
        form.accepted_terms = false;
        assert_eq!(
            validate_sign_up(&form).unwrap_err().to_string(),
            "You must agree to the terms and conditions."
        );
    }

    #[test]
    fn test_email_checks() {
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a b@c.d").is_err());
    }

    #[test]
    fn test_otp_normalization() {
        assert_eq!(normalize_otp("123 456").unwrap(), "123456");
        assert!(normalize_otp("12345").is_err());
        assert!(normalize_otp("12345a").is_err());
        assert!(normalize_otp("1234567").is_err());
    }

    #[test]
    fn test_signature_form_requires_everything() {
        let mut form = SignatureForm {
            title: "President Signature".into(),
            author: "Office".into(),
            original_image: Some("a.png".into()),
            scanned_image: None,
        };
        assert!(validate_signature_form(&form).is_err());

        form.scanned_image = Some("b.png".into());
        let (a, b) = validate_signature_form(&form).unwrap();
        assert_eq!(a, Path::new("a.png"));
        assert_eq!(b, Path::new("b.png"));

        form.title.clear();
        assert_eq!(
            validate_signature_form(&form).unwrap_err().to_string(),
            "Title is required"
        );
    }
}
