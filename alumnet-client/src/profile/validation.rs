//! Pre-flight checks on a profile about to be saved.
//!
//! These only keep obviously broken input off the wire; the backend stays
//! the authority on what it accepts.
use once_cell::sync::Lazy;
use regex::Regex;
use shared::models::{Profile, ProfileDetails};

pub const INVALID_EMAIL: &str = "Invalid email format";
pub const INVALID_LINKEDIN: &str = "LinkedIn must be a valid URL";
pub const INVALID_GITHUB: &str = "GitHub must be a valid URL";
pub const INVALID_CGPA: &str = "CGPA must be a number between 0 and 10";

/// Highest CGPA the backend's grading scale allows.
pub const CGPA_MAX: f64 = 10.0;

/// `local@domain.tld` with no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
    RE.is_match(email)
}

/// Starts with `http://` or `https://` (any case) followed by something.
pub fn is_valid_url(url: &str) -> bool {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^https?://.+").expect("valid regex"));
    RE.is_match(url)
}

fn is_valid_cgpa(cgpa: &str) -> bool {
    cgpa.trim()
        .parse::<f64>()
        .is_ok_and(|value| (0.0..=CGPA_MAX).contains(&value))
}

/// Check `profile` and report the first violated rule.
///
/// Empty optional fields always pass.
///
/// # Errors
/// Returns the user-facing message of the first failing rule.
pub fn validate(profile: &Profile) -> Result<(), &'static str> {
    if !profile.email.is_empty() && !is_valid_email(&profile.email) {
        return Err(INVALID_EMAIL);
    }
    if !profile.linked_in.is_empty() && !is_valid_url(&profile.linked_in) {
        return Err(INVALID_LINKEDIN);
    }
    if !profile.github.is_empty() && !is_valid_url(&profile.github) {
        return Err(INVALID_GITHUB);
    }
    if let ProfileDetails::Student { cgpa, .. } = &profile.details {
        if !cgpa.trim().is_empty() && !is_valid_cgpa(cgpa) {
            return Err(INVALID_CGPA);
        }
    }
    Ok(())
}
