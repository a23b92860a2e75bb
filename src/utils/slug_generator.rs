//! Slug generation and validation utilities.
//!
//! Provides cryptographically secure random slug generation and validation
//! for operator-chosen slugs.

use crate::error::AppError;
use serde_json::json;

/// Length of generated slugs.
const GENERATED_SLUG_LENGTH: usize = 10;

/// Alphabet for generated slugs; matches the rules custom slugs must follow.
const SLUG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Largest multiple of the alphabet size below 256, for unbiased sampling.
const SAMPLE_LIMIT: u8 = (256 / SLUG_ALPHABET.len() * SLUG_ALPHABET.len()) as u8;

const MIN_SLUG_LENGTH: usize = 3;
const MAX_SLUG_LENGTH: usize = 64;

/// Slugs that would shadow operational paths or read as official.
const RESERVED_SLUGS: &[&str] = &["r", "health", "admin", "api", "static", "metrics"];

/// Generates a cryptographically secure random slug.
///
/// Draws bytes from `getrandom` and keeps only those that map onto the
/// alphabet without modulo bias, producing a 10-character lowercase
/// alphanumeric slug.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the system random number generator fails.
///
/// # Examples
///
/// ```ignore
/// let slug = generate_slug()?;
/// assert_eq!(slug.len(), 10);
/// assert!(validate_slug(&slug).is_ok());
/// ```
pub fn generate_slug() -> Result<String, AppError> {
    let mut slug = String::with_capacity(GENERATED_SLUG_LENGTH);
    let mut buffer = [0u8; 32];

    while slug.len() < GENERATED_SLUG_LENGTH {
        getrandom::fill(&mut buffer).map_err(|e| {
            AppError::internal(
                "Failed to generate random bytes",
                json!({ "reason": e.to_string() }),
            )
        })?;

        for &byte in buffer.iter().filter(|&&b| b < SAMPLE_LIMIT) {
            if slug.len() == GENERATED_SLUG_LENGTH {
                break;
            }
            slug.push(SLUG_ALPHABET[byte as usize % SLUG_ALPHABET.len()] as char);
        }
    }

    Ok(slug)
}

/// Validates an operator-provided slug.
///
/// # Rules
///
/// - Length: 3-64 characters
/// - Allowed characters: lowercase letters, digits, hyphens
/// - Cannot start or end with a hyphen
/// - Cannot be a reserved system path
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any validation rule is violated.
///
/// # Examples
///
/// ```ignore
/// assert!(validate_slug("promo1").is_ok());
/// assert!(validate_slug("spring-2026").is_ok());
///
/// assert!(validate_slug("ab").is_err());        // Too short
/// assert!(validate_slug("Promo").is_err());     // Uppercase
/// assert!(validate_slug("-promo").is_err());    // Starts with hyphen
/// assert!(validate_slug("health").is_err());    // Reserved
/// ```
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.len() < MIN_SLUG_LENGTH || slug.len() > MAX_SLUG_LENGTH {
        return Err(AppError::bad_request(
            format!("Slug must be {MIN_SLUG_LENGTH}-{MAX_SLUG_LENGTH} characters"),
            json!({ "provided_length": slug.len() }),
        ));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::bad_request(
            "Slug can only contain lowercase letters, digits, and hyphens",
            json!({ "slug": slug }),
        ));
    }

    if slug.starts_with('-') || slug.ends_with('-') {
        return Err(AppError::bad_request(
            "Slug cannot start or end with a hyphen",
            json!({ "slug": slug }),
        ));
    }

    if RESERVED_SLUGS.contains(&slug) {
        return Err(AppError::bad_request(
            "This slug is reserved",
            json!({ "slug": slug }),
        ));
    }

    Ok(())
}
