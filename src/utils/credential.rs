// src/utils/credential.rs

use chrono::{DateTime, Datelike, Utc};
use uuid::Uuid;

/// Builds a human-readable credential id: an uppercase prefix derived from
/// the course title, the issue year, and a random suffix.
///
/// The suffix alone does not guarantee global uniqueness; the UNIQUE
/// constraint on `certificates.credential_id` backstops collisions.
pub fn generate_credential_id(title: &str, issued_at: DateTime<Utc>) -> String {
    let prefix: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    let prefix = if prefix.is_empty() {
        "COURSE".to_string()
    } else {
        prefix
    };

    let suffix = Uuid::new_v4().simple().to_string();

    format!(
        "EC-{}-{}-{}",
        prefix,
        issued_at.year(),
        suffix[..8].to_ascii_uppercase()
    )
}
