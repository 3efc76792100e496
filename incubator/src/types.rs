//! Common type definitions.
//!
//! - [`ProfileId`]: identifier of a profile, always equal to the identity id issued by the identity
//!   provider. Treated as opaque text.
//! - [`abbrev_id`]: shorten identifiers for logs and traces.

// Type aliases for IDs
pub type ProfileId = String;

/// Abbreviate an identifier to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_id(id: &str) -> String {
    id.chars().take(8).collect()
}
