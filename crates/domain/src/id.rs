//! ID generation utilities.

use uuid::Uuid;

/// Generates a new request correlation id.
///
/// UUID v7 includes timestamp information, so ids sort by creation time in
/// log output.
#[must_use]
pub fn generate_request_id() -> String {
    Uuid::now_v7().to_string()
}
