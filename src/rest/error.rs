//! Error types for fullnode and companion API calls

use thiserror::Error;

/// Errors surfaced by REST API implementations.
///
/// Node error payloads are classified once, at the client boundary, so
/// callers can match on variants instead of scraping message text.
#[derive(Debug, Error)]
pub enum RestError {
    /// The requested history has been pruned by the node. `min_available`
    /// is the lowest index (transaction version or event sequence number,
    /// depending on the endpoint) still retained.
    #[error("history pruned below {min_available}")]
    Pruned { min_available: u64 },

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-success status from the node.
    #[error("node returned {status} ({error_code}): {message}")]
    Status {
        status: u16,
        error_code: String,
        message: String,
    },

    #[error("http transport error: {0}")]
    Http(String),

    #[error("unexpected response body: {0}")]
    Json(String),
}

impl RestError {
    /// Classify a node error payload into a structured variant.
    ///
    /// The fullnode reports pruned history as an `internal_error` whose
    /// message ends with the retained floor, in one of two shapes:
    ///
    /// - events: `... expected: 0, actual: 5`
    /// - transactions: `... min available version is 4137.`
    pub fn from_node_error(status: u16, error_code: String, message: String) -> Self {
        if status == 404 {
            return RestError::NotFound(message);
        }
        let looks_pruned =
            message.contains("min available version is") || message.contains("actual:");
        if error_code == "internal_error" && looks_pruned {
            if let Some(min_available) = trailing_number(&message) {
                return RestError::Pruned { min_available };
            }
        }
        RestError::Status {
            status,
            error_code,
            message,
        }
    }
}

/// The trailing integer of a message, ignoring final punctuation.
fn trailing_number(message: &str) -> Option<u64> {
    let trimmed = message.trim_end().trim_end_matches('.');
    let digits_start = trimmed
        .rfind(|c: char| !c.is_ascii_digit())
        .map(|i| i + 1)
        .unwrap_or(0);
    let digits = &trimmed[digits_start..];
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Extract the pruned floor from an error, if it is one.
pub fn pruned_floor(err: &anyhow::Error) -> Option<u64> {
    match err.downcast_ref::<RestError>() {
        Some(RestError::Pruned { min_available }) => Some(*min_available),
        _ => None,
    }
}
