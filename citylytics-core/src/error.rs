use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::ServiceId;

/// Why a call to an external service produced no usable payload.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} {what} request failed with status {status}: {body}")]
    Status {
        service: ServiceId,
        what: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to reach {service} ({what})")]
    Transport {
        service: ServiceId,
        what: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {service} {what} JSON")]
    Decode {
        service: ServiceId,
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{service} {what} response contained no data")]
    Empty { service: ServiceId, what: &'static str },
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
