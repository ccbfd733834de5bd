//! Timeout helper for provider calls
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::with_timeout;
//!
//! let response = with_timeout(
//!     settings.request_timeout,
//!     provider.generate(prompt),
//!     "narrative request",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{ReportError, Result};

/// Execute an async operation with a timeout
///
/// Returns [`ReportError::Timeout`] if the operation doesn't complete within
/// the specified duration. The timeout error classifies as a network failure,
/// so the generation client retries it.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::timeout(operation_name, timeout)),
    }
}
