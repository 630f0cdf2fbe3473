//! Shared HTTP utilities for Stockroom crates.

/// Extract the first client IP from an X-Forwarded-For header value.
///
/// Returns the leftmost entry, which is the original client. The header is
/// client-controlled, so the value is recorded in the audit trail as
/// informational only.
pub fn extract_client_ip(forwarded_for: Option<&str>) -> Option<String> {
    forwarded_for
        .map(|s| s.split(',').next().unwrap_or("").trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Pick the executor name recorded in the audit trail.
///
/// Uses the caller-supplied name when it is non-blank, otherwise the configured fallback.
pub fn resolve_executor(requested: Option<&str>, fallback: &str) -> String {
    requested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
