use crate::error::{AppError, Result};

/// Derive the socket endpoint from a page origin by swapping the scheme
/// (`http` → `ws`, `https` → `wss`). `ws`/`wss` addresses pass through.
pub fn resolve_endpoint(origin: &str) -> Result<String> {
    let origin = origin.trim();
    let (scheme, rest) = origin
        .split_once("://")
        .ok_or_else(|| AppError::InvalidEndpoint(format!("missing scheme in '{}'", origin)))?;

    if rest.is_empty() {
        return Err(AppError::InvalidEndpoint(format!("missing host in '{}'", origin)));
    }

    let ws_scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(AppError::InvalidEndpoint(format!(
                "unsupported scheme '{}' in '{}'",
                other, origin
            )))
        }
    };

    Ok(format!("{}://{}", ws_scheme, rest))
}
