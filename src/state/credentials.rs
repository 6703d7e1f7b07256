use crate::state::app_settings::config_path;
use log::{debug, warn};
use std::path::Path;

pub const TOKEN_ENV: &str = "BETBOARD_TOKEN";
const TOKEN_FILE: &str = "token";

/// Bearer token for the REST API: the environment wins over the token file.
/// Read-only; signing in happens elsewhere.
pub fn load_token() -> Option<String> {
    let path = config_path(TOKEN_FILE);
    resolve_token(std::env::var(TOKEN_ENV).ok(), &path)
}

fn resolve_token(from_env: Option<String>, path: &Path) -> Option<String> {
    if let Some(token) = from_env.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        debug!("using token from {TOKEN_ENV}");
        return Some(token);
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let token = content.trim().to_string();
            if token.is_empty() {
                warn!("token file {} is empty", path.display());
                return None;
            }
            debug!("using token from {}", path.display());
            Some(token)
        }
        Err(e) => {
            debug!("no token at {}: {e}", path.display());
            None
        }
    }
}
