// Cache key construction: "<operation>_<params digest>"
use crate::domain::error::LeagueError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Display;

const DIGEST_HEX_LEN: usize = 16;

/// Key for an operation whose result depends on structured parameters.
///
/// The digest is taken over the JSON form of `params`, so equal parameter
/// values always map to the same key. Parameters that cannot be serialized
/// are an error rather than a shared fallback key.
pub fn cache_key<P: Serialize + ?Sized>(
    operation: &str,
    params: &P,
) -> Result<String, LeagueError> {
    let encoded = serde_json::to_vec(params)?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hex::encode(hasher.finalize());
    Ok(format!("{}_{}", operation, &digest[..DIGEST_HEX_LEN]))
}

/// Key for an operation addressed by a single id, e.g. `fetchTeam_5`.
pub fn keyed(operation: &str, id: impl Display) -> String {
    format!("{}_{}", operation, id)
}
