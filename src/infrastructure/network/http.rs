// HTTP client utilities
use crate::domain::error::LeagueError;
use crate::infrastructure::config::Config;
use reqwest::Client;

pub const USER_AGENT: &str = concat!("league/", env!("CARGO_PKG_VERSION"));

/// Create the HTTP client used for every backend call
///
/// The request timeout comes from `api.timeout_ms`; a timeout surfaces as an
/// ordinary request error.
pub fn create_client(config: &Config) -> Result<Client, LeagueError> {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(std::time::Duration::from_secs(30))
        .timeout(config.api.timeout())
        .user_agent(USER_AGENT);

    if let Some(proxy) = config.http_proxy.as_deref().filter(|p| !p.is_empty()) {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    Ok(builder.build()?)
}
