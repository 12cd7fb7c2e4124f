use crate::config::types::{
    ClientConfig, Config, CrawlerConfig, SelectorConfig, ServerConfig, StoreConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_store_config(&config.store)?;
    validate_crawler_config(&config.crawler)?;
    validate_selectors(&config.selectors)?;
    validate_server_config(&config.server)?;
    validate_client_config(&config.client)?;
    Ok(())
}

fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("start_url", &config.start_url)?;

    if config.page_cap < 1 {
        return Err(ConfigError::Validation(format!(
            "page_cap must be >= 1, got {}",
            config.page_cap
        )));
    }

    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_ms must be > 0".to_string(),
        ));
    }

    if config.poll_interval_ms > config.max_settle_ms {
        return Err(ConfigError::Validation(format!(
            "poll_interval_ms ({}) must not exceed max_settle_ms ({})",
            config.poll_interval_ms, config.max_settle_ms
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Every selector must parse; the extractor compiles them again at startup
fn validate_selectors(config: &SelectorConfig) -> Result<(), ConfigError> {
    for (name, selector) in [
        ("quote", &config.quote),
        ("text", &config.text),
        ("author", &config.author),
        ("tag", &config.tag),
        ("next", &config.next),
    ] {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} selector '{}': {:?}", name, selector, e))
        })?;
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid bind address '{}': {}", config.bind, e))
    })?;

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "server request_timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_client_config(config: &ClientConfig) -> Result<(), ConfigError> {
    validate_http_url("api_url", &config.api_url)?;

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "client request_timeout_secs must be > 0".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            field,
            url.scheme()
        )));
    }

    Ok(())
}
