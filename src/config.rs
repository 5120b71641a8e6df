use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub local_store_path: PathBuf,
    pub db_connection_string: String,
    pub bind_addr: String,
    pub bootstrap_token: Option<String>,
}

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_LOCAL_STORE_PATH: &str = ".dharma/local-storage.json";
const DEFAULT_DB_CONNECTION_STRING: &str = "sqlite://progress.sqlite?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_base_url =
            lookup("PROGRESS_API_BASE_URL").unwrap_or(DEFAULT_API_BASE_URL.into());
        let local_store_path = lookup("LOCAL_STORE_PATH")
            .unwrap_or(DEFAULT_LOCAL_STORE_PATH.into())
            .into();
        let db_connection_string =
            lookup("DB_CONNECTION_STRING").unwrap_or(DEFAULT_DB_CONNECTION_STRING.into());
        let bind_addr = lookup("BIND_ADDR").unwrap_or(DEFAULT_BIND_ADDR.into());
        let bootstrap_token = lookup("BOOTSTRAP_TOKEN").filter(|t| !t.trim().is_empty());
        let config = Config {
            api_base_url,
            local_store_path,
            db_connection_string,
            bind_addr,
            bootstrap_token,
        };
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.api_base_url.trim().is_empty() {
            return Err("PROGRESS_API_BASE_URL is empty".into());
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(format!(
                "PROGRESS_API_BASE_URL must be an http(s) URL, got {}",
                self.api_base_url
            ));
        }
        if self.local_store_path.as_os_str().is_empty() {
            return Err("LOCAL_STORE_PATH is empty".into());
        }
        if self.db_connection_string.trim().is_empty() {
            return Err("DB_CONNECTION_STRING is empty".into());
        }
        if self.bind_addr.trim().is_empty() {
            return Err("BIND_ADDR is empty".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
        assert_eq!(config.bootstrap_token, None);
    }

    #[test]
    fn blank_bootstrap_token_is_unset() {
        let config = Config::from_lookup(lookup(&[("BOOTSTRAP_TOKEN", "  ")])).unwrap();
        assert_eq!(config.bootstrap_token, None);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = Config::from_lookup(lookup(&[("PROGRESS_API_BASE_URL", "localhost:5000")]))
            .unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }
}
