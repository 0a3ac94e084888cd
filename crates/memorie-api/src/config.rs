/// Where the backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl From<&memorie_core::Config> for ApiConfig {
    fn from(config: &memorie_core::Config) -> Self {
        Self::new(config.api_base_url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slashes_trimmed() {
        assert_eq!(ApiConfig::new("http://h:3000//").base_url, "http://h:3000");
        assert_eq!(ApiConfig::new("http://h").base_url, "http://h");
    }

    #[test]
    fn test_from_core_config() {
        let env = |key: &str| (key == "MEMORIE_API_BASE_URL").then(|| "http://env.example/".to_string());
        let core = memorie_core::Config::from_sources("/d".into(), None, env);
        assert_eq!(ApiConfig::from(&core).base_url, "http://env.example");
    }
}
