use sim_diff::DiffConfig;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct SimConfig {
    pub service: String,
    pub port: u16,
    pub endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub ignore_paths: Vec<String>,
    #[serde(default)]
    pub money_paths: Vec<String>,
    #[serde(default = "default_money_tolerance")]
    pub money_tolerance: f64,
    #[serde(default = "default_float_tolerance")]
    pub float_tolerance: f64,
}

fn default_money_tolerance() -> f64 {
    0.01
}

fn default_float_tolerance() -> f64 {
    1e-9
}

impl SimConfig {
    pub fn from_yaml(text: &str) -> Result<SimConfig, ConfigError> {
        let config: SimConfig = serde_yaml::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(&endpoint.name) {
                return Err(ConfigError::DuplicateEndpoint(endpoint.name.clone()));
            }
        }
        Ok(())
    }

    pub fn diff_config(&self) -> DiffConfig {
        DiffConfig {
            ignore_paths: self.ignore_paths.clone(),
            money_paths: self.money_paths.clone(),
            money_tolerance: self.money_tolerance,
            float_tolerance: self.float_tolerance,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[source] serde_yaml::Error),
    #[error("config names endpoint '{0}' more than once")]
    DuplicateEndpoint(String),
}
