use serde::Deserialize;
use std::env;
use aerolink_core::geo::FlightTimeModel;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub flight_model: FlightModelConfig,
    #[serde(default)]
    pub routes: RoutesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct FlightModelConfig {
    pub cruise_speed_kmh: f64,
    pub overhead_minutes: i64,
}

impl Default for FlightModelConfig {
    fn default() -> Self {
        let model = FlightTimeModel::default();
        Self {
            cruise_speed_kmh: model.cruise_speed_kmh,
            overhead_minutes: model.overhead_minutes,
        }
    }
}

impl FlightModelConfig {
    pub fn time_model(&self) -> FlightTimeModel {
        FlightTimeModel::new(self.cruise_speed_kmh, self.overhead_minutes)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutesConfig {
    pub min_waiting_minutes: u32,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self { min_waiting_minutes: 120 }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `AEROLINK_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("AEROLINK").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config as Builder, File, FileFormat};

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let cfg: Config = Builder::builder()
            .add_source(File::from_str("[database]\nurl = \"postgres://localhost/aerolink\"", FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.database.max_connections, 5);
        assert_eq!(cfg.routes.min_waiting_minutes, 120);
        assert_eq!(cfg.flight_model.time_model(), FlightTimeModel::default());
    }

    #[test]
    fn test_flight_model_override() {
        let toml = "[database]\nurl = \"postgres://x\"\n[flight_model]\ncruise_speed_kmh = 750.0\noverhead_minutes = 40\n";
        let cfg: Config = Builder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(cfg.flight_model.time_model(), FlightTimeModel::new(750.0, 40));
    }
}
