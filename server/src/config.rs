// Configuration for the server, read from the environment

use std::time::Duration;

use audio_core::mixdown::{DEFAULT_EXPORT_VOLUME, DEFAULT_TAIL_SECS};
use audio_core::{MixdownPipeline, PIPELINE_SAMPLE_RATE};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub generation_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub sample_rate: u32,
    pub ambient_default_volume: f32,
    pub export_ambient_volume: f32,
    pub export_tail_secs: f64,
    pub max_audio_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            rate_limit_per_minute: 60,
            generation_timeout_secs: 120,
            // exports render the whole mix before responding
            request_timeout_secs: 300,
            cors_allowed_origins: None,
            sample_rate: PIPELINE_SAMPLE_RATE,
            ambient_default_volume: 0.2,
            export_ambient_volume: DEFAULT_EXPORT_VOLUME,
            export_tail_secs: DEFAULT_TAIL_SECS,
            max_audio_bytes: 50 * 1024 * 1024,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        Self {
            port: env_or("PORT", defaults.port),
            rate_limit_per_minute: env_or("RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute),
            generation_timeout_secs: env_or(
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout_secs,
            ),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            cors_allowed_origins,
            // speech always arrives at the pipeline rate; not configurable
            sample_rate: defaults.sample_rate,
            ambient_default_volume: env_or(
                "AMBIENT_DEFAULT_VOLUME",
                defaults.ambient_default_volume,
            ),
            export_ambient_volume: env_or("EXPORT_AMBIENT_VOLUME", defaults.export_ambient_volume),
            export_tail_secs: env_or("EXPORT_TAIL_SECS", defaults.export_tail_secs),
            max_audio_bytes: env_or("MAX_AUDIO_BYTES", defaults.max_audio_bytes),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn mixdown(&self) -> MixdownPipeline {
        MixdownPipeline {
            sample_rate: self.sample_rate,
            tail_secs: self.export_tail_secs,
            ambient_volume: self.export_ambient_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8085);
        assert_eq!(config.sample_rate, 24_000);
        assert_eq!(config.request_timeout(), Duration::from_secs(300));
        let mixdown = config.mixdown();
        assert_eq!(mixdown.tail_secs, 2.0);
        assert_eq!(mixdown.ambient_volume, 0.25);
    }

    #[test]
    fn test_sample_rate_ignores_environment() {
        std::env::set_var("SAMPLE_RATE", "44100");
        let config = ServerConfig::from_env();
        std::env::remove_var("SAMPLE_RATE");
        assert_eq!(config.sample_rate, PIPELINE_SAMPLE_RATE);
        assert_eq!(config.mixdown().sample_rate, PIPELINE_SAMPLE_RATE);
    }
}
