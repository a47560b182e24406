/// Environment-based configuration.

use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub detector_url: Option<String>,
    pub detector_api_key: Option<String>,
    pub model_timeout: Duration,
    pub detector_fallback: bool,
    pub jpeg_quality: u8,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            detector_url: None,
            detector_api_key: None,
            model_timeout: Duration::from_secs(5),
            detector_fallback: false,
            jpeg_quality: 85,
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            detector_url: non_empty("DETECTOR_URL"),
            detector_api_key: non_empty("DETECTOR_API_KEY"),
            model_timeout: lookup("MODEL_TIMEOUT_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.model_timeout),
            detector_fallback: lookup("DETECTOR_FALLBACK")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.detector_fallback),
            jpeg_quality: lookup("JPEG_QUALITY")
                .and_then(|q| q.parse::<u16>().ok())
                .map(|q| q.clamp(1, 100) as u8)
                .unwrap_or(defaults.jpeg_quality),
            max_body_bytes: lookup("MAX_BODY_BYTES")
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.port, 8000);
        assert!(config.detector_url.is_none());
        assert_eq!(config.model_timeout, Duration::from_secs(5));
        assert!(!config.detector_fallback);
        assert_eq!(config.jpeg_quality, 85);
    }

    #[test]
    fn test_reads_and_sanitizes_values() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "9100"),
            ("DETECTOR_URL", "https://detect.example.com/trees/3"),
            ("DETECTOR_API_KEY", "  "),
            ("MODEL_TIMEOUT_SECS", "0"),
            ("DETECTOR_FALLBACK", "TRUE"),
            ("JPEG_QUALITY", "400"),
        ]));
        assert_eq!(config.port, 9100);
        assert_eq!(
            config.detector_url.as_deref(),
            Some("https://detect.example.com/trees/3")
        );
        assert!(config.detector_api_key.is_none());
        assert_eq!(config.model_timeout, Duration::from_secs(5));
        assert!(config.detector_fallback);
        assert_eq!(config.jpeg_quality, 100);
    }

    #[test]
    fn test_unparsable_port_falls_back() {
        let config = Config::from_lookup(lookup(&[("PORT", "eighty")]));
        assert_eq!(config.port, 8000);
    }
}
