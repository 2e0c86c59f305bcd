use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEOJSON_PATH: &str = "content/out/hawker_opportunities_ver2.geojson";
pub const DEFAULT_STATIC_DIR: &str = "client/dist";
pub const DEFAULT_DATASET_REFRESH_SECS: u64 = 60;
pub const DEFAULT_SERVER_PORT: u16 = 3000;

pub const DATASET_CACHE_CONTROL: &str = "public, max-age=60";

pub fn geojson_path() -> PathBuf {
    std::env::var("OPPORTUNITY_GEOJSON_PATH")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_GEOJSON_PATH))
}

pub fn static_dir() -> PathBuf {
    std::env::var("OPPORTUNITY_STATIC_DIR")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR))
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

/// How often the dataset file is checked for changes on disk.
pub fn dataset_refresh_interval() -> Duration {
    std::env::var("DATASET_REFRESH_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(DEFAULT_DATASET_REFRESH_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_env_is_unset() {
        temp_env::with_vars_unset(
            [
                "OPPORTUNITY_GEOJSON_PATH",
                "OPPORTUNITY_STATIC_DIR",
                "SERVER_PORT",
                "DATASET_REFRESH_SECS",
            ],
            || {
                assert_eq!(geojson_path(), PathBuf::from(DEFAULT_GEOJSON_PATH));
                assert_eq!(static_dir(), PathBuf::from(DEFAULT_STATIC_DIR));
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(
                    dataset_refresh_interval(),
                    Duration::from_secs(DEFAULT_DATASET_REFRESH_SECS)
                );
            },
        );
    }

    #[test]
    fn env_overrides_are_respected() {
        temp_env::with_vars(
            [
                ("OPPORTUNITY_GEOJSON_PATH", Some("/srv/data/opportunity.geojson")),
                ("OPPORTUNITY_STATIC_DIR", Some(" /srv/www ")),
                ("SERVER_PORT", Some("8080")),
                ("DATASET_REFRESH_SECS", Some("5")),
            ],
            || {
                assert_eq!(
                    geojson_path(),
                    PathBuf::from("/srv/data/opportunity.geojson")
                );
                assert_eq!(static_dir(), PathBuf::from("/srv/www"));
                assert_eq!(server_port(), 8080);
                assert_eq!(dataset_refresh_interval(), Duration::from_secs(5));
            },
        );
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        temp_env::with_vars(
            [
                ("OPPORTUNITY_GEOJSON_PATH", Some("   ")),
                ("SERVER_PORT", Some("0")),
                ("DATASET_REFRESH_SECS", Some("soon")),
            ],
            || {
                assert_eq!(geojson_path(), PathBuf::from(DEFAULT_GEOJSON_PATH));
                assert_eq!(server_port(), DEFAULT_SERVER_PORT);
                assert_eq!(
                    dataset_refresh_interval(),
                    Duration::from_secs(DEFAULT_DATASET_REFRESH_SECS)
                );
            },
        );
    }
}
