use config::ConfigError;
use flows::PollPolicy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const ENV_PREFIX: &str = "PREPMATE_";

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub api: ApiSettings,
    pub interview: InterviewSettings,
    pub verification: VerificationSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct InterviewSettings {
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct VerificationSettings {
    pub window_secs: u64,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::build(&run_mode, env_overrides(std::env::vars()))
    }

    fn build(run_mode: &str, env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let env_json =
            serde_json::to_string(&env_map).map_err(|e| ConfigError::Message(e.to_string()))?;

        let s = config::Config::builder()
            .set_default("api.base_url", "http://127.0.0.1:8080")?
            .set_default("api.timeout_secs", 10)?
            .set_default("interview.poll_interval_secs", 3)?
            .set_default("interview.poll_timeout_secs", 60)?
            .set_default("verification.window_secs", 600)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interview.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(self.interview.poll_timeout_secs),
        }
    }

    pub fn verification_window(&self) -> Duration {
        Duration::from_secs(self.verification.window_secs)
    }
}

/// `PREPMATE_API__BASE_URL` → `api.base_url`
fn env_overrides(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn env_keys_are_nested_and_filtered() {
        let map = env_overrides(vars(&[
            ("PREPMATE_API__BASE_URL", "https://prep.example"),
            ("PREPMATE_INTERVIEW__POLL_TIMEOUT_SECS", "30"),
            ("HOME", "/root"),
        ]));
        assert_eq!(map.len(), 2);
        assert_eq!(map["api.base_url"], "https://prep.example");
        assert_eq!(map["interview.poll_timeout_secs"], "30");
    }

    #[test]
    fn defaults_apply_without_files() {
        let s = Settings::build("test-nonexistent", HashMap::new()).unwrap();
        assert_eq!(s.api.base_url, "http://127.0.0.1:8080");
        assert_eq!(s.request_timeout(), Duration::from_secs(10));
        assert_eq!(s.poll_policy(), PollPolicy::default());
        assert_eq!(s.verification_window(), flows::VERIFICATION_WINDOW);
    }

    #[test]
    fn env_values_override_defaults() {
        let env = env_overrides(vars(&[
            ("PREPMATE_API__TIMEOUT_SECS", "3"),
            ("PREPMATE_VERIFICATION__WINDOW_SECS", "120"),
        ]));
        let s = Settings::build("test-nonexistent", env).unwrap();
        assert_eq!(s.api.timeout_secs, 3);
        assert_eq!(s.verification.window_secs, 120);
    }
}
