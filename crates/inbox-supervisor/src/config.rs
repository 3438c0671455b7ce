//! Environment-style configuration. Every invalid key is collected into
//! a single error so a misconfigured deploy fails with one complete report
//! instead of one environment variable at a time.

use std::env;

use inbox_core::InboxError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
}

impl Network {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "mainnet" => Some(Network::Mainnet),
            "testnet" => Some(Network::Testnet),
            "devnet" => Some(Network::Devnet),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub firebase_project_id: String,
    pub google_application_credentials: Option<String>,
    pub firestore_emulator_host: Option<String>,
    pub accumulate_api_url: String,
    pub accumulate_network: Network,
    pub poll_interval_sec: u64,
    pub user_concurrency: usize,
    pub max_retries: u32,
    pub delegation_depth: u32,
    pub pending_page_size: u32,
    pub users_collection: String,
    pub dry_run: bool,
    pub log_level: LogLevel,
}

const DEFAULT_API_URL: &str = "https://mainnet.accumulatenetwork.io/v3";

fn parse_int<T: std::str::FromStr>(key: &str, raw: &str, errors: &mut Vec<String>) -> Option<T> {
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(format!("{key}: invalid integer value {raw:?}"));
            None
        }
    }
}

fn parse_bool(key: &str, raw: &str, errors: &mut Vec<String>) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => {
            errors.push(format!("{key}: invalid boolean value {raw:?}"));
            None
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, InboxError> {
        let mut errors = Vec::new();

        let firebase_project_id = match env::var("FIREBASE_PROJECT_ID") {
            Ok(v) if !v.is_empty() => Some(v),
            _ => {
                errors.push("FIREBASE_PROJECT_ID: required, not set".to_string());
                None
            }
        };

        let google_application_credentials = env::var("GOOGLE_APPLICATION_CREDENTIALS").ok();
        let firestore_emulator_host = env::var("FIRESTORE_EMULATOR_HOST").ok();
        let accumulate_api_url =
            env::var("ACCUMULATE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let accumulate_network = match env::var("ACCUMULATE_NETWORK") {
            Ok(raw) => match Network::parse(&raw) {
                Some(n) => n,
                None => {
                    errors.push(format!(
                        "ACCUMULATE_NETWORK: invalid value {raw:?}, expected mainnet|testnet|devnet"
                    ));
                    Network::Mainnet
                }
            },
            Err(_) => Network::Mainnet,
        };

        let poll_interval_sec = env::var("POLL_INTERVAL_SEC")
            .ok()
            .and_then(|raw| parse_int::<u64>("POLL_INTERVAL_SEC", &raw, &mut errors))
            .unwrap_or(600);

        let user_concurrency = env::var("USER_CONCURRENCY")
            .ok()
            .and_then(|raw| parse_int::<usize>("USER_CONCURRENCY", &raw, &mut errors))
            .unwrap_or(8);

        let max_retries = env::var("MAX_RETRIES")
            .ok()
            .and_then(|raw| parse_int::<u32>("MAX_RETRIES", &raw, &mut errors))
            .unwrap_or(3);

        let delegation_depth = env::var("DELEGATION_DEPTH")
            .ok()
            .and_then(|raw| parse_int::<u32>("DELEGATION_DEPTH", &raw, &mut errors))
            .unwrap_or(10);

        let pending_page_size = env::var("PENDING_PAGE_SIZE")
            .ok()
            .and_then(|raw| parse_int::<u32>("PENDING_PAGE_SIZE", &raw, &mut errors))
            .unwrap_or(100);

        let users_collection =
            env::var("USERS_COLLECTION").unwrap_or_else(|_| "users".to_string());

        let dry_run = env::var("DRY_RUN")
            .ok()
            .and_then(|raw| parse_bool("DRY_RUN", &raw, &mut errors))
            .unwrap_or(false);

        let log_level = match env::var("LOG_LEVEL") {
            Ok(raw) => match LogLevel::parse(&raw) {
                Some(l) => l,
                None => {
                    errors.push(format!(
                        "LOG_LEVEL: invalid value {raw:?}, expected debug|info|warn|error"
                    ));
                    LogLevel::Info
                }
            },
            Err(_) => LogLevel::Info,
        };

        if !errors.is_empty() {
            return Err(InboxError::Config(errors.join("; ")));
        }

        Ok(Config {
            firebase_project_id: firebase_project_id.expect("checked above"),
            google_application_credentials,
            firestore_emulator_host,
            accumulate_api_url,
            accumulate_network,
            poll_interval_sec,
            user_concurrency,
            max_retries,
            delegation_depth,
            pending_page_size,
            users_collection,
            dry_run,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for key in [
            "FIREBASE_PROJECT_ID",
            "GOOGLE_APPLICATION_CREDENTIALS",
            "FIRESTORE_EMULATOR_HOST",
            "ACCUMULATE_API_URL",
            "ACCUMULATE_NETWORK",
            "POLL_INTERVAL_SEC",
            "USER_CONCURRENCY",
            "MAX_RETRIES",
            "DELEGATION_DEPTH",
            "PENDING_PAGE_SIZE",
            "USERS_COLLECTION",
            "DRY_RUN",
            "LOG_LEVEL",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn missing_required_project_id_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let result = Config::from_env();
        assert!(result.is_err());
    }

    #[test]
    fn defaults_apply_when_optional_keys_are_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("FIREBASE_PROJECT_ID", "my-project");
        let config = Config::from_env().unwrap();
        assert_eq!(config.poll_interval_sec, 600);
        assert_eq!(config.user_concurrency, 8);
        assert_eq!(config.accumulate_network, Network::Mainnet);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.dry_run);
        clear_all();
    }

    #[test]
    fn multiple_invalid_values_are_collected_together() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("FIREBASE_PROJECT_ID", "my-project");
        env::set_var("POLL_INTERVAL_SEC", "not-a-number");
        env::set_var("ACCUMULATE_NETWORK", "moonnet");
        let err = Config::from_env().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("POLL_INTERVAL_SEC"));
        assert!(message.contains("ACCUMULATE_NETWORK"));
        clear_all();
    }
}
