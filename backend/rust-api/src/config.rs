use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Mongo,
    Local,
}

impl FromStr for StorageBackend {
    type Err = config::ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "local" | "file" => Ok(StorageBackend::Local),
            other => Err(config::ConfigError::Message(format!(
                "Unknown storage backend '{}', expected 'mongo' or 'local'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub storage_backend: StorageBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    /// JSON file mirroring the local store. `None` keeps it in memory only.
    pub local_store_path: Option<String>,
    pub question_bank_path: String,
    pub jwt_secret: String,
    pub bind_addr: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first, then the crate-local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + ENV overrides (APP__SECTION__KEY)
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        let lookup = |key: &str, var: &str| settings.get_string(key).or_else(|_| env::var(var));

        let storage_backend = lookup("storage.backend", "STORAGE_BACKEND")
            .map(|value| value.parse::<StorageBackend>())
            .unwrap_or(Ok(StorageBackend::Local))?;

        let mongo_uri = lookup("database.mongo_uri", "MONGO_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        let mongo_database = lookup("database.mongo_database", "MONGO_DATABASE")
            .unwrap_or_else(|_| "cyberquiz".to_string());

        let local_store_path = lookup("storage.local_path", "LOCAL_STORE_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty());

        let question_bank_path = lookup("questions.path", "QUESTION_BANK_PATH")
            .unwrap_or_else(|_| "data/questions.json".to_string());

        let jwt_secret = match lookup("auth.jwt_secret", "JWT_SECRET") {
            Ok(secret) => secret,
            Err(_) if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!("Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            }
        };

        let bind_addr =
            lookup("server.bind_addr", "BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        Ok(Config {
            storage_backend,
            mongo_uri,
            mongo_database,
            local_store_path,
            question_bank_path,
            jwt_secret,
            bind_addr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 8] = [
        "APP_ENV",
        "STORAGE_BACKEND",
        "MONGO_URI",
        "MONGO_DATABASE",
        "LOCAL_STORE_PATH",
        "QUESTION_BANK_PATH",
        "JWT_SECRET",
        "BIND_ADDR",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
        env::set_var("SKIP_ROOT_ENV", "1");
        env::set_var("APP_ENV", "unit-test");
    }

    #[test]
    #[serial]
    fn defaults_to_local_backend() {
        clear_env();
        let config = Config::load().unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Local);
        assert_eq!(config.mongo_database, "cyberquiz");
        assert_eq!(config.question_bank_path, "data/questions.json");
        assert_eq!(config.bind_addr, "0.0.0.0:8081");
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        clear_env();
        env::set_var("STORAGE_BACKEND", "MongoDB");
        env::set_var("MONGO_DATABASE", "quiz_test");
        env::set_var("LOCAL_STORE_PATH", "");
        let config = Config::load().unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Mongo);
        assert_eq!(config.mongo_database, "quiz_test");
        assert!(config.local_store_path.is_none());
        clear_env();
    }

    #[test]
    #[serial]
    fn unknown_backend_is_rejected() {
        clear_env();
        env::set_var("STORAGE_BACKEND", "redis");
        assert!(Config::load().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn prod_requires_jwt_secret() {
        clear_env();
        env::set_var("APP_ENV", "prod");
        assert!(Config::load().is_err());
        clear_env();
    }
}
