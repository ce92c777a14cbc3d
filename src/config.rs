//! Configuration module
//!
//! Loads the [`DynamoStoreConfig`] the durable store needs from environment
//! variables, via the same `from_env` shape used elsewhere for application
//! config.

use std::env;
use std::sync::Arc;

use uuid::Uuid;

/// Options consumed by [`crate::store::dynamo::DynamoEventStore`]:
/// `table_name`, `region`, `credentials_profile`, `log_id_generator`.
#[derive(Clone)]
pub struct DynamoStoreConfig {
    /// DynamoDB table name backing the event store.
    pub table_name: String,

    /// AWS region the table lives in.
    pub region: String,

    /// Named credentials profile to assume. Defaults to `"default"`.
    pub credentials_profile: String,

    /// Generator used by [`crate::factory::AggregateFactory::new`] to mint a
    /// fresh `log_id`. Defaults to UUIDv4, dashed hex.
    pub log_id_generator: Arc<dyn Fn() -> String + Send + Sync>,
}

impl std::fmt::Debug for DynamoStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoStoreConfig")
            .field("table_name", &self.table_name)
            .field("region", &self.region)
            .field("credentials_profile", &self.credentials_profile)
            .finish_non_exhaustive()
    }
}

/// Default `log_id_generator`: a dashed-hex UUIDv4, matching
/// `uuid_log_id_generator` in the source.
pub fn uuid_log_id_generator() -> String {
    Uuid::new_v4().to_string()
}

impl DynamoStoreConfig {
    /// Load configuration from environment variables.
    ///
    /// `EVENT_STORE_TABLE_NAME` and `AWS_REGION` are required;
    /// `AWS_PROFILE` defaults to `"default"`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let table_name = env::var("EVENT_STORE_TABLE_NAME")
            .map_err(|_| ConfigError::MissingEnv("EVENT_STORE_TABLE_NAME"))?;

        let region =
            env::var("AWS_REGION").map_err(|_| ConfigError::MissingEnv("AWS_REGION"))?;

        let credentials_profile =
            env::var("AWS_PROFILE").unwrap_or_else(|_| "default".to_string());

        Ok(Self {
            table_name,
            region,
            credentials_profile,
            log_id_generator: Arc::new(uuid_log_id_generator),
        })
    }

    /// Build directly, e.g. for tests or non-env-driven wiring.
    pub fn new(table_name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            region: region.into(),
            credentials_profile: "default".to_string(),
            log_id_generator: Arc::new(uuid_log_id_generator),
        }
    }

    pub fn with_credentials_profile(mut self, profile: impl Into<String>) -> Self {
        self.credentials_profile = profile.into();
        self
    }

    pub fn with_log_id_generator(
        mut self,
        generator: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.log_id_generator = Arc::new(generator);
        self
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
