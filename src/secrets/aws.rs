//! AWS Secrets Manager store implementation.
//!
//! Compiled only with the `aws` feature. Credentials come from the standard
//! AWS provider chain (environment, profile, instance/task role).
//!
//! ## Secret Format
//!
//! The `SecretString` of the `AWSCURRENT` version must be a flat JSON object;
//! each key becomes one logical secret name:
//!
//! ```json
//! { "username": "app", "password": "...", "host": "db.internal", "port": 5432 }
//! ```
//!
//! Rotation metadata comes from `DescribeSecret` (`LastRotatedDate`,
//! `NextRotationDate`).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::primitives::DateTime as AwsDateTime;
use aws_sdk_secretsmanager::Client;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::client::SecretStoreClient;
use super::error::{Result, SecretsError};
use super::types::{parse_secret_payload, RotationMetadata, SecretSet};

/// Version stage fetched for secret values.
const CURRENT_VERSION_STAGE: &str = "AWSCURRENT";

/// AWS Secrets Manager store with one SDK client per region.
#[derive(Default)]
pub struct AwsSecretStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl std::fmt::Debug for AwsSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretStore").field("clients", &"[per-region SDK clients]").finish()
    }
}

impl AwsSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, region: &str) -> Client {
        if let Some(client) = self.clients.read().await.get(region) {
            return client.clone();
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(region) {
            return client.clone();
        }

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        let client = Client::new(&sdk_config);
        info!(region = %region, "Created AWS Secrets Manager client");
        clients.insert(region.to_string(), client.clone());
        client
    }

    fn to_chrono(value: Option<&AwsDateTime>) -> Option<DateTime<Utc>> {
        value.and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos()))
    }
}

#[async_trait]
impl SecretStoreClient for AwsSecretStore {
    async fn fetch_secret_value(&self, name: &str, region: &str) -> Result<SecretSet> {
        let client = self.client(region).await;
        debug!(secret = %name, region = %region, "Fetching secret value from AWS");

        let output = client
            .get_secret_value()
            .secret_id(name)
            .version_stage(CURRENT_VERSION_STAGE)
            .send()
            .await
            .map_err(|err| {
                let service_error = err.into_service_error();
                if service_error.is_resource_not_found_exception() {
                    SecretsError::not_found(name)
                } else {
                    SecretsError::store_unavailable(format!(
                        "GetSecretValue for {} in {} failed: {}",
                        name,
                        region,
                        DisplayErrorContext(&service_error)
                    ))
                }
            })?;

        match output.secret_string() {
            Some(payload) => parse_secret_payload(name, payload),
            None => {
                warn!(secret = %name, "Secret holds binary data, which is not handled");
                Err(SecretsError::malformed(name, "secret has no string payload"))
            }
        }
    }

    async fn fetch_secret_metadata(&self, name: &str, region: &str) -> Result<RotationMetadata> {
        let client = self.client(region).await;

        let output = client.describe_secret().secret_id(name).send().await.map_err(|err| {
            let service_error = err.into_service_error();
            if service_error.is_resource_not_found_exception() {
                SecretsError::not_found(name)
            } else {
                SecretsError::store_unavailable(format!(
                    "DescribeSecret for {} in {} failed: {}",
                    name,
                    region,
                    DisplayErrorContext(&service_error)
                ))
            }
        })?;

        let metadata = RotationMetadata::new(
            Self::to_chrono(output.last_rotated_date()),
            Self::to_chrono(output.next_rotation_date()),
        );

        if metadata.last_rotated_at.is_none() && metadata.next_rotation_at.is_none() {
            let reason = if output.rotation_enabled().unwrap_or(false) {
                "rotation enabled but no rotation dates reported"
            } else {
                "rotation is not enabled for this secret"
            };
            return Err(SecretsError::metadata_unavailable(name, reason));
        }

        Ok(metadata)
    }

    fn backend_name(&self) -> &'static str {
        "aws"
    }
}
