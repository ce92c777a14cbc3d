//! DynamoDB-backed durable event store
//!
//! Partitioned-KV realization of [`super::EventStore`]: `PK = log_id`,
//! `SK = event_id` for event rows, `SK = "#LOG_METADATA"` for the single
//! per-log metadata row holding `last_event`. The metadata row sorts before
//! every event row because `#` precedes digits in ASCII, so a plain
//! ascending `Query` on `PK` naturally yields metadata first.
//!
//! Directly grounded in the source's `DynamodbEventStore`
//! (`dynamodb_event_store.py`, built on `aiodynamo`): same two-item
//! transactional write (event Put + metadata Put/Update with a
//! `last_event` condition), same `ConditionalCheckFailed` ->
//! `ConcurrencyViolation` translation. The HTTP/credentials plumbing
//! (`aiodynamo` + `httpx`) is replaced by `aws-sdk-dynamodb` + `aws-config`,
//! the real AWS SDK stack for a Rust service talking to DynamoDB.

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError;
use aws_sdk_dynamodb::types::{AttributeValue, Put, TransactWriteItem, Update};
use aws_sdk_dynamodb::Client;
use futures::StreamExt;
use tracing::{info, warn};

use crate::config::DynamoStoreConfig;
use crate::error::{DendriteError, DendriteResult};
use crate::event::{Event, EventPayload};

use super::{EventStore, StartingPoint};

const LOG_METADATA_SK: &str = "#LOG_METADATA";

/// Durable event store backed by a single DynamoDB table shared by every
/// aggregate's log (`PK`/`SK` partition the table, not the connection).
pub struct DynamoEventStore<P: EventPayload> {
    client: Client,
    table_name: String,
    _payload: PhantomData<P>,
}

impl<P: EventPayload> DynamoEventStore<P> {
    /// Build a store from a resolved AWS SDK config and table name,
    /// bypassing [`DynamoStoreConfig`] for callers that already hold a
    /// client (e.g. tests against a local endpoint).
    pub fn from_client(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            _payload: PhantomData,
        }
    }

    /// Build a store by loading AWS credentials for `config.credentials_profile`
    /// and region `config.region`, the way the source's `_ensure_client`
    /// lazily built its `aiodynamo` client -- here resolved eagerly, since
    /// `aws-config` has no lazy-init equivalent worth reimplementing.
    pub async fn connect(config: &DynamoStoreConfig) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_dynamodb::config::Region::new(config.region.clone()))
            .profile_name(&config.credentials_profile)
            .load()
            .await;

        Self::from_client(Client::new(&sdk_config), config.table_name.clone())
    }

    fn metadata_key(log_id: &str) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(log_id.to_string())),
            ("SK".to_string(), AttributeValue::S(LOG_METADATA_SK.to_string())),
        ])
    }
}

#[async_trait]
impl<P: EventPayload> EventStore<P> for DynamoEventStore<P> {
    async fn apply(
        &self,
        log_id: &str,
        event: &mut Event<P>,
        expected_last_event_id: Option<&str>,
    ) -> DendriteResult<()> {
        let event_id = event
            .event_id
            .clone()
            .expect("Aggregate::apply must stamp event_id before calling the store");

        if let Some(expected) = expected_last_event_id {
            if event_id.as_str() <= expected {
                return Err(DendriteError::NonMonotonicEventId {
                    log_id: log_id.to_string(),
                    last_event_id: expected.to_string(),
                    new_event_id: event_id,
                });
            }
        }

        // `payload` is `#[serde(flatten)]`ed on `Event<P>`, so this already
        // carries every payload field -- and the payload enum's own
        // `#[serde(tag = "event_type")]` discriminant -- at the top level;
        // no separate `event_type` attribute needs inserting by hand.
        let mut item: HashMap<String, AttributeValue> = serde_dynamo::to_item(&*event)?;
        item.insert("PK".to_string(), AttributeValue::S(log_id.to_string()));
        item.insert("SK".to_string(), AttributeValue::S(event_id.clone()));

        info!(log_id, event_id = %event_id, "applying event to dynamodb");

        let event_put = TransactWriteItem::builder()
            .put(
                Put::builder()
                    .table_name(&self.table_name)
                    .set_item(Some(item))
                    .build()?,
            )
            .build();

        let metadata_write = match expected_last_event_id {
            None => TransactWriteItem::builder()
                .put(
                    Put::builder()
                        .table_name(&self.table_name)
                        .set_item(Some({
                            let mut item = Self::metadata_key(log_id);
                            item.insert(
                                "last_event".to_string(),
                                AttributeValue::S(event_id.clone()),
                            );
                            item
                        }))
                        .condition_expression("attribute_not_exists(PK)")
                        .build()?,
                )
                .build(),
            Some(expected) => TransactWriteItem::builder()
                .update(
                    Update::builder()
                        .table_name(&self.table_name)
                        .set_key(Some(Self::metadata_key(log_id)))
                        .update_expression("SET last_event = :new_event")
                        .condition_expression("last_event = :expected_event")
                        .expression_attribute_values(
                            ":new_event",
                            AttributeValue::S(event_id.clone()),
                        )
                        .expression_attribute_values(
                            ":expected_event",
                            AttributeValue::S(expected.to_string()),
                        )
                        .build()?,
                )
                .build(),
        };

        match self
            .client
            .transact_write_items()
            .transact_items(event_put)
            .transact_items(metadata_write)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                if transact_failed_on_condition(&err) {
                    warn!(log_id, "conditional check failed applying event");
                    Err(DendriteError::concurrency_violation(
                        log_id,
                        expected_last_event_id,
                        "ConditionalCheckFailed",
                        err.to_string(),
                    ))
                } else {
                    Err(aws_sdk_dynamodb::Error::from(err).into())
                }
            }
        }
    }

    async fn get_log(&self, log_id: &str) -> DendriteResult<Vec<Event<P>>> {
        let mut events = Vec::new();
        let mut pages = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk")
            .expression_attribute_values(":pk", AttributeValue::S(log_id.to_string()))
            .into_paginator()
            .items()
            .send();

        while let Some(item) = pages.next().await {
            let item = item.map_err(aws_sdk_dynamodb::Error::from)?;
            if is_metadata_row(&item) {
                continue;
            }
            let event: Event<P> = serde_dynamo::from_item(item)?;
            events.push(event);
        }

        events.sort_by(|a, b| a.event_id.cmp(&b.event_id));
        Ok(events)
    }

    async fn get_log_from(
        &self,
        log_id: &str,
        starting_point: StartingPoint,
    ) -> DendriteResult<Vec<Event<P>>> {
        match starting_point {
            StartingPoint::AfterEvent(after_id) => {
                let mut events = Vec::new();
                let mut pages = self
                    .client
                    .query()
                    .table_name(&self.table_name)
                    .key_condition_expression("PK = :pk AND SK > :after")
                    .expression_attribute_values(":pk", AttributeValue::S(log_id.to_string()))
                    .expression_attribute_values(":after", AttributeValue::S(after_id))
                    .into_paginator()
                    .items()
                    .send();

                while let Some(item) = pages.next().await {
                    let item = item.map_err(aws_sdk_dynamodb::Error::from)?;
                    if is_metadata_row(&item) {
                        continue;
                    }
                    let event: Event<P> = serde_dynamo::from_item(item)?;
                    events.push(event);
                }
                events.sort_by(|a, b| a.event_id.cmp(&b.event_id));
                Ok(events)
            }
            StartingPoint::Timestamp(at) => {
                let all = self.get_log(log_id).await?;
                Ok(all
                    .into_iter()
                    .filter(|e| e.applied_time.map(|t| t >= at).unwrap_or(false))
                    .collect())
            }
        }
    }
}

fn is_metadata_row(item: &HashMap<String, AttributeValue>) -> bool {
    item.get("SK")
        .and_then(|v| v.as_s().ok())
        .map(|sk| sk == LOG_METADATA_SK)
        .unwrap_or(false)
}

fn transact_failed_on_condition(err: &SdkError<TransactWriteItemsError>) -> bool {
    match err.as_service_error() {
        Some(TransactWriteItemsError::TransactionCanceledException(e)) => e
            .cancellation_reasons()
            .iter()
            .any(|r| r.code() == Some("ConditionalCheckFailed")),
        Some(TransactWriteItemsError::ConditionalCheckFailedException(_)) => true,
        _ => false,
    }
}
