//! Redis backend for operations and the item registry.
//!
//! Key layout (all keys carry the configured prefix):
//!
//! ```text
//! {prefix}op:{len(client_id)}:{client_id}:{booking}   HASH  id, client_id, booking, containers, orders
//! {prefix}client:{client_id}                         SET   bookings of that client (partition index)
//! {prefix}item:{id}                                  HASH  id, type
//! ```
//!
//! The client id length keeps operation keys distinct when ids contain `:`.
//! The operation hash and the client index are written in one `MULTI`
//! pipeline so an indexed lookup never sees a booking without its hash.
//! Items are written with a script that refuses an existing key.
//! Each call makes a single attempt; retries belong to the resilience layer.

use std::collections::HashMap;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, cmd, pipe};
use crate::item::{Item, ItemType};
use crate::resilience::retry::{retry, RetryConfig};
use super::record::OperationRecord;
use super::traits::{ItemStore, OperationStore, StorageError};

/// Create the item hash only if the key is absent. Replies 1 on insert, 0 otherwise.
const INSERT_ITEM_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1], 'id', ARGV[1], 'type', ARGV[2])
return 1
"#;

pub struct RedisStore {
    connection: ConnectionManager,
    /// Optional key prefix for namespacing (e.g., "ops:" → "ops:op:CLI-1:BKG-1")
    prefix: String,
}

impl RedisStore {
    /// Create a new Redis store without a key prefix.
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        Self::with_prefix(connection_string, None).await
    }

    /// Create a new Redis store with an optional key prefix.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use operation_store::storage::redis::RedisStore;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = RedisStore::with_prefix("redis://localhost", Some("ops:")).await?;
    /// assert_eq!(store.prefix(), "ops:");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_prefix(connection_string: &str, prefix: Option<&str>) -> Result<Self, StorageError> {
        let client = Client::open(connection_string)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        // Startup preset: fail fast on bad config instead of hanging
        let connection = retry("redis_connect", &RetryConfig::startup(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| StorageError::Backend(e.to_string()))?;

        Ok(Self {
            connection,
            prefix: prefix.unwrap_or("").to_string(),
        })
    }

    /// Get the configured prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn operation_key(&self, client_id: &str, booking: &str) -> String {
        operation_key(&self.prefix, client_id, booking)
    }

    fn client_index_key(&self, client_id: &str) -> String {
        format!("{}client:{}", self.prefix, client_id)
    }

    fn item_key(&self, id: &str) -> String {
        format!("{}item:{}", self.prefix, id)
    }

    /// Rebuild a record from an `HGETALL` reply. An empty reply means the key is absent.
    fn parse_operation(key: &str, mut fields: HashMap<String, String>) -> Result<Option<OperationRecord>, StorageError> {
        if fields.is_empty() {
            return Ok(None);
        }

        let mut required = |name: &str| {
            fields.remove(name).ok_or_else(|| StorageError::Decode {
                key: key.to_string(),
                reason: format!("missing field '{}'", name),
            })
        };

        let client_id = required("client_id")?;
        let booking = required("booking")?;

        Ok(Some(OperationRecord {
            id: fields.remove("id").unwrap_or_default(),
            client_id,
            booking,
            containers: fields.remove("containers").unwrap_or_default(),
            orders: fields.remove("orders").unwrap_or_default(),
        }))
    }

    fn parse_item(key: &str, mut fields: HashMap<String, String>) -> Result<Option<Item>, StorageError> {
        if fields.is_empty() {
            return Ok(None);
        }

        let decode_err = |reason: String| StorageError::Decode {
            key: key.to_string(),
            reason,
        };

        let id = fields
            .remove("id")
            .ok_or_else(|| decode_err("missing field 'id'".into()))?;
        let item_type = fields
            .remove("type")
            .ok_or_else(|| decode_err("missing field 'type'".into()))?
            .parse::<ItemType>()
            .map_err(decode_err)?;

        Ok(Some(Item { id, item_type }))
    }
}

fn operation_key(prefix: &str, client_id: &str, booking: &str) -> String {
    format!("{}op:{}:{}:{}", prefix, client_id.len(), client_id, booking)
}

fn backend(e: redis::RedisError) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[async_trait]
impl OperationStore for RedisStore {
    async fn put_operation(&self, record: &OperationRecord) -> Result<(), StorageError> {
        let mut conn = self.connection.clone();
        let key = self.operation_key(&record.client_id, &record.booking);
        let index_key = self.client_index_key(&record.client_id);

        let fields = [
            ("id", record.id.as_str()),
            ("client_id", record.client_id.as_str()),
            ("booking", record.booking.as_str()),
            ("containers", record.containers.as_str()),
            ("orders", record.orders.as_str()),
        ];

        pipe()
            .atomic()
            .hset_multiple(&key, &fields)
            .ignore()
            .sadd(&index_key, &record.booking)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(backend)
    }

    async fn get_operation(&self, client_id: &str, booking: &str) -> Result<Option<OperationRecord>, StorageError> {
        let mut conn = self.connection.clone();
        let key = self.operation_key(client_id, booking);

        let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(backend)?;
        Self::parse_operation(&key, fields)
    }

    async fn query_operations(&self, client_id: &str) -> Result<Vec<OperationRecord>, StorageError> {
        let mut conn = self.connection.clone();
        let index_key = self.client_index_key(client_id);

        let bookings: Vec<String> = conn.smembers(&index_key).await.map_err(backend)?;
        if bookings.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = bookings
            .iter()
            .map(|booking| self.operation_key(client_id, booking))
            .collect();

        let mut pipeline = pipe();
        for key in &keys {
            pipeline.hgetall(key);
        }
        let rows: Vec<HashMap<String, String>> = pipeline
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        let mut records = Vec::with_capacity(rows.len());
        for (key, fields) in keys.iter().zip(rows) {
            // Index entries can outlive a hash removed out-of-band
            if let Some(record) = Self::parse_operation(key, fields)? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| a.booking.cmp(&b.booking));
        Ok(records)
    }
}

#[async_trait]
impl ItemStore for RedisStore {
    async fn get_item(&self, id: &str) -> Result<Option<Item>, StorageError> {
        let mut conn = self.connection.clone();
        let key = self.item_key(id);

        let fields: HashMap<String, String> = conn.hgetall(&key).await.map_err(backend)?;
        Self::parse_item(&key, fields)
    }

    async fn insert_item(&self, item: &Item) -> Result<bool, StorageError> {
        let mut conn = self.connection.clone();
        let key = self.item_key(&item.id);

        let inserted: i64 = cmd("EVAL")
            .arg(INSERT_ITEM_SCRIPT)
            .arg(1)
            .arg(&key)
            .arg(&item.id)
            .arg(item.item_type.as_str())
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(inserted == 1)
    }
}
