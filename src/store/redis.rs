//! Redis backend
//!
//! Uses one multiplexed async connection shared by every clone of the handle.
//! `initialize` connects, authenticates and selects the database from the
//! parsed config, then sends `PING` so a dead server fails engine
//! construction instead of the first cache call.

use crate::config::Options;
use crate::error::{Result, TagCacheError};
use crate::store::{prefixed_key, CacheStore};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Prefix used when the options carry no section
pub const DEFAULT_PREFIX: &str = "tc";

/// Port used when `addr` names only a host
pub const DEFAULT_PORT: u16 = 6379;

/// Default sliding expiry window in seconds
pub const DEFAULT_SLIDING_EXPIRE: u64 = 3600;

/// Adapter payload for the redis backend
///
/// Accepts both snake_case keys and the capitalized `Addr`/`Passwd`/`SelectDB`
/// form.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RedisConfig {
    /// `host:port` of the server
    #[serde(alias = "Addr")]
    pub addr: String,

    /// Password sent with `AUTH`; empty disables authentication
    #[serde(alias = "Passwd")]
    pub passwd: String,

    /// Database index passed to `SELECT`
    #[serde(alias = "SelectDB")]
    pub select_db: i64,

    /// Seconds; a read of a key with less remaining TTL than this pushes its
    /// expiry out by this amount. 0 disables sliding expiry.
    #[serde(alias = "SlidingExpire")]
    pub sliding_expire: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            passwd: String::new(),
            select_db: 0,
            sliding_expire: DEFAULT_SLIDING_EXPIRE,
        }
    }
}

impl RedisConfig {
    /// Connection parameters for the redis driver
    ///
    /// Built field by field rather than as a URL, so the password is passed
    /// to `AUTH` verbatim whatever characters it contains.
    pub fn connection_info(&self) -> Result<ConnectionInfo> {
        let (host, port) = match self.addr.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    TagCacheError::ConfigError(format!("Invalid redis port in '{}'", self.addr))
                })?;
                (host, port)
            }
            None => (self.addr.as_str(), DEFAULT_PORT),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(TagCacheError::ConfigError(format!(
                "Invalid redis address '{}'",
                self.addr
            )));
        }

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db: self.select_db,
                password: (!self.passwd.is_empty()).then(|| self.passwd.clone()),
                ..Default::default()
            },
        })
    }
}

/// Redis-backed [`CacheStore`], registered as the `redis` adapter
#[derive(Default)]
pub struct RedisStore {
    prefix: String,
    config: RedisConfig,
    conn: Option<MultiplexedConnection>,
}

impl RedisStore {
    /// Create an unconnected store; call `initialize` before use
    pub fn new() -> Self {
        Self::default()
    }

    /// Active configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    fn key(&self, key: &str) -> String {
        prefixed_key(&self.prefix, key)
    }

    fn conn(&self) -> Result<MultiplexedConnection> {
        self.conn.clone().ok_or_else(|| {
            TagCacheError::ConnectionError("redis store used before initialize".to_string())
        })
    }
}

/// Whole seconds for `SETEX`/`EXPIRE`; sub-second ttls round up to 1
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn()?;
        let key = self.key(key);

        let mut cmd = if ttl.is_zero() {
            redis::cmd("SET")
        } else {
            redis::cmd("SETEX")
        };
        cmd.arg(&key);
        if !ttl.is_zero() {
            cmd.arg(ttl_secs(ttl));
        }
        cmd.arg(value);

        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn batch_set(&self, items: &HashMap<String, String>, ttl: Duration) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;

        if ttl.is_zero() {
            let mut cmd = redis::cmd("MSET");
            for (key, value) in items {
                cmd.arg(self.key(key)).arg(value);
            }
            let _: () = cmd.query_async(&mut conn).await?;
        } else {
            let mut pipe = redis::pipe();
            for (key, value) in items {
                pipe.cmd("SETEX")
                    .arg(self.key(key))
                    .arg(ttl_secs(ttl))
                    .arg(value)
                    .ignore();
            }
            let _: () = pipe.query_async(&mut conn).await?;
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn()?;
        let key = self.key(key);

        let (value, ttl): (Option<String>, i64) = redis::pipe()
            .cmd("GET")
            .arg(&key)
            .cmd("TTL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;

        let window = self.config.sliding_expire as i64;
        if value.is_some() && window > 0 && ttl > 0 && ttl < window {
            debug!("Extending expiry of {} by {}s", key, window);
            let _: () = redis::cmd("EXPIRE")
                .arg(&key)
                .arg(window + ttl)
                .query_async(&mut conn)
                .await?;
        }

        Ok(value)
    }

    async fn batch_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn()?;

        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(self.key(key));
        }
        let values: Vec<Option<String>> = cmd.query_async(&mut conn).await?;
        Ok(values)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let _: i64 = redis::cmd("DEL")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn()?;
        let value: i64 = redis::cmd("INCR")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn decrement(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn()?;
        let value: i64 = redis::cmd("DECR")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.conn()?;

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(self.key("*"))
            .query_async(&mut conn)
            .await?;

        if !keys.is_empty() {
            let _: i64 = redis::cmd("DEL").arg(&keys).query_async(&mut conn).await?;
        }

        info!("Flushed {} redis keys (prefix: '{}')", keys.len(), self.prefix);
        Ok(())
    }

    async fn touch(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn()?;
        let key = self.key(key);

        // EXPIRE 0 would delete the key; zero means "no expiry" here.
        let _: i64 = if ttl.is_zero() {
            redis::cmd("PERSIST").arg(&key).query_async(&mut conn).await?
        } else {
            redis::cmd("EXPIRE")
                .arg(&key)
                .arg(ttl_secs(ttl))
                .query_async(&mut conn)
                .await?
        };
        Ok(())
    }

    async fn initialize(&mut self, options: &Options) -> Result<()> {
        let config: RedisConfig = options.parse_adapter_config()?;

        self.prefix = if options.section.is_empty() {
            DEFAULT_PREFIX.to_string()
        } else {
            options.section.clone()
        };

        info!(
            "Connecting to redis at {} (db: {}, prefix: '{}')",
            config.addr, config.select_db, self.prefix
        );

        let client = redis::Client::open(config.connection_info()?)
            .map_err(|e| TagCacheError::ConfigError(e.to_string()))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| TagCacheError::ConnectionError(e.to_string()))?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| TagCacheError::ConnectionError(e.to_string()))?;
        debug!("Redis liveness check answered {}", pong);

        info!("Successfully connected to redis");

        self.config = config;
        self.conn = Some(conn);
        Ok(())
    }
}
