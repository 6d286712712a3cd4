//! Redis storage backend.
//!
//! Requires the `redis-backend` feature. Maps the [`StorageBackend`]
//! contract onto GET / SET (with PX, PXAT, NX, XX, KEEPTTL) and a sorted
//! set with zero scores whose members carry the encoded timestamps: the
//! trim+count batch is one `MULTI`/`EXEC` pipeline of ZREMRANGEBYLEX +
//! ZLEXCOUNT, and the release record is a ZADD.

use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use crate::store::WriteOptions;
use crate::traits::StorageBackend;
use crate::{MimirError, Result};

impl From<redis::RedisError> for MimirError {
    fn from(err: redis::RedisError) -> Self {
        MimirError::Storage(err.to_string())
    }
}

/// Redis-backed [`StorageBackend`] over a multiplexed connection.
///
/// The connection is cheap to clone and safe to share across unboundedly
/// many concurrent logical calls.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
}

impl RedisBackend {
    /// Wrap an already-established connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Connect to a redis server, e.g. `redis://localhost:6379`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { conn })
    }

    fn set_command(key: &str, value: &str, options: &WriteOptions) -> Result<redis::Cmd> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = options.ttl {
            cmd.arg("PX").arg(ttl.as_millis() as u64);
        }
        if let Some(at) = options.expire_at {
            let unix_ms = at
                .duration_since(UNIX_EPOCH)
                .map_err(|_| {
                    MimirError::Configuration("expire_at predates the unix epoch".to_owned())
                })?
                .as_millis() as u64;
            cmd.arg("PXAT").arg(unix_ms);
        }
        if options.keep_ttl {
            cmd.arg("KEEPTTL");
        }
        if options.if_absent {
            cmd.arg("NX");
        }
        if options.if_present {
            cmd.arg("XX");
        }
        Ok(cmd)
    }
}

#[async_trait]
impl StorageBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, options: &WriteOptions) -> Result<()> {
        if options.if_absent && options.if_present {
            return Err(MimirError::Configuration(
                "if_absent and if_present are mutually exclusive".to_owned(),
            ));
        }
        let mut conn = self.conn.clone();
        // Nil reply when an NX/XX precondition fails; that is not an error.
        let _: redis::Value = Self::set_command(key, value, options)?
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn trim_and_count(
        &self,
        key: &str,
        cutoff: &str,
        ranges: &[(String, String)],
    ) -> Result<Vec<u64>> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        pipe.cmd("ZREMRANGEBYLEX")
            .arg(key)
            .arg("-")
            .arg(format!("({cutoff}"))
            .ignore();
        for (min, max) in ranges {
            pipe.cmd("ZLEXCOUNT")
                .arg(key)
                .arg(format!("[{min}"))
                .arg(format!("[{max}"));
        }
        let counts: Vec<u64> = pipe.query_async(&mut conn).await?;
        Ok(counts)
    }

    async fn add_member(&self, key: &str, member: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: u64 = redis::cmd("ZADD")
            .arg(key)
            .arg(0)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
