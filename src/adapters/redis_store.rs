//! Redis reading store.
//!
//! Implements [`ReadingStore`] over a synchronous Redis connection.  The
//! connection is opened lazily and dropped on any transport error, so the
//! next call reconnects; the control loop's breaker limits how often that
//! happens while Redis is down.
//!
//! Server-side reply errors (e.g. `WRONGTYPE` when a key holds a hash) are
//! not transport failures: the value is reported missing and normalises
//! to 0.

use std::time::Duration;

use log::{debug, info, warn};
use redis::{Client, Connection, RedisError};

use crate::app::ports::{ReadingStore, StoreError};
use crate::config::StoreConfig;

pub struct RedisStore {
    client: Client,
    conn: Option<Connection>,
    timeout: Duration,
}

impl RedisStore {
    /// Validate the endpoint.  No connection is made until the first read.
    pub fn new(config: &StoreConfig, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(config.url()).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            conn: None,
            timeout,
        })
    }

    fn connection(&mut self) -> Result<&mut Connection, StoreError> {
        if self.conn.is_none() {
            let conn = self
                .client
                .get_connection_with_timeout(self.timeout)
                .map_err(map_error)?;
            conn.set_read_timeout(Some(self.timeout)).map_err(map_error)?;
            conn.set_write_timeout(Some(self.timeout)).map_err(map_error)?;
            info!("Redis: connected to {}", self.client.get_connection_info().addr);
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("no connection".into()))
    }
}

impl ReadingStore for RedisStore {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.connection()?;
        match redis::cmd("GET").arg(key).query::<Option<Vec<u8>>>(conn) {
            Ok(raw) => Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if is_transport(&e) => {
                debug!("Redis: dropping connection after {}", e);
                self.conn = None;
                Err(map_error(e))
            }
            Err(e) => {
                warn!("Redis: GET {} rejected ({}), treating as missing", key, e);
                Ok(None)
            }
        }
    }
}

fn is_transport(e: &RedisError) -> bool {
    e.is_timeout() || e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal()
}

fn map_error(e: RedisError) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else {
        StoreError::Unavailable(e.to_string())
    }
}
