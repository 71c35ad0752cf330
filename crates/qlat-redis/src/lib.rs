//! Redis LIST adapter for [`ListTransport`].
//!
//! Command mapping:
//! - `move_blocking` -> `BRPOPLPUSH src dst <wait seconds>`
//! - `move_now`      -> `RPOPLPUSH src dst`
//! - `len`           -> `LLEN`
//! - `push`          -> pipelined `RPUSH` / `LPUSH`, one item per command
//! - `delete`        -> `DEL`
//!
//! A nil reply from either move command is the empty signal (`Ok(None)`).
//! Every other failure is reported as [`TransportError`] and is fatal to the
//! caller's run.

use std::time::Duration;

use qlat_transport::{ListTransport, PushSide, TransportError};
use tracing::debug;

pub struct RedisLists {
    conn: redis::Connection,
}

impl RedisLists {
    /// Open a connection. `url` is `redis://[:password@]host:port[/db]`.
    ///
    /// The URL may carry a password; it is never logged.
    pub fn connect(url: &str) -> Result<Self, TransportError> {
        let client =
            redis::Client::open(url).map_err(|e| TransportError::Connect(e.to_string()))?;
        let conn = client
            .get_connection()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!("redis connection established");
        Ok(Self { conn })
    }

    fn command_err(op: &'static str, e: redis::RedisError) -> TransportError {
        TransportError::Command {
            op,
            message: e.to_string(),
        }
    }
}

impl ListTransport for RedisLists {
    fn move_blocking(
        &mut self,
        src: &str,
        dst: &str,
        wait: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        // BRPOPLPUSH with timeout 0 blocks forever.
        if wait.is_zero() {
            return self.move_now(src, dst);
        }
        redis::cmd("BRPOPLPUSH")
            .arg(src)
            .arg(dst)
            .arg(wait.as_secs_f64())
            .query::<Option<Vec<u8>>>(&mut self.conn)
            .map_err(|e| Self::command_err("BRPOPLPUSH", e))
    }

    fn move_now(&mut self, src: &str, dst: &str) -> Result<Option<Vec<u8>>, TransportError> {
        redis::cmd("RPOPLPUSH")
            .arg(src)
            .arg(dst)
            .query::<Option<Vec<u8>>>(&mut self.conn)
            .map_err(|e| Self::command_err("RPOPLPUSH", e))
    }

    fn len(&mut self, list: &str) -> Result<u64, TransportError> {
        redis::cmd("LLEN")
            .arg(list)
            .query::<u64>(&mut self.conn)
            .map_err(|e| Self::command_err("LLEN", e))
    }

    fn push(
        &mut self,
        list: &str,
        items: &[Vec<u8>],
        side: PushSide,
    ) -> Result<(), TransportError> {
        if items.is_empty() {
            return Ok(());
        }
        let op = match side {
            PushSide::Rpush => "RPUSH",
            PushSide::Lpush => "LPUSH",
        };
        let mut pipe = redis::pipe();
        for item in items {
            pipe.cmd(op).arg(list).arg(item.as_slice()).ignore();
        }
        pipe.query::<()>(&mut self.conn)
            .map_err(|e| Self::command_err(op, e))
    }

    fn delete(&mut self, list: &str) -> Result<(), TransportError> {
        redis::cmd("DEL")
            .arg(list)
            .query::<()>(&mut self.conn)
            .map_err(|e| Self::command_err("DEL", e))
    }
}
