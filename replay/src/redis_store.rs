use crate::store::ReplayMarkerStore;
use async_trait::async_trait;
use eventbridge_common::{Error, ReplayId, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed replay marker store, keyed `<key_prefix>:<source>:<channel>`.
///
/// `ignore_network_errors` is fixed at construction time (§4.1): when set,
/// transport failures degrade `get` to `Ok(None)` and `set` to a logged
/// no-op instead of propagating `ReplayStorageError`.
pub struct RedisReplayStore {
    conn: ConnectionManager,
    key_prefix: Option<String>,
    ignore_network_errors: bool,
}

impl RedisReplayStore {
    pub async fn connect(
        address: &str,
        key_prefix: Option<String>,
        ignore_network_errors: bool,
    ) -> Result<Self> {
        let client = redis::Client::open(address)
            .map_err(|err| Error::Config(format!("invalid redis address {address:?}: {err}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|err| Error::ReplayStorage(err.to_string()))?;

        Ok(Self {
            conn,
            key_prefix,
            ignore_network_errors,
        })
    }

    fn key(&self, source: &str, channel: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}:{source}:{channel}"),
            None => format!("{source}:{channel}"),
        }
    }
}

#[async_trait]
impl ReplayMarkerStore for RedisReplayStore {
    async fn get(&self, source: &str, channel: &str) -> Result<Option<ReplayId>> {
        let key = self.key(source, channel);
        let mut conn = self.conn.clone();

        match conn.get::<_, Option<ReplayId>>(&key).await {
            Ok(value) => Ok(value),
            Err(err) if self.ignore_network_errors => {
                tracing::warn!(%key, error = %err, "replay storage read failed, ignoring");
                Ok(None)
            }
            Err(err) => Err(Error::ReplayStorage(err.to_string())),
        }
    }

    async fn set(&self, source: &str, channel: &str, replay_id: ReplayId) -> Result<()> {
        let key = self.key(source, channel);
        let mut conn = self.conn.clone();

        // Lua script keeps the compare-and-set atomic so concurrent forwarding
        // tasks committing markers out of channel order never regress a
        // channel's cursor (P3).
        let script = redis::Script::new(
            r#"
            local current = redis.call("GET", KEYS[1])
            if current == false or tonumber(current) < tonumber(ARGV[1]) then
                redis.call("SET", KEYS[1], ARGV[1])
            end
            return redis.status_reply("OK")
            "#,
        );

        let result: redis::RedisResult<()> =
            script.key(&key).arg(replay_id).invoke_async(&mut conn).await;

        match result {
            Ok(()) => Ok(()),
            Err(err) if self.ignore_network_errors => {
                tracing::warn!(%key, error = %err, "replay storage write failed, dropping");
                Ok(())
            }
            Err(err) => Err(Error::ReplayStorage(err.to_string())),
        }
    }
}
