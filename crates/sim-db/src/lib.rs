//! The DB primitive (spec component C7): a transparent proxy over any
//! connection-like type that exposes `query`/`execute`. Rust has no dynamic
//! attribute interception, so "transparent" is expressed as [`std::ops::Deref`]
//! to the wrapped connection — every method except `query`/`execute` resolves
//! straight through to the original type via inherent-method-before-trait
//! Deref coercion, and the original value is never mutated.

use sim_canon::sql;
use sim_canon::Value;
use sim_context::Context;
use sim_fixture::{paths, read_fixture, DbFixture, Mode, ReadFixtureError, Sink, SinkEvent, Source, StubDescriptor, StubMissError, WriteBlockedError};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum DbError<E: std::error::Error + 'static> {
    #[error(transparent)]
    StubMiss(#[from] StubMissError),
    #[error(transparent)]
    WriteBlocked(#[from] WriteBlockedError),
    #[error(transparent)]
    Inner(E),
}

/// The interception seam a connection type must implement to be wrapped by
/// [`DbProxy`]. `params` is whatever positional list or named map the
/// caller's driver accepts, already folded into a [`Value`].
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn query(&self, sql: &str, params: &Value) -> Result<serde_json::Value, Self::Error>;
    async fn execute(&self, sql: &str, params: &Value) -> Result<serde_json::Value, Self::Error>;
}

/// Wraps a [`Connection`], intercepting `query`/`execute` while leaving
/// everything else about the underlying connection reachable through
/// [`Deref`](std::ops::Deref). Valid only for the scope in which it was
/// acquired; the wrapped value is returned unmodified by [`DbProxy::into_inner`].
pub struct DbProxy<C: Connection> {
    inner: C,
    name: String,
}

impl<C: Connection> std::ops::Deref for DbProxy<C> {
    type Target = C;
    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: Connection> DbProxy<C> {
    /// `name` identifies this connection in the fixture key
    /// (`__db__/{name}_{sql_fp8}_{params_fp8}_{ordinal}.json`) and in
    /// `WriteBlocked` error messages.
    pub fn new(name: impl Into<String>, inner: C) -> DbProxy<C> {
        DbProxy { inner, name: name.into() }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// In `off` mode, returns the wrapped connection directly: zero
    /// interception overhead, per spec §4.7 "Off".
    pub fn unwrap_if_off(self) -> Result<C, DbProxy<C>> {
        if sim_context::current().mode() == Mode::Off {
            Ok(self.inner)
        } else {
            Err(self)
        }
    }

    pub async fn query(&self, sql: &str, params: &Value) -> Result<serde_json::Value, DbError<C::Error>> {
        self.call(sql, params, false).await
    }

    pub async fn execute(&self, sql: &str, params: &Value) -> Result<serde_json::Value, DbError<C::Error>> {
        self.call(sql, params, true).await
    }

    async fn call(&self, statement: &str, params: &Value, is_execute: bool) -> Result<serde_json::Value, DbError<C::Error>> {
        let ctx = sim_context::current();
        match ctx.mode() {
            Mode::Off => {
                if is_execute {
                    self.inner.execute(statement, params).await.map_err(DbError::Inner)
                } else {
                    self.inner.query(statement, params).await.map_err(DbError::Inner)
                }
            }
            Mode::Record => self.record(&ctx, statement, params, is_execute).await,
            Mode::Replay => self.replay(&ctx, statement, params),
        }
    }

    async fn record(
        &self,
        ctx: &Context,
        statement: &str,
        params: &Value,
        is_execute: bool,
    ) -> Result<serde_json::Value, DbError<C::Error>> {
        let sql_fp = sql::sql_fingerprint(statement);
        let params_fp = sql::params_fingerprint(params);
        let key = format!(
            "db:{}:{}:{}",
            self.name,
            sim_canon::fingerprint_prefix(&sql_fp, 16),
            sim_canon::fingerprint_prefix(&params_fp, 16)
        );
        let ordinal = ctx.next_ordinal(&key);

        let rows = if is_execute {
            self.inner.execute(statement, params).await.map_err(DbError::Inner)?
        } else {
            self.inner.query(statement, params).await.map_err(DbError::Inner)?
        };

        if let Some(store_root) = ctx.store_root() {
            let fixture = DbFixture {
                sql: statement.to_string(),
                params: canon_to_json(params),
                rows: rows.clone(),
                sql_fingerprint: sql_fp.clone(),
                params_fingerprint: params_fp.clone(),
                ordinal,
            };
            let path = paths::db_path(
                &store_root,
                &self.name,
                sim_canon::fingerprint_prefix(&sql_fp, 8),
                sim_canon::fingerprint_prefix(&params_fp, 8),
                ordinal,
            );
            emit(ctx, path, &fixture);
        }

        ctx.push_stub(StubDescriptor::Db {
            name: self.name.clone(),
            ordinal,
            output: rows.clone(),
            source: Source::Record,
        });

        Ok(rows)
    }

    fn replay(&self, ctx: &Context, statement: &str, params: &Value) -> Result<serde_json::Value, DbError<C::Error>> {
        if sql::is_write(statement) {
            return Err(DbError::WriteBlocked(WriteBlockedError::new(&self.name, statement)));
        }

        let sql_fp = sql::sql_fingerprint(statement);
        let params_fp = sql::params_fingerprint(params);
        let key = format!(
            "db:{}:{}:{}",
            self.name,
            sim_canon::fingerprint_prefix(&sql_fp, 16),
            sim_canon::fingerprint_prefix(&params_fp, 16)
        );
        let ordinal = ctx.next_ordinal(&key);

        let store_root = ctx.store_root().unwrap_or_default();
        let path = paths::db_path(
            &store_root,
            &self.name,
            sim_canon::fingerprint_prefix(&sql_fp, 8),
            sim_canon::fingerprint_prefix(&params_fp, 8),
            ordinal,
        );

        let lookup: Result<DbFixture, ReadFixtureError> = read_fixture(&path, || StubMissError {
            qualname: format!("db:{}", self.name),
            fingerprint: format!("{sql_fp}:{params_fp}"),
            ordinal,
            expected_path: path.clone(),
        });

        let fixture = match lookup {
            Ok(fixture) => fixture,
            Err(ReadFixtureError::Miss(miss)) => return Err(DbError::StubMiss(miss)),
            Err(other) => {
                tracing::error!(error = %other, path = %path.display(), "db fixture read failed");
                return Err(DbError::StubMiss(StubMissError {
                    qualname: format!("db:{}", self.name),
                    fingerprint: format!("{sql_fp}:{params_fp}"),
                    ordinal,
                    expected_path: path,
                }));
            }
        };

        ctx.push_stub(StubDescriptor::Db {
            name: self.name.clone(),
            ordinal,
            output: fixture.rows.clone(),
            source: Source::Replay,
        });

        Ok(fixture.rows)
    }
}

fn canon_to_json(value: &Value) -> serde_json::Value {
    serde_json::from_slice(&sim_canon::canonicalize(value)).unwrap_or(serde_json::Value::Null)
}

fn emit(ctx: &Context, path: std::path::PathBuf, fixture: &DbFixture) {
    let sink: Arc<dyn Sink> = ctx.sink().unwrap_or_else(|| Arc::new(sim_fixture::DirectStore));
    match SinkEvent::new(path, fixture) {
        Ok(event) => sink.emit(event),
        Err(err) => tracing::error!(error = %err, "failed to serialize db fixture"),
    }
}
