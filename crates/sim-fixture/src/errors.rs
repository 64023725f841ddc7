use std::path::PathBuf;

/// Raised by trace/capture/db in replay mode when no fixture exists at the
/// expected key (spec §7). Always fatal for the call that raised it; the
/// SDK never falls back to executing the underlying operation.
#[derive(Debug, thiserror::Error)]
#[error(
    "stub miss: no recorded fixture for '{qualname}' (fingerprint {fingerprint}, ordinal {ordinal}); expected at {}",
    expected_path.display()
)]
pub struct StubMissError {
    pub qualname: String,
    pub fingerprint: String,
    pub ordinal: u64,
    pub expected_path: PathBuf,
}

/// Raised by the db primitive in replay mode when the statement would
/// mutate external state (spec §4.7, §7). The SQL is truncated for
/// readability before being embedded in the message.
#[derive(Debug, thiserror::Error)]
#[error("write blocked on connection '{connection_label}': {sql_excerpt}")]
pub struct WriteBlockedError {
    pub connection_label: String,
    pub sql_excerpt: String,
}

impl WriteBlockedError {
    pub fn new(connection_label: impl Into<String>, sql: &str) -> WriteBlockedError {
        const MAX_LEN: usize = 200;
        let mut excerpt = sql.trim().to_string();
        if excerpt.len() > MAX_LEN {
            excerpt.truncate(MAX_LEN);
            excerpt.push_str("...");
        }
        WriteBlockedError {
            connection_label: connection_label.into(),
            sql_excerpt: excerpt,
        }
    }
}
