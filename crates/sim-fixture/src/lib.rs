//! Value types for fixture events and the on-disk fixture store layout
//! (spec component C3). Pure data: no I/O, no canonicalization logic.

mod errors;
mod events;
mod mode;
pub mod paths;
mod set;
mod sink;

pub use errors::{StubMissError, WriteBlockedError};
pub use events::{CaptureFixture, DbFixture, FixtureEvent, Source, StubDescriptor};
pub use mode::Mode;
pub use set::{FixtureSet, GoldenOutputFile, InputFile, MetadataFile, StubsFile, SCHEMA_VERSION};
pub use sink::{read_fixture, write_atomic, DirectStore, ReadFixtureError, Sink, SinkEvent};

/// A hook for redacting or pseudonymizing values before they are persisted.
/// The core ships only the no-op default; a host application supplies its
/// own policy (spec §1: "PII redaction ... specified only as a hook").
pub trait Redactor: Send + Sync {
    fn redact(&self, value: serde_json::Value) -> serde_json::Value {
        value
    }
}

/// The default, no-op redactor.
pub struct NoopRedactor;

impl Redactor for NoopRedactor {}
