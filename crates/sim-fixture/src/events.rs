use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Where a stub or fixture's output came from — recorded fresh, or replayed
/// back from a prior recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Record,
    Replay,
}

/// A fixture event emitted by the trace primitive (spec §3 "Fixture
/// event"). Immutable once constructed and handed to a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureEvent {
    pub fixture_id: String,
    pub qualname: String,
    pub run_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: time::OffsetDateTime,
    pub input: Json,
    pub input_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Json>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output_fingerprint: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stubs: Vec<StubDescriptor>,
    pub ordinal: u64,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A structural variant of an inner stub descriptor collected by the
/// capture or db primitives while a trace is executing (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StubDescriptor {
    Capture {
        label: String,
        ordinal: u64,
        output: Json,
        source: Source,
    },
    Db {
        name: String,
        ordinal: u64,
        output: Json,
        source: Source,
    },
    /// A nested trace call attributed to its enclosing trace, pushed per
    /// spec §4.5 step 6 ("push a stub descriptor summarizing this trace").
    Trace {
        qualname: String,
        ordinal: u64,
        output: Json,
        source: Source,
    },
}

impl StubDescriptor {
    pub fn ordinal(&self) -> u64 {
        match self {
            StubDescriptor::Capture { ordinal, .. }
            | StubDescriptor::Db { ordinal, .. }
            | StubDescriptor::Trace { ordinal, .. } => *ordinal,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            StubDescriptor::Capture { source, .. }
            | StubDescriptor::Db { source, .. }
            | StubDescriptor::Trace { source, .. } => *source,
        }
    }
}

/// A single persisted DB fixture (spec §4.7 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbFixture {
    pub sql: String,
    pub params: Json,
    pub rows: Json,
    pub sql_fingerprint: String,
    pub params_fingerprint: String,
    pub ordinal: u64,
}

/// A single persisted capture fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureFixture {
    pub label: String,
    pub ordinal: u64,
    pub result: Json,
    pub recorded_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixture_event_round_trips_through_json() {
        let event = FixtureEvent {
            fixture_id: "fx1".into(),
            qualname: "add".into(),
            run_id: "run1".into(),
            recorded_at: time::OffsetDateTime::UNIX_EPOCH,
            input: serde_json::json!({"a": 2, "b": 3}),
            input_fingerprint: "deadbeef".into(),
            output: Some(serde_json::json!(5)),
            output_fingerprint: "cafebabe".into(),
            stubs: vec![],
            ordinal: 0,
            duration_ms: 1.5,
            error: None,
        };
        let text = serde_json::to_string_pretty(&event).unwrap();
        let back: FixtureEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back.qualname, event.qualname);
        assert_eq!(back.output, event.output);
    }

    #[test]
    fn absent_output_and_empty_stubs_round_trip() {
        let event = FixtureEvent {
            fixture_id: "fx2".into(),
            qualname: "boom".into(),
            run_id: "run1".into(),
            recorded_at: time::OffsetDateTime::UNIX_EPOCH,
            input: serde_json::json!({}),
            input_fingerprint: "fp".into(),
            output: None,
            output_fingerprint: String::new(),
            stubs: vec![],
            ordinal: 0,
            duration_ms: 0.2,
            error: Some("boom failed".into()),
        };
        let text = serde_json::to_string(&event).unwrap();
        assert!(!text.contains("\"output\""));
        let back: FixtureEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back.output, None);
        assert_eq!(back.error.as_deref(), Some("boom failed"));
    }
}
