use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// `{store_root}/{service}/{endpoint}/{fixture_id}/input.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFile {
    pub fixture_id: String,
    pub name: String,
    pub args: Json,
    pub fingerprint: String,
}

/// `.../golden_output.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenOutputFile {
    pub fixture_id: String,
    pub output: Json,
    pub fingerprint: String,
}

/// `.../stubs.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StubsFile {
    pub fixture_id: String,
    #[serde(default)]
    pub db_calls: Vec<Json>,
    #[serde(default)]
    pub http_calls: Vec<Json>,
    #[serde(default)]
    pub captures: Vec<Json>,
}

/// `.../metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFile {
    pub fixture_id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: time::OffsetDateTime,
    pub recording_mode: crate::Mode,
    pub run_id: String,
    pub duration_ms: f64,
    pub schema_version: String,
}

pub const SCHEMA_VERSION: &str = "1.0";

/// A fully materialized fixture, as loaded by the fetcher (spec C8) and
/// consumed by the runner (spec C11).
#[derive(Debug, Clone)]
pub struct FixtureSet {
    pub input: InputFile,
    pub golden_output: GoldenOutputFile,
    pub stubs: StubsFile,
    pub metadata: MetadataFile,
}

impl serde::Serialize for crate::Mode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for crate::Mode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(crate::Mode::from_env_str(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_round_trips_mode_as_string() {
        let meta = MetadataFile {
            fixture_id: "fx1".into(),
            name: "add".into(),
            recorded_at: time::OffsetDateTime::UNIX_EPOCH,
            recording_mode: crate::Mode::Record,
            run_id: "run1".into(),
            duration_ms: 3.0,
            schema_version: SCHEMA_VERSION.into(),
        };
        let text = serde_json::to_string(&meta).unwrap();
        assert!(text.contains("\"record\""));
        let back: MetadataFile = serde_json::from_str(&text).unwrap();
        assert_eq!(back.recording_mode, crate::Mode::Record);
    }
}
