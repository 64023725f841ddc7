//! The runner (spec component C11): fetches fixtures for each configured
//! endpoint, replays their recorded inputs against a candidate service,
//! diffs the observed responses against the golden outputs, and emits a
//! [`SimulationReport`].

mod config;

pub use config::{ConfigError, EndpointConfig, SimConfig};

use sim_diff::{diff, DiffConfig, Response as DiffResponse};
use sim_fetch::{FetchError, Fetcher, FixtureSource};
use sim_fixture::FixtureSet;
use sim_report::{FixtureOutcome, SimulationReport};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("endpoint '{0}' not found in configuration")]
    UnknownEndpoint(String),
}

/// Headers an instrumented candidate service is expected to set on its
/// error response when a replayed call could not be satisfied, so the
/// runner can attribute the failure to the right counter instead of a
/// generic error (spec §4.11 counters `stub_misses`/`blocked_writes`).
const STUB_MISS_HEADER: &str = "x-sim-outcome";
const STUB_MISS_VALUE: &str = "stub-miss";
const BLOCKED_WRITE_VALUE: &str = "blocked-write";

/// Runs simulations against `candidate_url`. Owns a plain [`reqwest::Client`]
/// constructed directly by this crate and never passed through `sim-trace` —
/// the "unpatched" requester the spec requires so the runner's own traffic
/// is never itself intercepted by instrumentation active in the same
/// process (spec §4.11 "Requester isolation").
pub struct Runner {
    client: reqwest::Client,
}

impl Default for Runner {
    fn default() -> Runner {
        Runner { client: reqwest::Client::new() }
    }
}

impl Runner {
    pub fn new(client: reqwest::Client) -> Runner {
        Runner { client }
    }

    /// Runs every endpoint in `config` (or only those in `allowlist`, if
    /// given) against `candidate_url`, fetching fixtures through `fetcher`.
    pub async fn run<S: FixtureSource>(
        &self,
        config: &SimConfig,
        candidate_url: &str,
        fetcher: &Fetcher<S>,
        allowlist: Option<&[String]>,
    ) -> Result<SimulationReport, RunError> {
        if let Some(names) = allowlist {
            for name in names {
                if !config.endpoints.iter().any(|e| &e.name == name) {
                    return Err(RunError::UnknownEndpoint(name.clone()));
                }
            }
        }

        let diff_config = config.diff_config();
        let mut outcomes = Vec::new();

        for endpoint in &config.endpoints {
            if let Some(names) = allowlist {
                if !names.iter().any(|n| n == &endpoint.name) {
                    continue;
                }
            }

            let fixtures = fetcher.fetch(&config.service, &endpoint.name, false).await?;
            for fixture in fixtures {
                let outcome = self.run_one(candidate_url, endpoint, &fixture, &diff_config).await;
                outcomes.push(outcome);
            }
        }

        Ok(SimulationReport::from_outcomes(outcomes))
    }

    async fn run_one(
        &self,
        candidate_url: &str,
        endpoint: &EndpointConfig,
        fixture: &FixtureSet,
        diff_config: &DiffConfig,
    ) -> FixtureOutcome {
        let fixture_id = fixture.input.fixture_id.clone();
        let request = match self.build_request(candidate_url, endpoint, &fixture.input.args) {
            Ok(req) => req,
            Err(message) => return FixtureOutcome::Error { fixture_id, endpoint: endpoint.name.clone(), message },
        };

        let response = match self.client.execute(request).await {
            Ok(resp) => resp,
            Err(err) => {
                return FixtureOutcome::Error { fixture_id, endpoint: endpoint.name.clone(), message: err.to_string() }
            }
        };

        let status = response.status().as_u16() as i64;
        let outcome_header = response
            .headers()
            .get(STUB_MISS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                return FixtureOutcome::Error { fixture_id, endpoint: endpoint.name.clone(), message: err.to_string() }
            }
        };

        match outcome_header.as_deref() {
            Some(STUB_MISS_VALUE) => {
                return FixtureOutcome::StubMiss {
                    fixture_id,
                    endpoint: endpoint.name.clone(),
                    message: body.to_string(),
                }
            }
            Some(BLOCKED_WRITE_VALUE) => {
                return FixtureOutcome::BlockedWrite {
                    fixture_id,
                    endpoint: endpoint.name.clone(),
                    message: body.to_string(),
                }
            }
            _ => {}
        }

        let golden = DiffResponse {
            status: golden_status(fixture),
            body: fixture.golden_output.output.clone(),
        };
        let candidate = DiffResponse { status, body };

        FixtureOutcome::Diffed(diff(&fixture.input.fixture_id, &endpoint.name, &golden, &candidate, diff_config))
    }

    /// Per spec §4.11: a fixture's `input.args` is interpreted either as a
    /// request envelope (`method`/`path`/`body`/`headers`) or, if it lacks
    /// that shape, as the request body verbatim with method/path taken from
    /// `endpoint`.
    fn build_request(
        &self,
        candidate_url: &str,
        endpoint: &EndpointConfig,
        args: &serde_json::Value,
    ) -> Result<reqwest::Request, String> {
        let (method, path, body, headers) = match args.as_object() {
            Some(obj) if obj.contains_key("method") && obj.contains_key("path") => {
                let method = obj.get("method").and_then(|v| v.as_str()).unwrap_or(&endpoint.method).to_string();
                let path = obj.get("path").and_then(|v| v.as_str()).unwrap_or(&endpoint.path).to_string();
                let body = obj.get("body").cloned();
                let headers = obj.get("headers").and_then(|v| v.as_object()).cloned();
                (method, path, body, headers)
            }
            _ => (endpoint.method.clone(), endpoint.path.clone(), Some(args.clone()), None),
        };

        let url = format!("{}{}", candidate_url.trim_end_matches('/'), path);
        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| e.to_string())?;
        let mut builder = self.client.request(method, &url);

        if let Some(headers) = headers {
            for (key, value) in headers {
                if let Some(value) = value.as_str() {
                    builder = builder.header(key, value);
                }
            }
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        builder.build().map_err(|e| e.to_string())
    }
}

fn golden_status(fixture: &FixtureSet) -> i64 {
    fixture
        .golden_output
        .output
        .get("status")
        .or_else(|| fixture.golden_output.output.get("status_code"))
        .and_then(|v| v.as_i64())
        .unwrap_or(200)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_fetch::LocalDirSource;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_fixture(root: &std::path::Path, service: &str, endpoint: &str, fixture_id: &str, args: serde_json::Value, output: serde_json::Value) {
        let dir = root.join(service).join(endpoint).join(fixture_id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("input.json"),
            serde_json::to_vec(&sim_fixture::InputFile {
                fixture_id: fixture_id.into(),
                name: endpoint.into(),
                args,
                fingerprint: "fp".into(),
            })
            .unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("golden_output.json"),
            serde_json::to_vec(&sim_fixture::GoldenOutputFile { fixture_id: fixture_id.into(), output, fingerprint: "fp2".into() }).unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("metadata.json"),
            serde_json::to_vec(&sim_fixture::MetadataFile {
                fixture_id: fixture_id.into(),
                name: endpoint.into(),
                recorded_at: time::OffsetDateTime::UNIX_EPOCH,
                recording_mode: sim_fixture::Mode::Record,
                run_id: "run1".into(),
                duration_ms: 1.0,
                schema_version: sim_fixture::SCHEMA_VERSION.into(),
            })
            .unwrap(),
        )
        .unwrap();
    }

    fn test_config() -> SimConfig {
        SimConfig {
            service: "users".into(),
            port: 8080,
            endpoints: vec![EndpointConfig { name: "get_user".into(), method: "GET".into(), path: "/users/1".into() }],
            ignore_paths: vec![],
            money_paths: vec![],
            money_tolerance: 0.01,
            float_tolerance: 1e-9,
        }
    }

    #[tokio::test]
    async fn passing_fixture_reports_a_pass() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1, "name": "ada"})))
            .mount(&server)
            .await;

        let source_root = tempfile::tempdir().unwrap();
        write_fixture(
            source_root.path(),
            "users",
            "get_user",
            "fx1",
            serde_json::json!({"method": "GET", "path": "/users/1"}),
            serde_json::json!({"status": 200, "id": 1, "name": "ada"}),
        );
        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());

        let runner = Runner::default();
        let report = runner.run(&test_config(), &server.uri(), &fetcher, None).await.unwrap();

        assert_eq!(report.counters.total, 1);
        assert_eq!(report.counters.passed, 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn diverging_response_reports_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1, "name": "grace"})))
            .mount(&server)
            .await;

        let source_root = tempfile::tempdir().unwrap();
        write_fixture(
            source_root.path(),
            "users",
            "get_user",
            "fx1",
            serde_json::json!({"method": "GET", "path": "/users/1"}),
            serde_json::json!({"status": 200, "id": 1, "name": "ada"}),
        );
        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());

        let runner = Runner::default();
        let report = runner.run(&test_config(), &server.uri(), &fetcher, None).await.unwrap();

        assert_eq!(report.counters.failed, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn stub_miss_header_is_attributed_to_the_stub_miss_counter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(502).insert_header("x-sim-outcome", "stub-miss").set_body_json(serde_json::json!({"error": "stub miss"})))
            .mount(&server)
            .await;

        let source_root = tempfile::tempdir().unwrap();
        write_fixture(
            source_root.path(),
            "users",
            "get_user",
            "fx1",
            serde_json::json!({"method": "GET", "path": "/users/1"}),
            serde_json::json!({"status": 200, "id": 1}),
        );
        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());

        let runner = Runner::default();
        let report = runner.run(&test_config(), &server.uri(), &fetcher, None).await.unwrap();

        assert_eq!(report.counters.stub_misses, 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn unknown_allowlisted_endpoint_is_an_error() {
        let source_root = tempfile::tempdir().unwrap();
        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());
        let runner = Runner::default();

        let result = runner.run(&test_config(), "http://localhost", &fetcher, Some(&["nope".to_string()])).await;
        assert!(matches!(result, Err(RunError::UnknownEndpoint(_))));
    }
}
