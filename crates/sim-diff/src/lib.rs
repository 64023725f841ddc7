//! The diff engine (spec component C9): a structural comparison between a
//! golden response and a candidate response, with configurable path
//! ignores, money-path tolerances, and float tolerance.
//!
//! The traversal shape is the same merge/zip walk the documentation crate's
//! [`doc::diff`] uses for catalog validation, extended with value-level
//! tolerance and ignore-pattern policy instead of a bare equality check.

use itertools::{
    EitherOrBoth::{Both, Left, Right},
    Itertools,
};
use serde_json::Value as Json;

#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Bare field names; a path matches if it ends in one of these, at any
    /// depth (spec §4.9 "Pattern matching").
    pub ignore_paths: Vec<String>,
    pub money_paths: Vec<String>,
    pub money_tolerance: f64,
    pub float_tolerance: f64,
}

impl Default for DiffConfig {
    fn default() -> DiffConfig {
        DiffConfig {
            ignore_paths: Vec::new(),
            money_paths: Vec::new(),
            money_tolerance: 0.01,
            float_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceKind {
    StatusCode,
    ValueChanged,
    TypeChanged,
    Added,
    Removed,
    MoneyToleranceExceeded,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Difference {
    pub kind: DifferenceKind,
    pub path: String,
    pub golden_value: Option<Json>,
    pub candidate_value: Option<Json>,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DiffResult {
    pub fixture_id: String,
    pub endpoint: String,
    pub passed: bool,
    pub differences: Vec<Difference>,
    pub ignored_paths: Vec<String>,
}

/// A response shape comparable by the diff engine: status plus body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: i64,
    pub body: Json,
}

/// Compares `golden` against `candidate` for `fixture_id`/`endpoint`,
/// producing a [`DiffResult`] per spec §4.9.
pub fn diff(fixture_id: &str, endpoint: &str, golden: &Response, candidate: &Response, config: &DiffConfig) -> DiffResult {
    let mut differences = Vec::new();
    let mut ignored_paths = Vec::new();

    if golden.status != candidate.status {
        differences.push(Difference {
            kind: DifferenceKind::StatusCode,
            path: "status".to_string(),
            golden_value: Some(Json::from(golden.status)),
            candidate_value: Some(Json::from(candidate.status)),
            message: format!("status code changed from {} to {}", golden.status, candidate.status),
        });
    }

    let mut path = Vec::new();
    diff_inner(&candidate.body, &golden.body, &mut path, config, &mut differences, &mut ignored_paths);

    let passed = differences.is_empty();
    DiffResult {
        fixture_id: fixture_id.to_string(),
        endpoint: endpoint.to_string(),
        passed,
        differences,
        ignored_paths,
    }
}

fn diff_inner(
    actual: &Json,
    expect: &Json,
    path: &mut Vec<String>,
    config: &DiffConfig,
    out: &mut Vec<Difference>,
    ignored: &mut Vec<String>,
) {
    match (actual, expect) {
        (Json::Object(a), Json::Object(e)) => {
            let mut a_sorted: Vec<_> = a.iter().collect();
            a_sorted.sort_by(|x, y| x.0.cmp(y.0));
            let mut e_sorted: Vec<_> = e.iter().collect();
            e_sorted.sort_by(|x, y| x.0.cmp(y.0));

            for eob in a_sorted.into_iter().merge_join_by(e_sorted, |l, r| l.0.cmp(r.0)) {
                match eob {
                    Left((key, a_val)) => {
                        path.push(key.clone());
                        record_or_ignore(a_val, &Json::Null, path, config, out, ignored, DifferenceKind::Added);
                        path.pop();
                    }
                    Right((key, e_val)) => {
                        path.push(key.clone());
                        record_or_ignore(&Json::Null, e_val, path, config, out, ignored, DifferenceKind::Removed);
                        path.pop();
                    }
                    Both((key, a_val), (_, e_val)) => {
                        path.push(key.clone());
                        diff_inner(a_val, e_val, path, config, out, ignored);
                        path.pop();
                    }
                }
            }
        }
        (Json::Array(a), Json::Array(e)) => diff_arrays(a, e, path, config, out, ignored),
        (Json::Number(a), Json::Number(e)) => {
            let af = a.as_f64().unwrap_or(f64::NAN);
            let ef = e.as_f64().unwrap_or(f64::NAN);
            handle_numeric(af, ef, actual, expect, path, config, out, ignored);
        }
        _ if actual == expect => {}
        _ => {
            let kind = if std::mem::discriminant(actual) != std::mem::discriminant(expect) {
                DifferenceKind::TypeChanged
            } else {
                DifferenceKind::ValueChanged
            };
            record_or_ignore(actual, expect, path, config, out, ignored, kind);
        }
    }
}

/// `actual`/`expect` are order-insensitive at this level when every element
/// of one multiset has a canonically-identical counterpart in the other
/// (spec §4.9 "order-insensitive matching when feasible"); otherwise falls
/// back to a positional comparison so real differences are still reported.
fn diff_arrays(
    actual: &[Json],
    expect: &[Json],
    path: &mut Vec<String>,
    config: &DiffConfig,
    out: &mut Vec<Difference>,
    ignored: &mut Vec<String>,
) {
    if actual.len() == expect.len() && same_multiset(actual, expect) {
        return;
    }

    for (index, eob) in actual.iter().zip_longest(expect.iter()).enumerate() {
        path.push(index.to_string());
        match eob {
            Both(a, e) => diff_inner(a, e, path, config, out, ignored),
            Left(a) => record_or_ignore(a, &Json::Null, path, config, out, ignored, DifferenceKind::Added),
            Right(e) => record_or_ignore(&Json::Null, e, path, config, out, ignored, DifferenceKind::Removed),
        }
        path.pop();
    }
}

fn same_multiset(a: &[Json], b: &[Json]) -> bool {
    let mut af: Vec<String> = a.iter().map(|v| sim_canon::fingerprint(&sim_canon::Value::from_json(v.clone()))).collect();
    let mut bf: Vec<String> = b.iter().map(|v| sim_canon::fingerprint(&sim_canon::Value::from_json(v.clone()))).collect();
    af.sort();
    bf.sort();
    af == bf
}

fn handle_numeric(
    actual: f64,
    expect: f64,
    actual_json: &Json,
    expect_json: &Json,
    path: &mut Vec<String>,
    config: &DiffConfig,
    out: &mut Vec<Difference>,
    ignored: &mut Vec<String>,
) {
    if path_matches_any(path, &config.ignore_paths) {
        ignored.push(path.join("."));
        return;
    }

    if path_matches_any(path, &config.money_paths) {
        if (actual - expect).abs() > config.money_tolerance {
            push_money_tolerance_exceeded(actual_json, expect_json, path, config.money_tolerance, out);
        } else {
            ignored.push(path.join("."));
        }
        return;
    }

    if !f64_eq(actual, expect, config.float_tolerance) {
        push_value_change(actual_json, expect_json, path, out);
    }
}

fn f64_eq(actual: f64, expect: f64, tolerance: f64) -> bool {
    (actual - expect).abs() <= tolerance
}

fn record_or_ignore(
    actual: &Json,
    expect: &Json,
    path: &mut Vec<String>,
    config: &DiffConfig,
    out: &mut Vec<Difference>,
    ignored: &mut Vec<String>,
    kind: DifferenceKind,
) {
    if path_matches_any(path, &config.ignore_paths) {
        ignored.push(path.join("."));
        return;
    }

    let pointer = path.join(".");
    let message = match kind {
        DifferenceKind::Added => format!("'{pointer}' present in candidate but missing from golden"),
        DifferenceKind::Removed => format!("'{pointer}' present in golden but missing from candidate"),
        DifferenceKind::TypeChanged => format!("'{pointer}' changed type"),
        DifferenceKind::ValueChanged => format!("'{pointer}' changed value"),
        DifferenceKind::StatusCode => unreachable!("handled by diff()"),
        DifferenceKind::MoneyToleranceExceeded => unreachable!("handled by handle_numeric"),
    };

    out.push(Difference {
        kind,
        path: pointer,
        golden_value: none_if_null(expect),
        candidate_value: none_if_null(actual),
        message,
    });
}

fn push_value_change(actual: &Json, expect: &Json, path: &[String], out: &mut Vec<Difference>) {
    let pointer = path.join(".");
    out.push(Difference {
        kind: DifferenceKind::ValueChanged,
        path: pointer.clone(),
        golden_value: Some(expect.clone()),
        candidate_value: Some(actual.clone()),
        message: format!("'{pointer}' changed value"),
    });
}

fn push_money_tolerance_exceeded(actual: &Json, expect: &Json, path: &[String], tolerance: f64, out: &mut Vec<Difference>) {
    let pointer = path.join(".");
    let delta = (actual.as_f64().unwrap_or(f64::NAN) - expect.as_f64().unwrap_or(f64::NAN)).abs();
    out.push(Difference {
        kind: DifferenceKind::MoneyToleranceExceeded,
        path: pointer.clone(),
        golden_value: Some(expect.clone()),
        candidate_value: Some(actual.clone()),
        message: format!("'{pointer}' changed by {delta:.2} (tolerance: {tolerance})"),
    });
}

fn none_if_null(v: &Json) -> Option<Json> {
    if matches!(v, Json::Null) {
        None
    } else {
        Some(v.clone())
    }
}

/// A pattern matches a path if the path ends in that field, for any depth —
/// no wildcards in v0 (spec §4.9).
fn path_matches_any(path: &[String], patterns: &[String]) -> bool {
    let Some(last) = path.last() else { return false };
    patterns.iter().any(|p| p == last)
}
