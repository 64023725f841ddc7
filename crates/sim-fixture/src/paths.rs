use std::path::{Path, PathBuf};

/// Replaces `.`, `/`, and space with `_`, per spec §4.6 "Key format".
pub fn sanitize(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '.' | '/' | ' ' => '_',
            c => c,
        })
        .collect()
}

/// `{store_root}/{qualname-sanitized}/{fingerprint16}_{ordinal}.json`
pub fn trace_path(store_root: &Path, qualname: &str, fingerprint16: &str, ordinal: u64) -> PathBuf {
    store_root
        .join(sanitize(qualname))
        .join(format!("{fingerprint16}_{ordinal}.json"))
}

/// `{store_root}/__capture__/{label-sanitized}_{ordinal}.json`
pub fn capture_path(store_root: &Path, label: &str, ordinal: u64) -> PathBuf {
    store_root
        .join("__capture__")
        .join(format!("{}_{ordinal}.json", sanitize(label)))
}

/// `{store_root}/__db__/{name}_{sql_fp8}_{params_fp8}_{ordinal}.json`
pub fn db_path(
    store_root: &Path,
    name: &str,
    sql_fp8: &str,
    params_fp8: &str,
    ordinal: u64,
) -> PathBuf {
    store_root.join("__db__").join(format!(
        "{}_{sql_fp8}_{params_fp8}_{ordinal}.json",
        sanitize(name)
    ))
}

/// `{store_root}/{service}/{endpoint}/{fixture_id}/`
pub fn fixture_set_dir(store_root: &Path, service: &str, endpoint: &str, fixture_id: &str) -> PathBuf {
    store_root
        .join(sanitize(service))
        .join(sanitize(endpoint))
        .join(fixture_id)
}
