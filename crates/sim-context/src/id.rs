use rand::Rng;

/// Generates a short, opaque, lowercase-hex identifier suitable for
/// `run_id`, `request_id`, and `fixture_id` (spec §3: "Short opaque
/// identifier").
pub fn random_id() -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    hex::encode(bytes)
}
