//! A thin wrapper satisfying the runner's "requester isolation" requirement:
//! a client constructed here is plain [`reqwest::Client`] with no adapter
//! routing through `sim-trace`, so traffic it sends is never itself
//! intercepted by instrumentation active in the same process.

/// Builds [`reqwest::Client`] instances that are never wrapped by any of
/// this workspace's record/replay primitives. Use this for any outbound
/// call a host application needs to make *as part of* driving a simulation
/// (e.g. a runner hitting the candidate service) rather than a call the
/// simulation is itself recording or replaying.
pub struct UnpatchedClient;

impl UnpatchedClient {
    pub fn build() -> reqwest::Client {
        reqwest::Client::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_returns_a_plain_client() {
        let _client = UnpatchedClient::build();
    }
}
