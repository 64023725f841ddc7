//! The asynchronous buffered sink (spec component C4): absorbs fixture
//! events from the request path and commits them to durable storage
//! without adding latency to that path.

mod config;
mod default_sink;
mod local;
mod remote;

pub use config::{DropPolicy, SinkConfig};
pub use default_sink::{default_sink, set_default_sink};
pub use local::BufferedSink;
pub use remote::{LocalDirRemoteStore, RemoteSink, RemoteStore, RemoteStoreError};

pub use sim_fixture::{Sink, SinkEvent};
