//! Per-request scoped state: mode, run id, ordinals, collected stubs, trace
//! depth (spec component C2).
//!
//! [`current()`] is the entry point primitives use to find "the context for
//! this call" without the caller having to thread one through explicitly.
//! It is task-local-first so that concurrent `tokio` tasks sharing an OS
//! thread never observe each other's ordinals or stubs (spec §5).

pub mod clock;
mod context;
mod env;
mod id;

pub use context::{current, scope, set_thread_context, Context, ContextGuard};
pub use env::EnvConfig;
pub use id::random_id;

pub use sim_fixture::Mode;
