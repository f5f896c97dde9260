//! Backend side: the databases we route to.

pub mod context;
pub mod mock;
pub mod pool;
pub mod target;

pub use context::{Context, Interrupted};
pub use target::{IsolationLevel, Target, TransactionOptions};
