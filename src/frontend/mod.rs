//! Frontend: the handle application code talks to.

pub mod router;

pub use router::{Database, Route, Router};
