//! # callmatch-node
//!
//! Process wiring for one Callmatch engine. [`Node`] owns every shared
//! component; the HTTP and chain-scanner layers drive its gateway and
//! deposit/withdrawal edges, the scheduler drives its engine.

pub mod app;
pub mod cli;

pub use app::Node;
pub use cli::{CliArgs, init_logging};
