//! Vexed runtime: a graph-reduction evaluator over the typed tree.
//!
//! An instance's properties start out as unevaluated tree nodes closed over
//! constructor scopes. The [`Evaluator`] rewrites them sweep after sweep
//! until nothing changes, awaiting host futures in concurrent batches
//! between fixed points, and seals instances as soon as their state is
//! final.
//!
//! # Architecture
//!
//! - [`heap`]: arenas of scopes, instances and promises
//! - [`construct`]: `new` with one constructor scope per ancestor
//! - [`reduce`]: the per-sweep rewrite rules
//! - [`walk`] / [`seal`]: graph discovery and sealing
//! - [`promise`]: concurrent promise batches on tokio
//! - [`native`]: the plugin interface and the built-in plugins
//! - [`eval`]: the driving loop
//! - [`format`]: JSON and text output
//! - [`config`]: `vexed.toml` evaluation settings

pub mod config;
pub mod construct;
pub mod error;
pub mod eval;
pub mod format;
pub mod heap;
pub mod native;
pub mod promise;
pub mod reduce;
pub mod runtime;
pub mod seal;
pub mod value;
pub mod walk;

pub use config::{EvalConfig, PropertyOrder};
pub use error::EvalError;
pub use eval::{Evaluator, ReduceStats, SweepCost};
pub use format::FormatMode;
pub use native::{CallOutcome, HostHook, NativeType, Natives};
pub use runtime::Runtime;
pub use value::{HostValue, NativeValue};
