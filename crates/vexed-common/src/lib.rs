//! Types shared by the Vexed type checker and runtime.
//!
//! - [`location`]: byte spans and file-qualified locations for diagnostics
//! - [`handle`]: copyable arena handles the typed tree uses to point at
//!   runtime scopes, instances, promises and host hooks

pub mod handle;
pub mod location;

pub use handle::{HookId, InstanceId, PromiseId, ScopeId};
pub use location::{LineIndex, Location, Span};
