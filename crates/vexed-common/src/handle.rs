//! Arena handles.
//!
//! The runtime stores scopes, instances and pending promises in flat vectors
//! and hands out these indices. Typed-tree nodes embed them, so a single
//! scope or instance can be shared by every node that closes over it without
//! reference counting or interior mutability.

use std::fmt;

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_handle!(
    /// A runtime binding environment.
    ScopeId,
    "scope#"
);
define_handle!(
    /// A runtime instance object.
    InstanceId,
    "instance#"
);
define_handle!(
    /// A pending or settled asynchronous host computation.
    PromiseId,
    "promise#"
);
define_handle!(
    /// A host callback registered with the runtime's native table.
    HookId,
    "hook#"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_display_with_prefix() {
        assert_eq!(ScopeId(3).to_string(), "scope#3");
        assert_eq!(InstanceId(0).to_string(), "instance#0");
        assert_eq!(PromiseId(12).index(), 12);
    }
}
