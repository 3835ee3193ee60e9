//! Dense integer identifiers.
//!
//! Node keys in the input are strings (OSM ids or synthetic keys such as
//! `"k23"`).  The walk network interns them to `NodeId`s at load time and
//! keeps the reverse mapping, so paths and caches work on plain `u32`s and
//! only turn back into strings at the persistence and output boundaries.

use std::fmt;

/// Newtype over `u32` with an `INVALID` sentinel and a `Display` prefix.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident, $prefix:literal;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub u32);

        impl $name {
            /// Marks an unset slot, e.g. a predecessor that was never reached.
            pub const INVALID: $name = $name(u32::MAX);

            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

typed_id! {
    /// Position of a walker in the walker store.
    pub struct AgentId, "agent-";
}

typed_id! {
    /// Dense index of a walk-network node.
    pub struct NodeId, "node#";
}

impl AgentId {
    /// External identifier handed to renderers, e.g. `"agent-7"`.
    pub fn label(self) -> String {
        self.to_string()
    }
}
