#![forbid(unsafe_code)]

//! Opaque id newtypes used across the runtime.
//!
//! Ids are plain `u64`s behind newtypes. The graph allocates [`CellId`] and
//! [`ComputationId`]; [`ComponentId`] is allocated by the component registry
//! and treated by the graph as an opaque subscriber identity.

use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_newtype!(
    /// Identity of one state cell.
    CellId,
    "cell#"
);

id_newtype!(
    /// Identity of one derived computation.
    ComputationId,
    "comp#"
);

id_newtype!(
    /// Identity of one component. Allocated by the component registry, not
    /// the graph.
    ComponentId,
    "cmp#"
);

/// Anything that can read reactive sources and be marked dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubscriberId {
    Computation(ComputationId),
    Component(ComponentId),
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberId::Computation(id) => write!(f, "{id}"),
            SubscriberId::Component(id) => write!(f, "{id}"),
        }
    }
}

/// Anything a subscriber can read: a cell or another computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceId {
    Cell(CellId),
    Computation(ComputationId),
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceId::Cell(id) => write!(f, "{id}"),
            SourceId::Computation(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes() {
        assert_eq!(CellId::new(3).to_string(), "cell#3");
        assert_eq!(ComputationId::new(1).to_string(), "comp#1");
        assert_eq!(ComponentId::new(9).to_string(), "cmp#9");
    }

    #[test]
    fn ids_are_ordered_by_raw_value() {
        assert!(CellId::new(1) < CellId::new(2));
        assert_eq!(ComponentId::new(7).raw(), 7);
    }
}
