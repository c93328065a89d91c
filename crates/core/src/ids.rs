use std::fmt;

use serde::Serialize;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index)
            }

            /// Returns the dense index backing this identifier.
            #[must_use]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Identifies an entity class or process taxon declared in a [`Model`](crate::Model).
    ClassId,
    "class"
);

id_type!(
    /// Identifies a variable declared on a class.
    VariableId,
    "variable"
);

id_type!(
    /// Identifies a reference attribute from instances of one class to
    /// instances of another.
    LinkId,
    "link"
);

id_type!(
    /// Identifies a process by its declaration order.
    ProcessId,
    "process"
);

id_type!(
    /// Identifies a runtime instance held by a [`World`](crate::World).
    InstanceId,
    "instance"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_index() {
        assert_eq!(InstanceId::new(7).to_string(), "instance#7");
        assert_eq!(VariableId::new(0).to_string(), "variable#0");
    }

    #[test]
    fn ordering_follows_index() {
        assert!(ProcessId::new(1) < ProcessId::new(2));
        assert_eq!(ClassId::new(3).index(), 3);
    }
}
