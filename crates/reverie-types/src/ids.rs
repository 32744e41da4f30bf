//! Type-safe identifier wrappers around `i64`.
//!
//! Every entity in a world has a strongly-typed ID to prevent accidental
//! mixing of identifiers at compile time. All IDs are plain integers
//! assigned by `PostgreSQL` BIGSERIAL columns on insert -- there is no
//! app-side generation.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `i64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw database key.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Return the inner `i64` value.
            pub const fn into_inner(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a world.
    WorldId
}

define_id! {
    /// Unique identifier for an area (room) within a world.
    AreaId
}

define_id! {
    /// Unique identifier for a character.
    CharacterId
}

define_id! {
    /// Unique identifier for an item.
    ItemId
}

define_id! {
    /// Unique identifier for a writing style row.
    StyleId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let area = AreaId::new(1);
        let character = CharacterId::new(1);
        // These are different types -- the compiler enforces no mixing.
        assert_eq!(area.into_inner(), character.into_inner());
    }

    #[test]
    fn id_roundtrip_serde() {
        let original = AreaId::new(42);
        let json = serde_json::to_string(&original).ok();
        assert_eq!(json.as_deref(), Some("42"));
        let restored: Result<AreaId, _> = serde_json::from_str(json.as_deref().unwrap_or(""));
        assert_eq!(restored.ok(), Some(original));
    }

    #[test]
    fn id_display_matches_raw() {
        let id = CharacterId::new(7);
        assert_eq!(id.to_string(), "7");
    }
}
