//! Type-safe identifier wrappers.
//!
//! Every entity has a strongly-typed ID to prevent accidental mixing of
//! identifiers at compile time. Players and rooms use UUID v7
//! (time-ordered) because they are minted on demand by the gateway.
//! Territories and probes use plain integers: territories live in a flat
//! indexed arena whose keys double as wire ids, and probes come from a
//! per-room monotonic counter.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_uuid_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

/// Generates a newtype wrapper around an integer with standard derives.
macro_rules! define_index_id {
    (
        $(#[$meta:meta])*
        $name:ident($backing:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub $backing);

        impl $name {
            /// Wrap a raw index value.
            pub const fn new(raw: $backing) -> Self {
                Self(raw)
            }

            /// Return the raw index value.
            pub const fn into_inner(self) -> $backing {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$backing> for $name {
            fn from(raw: $backing) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for $backing {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_uuid_id! {
    /// Unique identifier for a player (human or autonomous).
    PlayerId
}

define_uuid_id! {
    /// Unique identifier for a game room.
    RoomId
}

define_index_id! {
    /// Stable arena index of a territory in the galaxy map.
    TerritoryId(u32)
}

define_index_id! {
    /// Monotonic per-room identifier for a colonization probe.
    ProbeId(u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let player = PlayerId::new();
        let room = RoomId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(player.into_inner(), Uuid::nil());
        assert_ne!(room.into_inner(), Uuid::nil());
    }

    #[test]
    fn uuid_id_roundtrip_serde() {
        let original = PlayerId::new();
        let json = serde_json::to_string(&original).ok();
        assert!(json.is_some());
        let restored: Result<PlayerId, _> =
            serde_json::from_str(json.as_deref().unwrap_or(""));
        assert!(restored.is_ok());
    }

    #[test]
    fn index_id_roundtrip_serde() {
        let original = TerritoryId::new(42);
        let json = serde_json::to_string(&original).unwrap_or_default();
        assert_eq!(json, "42");
        let restored: TerritoryId = serde_json::from_str(&json).unwrap_or(TerritoryId::new(0));
        assert_eq!(restored, original);
    }

    #[test]
    fn index_ids_order_by_value() {
        assert!(TerritoryId::new(3) < TerritoryId::new(10));
        assert!(ProbeId::new(1) < ProbeId::new(2));
    }

    #[test]
    fn index_ids_work_as_json_map_keys() {
        use std::collections::BTreeMap;

        let mut map: BTreeMap<TerritoryId, u32> = BTreeMap::new();
        map.insert(TerritoryId::new(7), 99);
        let json = serde_json::to_string(&map).unwrap_or_default();
        assert_eq!(json, r#"{"7":99}"#);
        let back: BTreeMap<TerritoryId, u32> =
            serde_json::from_str(&json).unwrap_or_default();
        assert_eq!(back.get(&TerritoryId::new(7)), Some(&99));
    }
}
