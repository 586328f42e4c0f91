//! Room descriptors and the available room catalog.

use serde::{Deserialize, Serialize};

/// A room advertised by the transport's room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    /// Unique room name.
    pub name: String,
    /// Human-readable description. `None` if the room has none.
    #[serde(default)]
    pub description: Option<String>,
}

impl RoomDescriptor {
    /// Create a descriptor without a description.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: None }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered list of rooms available to join.
///
/// Replaced wholesale on every fetch. Duplicate names keep their first
/// occurrence so the name stays a unique key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    rooms: Vec<RoomDescriptor>,
}

impl Catalog {
    /// Build a catalog from a transport listing.
    pub fn new(listing: Vec<RoomDescriptor>) -> Self {
        let mut rooms: Vec<RoomDescriptor> = Vec::with_capacity(listing.len());
        for room in listing {
            if rooms.iter().any(|r| r.name == room.name) {
                tracing::warn!(room = %room.name, "duplicate room in catalog, keeping first");
                continue;
            }
            rooms.push(room);
        }
        Self { rooms }
    }

    /// Check whether a room is listed.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Descriptor for a room. `None` if not listed.
    pub fn get(&self, name: &str) -> Option<&RoomDescriptor> {
        self.rooms.iter().find(|r| r.name == name)
    }

    /// Rooms in listing order.
    pub fn rooms(&self) -> &[RoomDescriptor] {
        &self.rooms
    }

    /// Room names in listing order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rooms.iter().map(|r| r.name.as_str())
    }

    /// Number of listed rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Check if no rooms are listed.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_keep_first_entry() {
        let catalog = Catalog::new(vec![
            RoomDescriptor::new("lobby").with_description("main"),
            RoomDescriptor::new("dev"),
            RoomDescriptor::new("lobby").with_description("shadow"),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("lobby").and_then(|r| r.description.as_deref()), Some("main"));
        assert_eq!(catalog.names().collect::<Vec<_>>(), ["lobby", "dev"]);
    }

    #[test]
    fn missing_description_deserializes_as_none() {
        let room: RoomDescriptor = serde_json::from_str(r#"{"name":"dev"}"#).unwrap();
        assert_eq!(room, RoomDescriptor::new("dev"));
    }
}
