use std::fmt;

use crate::*;

/// Validation error for malformed room or region definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    VersionMismatch { found: u32, expected: u32 },
    BadName { room: String, forms: usize },
    EmptyId,
    EmptyDescription { room: String },
    BookkeepingTag { room: String, direction: Direction },
    MissingDestination { room: String, direction: Direction },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::VersionMismatch { found, expected } => {
                write!(f, "region yaml version {found} (expected {expected})")
            },
            ValidationError::BadName { room, forms } => {
                write!(f, "room '{room}' name must have exactly 2 forms, found {forms}")
            },
            ValidationError::EmptyId => write!(f, "room with an empty id"),
            ValidationError::EmptyDescription { room } => write!(f, "room '{room}' has no description"),
            ValidationError::BookkeepingTag { room, direction } => {
                write!(f, "room '{room}' link {} uses a reserved bookkeeping tag", direction.name())
            },
            ValidationError::MissingDestination { room, direction } => {
                write!(f, "room '{room}' link {} has no destination", direction.name())
            },
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate the structure of a region definition.
///
/// Cross-region link targets can only be checked once every region is indexed,
/// so that is left to the engine.
///
/// ```
/// use std::collections::BTreeMap;
/// use gale_data::{REGION_YAML_VERSION, RegionDef, RegionIdentifier, RoomDef, validate_region};
///
/// let mut rooms = BTreeMap::new();
/// rooms.insert(
///     "hut".to_string(),
///     RoomDef {
///         name: vec!["a draughty hut".into(), "hut".into()],
///         desc: "Wind whistles through the planks.".into(),
///         ..RoomDef::default()
///     },
/// );
/// let region = RegionDef {
///     identifier: RegionIdentifier { version: REGION_YAML_VERSION, name: "Moor".into() },
///     rooms,
/// };
/// assert!(validate_region(&region).is_empty());
/// ```
pub fn validate_region(region: &RegionDef) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if region.identifier.version != REGION_YAML_VERSION {
        errors.push(ValidationError::VersionMismatch {
            found: region.identifier.version,
            expected: REGION_YAML_VERSION,
        });
    }

    for (id, room) in &region.rooms {
        if id.trim().is_empty() {
            errors.push(ValidationError::EmptyId);
        }
        if room.name.len() != 2 {
            errors.push(ValidationError::BadName {
                room: id.clone(),
                forms: room.name.len(),
            });
        }
        if room.desc.trim().is_empty() {
            errors.push(ValidationError::EmptyDescription { room: id.clone() });
        }
        for (direction, link) in &room.links {
            if link.to.trim().is_empty() {
                errors.push(ValidationError::MissingDestination {
                    room: id.clone(),
                    direction: *direction,
                });
            }
            if link.tags.iter().any(|tag| tag.is_bookkeeping()) {
                errors.push(ValidationError::BookkeepingTag {
                    room: id.clone(),
                    direction: *direction,
                });
            }
        }
    }

    errors
}
