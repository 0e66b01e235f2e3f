use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the region YAML layout this crate understands.
pub const REGION_YAML_VERSION: u32 = 1;

/// Key of the metadata map inside every region file.
pub const REGION_IDENTIFIER: &str = "REGION_IDENTIFIER";

/// One region file: metadata plus every room keyed by its string id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionDef {
    #[serde(rename = "REGION_IDENTIFIER")]
    pub identifier: RegionIdentifier,
    #[serde(flatten)]
    pub rooms: BTreeMap<String, RoomDef>,
}

/// Region-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionIdentifier {
    pub version: u32,
    pub name: String,
}

/// Static definition of a single room.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoomDef {
    /// Full and short forms of the room's name, in that order.
    pub name: Vec<String>,
    pub desc: String,
    #[serde(default)]
    pub tags: Vec<RoomTag>,
    /// Forces a season regardless of the calendar (caves, enchanted glades).
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub links: BTreeMap<Direction, LinkDef>,
}

/// An exit authored in a room definition.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinkDef {
    /// String id of the destination room.
    pub to: String,
    #[serde(default)]
    pub tags: Vec<LinkTag>,
}

/// The four seasons of the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn as_key(self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Autumn => "AUTUMN",
        }
    }
}

/// The ten directions a link can leave a room in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Direction {
    North = 0,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
        Direction::Up,
        Direction::Down,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_u8(value: u8) -> Option<Direction> {
        Direction::ALL.get(usize::from(value)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::Northeast => "northeast",
            Direction::East => "east",
            Direction::Southeast => "southeast",
            Direction::South => "south",
            Direction::Southwest => "southwest",
            Direction::West => "west",
            Direction::Northwest => "northwest",
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::Northeast => Direction::Southwest,
            Direction::East => Direction::West,
            Direction::Southeast => Direction::Northwest,
            Direction::South => Direction::North,
            Direction::Southwest => Direction::Northeast,
            Direction::West => Direction::East,
            Direction::Northwest => Direction::Southeast,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    /// Parse a player-typed direction, accepting the usual abbreviations.
    pub fn parse(input: &str) -> Option<Direction> {
        let dir = match input.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Direction::North,
            "ne" | "northeast" => Direction::Northeast,
            "e" | "east" => Direction::East,
            "se" | "southeast" => Direction::Southeast,
            "s" | "south" => Direction::South,
            "sw" | "southwest" => Direction::Southwest,
            "w" | "west" => Direction::West,
            "nw" | "northwest" => Direction::Northwest,
            "u" | "up" => Direction::Up,
            "d" | "down" => Direction::Down,
            _ => return None,
        };
        Some(dir)
    }
}

/// Room attributes. `Explored` is the only tag set during play by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoomTag {
    Explored = 0,
    Indoors,
    Underground,
    Windows,
    Trees,
    City,
    SleepOk,
}

impl RoomTag {
    pub const ALL: [RoomTag; 7] = [
        RoomTag::Explored,
        RoomTag::Indoors,
        RoomTag::Underground,
        RoomTag::Windows,
        RoomTag::Trees,
        RoomTag::City,
        RoomTag::SleepOk,
    ];

    pub fn from_u8(value: u8) -> Option<RoomTag> {
        RoomTag::ALL.get(usize::from(value)).copied()
    }
}

/// Link attributes.
///
/// `ChangedLink` and `ChangedTags` are bookkeeping markers: they flag a link for
/// inclusion in a region delta and are never persisted as link tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LinkTag {
    Openable = 0,
    Open,
    Lockable,
    Locked,
    Permalock,
    Door,
    Window,
    Grate,
    Gate,
    SeeThrough,
    Hidden,
    ChangedLink,
    ChangedTags,
}

impl LinkTag {
    pub const ALL: [LinkTag; 13] = [
        LinkTag::Openable,
        LinkTag::Open,
        LinkTag::Lockable,
        LinkTag::Locked,
        LinkTag::Permalock,
        LinkTag::Door,
        LinkTag::Window,
        LinkTag::Grate,
        LinkTag::Gate,
        LinkTag::SeeThrough,
        LinkTag::Hidden,
        LinkTag::ChangedLink,
        LinkTag::ChangedTags,
    ];

    pub fn from_u8(value: u8) -> Option<LinkTag> {
        LinkTag::ALL.get(usize::from(value)).copied()
    }

    /// True for the markers used only to track unsaved changes.
    pub fn is_bookkeeping(self) -> bool {
        matches!(self, LinkTag::ChangedLink | LinkTag::ChangedTags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for dir in Direction::ALL {
            assert_ne!(dir.opposite(), dir);
            assert_eq!(dir.opposite().opposite(), dir);
        }
    }

    #[test]
    fn abbreviations_parse() {
        assert_eq!(Direction::parse("SW"), Some(Direction::Southwest));
        assert_eq!(Direction::parse(" up "), Some(Direction::Up));
        assert_eq!(Direction::parse("widdershins"), None);
    }

    #[test]
    fn saved_discriminants_round_trip() {
        for (i, tag) in LinkTag::ALL.iter().enumerate() {
            assert_eq!(LinkTag::from_u8(u8::try_from(i).unwrap()), Some(*tag));
        }
        assert_eq!(RoomTag::from_u8(200), None);
    }
}
