//! Regions: the unit of world streaming and saving.
//!
//! A region is built from its static YAML definition, then any delta saved for
//! the active slot is replayed over it. While resident it is either clean or
//! dirty; a dirty region rewrites its delta when saved or unloaded.
//!
//! Delta layout (native-endian integers, `u32`-prefixed strings):
//!
//! ```text
//! C0 FF EE | REGION_SAVE_VERSION | SAVE_TAG_ROOMS | region id | room count
//!   room id | ROOM_SAVE_VERSION | tag count | tags...
//!   link count:u8 | (dir:u8 | LINK_SAVE_VERSION | dest | marks:u8 | tag count:u8 | tags...)*
//!   entity count | entity records...
//! 13 51
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use gale_data::{Direction, LinkTag, RegionDef, RoomTag};
use log::{debug, info};

use crate::entity::{Entity, EntityIdGen};
use crate::room::{Room, RoomId};
use crate::savefile::{FileReader, FileWriter, SaveError};

pub const REGION_SAVE_VERSION: u32 = 3;
pub const ROOM_SAVE_VERSION: u32 = 2;
pub const LINK_SAVE_VERSION: u32 = 1;
/// Section tag for the room records ("ROOM").
pub const SAVE_TAG_ROOMS: u32 = 0x524F_4F4D;

const MARK_CHANGED_LINK: u8 = 0b01;
const MARK_CHANGED_TAGS: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Clean,
    Dirty,
}

#[derive(Debug, Clone)]
pub struct Region {
    id: u32,
    name: String,
    rooms: BTreeMap<RoomId, Room>,
    state: RegionState,
}

/// Parsed, not yet applied, contents of a delta file.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDelta {
    pub region: u32,
    pub rooms: Vec<RoomDelta>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomDelta {
    pub room: RoomId,
    pub tags: BTreeSet<RoomTag>,
    pub links: Vec<LinkDelta>,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDelta {
    pub direction: Direction,
    pub destination: RoomId,
    pub tags: BTreeSet<LinkTag>,
    pub marks: u8,
}

impl Region {
    /// Build a clean region from its static definition.
    pub fn from_def(id: u32, def: &RegionDef) -> Region {
        let rooms = def
            .rooms
            .iter()
            .map(|(string_id, room_def)| {
                let room = Room::from_def(string_id, room_def, id);
                (room.id(), room)
            })
            .collect();
        Region {
            id,
            name: def.identifier.name.clone(),
            rooms,
            state: RegionState::Clean,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == RegionState::Dirty
    }

    pub fn contains(&self, room: RoomId) -> bool {
        self.rooms.contains_key(&room)
    }

    pub fn room(&self, room: RoomId) -> Option<&Room> {
        self.rooms.get(&room)
    }

    /// Mutable access to a room. Any mutable access marks the region dirty.
    pub fn room_mut(&mut self, room: RoomId) -> Option<&mut Room> {
        let room = self.rooms.get_mut(&room)?;
        if self.state == RegionState::Clean {
            debug!("region {} is now dirty", self.id);
            self.state = RegionState::Dirty;
        }
        Some(room)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> + '_ {
        self.rooms.values()
    }

    pub fn mark_clean(&mut self) {
        self.state = RegionState::Clean;
    }

    /// Serialise every room that differs from its static definition.
    pub fn save_delta(&self) -> FileWriter {
        let mut writer = FileWriter::with_header(REGION_SAVE_VERSION);
        writer.write_u32(SAVE_TAG_ROOMS);
        writer.write_u32(self.id);

        let dirty: Vec<&Room> = self.rooms.values().filter(|room| room.is_dirty()).collect();
        writer.write_count(dirty.len());
        for room in dirty {
            writer.write_u32(room.id().0);
            writer.write_u32(ROOM_SAVE_VERSION);
            writer.write_count(room.tags().len());
            for tag in room.tags() {
                writer.write_u8(*tag as u8);
            }

            let changed: Vec<(Direction, _)> = Direction::ALL
                .into_iter()
                .map(|dir| (dir, room.link(dir)))
                .filter(|(_, link)| link.is_changed())
                .collect();
            #[allow(clippy::cast_possible_truncation)]
            let link_count = changed.len() as u8;
            writer.write_u8(link_count);
            for (direction, link) in changed {
                writer.write_u8(direction as u8);
                writer.write_u32(LINK_SAVE_VERSION);
                writer.write_u32(link.destination().0);
                let mut marks = 0;
                if link.tag(LinkTag::ChangedLink) {
                    marks |= MARK_CHANGED_LINK;
                }
                if link.tag(LinkTag::ChangedTags) {
                    marks |= MARK_CHANGED_TAGS;
                }
                writer.write_u8(marks);
                let tags: Vec<LinkTag> = link.semantic_tags().collect();
                #[allow(clippy::cast_possible_truncation)]
                let tag_count = tags.len() as u8;
                writer.write_u8(tag_count);
                for tag in tags {
                    writer.write_u8(tag as u8);
                }
            }

            writer.write_count(room.entities().len());
            for entity in room.entities() {
                entity.save(&mut writer);
            }
        }
        writer
    }

    /// Write the delta to `path` and mark the region clean.
    ///
    /// # Errors
    /// - on filesystem failure
    pub fn write_delta(&mut self, path: &Path) -> Result<(), SaveError> {
        self.save_delta().finish_to(path)?;
        info!("region {} ('{}') saved to '{}'", self.id, self.name, path.display());
        self.mark_clean();
        Ok(())
    }

    /// Replay a parsed delta. Nothing is changed unless every room in it exists here.
    ///
    /// # Errors
    /// - if the delta is for another region or names a room this region lacks
    pub fn apply_delta(&mut self, delta: RegionDelta) -> Result<(), SaveError> {
        if delta.region != self.id {
            return Err(SaveError::WrongRegion {
                expected: self.id,
                found: delta.region,
            });
        }
        if let Some(missing) = delta.rooms.iter().find(|r| !self.rooms.contains_key(&r.room)) {
            return Err(SaveError::UnknownRoom(missing.room));
        }

        let room_count = delta.rooms.len();
        for room_delta in delta.rooms {
            let Some(room) = self.rooms.get_mut(&room_delta.room) else {
                continue;
            };
            room.restore_tags(room_delta.tags);
            for link in room_delta.links {
                let mut tags = link.tags;
                if link.marks & MARK_CHANGED_LINK != 0 {
                    tags.insert(LinkTag::ChangedLink);
                }
                if link.marks & MARK_CHANGED_TAGS != 0 {
                    tags.insert(LinkTag::ChangedTags);
                }
                room.link_mut(link.direction).restore(link.destination, tags);
            }
            for entity in room_delta.entities {
                room.add_entity(entity).map_err(|_| SaveError::UnknownRoom(room_delta.room))?;
            }
        }
        debug!("applied delta with {room_count} rooms to region {}", self.id);
        Ok(())
    }
}

impl RegionDelta {
    /// Parse a complete delta file.
    ///
    /// # Errors
    /// - on bad magic, any version mismatch, unknown discriminants or truncation
    pub fn parse(bytes: &[u8], ids: &mut EntityIdGen) -> Result<RegionDelta, SaveError> {
        let mut reader = FileReader::open(bytes, "region", REGION_SAVE_VERSION)?;
        reader.expect_section(SAVE_TAG_ROOMS)?;
        let region = reader.read_u32()?;
        let room_count = reader.read_u32()?;
        let mut rooms = Vec::new();
        for _ in 0..room_count {
            rooms.push(parse_room(&mut reader, ids)?);
        }
        reader.finish()?;
        Ok(RegionDelta { region, rooms })
    }

    /// Total entities in the delta, counting nested inventories.
    pub fn entity_count(&self) -> usize {
        self.rooms
            .iter()
            .flat_map(|room| room.entities.iter())
            .map(Entity::count_recursive)
            .sum()
    }
}

fn parse_room(reader: &mut FileReader<'_>, ids: &mut EntityIdGen) -> Result<RoomDelta, SaveError> {
    let room = RoomId(reader.read_u32()?);
    reader.expect_version("room", ROOM_SAVE_VERSION)?;

    let tag_count = reader.read_u32()?;
    let mut tags = BTreeSet::new();
    for _ in 0..tag_count {
        let raw = reader.read_u8()?;
        tags.insert(RoomTag::from_u8(raw).ok_or(SaveError::UnknownDiscriminant {
            kind: "room tag",
            value: u32::from(raw),
        })?);
    }

    let link_count = reader.read_u8()?;
    let mut links = Vec::with_capacity(usize::from(link_count));
    for _ in 0..link_count {
        links.push(parse_link(reader)?);
    }

    let entity_count = reader.read_u32()?;
    let mut entities = Vec::new();
    for _ in 0..entity_count {
        entities.push(Entity::load(reader, ids)?);
    }

    Ok(RoomDelta {
        room,
        tags,
        links,
        entities,
    })
}

fn parse_link(reader: &mut FileReader<'_>) -> Result<LinkDelta, SaveError> {
    let raw_dir = reader.read_u8()?;
    let direction = Direction::from_u8(raw_dir).ok_or(SaveError::UnknownDiscriminant {
        kind: "direction",
        value: u32::from(raw_dir),
    })?;
    reader.expect_version("link", LINK_SAVE_VERSION)?;
    let destination = RoomId(reader.read_u32()?);
    let marks = reader.read_u8()?;
    let tag_count = reader.read_u8()?;
    let mut tags = BTreeSet::new();
    for _ in 0..tag_count {
        let raw = reader.read_u8()?;
        let tag = LinkTag::from_u8(raw)
            .filter(|tag| !tag.is_bookkeeping())
            .ok_or(SaveError::UnknownDiscriminant {
                kind: "link tag",
                value: u32::from(raw),
            })?;
        tags.insert(tag);
    }
    Ok(LinkDelta {
        direction,
        destination,
        tags,
        marks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityKind, ItemData, MobileData};
    use gale_data::{LinkDef, REGION_YAML_VERSION, RegionIdentifier, RoomDef};

    fn hamlet() -> RegionDef {
        let mut rooms = BTreeMap::new();
        let mut links = BTreeMap::new();
        links.insert(
            Direction::East,
            LinkDef {
                to: "smithy".into(),
                tags: vec![LinkTag::Door, LinkTag::Openable],
            },
        );
        rooms.insert(
            "green".to_string(),
            RoomDef {
                name: vec!["the village green".into(), "green".into()],
                desc: "Grass, geese, a well.".into(),
                tags: vec![RoomTag::Trees],
                season: None,
                links,
            },
        );
        rooms.insert(
            "smithy".to_string(),
            RoomDef {
                name: vec!["a smithy".into(), "smithy".into()],
                desc: "The forge is cold.".into(),
                tags: vec![RoomTag::Indoors],
                ..RoomDef::default()
            },
        );
        RegionDef {
            identifier: RegionIdentifier {
                version: REGION_YAML_VERSION,
                name: "Hamlet".into(),
            },
            rooms,
        }
    }

    fn item(ids: &mut EntityIdGen, name: &str) -> Entity {
        Entity::new(
            ids.next_id(),
            name,
            EntityKind::Item(ItemData {
                stack: 1,
                value: 2,
                weight: 3,
            }),
        )
    }

    #[test]
    fn clean_region_writes_no_rooms() {
        let region = Region::from_def(4, &hamlet());
        let bytes = region.save_delta().finish();
        let delta = RegionDelta::parse(&bytes, &mut EntityIdGen::default()).unwrap();
        assert_eq!(delta.region, 4);
        assert!(delta.rooms.is_empty());
    }

    #[test]
    fn delta_round_trip_restores_rooms_links_and_entities() {
        let mut ids = EntityIdGen::default();
        let green = RoomId::from_key("green");
        let smithy = RoomId::from_key("smithy");

        let mut region = Region::from_def(4, &hamlet());
        assert_eq!(region.state(), RegionState::Clean);
        {
            let room = region.room_mut(green).unwrap();
            room.set_tag(RoomTag::Explored);
            room.link_mut(Direction::East).set_tag(LinkTag::Open);
            let mut goose = Entity::new(
                ids.next_id(),
                "goose",
                EntityKind::Mobile(MobileData {
                    hp: 3,
                    hp_max: 3,
                    spawn_room: green,
                }),
            );
            goose.add_to_inventory(item(&mut ids, "feather")).unwrap();
            room.add_entity(goose).unwrap();
        }
        region.room_mut(smithy).unwrap().add_entity(item(&mut ids, "horseshoe")).unwrap();
        assert!(region.is_dirty());

        let bytes = region.save_delta().finish();
        let delta = RegionDelta::parse(&bytes, &mut ids).unwrap();
        assert_eq!(delta.rooms.len(), 2);
        assert_eq!(delta.entity_count(), 3);

        let mut restored = Region::from_def(4, &hamlet());
        restored.apply_delta(delta).unwrap();

        let before = region.room(green).unwrap();
        let after = restored.room(green).unwrap();
        assert_eq!(after.tags(), before.tags());
        assert_eq!(after.link(Direction::East), before.link(Direction::East));
        assert_eq!(after.entities()[0].name, "goose");
        assert_eq!(after.entities()[0].kind, before.entities()[0].kind);
        assert_eq!(after.entities()[0].inventory[0].name, "feather");
        assert_eq!(restored.room(smithy).unwrap().entities()[0].name, "horseshoe");

        // a second save of the restored region is byte-identical
        assert_eq!(restored.save_delta().finish(), bytes);
    }

    #[test]
    fn version_mismatch_leaves_region_untouched() {
        let mut ids = EntityIdGen::default();
        let green = RoomId::from_key("green");
        let mut region = Region::from_def(4, &hamlet());
        region.room_mut(green).unwrap().add_entity(item(&mut ids, "bucket")).unwrap();
        let mut bytes = region.save_delta().finish();
        bytes[3..7].copy_from_slice(&(REGION_SAVE_VERSION + 1).to_ne_bytes());

        let err = RegionDelta::parse(&bytes, &mut ids).unwrap_err();
        assert!(matches!(err, SaveError::VersionMismatch { kind: "region", .. }));
        let fresh = Region::from_def(4, &hamlet());
        assert!(fresh.room(green).unwrap().entities().is_empty());
    }

    #[test]
    fn unknown_rooms_reject_the_whole_delta() {
        let mut ids = EntityIdGen::default();
        let green = RoomId::from_key("green");
        let delta = RegionDelta {
            region: 4,
            rooms: vec![
                RoomDelta {
                    room: green,
                    tags: BTreeSet::from([RoomTag::Explored]),
                    links: Vec::new(),
                    entities: vec![item(&mut ids, "rake")],
                },
                RoomDelta {
                    room: RoomId::from_key("nowhere"),
                    tags: BTreeSet::new(),
                    links: Vec::new(),
                    entities: Vec::new(),
                },
            ],
        };
        let mut region = Region::from_def(4, &hamlet());
        assert!(matches!(region.apply_delta(delta), Err(SaveError::UnknownRoom(_))));
        let room = region.room(green).unwrap();
        assert!(room.entities().is_empty());
        assert!(!room.tag(RoomTag::Explored));
    }

    #[test]
    fn truncated_delta_is_out_of_bounds() {
        let mut ids = EntityIdGen::default();
        let mut region = Region::from_def(4, &hamlet());
        region
            .room_mut(RoomId::from_key("green"))
            .unwrap()
            .add_entity(item(&mut ids, "pail"))
            .unwrap();
        let bytes = region.save_delta().finish();
        let cut = &bytes[..bytes.len() - 8];
        assert!(matches!(
            RegionDelta::parse(cut, &mut ids),
            Err(SaveError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn delta_for_another_region_is_refused() {
        let region = Region::from_def(4, &hamlet());
        let bytes = region.save_delta().finish();
        let delta = RegionDelta::parse(&bytes, &mut EntityIdGen::default()).unwrap();
        let mut other = Region::from_def(5, &hamlet());
        assert!(matches!(
            other.apply_delta(delta),
            Err(SaveError::WrongRegion { expected: 5, found: 4 })
        ));
    }
}
