//! The resident world: which regions are loaded, where the player is, and
//! how all of it is saved to a slot.
//!
//! At startup every region file is read once to build the global room index
//! (room id -> region id). Regions are then loaded on demand when one of their
//! rooms is touched, with the slot's delta replayed over the YAML, and written
//! back out when unloaded or saved.
//!
//! Deltas written when a region is unloaded go to the slot's work directory.
//! Only `save_all` moves them next to `game.dat`, so the files in the slot
//! itself always describe the same moment. Leftover work files from a session
//! that never saved are discarded when the world is opened.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use thiserror::Error;

use crate::entity::{Entity, EntityError, EntityId, EntityIdGen, EntityKind, PlayerData};
use crate::hashing::{HashError, HashRegistry};
use crate::loader::{self, RegionFile};
use crate::region::{Region, RegionDelta};
use crate::room::{Room, RoomId};
use crate::savefile::{self, FileReader, FileWriter, SaveError};
use crate::time_weather::TimeWeather;
use gale_data::{Direction, RoomTag};

pub const GAME_SAVE_VERSION: u32 = 1;
/// Section tag for the game-state record ("GAME").
pub const SAVE_TAG_GAME: u32 = 0x4741_4D45;
pub const GAME_FILE: &str = "game.dat";
/// Unsaved region deltas, inside the slot directory.
pub const WORK_DIR: &str = ".work";

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("cannot unload region {0} while the player is in it")]
    RegionOccupied(u32),
    #[error("no room with id {0} exists")]
    UnknownRoom(RoomId),
    #[error("no region with id {0} exists")]
    UnknownRegion(u32),
    #[error("room '{room}' links {direction} to '{target}', which does not exist")]
    DanglingLink {
        room: String,
        direction: &'static str,
        target: String,
    },
    #[error("the player is not in the world")]
    NoPlayer,
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error(transparent)]
    Entity(#[from] EntityError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Data(#[from] anyhow::Error),
}

/// What happened when the player tried to walk somewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Moved(RoomId),
    NoExit,
    Blocked,
}

#[derive(Debug)]
pub struct World {
    region_files: BTreeMap<u32, RegionFile>,
    index: HashRegistry,
    regions: BTreeMap<u32, Region>,
    slot_dir: PathBuf,
    player_room: RoomId,
    player: Option<EntityId>,
    ids: EntityIdGen,
}

impl World {
    /// Index every region in `region_dir`, saving and loading deltas in `slot_dir`.
    ///
    /// # Errors
    /// - if a region file is unreadable or invalid
    /// - on a room id hash collision
    /// - if a link points at a room that no region defines
    pub fn open(region_dir: &Path, slot_dir: &Path) -> Result<World, WorldError> {
        let mut index = HashRegistry::new();
        let mut region_files = BTreeMap::new();
        let mut links = Vec::new();

        for file in loader::discover_regions(region_dir)? {
            let def = loader::load_region_def(&file.path)?;
            for (key, room) in &def.rooms {
                index.register(key, file.id)?;
                for (direction, link) in &room.links {
                    links.push((key.clone(), direction.name(), link.to.clone()));
                }
            }
            debug!("indexed {} rooms of region {} ('{}')", def.rooms.len(), file.id, def.identifier.name);
            region_files.insert(file.id, file);
        }

        if let Some((room, direction, target)) =
            links.into_iter().find(|(_, _, target)| index.owner(RoomId::from_key(target).0).is_none())
        {
            return Err(WorldError::DanglingLink {
                room,
                direction,
                target,
            });
        }

        info!("world index holds {} rooms in {} regions", index.len(), region_files.len());
        discard_work(&slot_dir.join(WORK_DIR))?;
        Ok(World {
            region_files,
            index,
            regions: BTreeMap::new(),
            slot_dir: slot_dir.to_path_buf(),
            player_room: RoomId::NONE,
            player: None,
            ids: EntityIdGen::default(),
        })
    }

    pub fn slot_dir(&self) -> &Path {
        &self.slot_dir
    }

    pub fn delta_path(&self, region: u32) -> PathBuf {
        self.slot_dir.join(format!("region-{region}.dat"))
    }

    /// Where an unloaded region's delta waits until the next save.
    pub fn work_path(&self, region: u32) -> PathBuf {
        self.slot_dir.join(WORK_DIR).join(format!("region-{region}.dat"))
    }

    pub fn game_path(&self) -> PathBuf {
        self.slot_dir.join(GAME_FILE)
    }

    /// Region that defines `room`.
    ///
    /// # Errors
    /// - if no region defines it
    pub fn region_of(&self, room: RoomId) -> Result<u32, WorldError> {
        self.index.owner(room.0).ok_or(WorldError::UnknownRoom(room))
    }

    pub fn is_resident(&self, region: u32) -> bool {
        self.regions.contains_key(&region)
    }

    pub fn resident_regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.regions.values()
    }

    /// Make `id` resident, loading it if needed.
    ///
    /// # Errors
    /// - if the region is unknown, its YAML is invalid, or its delta cannot be applied
    pub fn load_region(&mut self, id: u32) -> Result<&mut Region, WorldError> {
        if !self.regions.contains_key(&id) {
            let region = self.read_region(id)?;
            self.regions.insert(id, region);
        }
        self.regions.get_mut(&id).ok_or(WorldError::UnknownRegion(id))
    }

    fn read_region(&mut self, id: u32) -> Result<Region, WorldError> {
        let file = self.region_files.get(&id).ok_or(WorldError::UnknownRegion(id))?;
        let def = loader::load_region_def(&file.path)?;
        let mut region = Region::from_def(id, &def);

        let delta_path = [self.work_path(id), self.delta_path(id)]
            .into_iter()
            .find(|path| path.is_file());
        if let Some(delta_path) = delta_path {
            let bytes = savefile::read_file(&delta_path)?;
            let delta = RegionDelta::parse(&bytes, &mut self.ids)?;
            let entities = delta.entity_count();
            region.apply_delta(delta)?;
            info!("region {id} ('{}') loaded with {entities} saved entities", region.name());
        } else {
            info!("region {id} ('{}') loaded from static data", region.name());
        }
        Ok(region)
    }

    /// Region the player stands in, if placed.
    pub fn player_region(&self) -> Option<u32> {
        if self.player_room.is_none() {
            return None;
        }
        self.index.owner(self.player_room.0)
    }

    /// Write out and drop a resident region. The player's region must stay.
    ///
    /// # Errors
    /// - [`WorldError::RegionOccupied`] if the player is in it; it stays resident
    /// - if the delta cannot be written; it stays resident
    pub fn unload_region(&mut self, id: u32) -> Result<(), WorldError> {
        if self.player_region() == Some(id) {
            return Err(WorldError::RegionOccupied(id));
        }
        let path = self.work_path(id);
        let Some(region) = self.regions.get_mut(&id) else {
            return Ok(());
        };
        if region.is_dirty() {
            region.write_delta(&path)?;
        }
        self.regions.remove(&id);
        debug!("region {id} unloaded");
        Ok(())
    }

    /// Unload every resident region except the player's. Returns how many went.
    ///
    /// # Errors
    /// - if a delta cannot be written
    pub fn prune_regions(&mut self) -> Result<usize, WorldError> {
        let keep = self.player_region();
        let doomed: Vec<u32> = self.regions.keys().copied().filter(|id| Some(*id) != keep).collect();
        for id in &doomed {
            self.unload_region(*id)?;
        }
        Ok(doomed.len())
    }

    /// A room in a resident region, without loading anything.
    pub fn resident_room(&self, room: RoomId) -> Option<&Room> {
        let region = self.index.owner(room.0)?;
        self.regions.get(&region)?.room(room)
    }

    /// Load the room's region if needed and return the room.
    ///
    /// # Errors
    /// - if the room is unknown or its region cannot be loaded
    pub fn room(&mut self, room: RoomId) -> Result<&Room, WorldError> {
        let region = self.region_of(room)?;
        self.load_region(region)?.room(room).ok_or(WorldError::UnknownRoom(room))
    }

    /// Mutable room access; the owning region becomes dirty.
    ///
    /// # Errors
    /// - if the room is unknown or its region cannot be loaded
    pub fn room_mut(&mut self, room: RoomId) -> Result<&mut Room, WorldError> {
        let region = self.region_of(room)?;
        self.load_region(region)?
            .room_mut(room)
            .ok_or(WorldError::UnknownRoom(room))
    }

    pub fn player_room(&self) -> RoomId {
        self.player_room
    }

    /// The room the player is in. Its region is always resident.
    ///
    /// # Errors
    /// - if the player has not been placed
    pub fn player_room_ref(&self) -> Result<&Room, WorldError> {
        self.resident_room(self.player_room).ok_or(WorldError::NoPlayer)
    }

    pub fn player_id(&self) -> Option<EntityId> {
        self.player
    }

    /// Create the player entity in `room` for a new game.
    ///
    /// # Errors
    /// - if the room is unknown or cannot be loaded
    pub fn spawn_player(&mut self, room: RoomId, name: &str) -> Result<EntityId, WorldError> {
        let id = self.ids.next_id();
        let player = Entity::new(
            id,
            name,
            EntityKind::Player(PlayerData {
                hp: 10,
                hp_max: 10,
                money: 0,
            }),
        );
        let target = self.room_mut(room)?;
        target.set_tag(RoomTag::Explored);
        target.add_entity(player)?;
        self.player_room = room;
        self.player = Some(id);
        info!("player '{name}' placed in room {room}");
        Ok(id)
    }

    /// Move an entity lying in room `from` to room `to`, loading regions as needed.
    ///
    /// # Errors
    /// - if either room is unknown or the entity is not in `from`
    pub fn transfer_entity(&mut self, id: EntityId, from: RoomId, to: RoomId) -> Result<(), WorldError> {
        self.room(to)?;
        let entity = self
            .room_mut(from)?
            .take_entity(id)
            .ok_or(EntityError::NotFound(id))?;
        self.room_mut(to)?.add_entity(entity)?;
        debug!("entity {} moved from {from} to {to}", id.0);
        Ok(())
    }

    /// Try to walk the player through the exit in `direction`.
    ///
    /// Leaving a region unloads it.
    ///
    /// # Errors
    /// - if the destination cannot be loaded or the player is missing
    pub fn move_player(&mut self, direction: Direction) -> Result<Movement, WorldError> {
        let player = self.player.ok_or(WorldError::NoPlayer)?;
        let here = self.player_room;
        let link = self.player_room_ref()?.link(direction).clone();
        if !link.is_linked() {
            return Ok(Movement::NoExit);
        }
        if !link.is_passable() {
            return Ok(Movement::Blocked);
        }

        let there = link.destination();
        let old_region = self.region_of(here)?;
        self.transfer_entity(player, here, there)?;
        self.player_room = there;
        self.room_mut(there)?.set_tag(RoomTag::Explored);

        let new_region = self.region_of(there)?;
        if new_region != old_region {
            info!("player left region {old_region} for region {new_region}");
            let pruned = self.prune_regions()?;
            debug!("{pruned} regions unloaded after the crossing");
        }
        Ok(Movement::Moved(there))
    }

    /// Write every dirty resident region and the game-state file.
    ///
    /// # Errors
    /// - on any write failure
    pub fn save_all(&mut self, sky: &TimeWeather) -> Result<(), WorldError> {
        let promoted = self.promote_work()?;
        let mut written = 0;
        for (id, region) in &mut self.regions {
            if region.is_dirty() {
                let path = self.slot_dir.join(format!("region-{id}.dat"));
                region.write_delta(&path)?;
                written += 1;
            }
        }
        let mut writer = FileWriter::with_header(GAME_SAVE_VERSION);
        writer.write_u32(SAVE_TAG_GAME);
        writer.write_u32(self.player_room.0);
        sky.save(&mut writer);
        writer.finish_to(&self.game_path())?;
        info!(
            "game saved to '{}' ({written} regions written, {promoted} promoted)",
            self.slot_dir.display()
        );
        Ok(())
    }

    /// Move every pending work delta into the slot proper.
    fn promote_work(&self) -> Result<usize, WorldError> {
        let work = self.slot_dir.join(WORK_DIR);
        if !work.is_dir() {
            return Ok(0);
        }
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| SaveError::Io { path, source }
        };
        let mut promoted = 0;
        for entry in fs::read_dir(&work).map_err(io_err(&work))? {
            let from = entry.map_err(io_err(&work))?.path();
            // half-written temp files are left for the next open to discard
            let Some(name) = from.file_name().filter(|_| from.extension().is_some_and(|ext| ext == "dat")) else {
                continue;
            };
            let to = self.slot_dir.join(name);
            fs::rename(&from, &to).map_err(io_err(&to))?;
            promoted += 1;
        }
        Ok(promoted)
    }

    /// Restore the player position and sky from the slot's game-state file.
    ///
    /// Returns `false` if the slot holds no saved game. The sky is only changed
    /// once the whole file has been read successfully.
    ///
    /// # Errors
    /// - on a corrupt or mismatched game file, or if the player cannot be found
    pub fn load_game(&mut self, sky: &mut TimeWeather) -> Result<bool, WorldError> {
        let path = self.game_path();
        if !path.is_file() {
            return Ok(false);
        }
        let bytes = savefile::read_file(&path)?;
        let mut reader = FileReader::open(&bytes, "game", GAME_SAVE_VERSION)?;
        reader.expect_section(SAVE_TAG_GAME)?;
        let room = RoomId(reader.read_u32()?);
        let mut restored = sky.clone();
        restored.load(&mut reader)?;
        reader.finish()?;

        let player = self
            .room(room)?
            .entities()
            .iter()
            .find(|entity| entity.is_player())
            .map(|entity| entity.id);
        let Some(player) = player else {
            warn!("saved game puts the player in room {room}, but no player entity is there");
            return Err(WorldError::NoPlayer);
        };

        *sky = restored;
        self.player_room = room;
        self.player = Some(player);
        info!("game loaded from '{}'", self.slot_dir.display());
        Ok(true)
    }
}

/// Drop deltas left behind by a session that ended without saving.
fn discard_work(work: &Path) -> Result<(), WorldError> {
    if work.is_dir() {
        warn!("discarding unsaved region changes in '{}'", work.display());
        fs::remove_dir_all(work).map_err(|source| SaveError::Io {
            path: work.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const HILL: &str = "REGION_IDENTIFIER:\n  version: 1\n  name: Hill\n\n\
hilltop:\n  name: [the hilltop, hilltop]\n  desc: Wind and heather.\n  links:\n    down: { to: hill_foot }\n\n\
hill_foot:\n  name: [the foot of the hill, hill foot]\n  desc: A stile.\n  links:\n    up: { to: hilltop }\n    east: { to: riverbank }\n";

    const RIVER: &str = "REGION_IDENTIFIER:\n  version: 1\n  name: River\n\n\
riverbank:\n  name: [the riverbank, riverbank]\n  desc: Reeds.\n  links:\n    west: { to: hill_foot }\n";

    fn write_regions(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    #[test]
    fn open_indexes_rooms_without_loading_regions() {
        let regions = write_regions(&[("1-hill.yml", HILL), ("2-river.yml", RIVER)]);
        let slot = tempdir().unwrap();
        let world = World::open(regions.path(), slot.path()).unwrap();
        assert_eq!(world.region_of(RoomId::from_key("riverbank")).unwrap(), 2);
        assert_eq!(world.region_of(RoomId::from_key("hilltop")).unwrap(), 1);
        assert_eq!(world.resident_regions().count(), 0);
        assert!(matches!(
            world.region_of(RoomId::from_key("nowhere")),
            Err(WorldError::UnknownRoom(_))
        ));
    }

    #[test]
    fn dangling_link_fails_open() {
        let regions = write_regions(&[("1-hill.yml", HILL)]);
        let slot = tempdir().unwrap();
        let err = World::open(regions.path(), slot.path()).unwrap_err();
        match err {
            WorldError::DanglingLink { room, direction, target } => {
                assert_eq!(room, "hill_foot");
                assert_eq!(direction, "east");
                assert_eq!(target, "riverbank");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_room_id_across_regions_fails_open() {
        let copy = RIVER.replace("name: River", "name: Other River");
        let regions = write_regions(&[("1-hill.yml", HILL), ("2-river.yml", RIVER), ("3-copy.yml", &copy)]);
        let slot = tempdir().unwrap();
        let err = World::open(regions.path(), slot.path()).unwrap_err();
        assert!(matches!(err, WorldError::Hash(HashError::Collision { .. })));
    }

    #[test]
    fn walking_across_regions_unloads_the_old_one() {
        let regions = write_regions(&[("1-hill.yml", HILL), ("2-river.yml", RIVER)]);
        let slot = tempdir().unwrap();
        let mut world = World::open(regions.path(), slot.path()).unwrap();
        let wren = world.spawn_player(RoomId::from_key("hill_foot"), "Wren").unwrap();
        assert_eq!(world.player_region(), Some(1));

        let moved = world.move_player(Direction::East).unwrap();
        assert_eq!(moved, Movement::Moved(RoomId::from_key("riverbank")));
        assert_eq!(world.player_region(), Some(2));
        assert!(!world.is_resident(1));
        assert!(world.work_path(1).is_file());
        assert!(!world.delta_path(1).exists());
        assert!(world.player_room_ref().unwrap().tag(RoomTag::Explored));
        assert!(world.player_room_ref().unwrap().find_entity(wren).is_some());

        // the hill comes back from its delta with the player gone
        let foot = world.room(RoomId::from_key("hill_foot")).unwrap();
        assert!(foot.entities().is_empty());
        assert!(foot.tag(RoomTag::Explored));
    }

    #[test]
    fn unsaved_crossing_is_forgotten_on_reopen() {
        let regions = write_regions(&[("1-hill.yml", HILL), ("2-river.yml", RIVER)]);
        let slot = tempdir().unwrap();
        let mut world = World::open(regions.path(), slot.path()).unwrap();
        world.spawn_player(RoomId::from_key("hill_foot"), "Wren").unwrap();
        world.move_player(Direction::East).unwrap();
        assert!(world.work_path(1).is_file());
        drop(world);

        let mut world = World::open(regions.path(), slot.path()).unwrap();
        assert!(!slot.path().join(WORK_DIR).exists());
        assert!(!world.delta_path(1).exists());
        let foot = world.room(RoomId::from_key("hill_foot")).unwrap();
        assert!(foot.entities().is_empty());
    }

    #[test]
    fn moving_without_a_player_is_an_error() {
        let regions = write_regions(&[("1-hill.yml", HILL), ("2-river.yml", RIVER)]);
        let slot = tempdir().unwrap();
        let mut world = World::open(regions.path(), slot.path()).unwrap();
        assert!(matches!(world.move_player(Direction::Up), Err(WorldError::NoPlayer)));
        assert!(matches!(world.player_room_ref(), Err(WorldError::NoPlayer)));
    }
}
