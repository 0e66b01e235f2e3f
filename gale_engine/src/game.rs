//! The running game: world, sky and error tracker passed around together.

use anyhow::{Context, Result};
use gale_data::{Direction, LinkTag, RoomTag};
use log::info;
use thiserror::Error;

use crate::config::GaleConfig;
use crate::data_paths::{REGION_DIR, STRINGS_FILE, data_root};
use crate::errors::{ErrorCascade, ErrorTracker};
use crate::loader;
use crate::room::RoomId;
use crate::save_files::{clear_slot, slot_dir};
use crate::time_weather::{PassTime, TimeWeather};
use crate::world::{GAME_FILE, Movement, World, WorldError};

/// Seconds it takes to walk from one room to the next.
pub const WALK_SECONDS: f64 = 60.0;

/// Longest single wait: one game day.
pub const MAX_WAIT_SECONDS: f64 = 86_400.0;

/// Failures that end the game.
#[derive(Debug, Error)]
pub enum GaleError {
    #[error(transparent)]
    World(#[from] WorldError),
    #[error(transparent)]
    Cascade(#[from] ErrorCascade),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Unexplored,
    Explored,
    Closed,
    Locked,
}

/// Everything the driver prints for `look`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    pub title: String,
    pub desc: String,
    pub sky: String,
    pub exits: Vec<(Direction, ExitState)>,
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walk {
    pub movement: Movement,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorOutcome {
    Done,
    AlreadyThat,
    NotADoor,
    Locked,
}

#[derive(Debug)]
pub struct Game {
    pub config: GaleConfig,
    pub world: World,
    pub sky: TimeWeather,
    pub errors: ErrorTracker,
}

impl Game {
    /// Load static data and either resume the configured slot or start a new game in it.
    ///
    /// # Errors
    /// Errors bubble up from data loading, a corrupt save, or an unknown start room.
    pub fn start(config: GaleConfig) -> Result<Game> {
        let root = data_root(config.data_dir.as_deref());
        let data = loader::load_weather_data(&root.join(STRINGS_FILE))?;
        let slot = slot_dir(&config.save_dir, &config.slot);

        if !slot.join(GAME_FILE).is_file() {
            clear_slot(&slot).context("while clearing stale save data")?;
        }
        let mut world = World::open(&root.join(REGION_DIR), &slot).context("while indexing regions")?;
        let mut sky = TimeWeather::new_game_seeded(data, config.seed);

        if world.load_game(&mut sky).context("while loading saved game")? {
            info!("resumed slot '{}'", config.slot);
        } else {
            let start = RoomId::from_key(&config.start_room);
            world
                .spawn_player(start, &config.player_name)
                .with_context(|| format!("while placing the player in '{}'", config.start_room))?;
            info!("new game in slot '{}'", config.slot);
        }

        Ok(Game {
            config,
            world,
            sky,
            errors: ErrorTracker::new(),
        })
    }

    /// Describe the player's room.
    ///
    /// # Errors
    /// - if the player is missing or the error tracker cascades
    pub fn look(&mut self) -> Result<RoomView, GaleError> {
        let links: Vec<(Direction, RoomId, Option<ExitState>)> = {
            let room = self.world.player_room_ref()?;
            room.exits()
                .map(|(direction, link)| {
                    let locked =
                        room.link_tag(direction, LinkTag::Locked) || room.link_tag(direction, LinkTag::Permalock);
                    let shut = if locked {
                        Some(ExitState::Locked)
                    } else if !link.is_passable() {
                        Some(ExitState::Closed)
                    } else {
                        None
                    };
                    (direction, link.destination(), shut)
                })
                .collect()
        };

        // destinations in other regions are loaded to read their explored flag
        let mut exits = Vec::with_capacity(links.len());
        for (direction, destination, shut) in links {
            let state = match shut {
                Some(state) => state,
                None if self.world.room(destination)?.tag(RoomTag::Explored) => ExitState::Explored,
                None => ExitState::Unexplored,
            };
            exits.push((direction, state));
        }

        let room = self.world.player_room_ref()?;
        let sky = self.sky.weather_desc(room, &mut self.errors)?;
        let player = self.world.player_id();
        Ok(RoomView {
            title: room.name().to_string(),
            desc: room.desc().to_string(),
            sky,
            exits,
            entities: room
                .entities()
                .iter()
                .filter(|entity| Some(entity.id) != player)
                .map(|entity| entity.name.clone())
                .collect(),
        })
    }

    /// Let time pass where the player stands. Long waits stop early for visible weather.
    ///
    /// Waits are capped at [`MAX_WAIT_SECONDS`].
    ///
    /// # Errors
    /// - if the player is missing or the error tracker cascades
    pub fn wait(&mut self, seconds: f64) -> Result<PassTime, GaleError> {
        let seconds = seconds.clamp(0.0, MAX_WAIT_SECONDS);
        let room = self.world.player_room_ref()?;
        Ok(self.sky.pass_time(seconds, true, room, &mut self.errors)?)
    }

    /// Walk through an exit, spending [`WALK_SECONDS`] on the way.
    ///
    /// # Errors
    /// - if the destination cannot be loaded or the error tracker cascades
    pub fn walk(&mut self, direction: Direction) -> Result<Walk, GaleError> {
        let movement = self.world.move_player(direction)?;
        let messages = if let Movement::Moved(_) = movement {
            let room = self.world.player_room_ref()?;
            self.sky.pass_time(WALK_SECONDS, false, room, &mut self.errors)?.messages
        } else {
            Vec::new()
        };
        Ok(Walk { movement, messages })
    }

    /// Open or close the door in `direction`, and its other side if it has one.
    ///
    /// # Errors
    /// - if either room cannot be loaded
    pub fn set_door(&mut self, direction: Direction, open: bool) -> Result<DoorOutcome, GaleError> {
        let here = self.world.player_room();
        let link = self.world.player_room_ref()?.link(direction).clone();
        if !link.is_linked() || !link.tag(LinkTag::Openable) {
            return Ok(DoorOutcome::NotADoor);
        }
        if link.tag(LinkTag::Locked) || link.tag(LinkTag::Permalock) {
            return Ok(DoorOutcome::Locked);
        }
        if link.tag(LinkTag::Open) == open {
            return Ok(DoorOutcome::AlreadyThat);
        }

        self.toggle_door(here, direction, open)?;
        let back = direction.opposite();
        if self.world.room(link.destination())?.link(back).destination() == here {
            self.toggle_door(link.destination(), back, open)?;
        }
        Ok(DoorOutcome::Done)
    }

    fn toggle_door(&mut self, room: RoomId, direction: Direction, open: bool) -> Result<(), WorldError> {
        let link = self.world.room_mut(room)?.link_mut(direction);
        if open {
            link.set_tag(LinkTag::Open);
        } else {
            link.clear_tag(LinkTag::Open);
        }
        Ok(())
    }

    /// Write the slot, then let go of every region but the player's.
    ///
    /// # Errors
    /// - on any write failure
    pub fn save(&mut self) -> Result<(), GaleError> {
        self.world.save_all(&self.sky)?;
        self.world.prune_regions()?;
        Ok(())
    }
}
