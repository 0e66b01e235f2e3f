//! Things that live in rooms: plain entities, mobiles, the player, and items.
//!
//! Every variant shares the same base record (name, gender, tags, inventory);
//! what differs is carried in [`EntityKind`]. Saving writes an [`EntityType`]
//! discriminant first and loading dispatches on it.

use std::collections::BTreeSet;

use log::error;
use thiserror::Error;
use variantly::Variantly;

use crate::room::RoomId;
use crate::savefile::{FileReader, FileWriter, SaveError};

pub const ENTITY_SAVE_VERSION: u32 = 2;
pub const MOBILE_SAVE_VERSION: u32 = 1;
pub const PLAYER_SAVE_VERSION: u32 = 1;
pub const ITEM_SAVE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

/// Hands out runtime entity ids. Ids are not saved; they are reassigned on load.
#[derive(Debug, Clone)]
pub struct EntityIdGen {
    next: u64,
}

impl Default for EntityIdGen {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl EntityIdGen {
    pub fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

/// Where an entity is. An entity is in a room or inside another entity, never both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Variantly)]
pub enum ParentRef {
    Room(RoomId),
    Entity(EntityId),
    #[default]
    Nowhere,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("entity {0:?} cannot be its own parent")]
    SelfParented(EntityId),
    #[error("entity {0:?} not found")]
    NotFound(EntityId),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Gender {
    #[default]
    It = 0,
    Female,
    Male,
    They,
}

impl Gender {
    pub fn from_u8(value: u8) -> Option<Gender> {
        match value {
            0 => Some(Gender::It),
            1 => Some(Gender::Female),
            2 => Some(Gender::Male),
            3 => Some(Gender::They),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EntityTag {
    ProperNoun = 0,
    PluralName,
    Hostile,
    Unique,
}

impl EntityTag {
    pub fn from_u8(value: u8) -> Option<EntityTag> {
        match value {
            0 => Some(EntityTag::ProperNoun),
            1 => Some(EntityTag::PluralName),
            2 => Some(EntityTag::Hostile),
            3 => Some(EntityTag::Unique),
            _ => None,
        }
    }
}

/// Save-file discriminant for [`EntityKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntityType {
    Entity = 1,
    Mobile = 2,
    Player = 3,
    Item = 4,
}

impl EntityType {
    pub fn from_u8(value: u8) -> Option<EntityType> {
        match value {
            1 => Some(EntityType::Entity),
            2 => Some(EntityType::Mobile),
            3 => Some(EntityType::Player),
            4 => Some(EntityType::Item),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileData {
    pub hp: u32,
    pub hp_max: u32,
    pub spawn_room: RoomId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerData {
    pub hp: u32,
    pub hp_max: u32,
    pub money: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemData {
    pub stack: u32,
    pub value: u32,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    Entity,
    Mobile(MobileData),
    Player(PlayerData),
    Item(ItemData),
}

impl EntityKind {
    pub fn entity_type(&self) -> EntityType {
        match self {
            EntityKind::Entity => EntityType::Entity,
            EntityKind::Mobile(_) => EntityType::Mobile,
            EntityKind::Player(_) => EntityType::Player,
            EntityKind::Item(_) => EntityType::Item,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub gender: Gender,
    pub parent: ParentRef,
    pub tags: BTreeSet<EntityTag>,
    pub inventory: Vec<Entity>,
    pub kind: EntityKind,
}

impl Entity {
    pub fn new(id: EntityId, name: impl Into<String>, kind: EntityKind) -> Entity {
        Entity {
            id,
            name: name.into(),
            gender: Gender::default(),
            parent: ParentRef::Nowhere,
            tags: BTreeSet::new(),
            inventory: Vec::new(),
            kind,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind.entity_type()
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, EntityKind::Player(_))
    }

    /// # Errors
    /// - if `parent` is this entity
    pub fn set_parent(&mut self, parent: ParentRef) -> Result<(), EntityError> {
        if parent == ParentRef::Entity(self.id) {
            error!("refusing to parent entity '{}' ({:?}) to itself", self.name, self.id);
            return Err(EntityError::SelfParented(self.id));
        }
        self.parent = parent;
        Ok(())
    }

    /// Move `child` into this entity's inventory.
    ///
    /// # Errors
    /// - if `child` is this entity
    pub fn add_to_inventory(&mut self, mut child: Entity) -> Result<(), EntityError> {
        child.set_parent(ParentRef::Entity(self.id))?;
        self.inventory.push(child);
        Ok(())
    }

    /// Take an entity out of this entity's inventory, searching nested containers too.
    pub fn take_from_inventory(&mut self, id: EntityId) -> Option<Entity> {
        if let Some(pos) = self.inventory.iter().position(|e| e.id == id) {
            let mut taken = self.inventory.remove(pos);
            taken.parent = ParentRef::Nowhere;
            return Some(taken);
        }
        self.inventory.iter_mut().find_map(|e| e.take_from_inventory(id))
    }

    /// Total count of this entity and everything inside it.
    pub fn count_recursive(&self) -> usize {
        1 + self.inventory.iter().map(Entity::count_recursive).sum::<usize>()
    }

    /// Write this entity and its inventory.
    pub fn save(&self, writer: &mut FileWriter) {
        writer.write_u8(self.entity_type() as u8);
        writer.write_u32(ENTITY_SAVE_VERSION);
        writer.write_string(&self.name);
        writer.write_u8(self.gender as u8);
        writer.write_count(self.tags.len());
        for tag in &self.tags {
            writer.write_u8(*tag as u8);
        }
        match &self.kind {
            EntityKind::Entity => {},
            EntityKind::Mobile(mobile) => save_mobile(mobile, writer),
            EntityKind::Player(player) => save_player(player, writer),
            EntityKind::Item(item) => save_item(item, writer),
        }
        writer.write_count(self.inventory.len());
        for child in &self.inventory {
            child.save(writer);
        }
    }

    /// Read one entity record (and its inventory), assigning fresh ids.
    ///
    /// # Errors
    /// - on an unknown discriminant, version mismatch or truncated data
    pub fn load(reader: &mut FileReader<'_>, ids: &mut EntityIdGen) -> Result<Entity, SaveError> {
        let raw_type = reader.read_u8()?;
        let entity_type = EntityType::from_u8(raw_type).ok_or(SaveError::UnknownDiscriminant {
            kind: "entity type",
            value: u32::from(raw_type),
        })?;
        reader.expect_version("entity", ENTITY_SAVE_VERSION)?;
        let name = reader.read_string()?;
        let raw_gender = reader.read_u8()?;
        let gender = Gender::from_u8(raw_gender).ok_or(SaveError::UnknownDiscriminant {
            kind: "gender",
            value: u32::from(raw_gender),
        })?;
        let tag_count = reader.read_u32()?;
        let mut tags = BTreeSet::new();
        for _ in 0..tag_count {
            let raw = reader.read_u8()?;
            tags.insert(EntityTag::from_u8(raw).ok_or(SaveError::UnknownDiscriminant {
                kind: "entity tag",
                value: u32::from(raw),
            })?);
        }
        let kind = match entity_type {
            EntityType::Entity => EntityKind::Entity,
            EntityType::Mobile => EntityKind::Mobile(load_mobile(reader)?),
            EntityType::Player => EntityKind::Player(load_player(reader)?),
            EntityType::Item => EntityKind::Item(load_item(reader)?),
        };

        let mut entity = Entity::new(ids.next_id(), name, kind);
        entity.gender = gender;
        entity.tags = tags;
        let inventory_count = reader.read_u32()?;
        for _ in 0..inventory_count {
            let mut child = Entity::load(reader, ids)?;
            child.parent = ParentRef::Entity(entity.id);
            entity.inventory.push(child);
        }
        Ok(entity)
    }
}

fn save_mobile(mobile: &MobileData, writer: &mut FileWriter) {
    writer.write_u32(MOBILE_SAVE_VERSION);
    writer.write_u32(mobile.hp);
    writer.write_u32(mobile.hp_max);
    writer.write_u32(mobile.spawn_room.0);
}

fn load_mobile(reader: &mut FileReader<'_>) -> Result<MobileData, SaveError> {
    reader.expect_version("mobile", MOBILE_SAVE_VERSION)?;
    Ok(MobileData {
        hp: reader.read_u32()?,
        hp_max: reader.read_u32()?,
        spawn_room: RoomId(reader.read_u32()?),
    })
}

fn save_player(player: &PlayerData, writer: &mut FileWriter) {
    writer.write_u32(PLAYER_SAVE_VERSION);
    writer.write_u32(player.hp);
    writer.write_u32(player.hp_max);
    writer.write_u32(player.money);
}

fn load_player(reader: &mut FileReader<'_>) -> Result<PlayerData, SaveError> {
    reader.expect_version("player", PLAYER_SAVE_VERSION)?;
    Ok(PlayerData {
        hp: reader.read_u32()?,
        hp_max: reader.read_u32()?,
        money: reader.read_u32()?,
    })
}

fn save_item(item: &ItemData, writer: &mut FileWriter) {
    writer.write_u32(ITEM_SAVE_VERSION);
    writer.write_u32(item.stack);
    writer.write_u32(item.value);
    writer.write_u32(item.weight);
}

fn load_item(reader: &mut FileReader<'_>) -> Result<ItemData, SaveError> {
    reader.expect_version("item", ITEM_SAVE_VERSION)?;
    Ok(ItemData {
        stack: reader.read_u32()?,
        value: reader.read_u32()?,
        weight: reader.read_u32()?,
    })
}
