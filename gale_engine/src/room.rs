//! Rooms and the links between them.
//!
//! A room's name, description and authored links come from the region YAML and
//! never change. Its tags, link state and contents can change during play, and
//! those changes are what a region delta records.

use std::collections::BTreeSet;
use std::fmt;

use gale_data::{Direction, LinkTag, RoomDef, RoomTag, Season};

use crate::entity::{Entity, EntityError, EntityId, ParentRef};
use crate::hashing::hash_str;

/// Hashed room id. `RoomId(0)` means "no room".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomId(pub u32);

impl RoomId {
    pub const NONE: RoomId = RoomId(0);

    pub fn from_key(key: &str) -> RoomId {
        RoomId(hash_str(key))
    }

    pub fn is_none(self) -> bool {
        self == RoomId::NONE
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// A directed exit from a room. Destination `RoomId::NONE` means there is no exit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Link {
    destination: RoomId,
    tags: BTreeSet<LinkTag>,
}

impl Link {
    pub fn new(destination: RoomId, tags: impl IntoIterator<Item = LinkTag>) -> Link {
        Link {
            destination,
            tags: tags.into_iter().filter(|tag| !tag.is_bookkeeping()).collect(),
        }
    }

    pub fn destination(&self) -> RoomId {
        self.destination
    }

    pub fn is_linked(&self) -> bool {
        !self.destination.is_none()
    }

    pub fn tag(&self, tag: LinkTag) -> bool {
        self.tags.contains(&tag)
    }

    /// Tags with the bookkeeping markers left out.
    pub fn semantic_tags(&self) -> impl Iterator<Item = LinkTag> + '_ {
        self.tags.iter().copied().filter(|tag| !tag.is_bookkeeping())
    }

    /// True if this link differs from its authored state.
    pub fn is_changed(&self) -> bool {
        self.tag(LinkTag::ChangedLink) || self.tag(LinkTag::ChangedTags)
    }

    pub fn set_tag(&mut self, tag: LinkTag) {
        if self.tags.insert(tag) && !tag.is_bookkeeping() {
            self.tags.insert(LinkTag::ChangedTags);
        }
    }

    pub fn clear_tag(&mut self, tag: LinkTag) {
        if self.tags.remove(&tag) && !tag.is_bookkeeping() {
            self.tags.insert(LinkTag::ChangedTags);
        }
    }

    pub fn set_destination(&mut self, destination: RoomId) {
        if self.destination != destination {
            self.destination = destination;
            self.tags.insert(LinkTag::ChangedLink);
        }
    }

    /// Whether the player could walk through right now.
    pub fn is_passable(&self) -> bool {
        if !self.is_linked() {
            return false;
        }
        if self.tag(LinkTag::Openable) && !self.tag(LinkTag::Open) {
            return false;
        }
        !self.tag(LinkTag::Locked) && !self.tag(LinkTag::Permalock)
    }

    /// Replace the whole state of the link, as when replaying a delta.
    pub(crate) fn restore(&mut self, destination: RoomId, tags: BTreeSet<LinkTag>) {
        self.destination = destination;
        self.tags = tags;
    }
}

#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    string_id: String,
    region: u32,
    name: String,
    short_name: String,
    desc: String,
    season: Option<Season>,
    static_tags: BTreeSet<RoomTag>,
    tags: BTreeSet<RoomTag>,
    links: [Link; 10],
    entities: Vec<Entity>,
}

impl Room {
    /// Build a room from its definition. Name forms are assumed validated.
    pub fn from_def(string_id: &str, def: &RoomDef, region: u32) -> Room {
        let mut links: [Link; 10] = Default::default();
        for (direction, link) in &def.links {
            links[direction.index()] = Link::new(RoomId::from_key(&link.to), link.tags.iter().copied());
        }
        let tags: BTreeSet<RoomTag> = def.tags.iter().copied().collect();
        Room {
            id: RoomId::from_key(string_id),
            string_id: string_id.to_string(),
            region,
            name: def.name.first().cloned().unwrap_or_default(),
            short_name: def.name.get(1).cloned().unwrap_or_default(),
            desc: def.desc.clone(),
            season: def.season,
            static_tags: tags.clone(),
            tags,
            links,
            entities: Vec::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn string_id(&self) -> &str {
        &self.string_id
    }

    pub fn region(&self) -> u32 {
        self.region
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Season override for this room, if any.
    pub fn season(&self) -> Option<Season> {
        self.season
    }

    pub fn tag(&self, tag: RoomTag) -> bool {
        self.tags.contains(&tag)
    }

    pub fn tags(&self) -> &BTreeSet<RoomTag> {
        &self.tags
    }

    pub fn set_tag(&mut self, tag: RoomTag) {
        self.tags.insert(tag);
    }

    pub fn clear_tag(&mut self, tag: RoomTag) {
        self.tags.remove(&tag);
    }

    pub(crate) fn restore_tags(&mut self, tags: BTreeSet<RoomTag>) {
        self.tags = tags;
    }

    /// True if the tag set no longer matches the authored one.
    pub fn tags_changed(&self) -> bool {
        self.tags != self.static_tags
    }

    /// Underground rooms never see the sky; indoor rooms only through windows.
    pub fn can_see_outside(&self) -> bool {
        if self.tag(RoomTag::Underground) {
            return false;
        }
        !self.tag(RoomTag::Indoors) || self.tag(RoomTag::Windows)
    }

    pub fn link(&self, direction: Direction) -> &Link {
        &self.links[direction.index()]
    }

    pub fn link_mut(&mut self, direction: Direction) -> &mut Link {
        &mut self.links[direction.index()]
    }

    pub fn link_tag(&self, direction: Direction, tag: LinkTag) -> bool {
        self.link(direction).tag(tag)
    }

    /// Linked directions, in compass order.
    pub fn exits(&self) -> impl Iterator<Item = (Direction, &Link)> + '_ {
        Direction::ALL
            .into_iter()
            .map(|dir| (dir, self.link(dir)))
            .filter(|(_, link)| link.is_linked() && !link.tag(LinkTag::Hidden))
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Take ownership of `entity`, making this room its parent.
    ///
    /// # Errors
    /// - if the entity cannot accept this room as parent
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<(), EntityError> {
        entity.set_parent(ParentRef::Room(self.id))?;
        self.entities.push(entity);
        Ok(())
    }

    /// Remove an entity directly in this room and hand it back.
    pub fn take_entity(&mut self, id: EntityId) -> Option<Entity> {
        let pos = self.entities.iter().position(|e| e.id == id)?;
        let mut entity = self.entities.remove(pos);
        entity.parent = ParentRef::Nowhere;
        Some(entity)
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// True if this room needs a record in the region delta.
    pub fn is_dirty(&self) -> bool {
        !self.entities.is_empty() || self.tags_changed() || self.links.iter().any(Link::is_changed)
    }
}
