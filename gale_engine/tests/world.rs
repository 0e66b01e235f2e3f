use std::fs;
use std::path::PathBuf;

use gale_data::{Direction, LinkTag};
use gale_engine::entity::{Entity, EntityKind, ItemData};
use gale_engine::game::ExitState;
use gale_engine::loader::load_weather_data;
use gale_engine::region::REGION_SAVE_VERSION;
use gale_engine::savefile::SaveError;
use gale_engine::world::Movement;
use gale_engine::*;
use tempfile::tempdir;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn open_world(slot: &std::path::Path) -> World {
    World::open(&data_dir().join("regions"), slot).expect("shipped regions load")
}

fn new_sky(seed: u64) -> TimeWeather {
    let data = load_weather_data(&data_dir().join("strings.yml")).expect("shipped strings load");
    TimeWeather::new_game_seeded(data, Some(seed))
}

#[test]
fn occupied_region_cannot_be_unloaded() {
    let slot = tempdir().unwrap();
    let mut world = open_world(slot.path());
    world.spawn_player(RoomId::from_key("village_green"), "Tester").unwrap();
    let village = world.region_of(RoomId::from_key("village_green")).unwrap();

    let err = world.unload_region(village).unwrap_err();
    assert!(matches!(err, WorldError::RegionOccupied(id) if id == village));
    assert!(world.is_resident(village));

    let forest = world.region_of(RoomId::from_key("forest_edge")).unwrap();
    world.load_region(forest).unwrap();
    assert_eq!(world.prune_regions().unwrap(), 1);
    assert!(!world.is_resident(forest));
    assert!(world.is_resident(village));
}

#[test]
fn closed_and_missing_exits_stop_the_player() {
    let slot = tempdir().unwrap();
    let mut world = open_world(slot.path());
    world.spawn_player(RoomId::from_key("village_green"), "Tester").unwrap();
    assert_eq!(world.move_player(Direction::South).unwrap(), Movement::Blocked);
    assert_eq!(world.move_player(Direction::Up).unwrap(), Movement::NoExit);
    assert_eq!(
        world.move_player(Direction::North).unwrap(),
        Movement::Moved(RoomId::from_key("inn_yard"))
    );
}

#[test]
fn saved_world_comes_back_the_same() {
    let slot = tempdir().unwrap();
    let green = RoomId::from_key("village_green");
    let smithy = RoomId::from_key("smithy");
    let edge = RoomId::from_key("forest_edge");

    let mut world = open_world(slot.path());
    let mut sky = new_sky(11);
    world.spawn_player(green, "Tester").unwrap();
    world.room_mut(green).unwrap().link_mut(Direction::South).set_tag(LinkTag::Open);
    let hammer = Entity::new(
        gale_engine::entity::EntityId(9000),
        "rusty hammer",
        EntityKind::Item(ItemData {
            stack: 1,
            value: 3,
            weight: 4,
        }),
    );
    world.room_mut(smithy).unwrap().add_entity(hammer).unwrap();

    let mut errors = ErrorTracker::new();
    let room = world.player_room_ref().unwrap();
    sky.pass_time(4000.0, false, room, &mut errors).unwrap();

    // leaving the village parks its delta until the save
    assert_eq!(world.move_player(Direction::East).unwrap(), Movement::Moved(edge));
    let village = world.region_of(green).unwrap();
    assert!(!world.is_resident(village));
    assert!(world.work_path(village).is_file());
    assert!(!world.delta_path(village).exists());
    world.save_all(&sky).unwrap();
    assert!(world.delta_path(village).is_file());
    assert!(!world.work_path(village).exists());

    let mut reloaded = open_world(slot.path());
    let mut restored_sky = new_sky(99);
    assert!(reloaded.load_game(&mut restored_sky).unwrap());
    assert_eq!(reloaded.player_room(), edge);
    assert_eq!(restored_sky.clock(), sky.clock());
    assert_eq!(restored_sky.raw_weather(), sky.raw_weather());
    assert_eq!(restored_sky.wind(), sky.wind());

    let door = reloaded.room(green).unwrap().link(Direction::South).clone();
    assert!(door.tag(LinkTag::Open));
    assert!(door.tag(LinkTag::ChangedTags));
    let items: Vec<&str> = reloaded
        .room(smithy)
        .unwrap()
        .entities()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(items, vec!["rusty hammer"]);
    let player_here = reloaded.player_room_ref().unwrap().entities().iter().any(Entity::is_player);
    assert!(player_here);
}

#[test]
fn mismatched_delta_version_refuses_to_load() {
    let slot = tempdir().unwrap();
    let green = RoomId::from_key("village_green");
    let mut world = open_world(slot.path());
    world.spawn_player(green, "Tester").unwrap();
    world.move_player(Direction::East).unwrap();
    world.save_all(&new_sky(1)).unwrap();
    let village = world.region_of(green).unwrap();

    let path = world.delta_path(village);
    let mut bytes = fs::read(&path).unwrap();
    bytes[3..7].copy_from_slice(&(REGION_SAVE_VERSION + 7).to_ne_bytes());
    fs::write(&path, bytes).unwrap();

    let mut fresh = open_world(slot.path());
    let err = fresh.load_region(village).unwrap_err();
    assert!(matches!(
        err,
        WorldError::Save(SaveError::VersionMismatch { kind: "region", .. })
    ));
    assert!(!fresh.is_resident(village));
}

#[test]
fn game_starts_fresh_then_resumes() {
    let saves = tempdir().unwrap();
    let config = GaleConfig {
        data_dir: Some(data_dir()),
        save_dir: saves.path().to_path_buf(),
        slot: "test".into(),
        seed: Some(3),
        ..GaleConfig::default()
    };

    let mut game = Game::start(config.clone()).unwrap();
    let view = game.look().unwrap();
    assert_eq!(view.title, "the village green");
    assert!(!view.sky.is_empty());
    game.set_door(Direction::South, true).unwrap();
    let walk = game.walk(Direction::South).unwrap();
    assert_eq!(walk.movement, Movement::Moved(RoomId::from_key("smithy")));
    assert!(game.sky.clock().time_passed() >= 60);
    game.save().unwrap();

    let mut resumed = Game::start(config).unwrap();
    assert_eq!(resumed.world.player_room(), RoomId::from_key("smithy"));
    assert_eq!(resumed.look().unwrap().title, "the smithy");
    assert_eq!(resumed.sky.clock(), game.sky.clock());
}

fn test_config(saves: &std::path::Path) -> GaleConfig {
    GaleConfig {
        data_dir: Some(data_dir()),
        save_dir: saves.to_path_buf(),
        slot: "test".into(),
        seed: Some(3),
        ..GaleConfig::default()
    }
}

#[test]
fn quitting_between_saves_resumes_at_the_last_save() {
    let saves = tempdir().unwrap();
    let config = test_config(saves.path());

    let mut game = Game::start(config.clone()).unwrap();
    game.save().unwrap();
    let saved_clock = game.sky.clock().clone();
    let walk = game.walk(Direction::East).unwrap();
    assert_eq!(walk.movement, Movement::Moved(RoomId::from_key("forest_edge")));
    drop(game);

    let mut resumed = Game::start(config).unwrap();
    let green = RoomId::from_key("village_green");
    assert_eq!(resumed.world.player_room(), green);
    assert_eq!(resumed.sky.clock(), &saved_clock);
    let players = resumed
        .world
        .room(green)
        .unwrap()
        .entities()
        .iter()
        .filter(|entity| entity.is_player())
        .count();
    assert_eq!(players, 1);
    assert_eq!(resumed.look().unwrap().title, "the village green");
}

#[test]
fn exits_back_into_a_parked_region_show_as_explored() {
    let saves = tempdir().unwrap();
    let mut game = Game::start(test_config(saves.path())).unwrap();
    let village = game.world.region_of(RoomId::from_key("village_green")).unwrap();

    game.walk(Direction::East).unwrap();
    assert!(!game.world.is_resident(village));
    let view = game.look().unwrap();
    let west = view.exits.iter().find(|(direction, _)| *direction == Direction::West);
    assert_eq!(west, Some(&(Direction::West, ExitState::Explored)));
}

#[test]
fn saving_drops_regions_the_player_is_not_in() {
    let saves = tempdir().unwrap();
    let mut game = Game::start(test_config(saves.path())).unwrap();
    let forest = game.world.region_of(RoomId::from_key("forest_edge")).unwrap();

    // looking at the village loads the forest behind its east exit
    game.look().unwrap();
    assert!(game.world.is_resident(forest));
    game.save().unwrap();
    assert!(!game.world.is_resident(forest));
    assert!(game.world.player_room_ref().is_ok());
}

#[test]
fn waiting_is_capped_at_a_day() {
    let saves = tempdir().unwrap();
    let mut game = Game::start(test_config(saves.path())).unwrap();
    let before = game.sky.clock().time_passed();
    game.wait(1.0e12).unwrap();
    assert!(game.sky.clock().time_passed() - before <= 86_400);
}
