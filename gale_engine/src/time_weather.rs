//! The sky: clock, weather and wind advanced together one second at a time.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use gale_data::Season;
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use regex::Regex;

use crate::clock::Clock;
use crate::errors::{ErrorCascade, ErrorTracker};
use crate::narrative::{self, RenderContext, StringMap};
use crate::room::Room;
use crate::savefile::{FileReader, FileWriter, SaveError};
use crate::weather::{TransitionTable, Weather, WeatherDataError, fix_weather};
use crate::wind::Wind;

pub const SKY_SAVE_VERSION: u32 = 1;

static TRANSITION_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^WMAP[0-8]$").expect("valid regex"));

/// Static data for the sky, split out of the strings file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherData {
    pub transitions: TransitionTable,
    pub strings: StringMap,
}

impl WeatherData {
    /// Split the raw strings map: `WMAP0`..`WMAP8` are transition tables,
    /// everything else is narrative text.
    ///
    /// # Errors
    /// - if the transition tables are missing or malformed
    pub fn from_entries(entries: BTreeMap<String, String>) -> Result<WeatherData, WeatherDataError> {
        let (tables, strings): (BTreeMap<_, _>, BTreeMap<_, _>) =
            entries.into_iter().partition(|(key, _)| TRANSITION_KEY.is_match(key));
        let transitions = TransitionTable::from_compressed(|key| tables.get(key).map(String::as_str))?;
        Ok(WeatherData {
            transitions,
            strings: strings.into_iter().collect(),
        })
    }
}

/// Outcome of a call to [`TimeWeather::pass_time`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassTime {
    /// Weather-change messages the player could see, in order.
    pub messages: Vec<String>,
    /// Whole seconds actually simulated.
    pub seconds: u64,
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub struct TimeWeather {
    clock: Clock,
    weather: Weather,
    wind: Wind,
    data: WeatherData,
    rng: StdRng,
    interrupt: bool,
}

impl TimeWeather {
    /// Fresh sky for a new game: default clock, fair weather, random wind.
    pub fn new_game(data: WeatherData, mut rng: StdRng) -> TimeWeather {
        let clock = Clock::default();
        let wind = Wind::new_game(clock.time_passed(), &mut rng);
        TimeWeather {
            clock,
            weather: Weather::Fair,
            wind,
            data,
            rng,
            interrupt: false,
        }
    }

    /// As [`TimeWeather::new_game`], seeding the generator from `seed` if given.
    pub fn new_game_seeded(data: WeatherData, seed: Option<u64>) -> TimeWeather {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        TimeWeather::new_game(data, rng)
    }

    pub fn from_state(clock: Clock, weather: Weather, wind: Wind, data: WeatherData, rng: StdRng) -> TimeWeather {
        TimeWeather {
            clock,
            weather,
            wind,
            data,
            rng,
            interrupt: false,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn wind(&self) -> &Wind {
        &self.wind
    }

    /// Raw weather, which may not suit the season. Never show this directly.
    pub fn raw_weather(&self) -> Weather {
        self.weather
    }

    pub fn strings(&self) -> &StringMap {
        &self.data.strings
    }

    /// The room's own season if it has one, otherwise the calendar's.
    pub fn season_for(&self, room: &Room) -> Season {
        room.season().unwrap_or_else(|| self.clock.season())
    }

    pub fn effective_weather(&self, room: &Room) -> Weather {
        fix_weather(self.weather, self.season_for(room))
    }

    /// Ask an interruptible [`TimeWeather::pass_time`] to stop at the next tick.
    pub fn request_interrupt(&mut self) {
        self.interrupt = true;
    }

    /// Let `seconds` of game time pass with the player in `room`.
    ///
    /// Fractions of a second are carried over to the next call. Every second is
    /// simulated so no day-part or dawn boundary is skipped. The weather rolls
    /// whenever the fine day-part changes, whether or not the player can see it;
    /// the message is only produced for rooms that can see outside.
    ///
    /// With `allow_interrupt`, a pending [`TimeWeather::request_interrupt`] or a
    /// visible weather change stops the loop. Time already passed is kept.
    ///
    /// # Errors
    /// Only if missing narrative text tips the error tracker into a cascade.
    pub fn pass_time(
        &mut self,
        seconds: f64,
        allow_interrupt: bool,
        room: &Room,
        errors: &mut ErrorTracker,
    ) -> Result<PassTime, ErrorCascade> {
        let whole = self.clock.accumulate(seconds);
        let mut outcome = PassTime::default();

        for _ in 0..whole {
            if allow_interrupt && self.interrupt {
                outcome.interrupted = true;
                break;
            }
            let before = self.clock.time_of_day(true);
            if self.clock.tick() {
                info!("dawn of {}", self.clock.date_string());
            }
            outcome.seconds += 1;

            let current = self.effective_weather(room);
            self.wind.tick(self.clock.time_passed(), current, &mut self.rng);

            if self.clock.time_of_day(true) != before {
                self.weather = self.data.transitions.roll(self.weather, &mut self.rng);
                debug!(
                    "{} begins, raw weather now {:?}",
                    self.clock.time_of_day(true).as_key(),
                    self.weather
                );
                if room.can_see_outside() {
                    let message = self.weather_message(room, errors)?;
                    if !message.is_empty() {
                        outcome.messages.push(message);
                        if allow_interrupt {
                            self.interrupt = true;
                        }
                    }
                }
            }
        }
        if allow_interrupt {
            self.interrupt = false;
        }
        Ok(outcome)
    }

    fn render_context(&self, room: &Room) -> RenderContext {
        RenderContext::for_room(room, self.wind.direction_name())
    }

    /// Message for the current day-part and weather.
    ///
    /// # Errors
    /// Only on an error cascade.
    pub fn weather_message(&self, room: &Room, errors: &mut ErrorTracker) -> Result<String, ErrorCascade> {
        let keys = narrative::weather_message_keys(self.clock.time_of_day(true), self.effective_weather(room));
        let template = self.data.strings.resolve(&keys, errors)?;
        narrative::render(&template, &self.render_context(room), errors)
    }

    /// Seasonal description of the sky as seen from `room`, empty if it cannot see outside.
    ///
    /// # Errors
    /// Only on an error cascade.
    pub fn weather_desc(&self, room: &Room, errors: &mut ErrorTracker) -> Result<String, ErrorCascade> {
        if !room.can_see_outside() {
            return Ok(String::new());
        }
        let keys = narrative::description_keys(
            self.season_for(room),
            self.clock.time_of_day(false),
            self.clock.tree_time(),
            self.effective_weather(room),
            room.tag(gale_data::RoomTag::Trees),
        );
        let template = self.data.strings.resolve(&keys, errors)?;
        narrative::render(&template, &self.render_context(room), errors)
    }

    pub fn save(&self, writer: &mut FileWriter) {
        writer.write_u32(SKY_SAVE_VERSION);
        writer.write_u16(self.clock.day());
        writer.write_u8(self.clock.moon());
        writer.write_u32(self.clock.time_of_day_seconds());
        writer.write_u64(self.clock.time_passed());
        writer.write_f64(self.clock.subsecond());
        writer.write_u8(self.weather as u8);
        writer.write_u8(self.wind.direction());
        writer.write_bool(self.wind.clockwise());
        writer.write_u64(self.wind.next_change());
    }

    /// Replace the sky state with a saved one. Nothing changes on error.
    ///
    /// # Errors
    /// - on version mismatch, truncation or any out-of-range value
    pub fn load(&mut self, reader: &mut FileReader<'_>) -> Result<(), SaveError> {
        reader.expect_version("sky", SKY_SAVE_VERSION)?;
        let day = reader.read_u16()?;
        let moon = reader.read_u8()?;
        let time_of_day = reader.read_u32()?;
        let time_passed = reader.read_u64()?;
        let subsecond = reader.read_f64()?;
        let clock = Clock::from_parts(day, moon, time_of_day, time_passed, subsecond)?;
        let raw = reader.read_u8()?;
        let weather = Weather::from_u8(raw).ok_or(SaveError::UnknownDiscriminant {
            kind: "weather",
            value: u32::from(raw),
        })?;
        let direction = reader.read_u8()?;
        let clockwise = reader.read_bool()?;
        let next_change = reader.read_u64()?;
        let wind = Wind::from_parts(direction, clockwise, next_change)?;

        self.clock = clock;
        self.weather = weather;
        self.wind = wind;
        self.interrupt = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gale_data::{RoomDef, RoomTag};

    fn data(row: &str) -> WeatherData {
        let mut entries: BTreeMap<String, String> =
            (0..9).map(|n| (format!("WMAP{n}"), row.to_string())).collect();
        entries.insert(
            "NOON_STORMY".into(),
            "[outside:Thunder rolls over the $LAND|CITY$.][indoors:Thunder rattles the windows.]".into(),
        );
        entries.insert("ANY_FAIR".into(), "The sky is fair.".into());
        WeatherData::from_entries(entries).unwrap()
    }

    fn room(tags: Vec<RoomTag>) -> Room {
        let def = RoomDef {
            name: vec!["a lane".into(), "lane".into()],
            desc: "A muddy lane.".into(),
            tags,
            ..RoomDef::default()
        };
        Room::from_def("lane", &def, 1)
    }

    fn sky_at(seconds: u32, weather: Weather, row: &str) -> TimeWeather {
        TimeWeather::from_state(
            Clock::from_parts(80, 0, seconds, 0, 0.0).unwrap(),
            weather,
            Wind::from_parts(3, true, 1_000_000).unwrap(),
            data(row),
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn strings_and_tables_are_split() {
        let data = data("9S");
        assert_eq!(data.strings.len(), 2);
        assert!(data.strings.get("WMAP0").is_none());
        assert_eq!(data.transitions.row(Weather::Clear), &[Weather::Stormy; 9]);
    }

    #[test]
    fn one_quiet_minute() {
        let mut sky = sky_at(39_660, Weather::Fair, "9S");
        let mut errors = ErrorTracker::new();
        let outcome = sky.pass_time(60.0, false, &room(vec![]), &mut errors).unwrap();
        assert_eq!(outcome.seconds, 60);
        assert!(outcome.messages.is_empty());
        assert_eq!(sky.clock().time_of_day_seconds(), 39_720);
        assert_eq!(sky.clock().day(), 80);
        assert_eq!(sky.raw_weather(), Weather::Fair);
        assert_eq!(errors.total_reported(), 0);
    }

    #[test]
    fn noon_rolls_the_weather() {
        let mut sky = sky_at(11 * 3600 + 59 * 60 + 30, Weather::Fair, "9S");
        let mut errors = ErrorTracker::new();
        let outcome = sky.pass_time(60.0, false, &room(vec![]), &mut errors).unwrap();
        assert_eq!(sky.raw_weather(), Weather::Stormy);
        assert_eq!(outcome.messages, vec!["Thunder rolls over the land.".to_string()]);

        let mut sky = sky_at(11 * 3600 + 59 * 60 + 30, Weather::Fair, "9S");
        let city_house = room(vec![RoomTag::Indoors, RoomTag::Windows, RoomTag::City]);
        let outcome = sky.pass_time(60.0, false, &city_house, &mut errors).unwrap();
        assert_eq!(outcome.messages, vec!["Thunder rattles the windows.".to_string()]);
    }

    #[test]
    fn weather_changes_unseen_underground() {
        let mut sky = sky_at(11 * 3600 + 59 * 60 + 30, Weather::Fair, "9S");
        let mut errors = ErrorTracker::new();
        let cellar = room(vec![RoomTag::Underground]);
        let outcome = sky.pass_time(60.0, false, &cellar, &mut errors).unwrap();
        assert!(outcome.messages.is_empty());
        assert_eq!(sky.raw_weather(), Weather::Stormy);
        assert_eq!(sky.weather_desc(&cellar, &mut errors).unwrap(), "");
    }

    #[test]
    fn fractions_carry_over() {
        let mut sky = sky_at(39_660, Weather::Fair, "9S");
        let mut errors = ErrorTracker::new();
        let lane = room(vec![]);
        assert_eq!(sky.pass_time(0.75, false, &lane, &mut errors).unwrap().seconds, 0);
        assert_eq!(sky.pass_time(0.5, false, &lane, &mut errors).unwrap().seconds, 1);
        assert_eq!(sky.clock().time_of_day_seconds(), 39_661);
    }

    #[test]
    fn visible_change_interrupts_a_wait() {
        let mut sky = sky_at(11 * 3600 + 59 * 60, Weather::Fair, "9S");
        let mut errors = ErrorTracker::new();
        let outcome = sky.pass_time(3600.0, true, &room(vec![]), &mut errors).unwrap();
        assert!(outcome.interrupted);
        assert_eq!(outcome.seconds, 60);
        assert_eq!(sky.clock().time_of_day_seconds(), 12 * 3600);

        sky.request_interrupt();
        let outcome = sky.pass_time(10.0, true, &room(vec![]), &mut errors).unwrap();
        assert!(outcome.interrupted);
        assert_eq!(outcome.seconds, 0);
    }

    #[test]
    fn sky_state_survives_save_and_load() {
        let mut sky = sky_at(3000, Weather::Sleet, "9S");
        let mut errors = ErrorTracker::new();
        sky.pass_time(5000.5, false, &room(vec![]), &mut errors).unwrap();

        let mut writer = FileWriter::with_header(1);
        sky.save(&mut writer);
        let bytes = writer.finish();

        let mut restored = TimeWeather::new_game(data("9S"), StdRng::seed_from_u64(1));
        let mut reader = FileReader::open(&bytes, "game", 1).unwrap();
        restored.load(&mut reader).unwrap();
        reader.finish().unwrap();
        assert_eq!(restored.clock(), sky.clock());
        assert_eq!(restored.raw_weather(), sky.raw_weather());
        assert_eq!(restored.wind(), sky.wind());
    }

    #[test]
    fn seasonal_override_changes_effective_weather() {
        let sky = sky_at(39_660, Weather::Blizzard, "9S");
        let mut lane = room(vec![]);
        assert_eq!(sky.effective_weather(&lane), Weather::Blizzard);
        let def = RoomDef {
            name: vec!["a hothouse garden".into(), "garden".into()],
            desc: "Warm.".into(),
            season: Some(Season::Summer),
            ..RoomDef::default()
        };
        lane = Room::from_def("garden", &def, 1);
        assert_eq!(sky.effective_weather(&lane), Weather::Stormy);
    }
}
