//! Wind direction and its slow drift around the compass.

use std::ops::RangeInclusive;

use log::debug;
use rand::Rng;
use thiserror::Error;

use crate::weather::Weather;

const STORM_RESCHEDULE: RangeInclusive<u64> = 1800..=3600;
const CALM_RESCHEDULE: RangeInclusive<u64> = 7200..=14_400;
/// Storms never leave the wind alone for longer than this.
const STORM_MAX_WAIT: u64 = 3600;

const COMPASS_NAMES: [&str; 8] = [
    "north",
    "north-east",
    "east",
    "south-east",
    "south",
    "south-west",
    "west",
    "north-west",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("wind direction {0} is outside 1..=8")]
pub struct WindDirectionError(pub u8);

/// One step around the 1-based compass, clockwise or not.
pub fn step_direction(direction: u8, clockwise: bool) -> u8 {
    let delta: i16 = if clockwise { 1 } else { -1 };
    let stepped = (i16::from(direction) - 1 + delta + 8).rem_euclid(8) + 1;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let stepped = stepped as u8;
    stepped
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wind {
    direction: u8,
    clockwise: bool,
    next_change: u64,
}

impl Wind {
    /// Random direction and sense, first change two to four hours out.
    pub fn new_game(now: u64, rng: &mut impl Rng) -> Wind {
        Wind {
            direction: rng.random_range(1..=8),
            clockwise: rng.random_bool(0.5),
            next_change: now + rng.random_range(CALM_RESCHEDULE),
        }
    }

    /// # Errors
    /// - if `direction` is not a compass point
    pub fn from_parts(direction: u8, clockwise: bool, next_change: u64) -> Result<Wind, WindDirectionError> {
        if !(1..=8).contains(&direction) {
            return Err(WindDirectionError(direction));
        }
        Ok(Wind {
            direction,
            clockwise,
            next_change,
        })
    }

    pub fn direction(&self) -> u8 {
        self.direction
    }

    pub fn clockwise(&self) -> bool {
        self.clockwise
    }

    pub fn next_change(&self) -> u64 {
        self.next_change
    }

    pub fn direction_name(&self) -> &'static str {
        COMPASS_NAMES[usize::from(self.direction - 1)]
    }

    /// Evaluate the wind for the second `now`. Returns true if it changed.
    pub fn tick(&mut self, now: u64, weather: Weather, rng: &mut impl Rng) -> bool {
        let storm = weather.is_storm();
        if storm && self.next_change > now + STORM_MAX_WAIT {
            self.next_change = now + rng.random_range(STORM_RESCHEDULE);
        }
        if now <= self.next_change {
            return false;
        }

        let (reschedule, randomise, flip) = if storm {
            (STORM_RESCHEDULE, 0.5, 0.8)
        } else {
            (CALM_RESCHEDULE, 0.1, 0.35)
        };
        self.next_change = now + rng.random_range(reschedule);

        if rng.random_bool(randomise) {
            self.direction = rng.random_range(1..=8);
            self.clockwise = rng.random_bool(0.5);
        } else if rng.random_bool(flip) {
            self.clockwise = !self.clockwise;
        } else {
            self.direction = step_direction(self.direction, self.clockwise);
        }
        debug!(
            "wind now from the {} ({}), next change at {}",
            self.direction_name(),
            if self.clockwise { "veering" } else { "backing" },
            self.next_change
        );
        true
    }
}
