//! In-game calendar.
//!
//! The clock counts seconds within a day, days within a 364-day year (13 months
//! of 28 days) and days within a 29-day lunar cycle. Dawn at 7:00, not
//! midnight, is when the day and moon counters roll over.

use gale_data::Season;
use thiserror::Error;

pub const SECONDS_PER_MINUTE: u32 = 60;
pub const SECONDS_PER_DAY: u32 = 86_400;
pub const DAYS_PER_YEAR: u16 = 364;
pub const DAYS_PER_MONTH: u16 = 28;
pub const LUNAR_CYCLE: u8 = 29;
/// Minute of the day at which the calendar rolls over.
pub const DAWN_MINUTE: u32 = 420;

const DAY_NAMES: [&str; 7] = [
    "Dawnday", "Tideday", "Windsday", "Thornsday", "Fireday", "Starday", "Restday",
];

const MONTH_NAMES: [&str; 13] = [
    "Deepwinter",
    "Frostwane",
    "Thaw",
    "Seedtime",
    "Greening",
    "Blossom",
    "Highsun",
    "Haymaking",
    "Harvest",
    "Leaffall",
    "Mistmonth",
    "Darkening",
    "Yearsend",
];

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClockError {
    #[error("day {0} is outside 1..={DAYS_PER_YEAR}")]
    Day(u16),
    #[error("moon {0} is outside the lunar cycle")]
    Moon(u8),
    #[error("time of day {0}s is outside a single day")]
    TimeOfDay(u32),
    #[error("sub-second accumulator {0} is outside [0, 1)")]
    Subsecond(f64),
}

/// A named part of the day. `Day` only appears at coarse granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeOfDay {
    Dawn,
    Sunrise,
    Morning,
    Noon,
    Sunset,
    Dusk,
    Night,
    Midnight,
    Day,
}

impl TimeOfDay {
    pub fn as_key(self) -> &'static str {
        match self {
            TimeOfDay::Dawn => "DAWN",
            TimeOfDay::Sunrise => "SUNRISE",
            TimeOfDay::Morning => "MORNING",
            TimeOfDay::Noon => "NOON",
            TimeOfDay::Sunset => "SUNSET",
            TimeOfDay::Dusk => "DUSK",
            TimeOfDay::Night => "NIGHT",
            TimeOfDay::Midnight => "MIDNIGHT",
            TimeOfDay::Day => "DAY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoonPhase {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    ThirdQuarter,
    WaningCrescent,
}

impl MoonPhase {
    pub fn name(self) -> &'static str {
        match self {
            MoonPhase::New => "new moon",
            MoonPhase::WaxingCrescent => "waxing crescent",
            MoonPhase::FirstQuarter => "first quarter",
            MoonPhase::WaxingGibbous => "waxing gibbous",
            MoonPhase::Full => "full moon",
            MoonPhase::WaningGibbous => "waning gibbous",
            MoonPhase::ThirdQuarter => "third quarter",
            MoonPhase::WaningCrescent => "waning crescent",
        }
    }
}

/// Season for a day of the year.
pub fn season_for_day(day: u16) -> Season {
    if day < 79 {
        Season::Winter
    } else if day < 172 {
        Season::Spring
    } else if day <= 266 {
        Season::Summer
    } else if day <= 355 {
        Season::Autumn
    } else {
        Season::Winter
    }
}

/// Moon phase for a position in the lunar cycle.
pub fn moon_phase_for(moon: u8) -> MoonPhase {
    match moon {
        0 => MoonPhase::New,
        1..=6 => MoonPhase::WaxingCrescent,
        7..=9 => MoonPhase::FirstQuarter,
        10..=14 => MoonPhase::WaxingGibbous,
        15 => MoonPhase::Full,
        16..=20 => MoonPhase::WaningGibbous,
        21..=23 => MoonPhase::ThirdQuarter,
        _ => MoonPhase::WaningCrescent,
    }
}

/// Day-part for a minute of the day.
pub fn time_of_day_for(minute: u32, fine: bool) -> TimeOfDay {
    if fine {
        match minute {
            0..60 => TimeOfDay::Midnight,
            420..480 => TimeOfDay::Dawn,
            480..540 => TimeOfDay::Sunrise,
            540..720 => TimeOfDay::Morning,
            720..1020 => TimeOfDay::Noon,
            1020..1140 => TimeOfDay::Sunset,
            1140..1260 => TimeOfDay::Dusk,
            _ => TimeOfDay::Night,
        }
    } else {
        match minute {
            420..540 => TimeOfDay::Dawn,
            540..1140 => TimeOfDay::Day,
            1140..1260 => TimeOfDay::Dusk,
            _ => TimeOfDay::Night,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    day: u16,
    moon: u8,
    time_of_day: u32,
    time_passed: u64,
    subsecond: f64,
}

impl Default for Clock {
    /// Late morning on the first day of spring.
    fn default() -> Self {
        Self {
            day: 80,
            moon: 0,
            time_of_day: 11 * 3600,
            time_passed: 0,
            subsecond: 0.0,
        }
    }
}

impl Clock {
    /// Rebuild a clock from saved values, rejecting anything out of range.
    ///
    /// # Errors
    /// - if any field breaks its range invariant
    pub fn from_parts(
        day: u16,
        moon: u8,
        time_of_day: u32,
        time_passed: u64,
        subsecond: f64,
    ) -> Result<Clock, ClockError> {
        if !(1..=DAYS_PER_YEAR).contains(&day) {
            return Err(ClockError::Day(day));
        }
        if moon >= LUNAR_CYCLE {
            return Err(ClockError::Moon(moon));
        }
        if time_of_day >= SECONDS_PER_DAY {
            return Err(ClockError::TimeOfDay(time_of_day));
        }
        if !(0.0..1.0).contains(&subsecond) {
            return Err(ClockError::Subsecond(subsecond));
        }
        Ok(Clock {
            day,
            moon,
            time_of_day,
            time_passed,
            subsecond,
        })
    }

    pub fn day(&self) -> u16 {
        self.day
    }

    pub fn moon(&self) -> u8 {
        self.moon
    }

    /// Seconds since midnight.
    pub fn time_of_day_seconds(&self) -> u32 {
        self.time_of_day
    }

    /// Whole seconds simulated since the game began.
    pub fn time_passed(&self) -> u64 {
        self.time_passed
    }

    pub fn subsecond(&self) -> f64 {
        self.subsecond
    }

    pub fn minute_of_day(&self) -> u32 {
        self.time_of_day / SECONDS_PER_MINUTE
    }

    /// Add fractional seconds to the accumulator and take out the whole seconds
    /// now ready to be simulated.
    pub fn accumulate(&mut self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        self.subsecond += seconds;
        let whole = self.subsecond.floor();
        self.subsecond -= whole;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = whole as u64;
        whole
    }

    /// Advance by one second. Returns true if dawn was crossed.
    pub fn tick(&mut self) -> bool {
        let before = self.time_of_day;
        self.time_of_day = (self.time_of_day + 1) % SECONDS_PER_DAY;
        self.time_passed += 1;

        let dawn = DAWN_MINUTE * SECONDS_PER_MINUTE;
        let crossed_dawn = before < dawn && self.time_of_day >= dawn;
        if crossed_dawn {
            self.day = if self.day >= DAYS_PER_YEAR { 1 } else { self.day + 1 };
            self.moon = (self.moon + 1) % LUNAR_CYCLE;
        }
        crossed_dawn
    }

    /// Advance by whole seconds, one at a time.
    pub fn advance(&mut self, whole_seconds: u64) {
        for _ in 0..whole_seconds {
            self.tick();
        }
    }

    pub fn season(&self) -> Season {
        season_for_day(self.day)
    }

    pub fn moon_phase(&self) -> MoonPhase {
        moon_phase_for(self.moon)
    }

    pub fn time_of_day(&self, fine: bool) -> TimeOfDay {
        time_of_day_for(self.minute_of_day(), fine)
    }

    /// The day/night split used for descriptions of trees.
    pub fn tree_time(&self) -> TimeOfDay {
        match self.minute_of_day() {
            420..1140 => TimeOfDay::Day,
            _ => TimeOfDay::Night,
        }
    }

    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[usize::from((self.day - 1) % 7)]
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[usize::from((self.day - 1) / DAYS_PER_MONTH)]
    }

    pub fn day_of_month(&self) -> u16 {
        (self.day - 1) % DAYS_PER_MONTH + 1
    }

    /// Twelve-hour clock reading, e.g. `11:01am`.
    pub fn time_string(&self) -> String {
        let minute = self.minute_of_day();
        let (hour, min) = (minute / 60, minute % 60);
        let suffix = if hour < 12 { "am" } else { "pm" };
        let hour12 = match hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{hour12}:{min:02}{suffix}")
    }

    /// e.g. `Windsday, the 3rd of Thaw`.
    pub fn date_string(&self) -> String {
        let dom = self.day_of_month();
        let suffix = match (dom % 10, dom % 100) {
            (1, n) if n != 11 => "st",
            (2, n) if n != 12 => "nd",
            (3, n) if n != 13 => "rd",
            _ => "th",
        };
        format!("{}, the {dom}{suffix} of {}", self.day_name(), self.month_name())
    }
}
