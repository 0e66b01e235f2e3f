//! Weather states and the Markov transition tables that drive them.
//!
//! Each weather state has an authored transition string: one letter per
//! possible outcome, so the frequency of a letter is the weight of that
//! destination. Tables are stored run-length compressed (`4cab2z` is
//! `ccccabzz`) in the strings file under the keys `WMAP0` to `WMAP8`.

use gale_data::Season;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Weather {
    Blizzard = 0,
    Stormy,
    Rain,
    Clear,
    Fair,
    Overcast,
    Fog,
    LightSnow,
    Sleet,
}

impl Weather {
    pub const ALL: [Weather; 9] = [
        Weather::Blizzard,
        Weather::Stormy,
        Weather::Rain,
        Weather::Clear,
        Weather::Fair,
        Weather::Overcast,
        Weather::Fog,
        Weather::LightSnow,
        Weather::Sleet,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_u8(value: u8) -> Option<Weather> {
        Weather::ALL.get(usize::from(value)).copied()
    }

    /// Map a transition-table letter to a weather state.
    pub fn from_code(code: char) -> Option<Weather> {
        let weather = match code {
            'c' => Weather::Clear,
            'f' => Weather::Fair,
            'r' => Weather::Rain,
            'F' => Weather::Fog,
            'S' => Weather::Stormy,
            'o' => Weather::Overcast,
            'b' => Weather::Blizzard,
            'l' => Weather::LightSnow,
            'L' => Weather::Sleet,
            _ => return None,
        };
        Some(weather)
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Weather::Blizzard => "BLIZZARD",
            Weather::Stormy => "STORMY",
            Weather::Rain => "RAIN",
            Weather::Clear => "CLEAR",
            Weather::Fair => "FAIR",
            Weather::Overcast => "OVERCAST",
            Weather::Fog => "FOG",
            Weather::LightSnow => "LIGHTSNOW",
            Weather::Sleet => "SLEET",
        }
    }

    pub fn is_storm(self) -> bool {
        matches!(self, Weather::Blizzard | Weather::Stormy)
    }
}

/// Replace weather that cannot happen in `season` with its warm-weather counterpart.
///
/// Raw weather is never shown to the player without passing through here.
pub fn fix_weather(weather: Weather, season: Season) -> Weather {
    match (season, weather) {
        (Season::Spring, Weather::Sleet) => Weather::Rain,
        (Season::Summer | Season::Autumn, Weather::Blizzard) => Weather::Stormy,
        (Season::Summer | Season::Autumn, Weather::LightSnow | Weather::Sleet) => Weather::Rain,
        _ => weather,
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WeatherDataError {
    #[error("weather transition table {0} is missing")]
    MissingTable(String),
    #[error("weather transition table {0} is empty")]
    EmptyTable(String),
    #[error("weather transition table {key} uses unknown weather code '{code}'")]
    UnknownCode { key: String, code: char },
    #[error("run-length string '{0}' ends with a count and nothing to repeat")]
    DanglingCount(String),
    #[error("run-length count in '{0}' is too large")]
    CountOverflow(String),
}

/// Longest run a single count may ask for.
pub const MAX_RUN: u32 = 1000;

/// Expand a run-length compressed string: a decimal count repeats the character after it.
///
/// # Errors
/// - if the input ends with a count
/// - if a count exceeds [`MAX_RUN`]
pub fn decompress(input: &str) -> Result<String, WeatherDataError> {
    let mut out = String::with_capacity(input.len());
    let mut count: Option<u32> = None;
    for ch in input.chars() {
        if let Some(digit) = ch.to_digit(10) {
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit))
                .filter(|n| *n <= MAX_RUN)
                .ok_or_else(|| WeatherDataError::CountOverflow(input.to_string()))?;
            count = Some(next);
            continue;
        }
        for _ in 0..count.take().unwrap_or(1) {
            out.push(ch);
        }
    }
    if count.is_some() {
        return Err(WeatherDataError::DanglingCount(input.to_string()));
    }
    Ok(out)
}

/// Decoded transition rows, one per weather state in [`Weather::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    rows: Vec<Vec<Weather>>,
}

impl TransitionTable {
    /// Build the table from the compressed `WMAPn` strings.
    ///
    /// # Errors
    /// - if any row is missing, empty after decoding, or contains an unknown code
    pub fn from_compressed<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Result<Self, WeatherDataError> {
        let mut rows = Vec::with_capacity(Weather::ALL.len());
        for weather in Weather::ALL {
            let key = format!("WMAP{}", weather.index());
            let encoded = lookup(&key).ok_or_else(|| WeatherDataError::MissingTable(key.clone()))?;
            let decoded = decompress(encoded)?;
            if decoded.is_empty() {
                return Err(WeatherDataError::EmptyTable(key));
            }
            let row = decoded
                .chars()
                .map(|code| {
                    Weather::from_code(code).ok_or_else(|| WeatherDataError::UnknownCode {
                        key: key.clone(),
                        code,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    /// Outcomes listed for `weather`, with repeats.
    pub fn row(&self, weather: Weather) -> &[Weather] {
        &self.rows[weather.index()]
    }

    /// Draw the next raw weather state.
    pub fn roll(&self, current: Weather, rng: &mut impl Rng) -> Weather {
        let row = self.row(current);
        row[rng.random_range(0..row.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    const SEASONS: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    fn sample_tables() -> HashMap<String, String> {
        let rows = [
            "8b4l3S2o3L",
            "6S8r3o2b1L",
            "8r3S4o2f1F1L1l",
            "9c7f2o1F1l",
            "4c8f5o1r1F1l",
            "2f7o5r1S2F2l1L",
            "7F4o3f2c3r1l",
            "7l3b3o2L2c3f",
            "6L4r3l3o2S2b",
        ];
        rows.iter()
            .enumerate()
            .map(|(idx, row)| (format!("WMAP{idx}"), (*row).to_string()))
            .collect()
    }

    #[test]
    fn decompress_expands_runs() {
        assert_eq!(decompress("4cab2z").unwrap(), "ccccabzz");
        assert_eq!(decompress("").unwrap(), "");
        assert_eq!(decompress("12c").unwrap(), "c".repeat(12));
        assert_eq!(decompress("0xy").unwrap(), "y");
        assert!(matches!(decompress("ab3"), Err(WeatherDataError::DanglingCount(_))));
    }

    #[test]
    fn oversized_runs_are_refused() {
        assert_eq!(decompress("1000c").unwrap().len(), 1000);
        assert!(matches!(decompress("1001c"), Err(WeatherDataError::CountOverflow(_))));
        assert!(matches!(decompress("4294967295c"), Err(WeatherDataError::CountOverflow(_))));
        assert!(matches!(decompress("99999999999999999999c"), Err(WeatherDataError::CountOverflow(_))));
    }

    #[test]
    fn fix_weather_is_idempotent_and_seasonal() {
        for season in SEASONS {
            for weather in Weather::ALL {
                let fixed = fix_weather(weather, season);
                assert_eq!(fix_weather(fixed, season), fixed);
                if season != Season::Winter {
                    assert_ne!(fixed, Weather::Sleet);
                }
                if matches!(season, Season::Summer | Season::Autumn) {
                    assert_ne!(fixed, Weather::Blizzard);
                    assert_ne!(fixed, Weather::LightSnow);
                }
            }
        }
        assert_eq!(fix_weather(Weather::Blizzard, Season::Winter), Weather::Blizzard);
        assert_eq!(fix_weather(Weather::LightSnow, Season::Spring), Weather::LightSnow);
        assert_eq!(fix_weather(Weather::Blizzard, Season::Summer), Weather::Stormy);
    }

    #[test]
    fn codes_cover_every_state() {
        let codes = "cfrFSobl L";
        let decoded: Vec<_> = codes.chars().filter_map(Weather::from_code).collect();
        assert_eq!(decoded.len(), 9);
        for weather in Weather::ALL {
            assert!(decoded.contains(&weather));
            assert_eq!(Weather::from_u8(weather as u8), Some(weather));
        }
    }

    #[test]
    fn table_rows_follow_letter_frequency() {
        let tables = sample_tables();
        let table = TransitionTable::from_compressed(|key| tables.get(key).map(String::as_str)).unwrap();
        let clear_row = table.row(Weather::Clear);
        assert_eq!(clear_row.len(), 20);
        assert_eq!(clear_row.iter().filter(|w| **w == Weather::Clear).count(), 9);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let next = table.roll(Weather::Clear, &mut rng);
            assert!(clear_row.contains(&next));
        }
    }

    #[test]
    fn missing_or_bad_tables_are_errors() {
        let mut tables = sample_tables();
        tables.remove("WMAP4");
        let err = TransitionTable::from_compressed(|key| tables.get(key).map(String::as_str)).unwrap_err();
        assert_eq!(err, WeatherDataError::MissingTable("WMAP4".into()));

        let mut tables = sample_tables();
        tables.insert("WMAP2".into(), "3r2x".into());
        let err = TransitionTable::from_compressed(|key| tables.get(key).map(String::as_str)).unwrap_err();
        assert!(matches!(err, WeatherDataError::UnknownCode { code: 'x', .. }));

        let mut tables = sample_tables();
        tables.insert("WMAP0".into(), String::new());
        let err = TransitionTable::from_compressed(|key| tables.get(key).map(String::as_str)).unwrap_err();
        assert_eq!(err, WeatherDataError::EmptyTable("WMAP0".into()));
    }
}
