//! Narrative text for the sky: string lookup, conditional tags and tokens.
//!
//! Templates come from the strings YAML and may contain two kinds of markup:
//!
//! - `[tag:text]` blocks, kept (without the brackets) when `tag` holds for the
//!   player's room and removed entirely when it does not. Known tags are
//!   `outside`, `indoors`, `city`, `wild`, `trees` and `windows`.
//! - `$TOKEN$` markers, replaced with a literal. `$WIND_DIR$` becomes the wind
//!   direction; the paired tokens such as `$LAND|CITY$` pick the left or right
//!   word depending on whether the room is in a city.

use std::collections::HashMap;
use std::sync::LazyLock;

use gale_data::{RoomTag, Season};
use regex::Regex;

use crate::clock::TimeOfDay;
use crate::errors::{ErrorCascade, ErrorTracker, Severity};
use crate::room::Room;
use crate::weather::Weather;

/// Fallback prefix for strings that apply at any time or season.
pub const ANY_PREFIX: &str = "ANY";

const CITY_TOKENS: [(&str, &str, &str); 4] = [
    ("$LAND|CITY$", "land", "city"),
    ("$LANDSCAPE|CITYSCAPE$", "landscape", "cityscape"),
    ("$GROUND|STREETS$", "ground", "streets"),
    ("$FIELDS|ROOFTOPS$", "fields", "rooftops"),
];

static LEFTOVER_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([a-z_]+):").expect("valid regex"));

/// Immutable map of template strings, keyed like `DAWN_RAIN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMap {
    strings: HashMap<String, String>,
}

impl FromIterator<(String, String)> for StringMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        StringMap {
            strings: iter.into_iter().collect(),
        }
    }
}

impl StringMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.strings.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Exact lookup. A missing key is reported and resolves to an empty string.
    ///
    /// # Errors
    /// Only if the report tips the error tracker into a cascade.
    pub fn lookup(&self, key: &str, errors: &mut ErrorTracker) -> Result<String, ErrorCascade> {
        self.resolve(&[key], errors)
    }

    /// First template found among `keys`, most specific first.
    ///
    /// Nothing is reported unless every key misses.
    ///
    /// # Errors
    /// Only if the report tips the error tracker into a cascade.
    pub fn resolve<K: AsRef<str>>(&self, keys: &[K], errors: &mut ErrorTracker) -> Result<String, ErrorCascade> {
        if let Some(found) = keys.iter().find_map(|key| self.get(key.as_ref())) {
            return Ok(found.to_string());
        }
        let wanted = keys.first().map_or("", AsRef::as_ref);
        errors.report(Severity::Error, &format!("missing narrative string '{wanted}'"))?;
        Ok(String::new())
    }
}

/// What a template needs to know about where the player is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    pub indoors: bool,
    pub city: bool,
    pub trees: bool,
    pub windows: bool,
    pub wind_dir: &'static str,
}

impl RenderContext {
    pub fn for_room(room: &Room, wind_dir: &'static str) -> RenderContext {
        RenderContext {
            indoors: room.tag(RoomTag::Indoors),
            city: room.tag(RoomTag::City),
            trees: room.tag(RoomTag::Trees),
            windows: room.tag(RoomTag::Windows),
            wind_dir,
        }
    }

    fn tags(&self) -> [(&'static str, bool); 6] {
        [
            ("outside", !self.indoors),
            ("indoors", self.indoors),
            ("city", self.city),
            ("wild", !self.city),
            ("trees", self.trees),
            ("windows", self.windows),
        ]
    }
}

/// Resolve every `[tag:...]` block for one tag name.
///
/// An unclosed block stops processing for that tag and is left in place.
pub fn process_conditional_tags(text: &str, tag: &str, active: bool) -> String {
    let open = format!("[{tag}:");
    let mut out = text.to_string();
    while let Some(start) = out.find(&open) {
        let inner = start + open.len();
        let Some(len) = out[inner..].find(']') else {
            break;
        };
        let end = inner + len;
        let kept = if active { out[inner..end].to_string() } else { String::new() };
        out.replace_range(start..=end, &kept);
    }
    out
}

/// Replace the `$...$` tokens.
pub fn substitute_tokens(text: &str, ctx: &RenderContext) -> String {
    let mut out = text.replace("$WIND_DIR$", ctx.wind_dir);
    for (token, land, city) in CITY_TOKENS {
        if out.contains(token) {
            out = out.replace(token, if ctx.city { city } else { land });
        }
    }
    out
}

/// Fully render a template for the given room context.
///
/// # Errors
/// Only if reporting a leftover unknown tag tips the tracker into a cascade.
pub fn render(template: &str, ctx: &RenderContext, errors: &mut ErrorTracker) -> Result<String, ErrorCascade> {
    let mut text = template.to_string();
    for (tag, active) in ctx.tags() {
        text = process_conditional_tags(&text, tag, active);
    }
    if let Some(caps) = LEFTOVER_TAG.captures(&text) {
        errors.report(Severity::Warn, &format!("unknown conditional tag '{}' in narrative text", &caps[1]))?;
    }
    Ok(substitute_tokens(&text, ctx))
}

/// Lookup order for the message shown when the weather changes.
pub fn weather_message_keys(fine_time: TimeOfDay, weather: Weather) -> Vec<String> {
    vec![
        format!("{}_{}", fine_time.as_key(), weather.as_key()),
        format!("{ANY_PREFIX}_{}", weather.as_key()),
    ]
}

/// Lookup order for the seasonal sky description of a room.
///
/// Rooms with trees use the day/night tree time and the `_TREES` suffix.
pub fn description_keys(
    season: Season,
    coarse: TimeOfDay,
    tree_time: TimeOfDay,
    weather: Weather,
    trees: bool,
) -> Vec<String> {
    let season = season.as_key();
    let weather = weather.as_key();
    let mut keys = Vec::with_capacity(4);
    if trees {
        keys.push(format!("{season}_{}_{weather}_TREES", tree_time.as_key()));
    }
    keys.push(format!("{season}_{}_{weather}", coarse.as_key()));
    keys.push(format!("{season}_{weather}"));
    keys.push(format!("{ANY_PREFIX}_{weather}"));
    keys
}
