//! Command module
//!
//! The handful of commands the driver understands.
use gale_data::Direction;
use variantly::Variantly;

/// Commands that can be executed by the player.
#[derive(Debug, Clone, PartialEq, Eq, Variantly)]
pub enum Command {
    Close(Direction),
    Go(Direction),
    Help,
    Look,
    Open(Direction),
    Quit,
    Save,
    Slots,
    Time,
    /// Minutes to wait.
    Wait(u32),
    Unknown(String),
}

const DEFAULT_WAIT_MINUTES: u32 = 10;
/// A day.
pub const MAX_WAIT_MINUTES: u32 = 24 * 60;

/// Parses an input line into a `Command`.
pub fn parse_command(input: &str) -> Command {
    let lowered = input.trim().to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    match words.as_slice() {
        ["look" | "l"] => Command::Look,
        ["time" | "date"] => Command::Time,
        ["wait" | "z"] => Command::Wait(DEFAULT_WAIT_MINUTES),
        ["wait", minutes] | ["wait", minutes, "minutes" | "minute" | "min"] => match minutes.parse() {
            Ok(minutes) => Command::Wait(u32::min(minutes, MAX_WAIT_MINUTES)),
            Err(_) => Command::Unknown(lowered.clone()),
        },
        ["save"] => Command::Save,
        ["slots" | "saves"] => Command::Slots,
        ["help" | "?"] => Command::Help,
        ["quit" | "exit" | "q"] => Command::Quit,
        ["open", dir] => Direction::parse(dir).map_or_else(|| Command::Unknown(lowered.clone()), Command::Open),
        ["close", dir] => Direction::parse(dir).map_or_else(|| Command::Unknown(lowered.clone()), Command::Close),
        ["go" | "walk", dir] | [dir] => {
            Direction::parse(dir).map_or_else(|| Command::Unknown(lowered.clone()), Command::Go)
        },
        _ => Command::Unknown(lowered.clone()),
    }
}
