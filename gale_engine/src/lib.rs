#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]

pub const GALE_VERSION: &str = env!("CARGO_PKG_VERSION");

// Simulation
pub mod clock;
pub mod narrative;
pub mod time_weather;
pub mod weather;
pub mod wind;

// World and persistence
pub mod entity;
pub mod hashing;
pub mod region;
pub mod room;
pub mod save_files;
pub mod savefile;
pub mod world;

// Driver support
pub mod command;
pub mod config;
pub mod data_paths;
pub mod errors;
pub mod game;
pub mod loader;
pub mod repl;
pub mod style;

// Re-exports for convenience
pub use clock::Clock;
pub use config::{GaleConfig, load_config};
pub use errors::{ErrorCascade, ErrorTracker, Severity};
pub use game::{Game, GaleError};
pub use region::Region;
pub use repl::run_repl;
pub use room::{Room, RoomId};
pub use time_weather::{PassTime, TimeWeather, WeatherData};
pub use weather::Weather;
pub use world::{World, WorldError};
