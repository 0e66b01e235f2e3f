//! Terminal styling.
//!
//! [`GameStyle`] is implemented for anything string-like, so both literals and
//! owned strings can be styled in place: `"Exits:".subheading_style()`.

use colored::{Color, ColoredString, Colorize};

const TITLE: Color = Color::TrueColor { r: 214, g: 120, b: 40 };
const PROSE: Color = Color::TrueColor { r: 150, g: 200, b: 235 };
const SKY: Color = Color::TrueColor { r: 185, g: 185, b: 225 };
const BRASS: Color = Color::TrueColor { r: 222, g: 184, b: 64 };
const MOSS: Color = Color::TrueColor { r: 96, g: 170, b: 96 };
const FRESH: Color = Color::TrueColor { r: 130, g: 225, b: 130 };
const RUST: Color = Color::TrueColor { r: 205, g: 60, b: 50 };

pub trait GameStyle {
    fn room_titlebar_style(&self) -> ColoredString;
    fn description_style(&self) -> ColoredString;
    /// Weather messages and sky descriptions.
    fn sky_style(&self) -> ColoredString;
    fn clock_style(&self) -> ColoredString;
    fn entity_style(&self) -> ColoredString;
    /// An exit leading somewhere not yet visited.
    fn exit_style(&self) -> ColoredString;
    fn exit_explored_style(&self) -> ColoredString;
    fn exit_locked_style(&self) -> ColoredString;
    fn subheading_style(&self) -> ColoredString;
    /// Refusals: blocked exits, unknown commands.
    fn denied_style(&self) -> ColoredString;
    fn error_style(&self) -> ColoredString;
}

impl<T: AsRef<str> + ?Sized> GameStyle for T {
    fn room_titlebar_style(&self) -> ColoredString {
        self.as_ref().color(TITLE).bold().underline()
    }
    fn description_style(&self) -> ColoredString {
        self.as_ref().color(PROSE)
    }
    fn sky_style(&self) -> ColoredString {
        self.as_ref().color(SKY).italic()
    }
    fn clock_style(&self) -> ColoredString {
        self.as_ref().color(BRASS)
    }
    fn entity_style(&self) -> ColoredString {
        self.as_ref().color(MOSS).underline()
    }
    fn exit_style(&self) -> ColoredString {
        self.as_ref().color(FRESH).italic()
    }
    fn exit_explored_style(&self) -> ColoredString {
        self.as_ref().color(MOSS).italic()
    }
    fn exit_locked_style(&self) -> ColoredString {
        self.as_ref().color(RUST).italic()
    }
    fn subheading_style(&self) -> ColoredString {
        self.as_ref().bold()
    }
    fn denied_style(&self) -> ColoredString {
        self.as_ref().color(RUST).italic()
    }
    fn error_style(&self) -> ColoredString {
        self.as_ref().color(RUST).bold()
    }
}
