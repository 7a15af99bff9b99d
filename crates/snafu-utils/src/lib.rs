//! Shared error plumbing for the IPAM crates.
//!
//! Error enums in this workspace capture the source position at which they
//! were raised through an implicit [`Location`] field, expose it through
//! [`Located`], and are rendered for humans by [`Report`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::{boxed::Box, string::String};
use core::{error::Error, fmt};

use snafu::{GenerateImplicitData, Snafu};

pub use self::style::Color;
use self::style::Paint;

mod style;

/// Source position at which an error value was created.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Errors that know where they were raised.
pub trait Located {
    fn location(&self) -> Location;
}

#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct GenericError {
    message: String,
    #[snafu(implicit)]
    location: Location,
    #[snafu(source(from(Box<dyn Error>, Some)))]
    source: Option<Box<dyn Error>>,
}

impl Located for GenericError {
    fn location(&self) -> Location {
        self.location
    }
}

/// Human readable rendering of an error and its `source()` chain.
pub struct Report<E> {
    error: E,
    color: bool,
}

impl<E> fmt::Debug for Report<E>
where
    E: Error + Located,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error + Located,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.paint(Color::Red, &self.error))?;
        writeln!(
            f,
            "  at {}",
            self.paint(Color::DarkGray, self.error.location())
        )?;
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {}", self.paint(Color::Red, s))?;
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

impl<E> Report<E> {
    /// Creates a report rendered with ANSI colors.
    pub fn new(error: E) -> Self {
        Self { error, color: true }
    }

    /// Enables or disables ANSI colors.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn error(&self) -> &E {
        &self.error
    }

    fn paint<T>(&self, color: Color, value: T) -> Paint<T> {
        Paint::new(self.color.then_some(color), value)
    }
}
