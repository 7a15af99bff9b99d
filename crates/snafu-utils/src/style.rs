use core::fmt;

/// Foreground colors used when rendering reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    DarkGray,
    Red,
}

impl Color {
    fn fg(self) -> u8 {
        match self {
            Self::DarkGray => 90,
            Self::Red => 31,
        }
    }
}

/// Displays a value, optionally wrapped in an ANSI color sequence.
pub(crate) struct Paint<T> {
    color: Option<Color>,
    value: T,
}

impl<T> Paint<T> {
    pub(crate) fn new(color: Option<Color>, value: T) -> Self {
        Self { color, value }
    }
}

impl<T> fmt::Display for Paint<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = &self.value;
        match self.color {
            Some(color) => write!(f, "\x1B[{};1m{value}\x1B[0m", color.fg()),
            None => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paint() {
        assert_eq!(Paint::new(None, "text").to_string(), "text");
    }

    #[test]
    fn test_colored_paint() {
        assert_eq!(
            Paint::new(Some(Color::DarkGray), 42).to_string(),
            "\x1B[90;1m42\x1B[0m"
        );
    }
}
