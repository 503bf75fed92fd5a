use std::fmt::Display;

pub use anstream::eprintln as aeprintln;
pub use anstream::println as aprintln;

/// Tokyo Night color palette
pub mod colors {
    pub const RESET: &str = "\x1b[0m";

    pub const TKN_RED: &str = "\x1b[38;2;247;118;142m"; // #f7768e
    pub const TKN_GREEN: &str = "\x1b[38;2;158;206;106m"; // #9ece6a
    pub const TKN_YELLOW: &str = "\x1b[38;2;224;175;104m"; // #e0af68
    pub const TKN_BLUE: &str = "\x1b[38;2;122;162;247m"; // #7aa2f7
    pub const TKN_CYAN: &str = "\x1b[38;2;125;207;255m"; // #7dcfff
}

fn paint(color: &str, text: &str) -> String {
    format!("{}{}{}", color, text, colors::RESET)
}

/// Green text, used for additions and success messages.
pub fn p_g(text: &str) -> String {
    paint(colors::TKN_GREEN, text)
}

/// Red text, used for deletions and errors.
pub fn p_r(text: &str) -> String {
    paint(colors::TKN_RED, text)
}

/// Yellow text, used for in-place updates.
pub fn p_y(text: &str) -> String {
    paint(colors::TKN_YELLOW, text)
}

pub fn p_b(text: &str) -> String {
    paint(colors::TKN_BLUE, text)
}

pub fn p_c(text: &str) -> String {
    paint(colors::TKN_CYAN, text)
}

/// Colors a plan line by its leading marker: `+` add, `-` remove, `~` change.
pub fn mark(line: &str) -> String {
    match line.trim_start().chars().next() {
        Some('+') => p_g(line),
        Some('-') => p_r(line),
        Some('~') => p_y(line),
        _ => line.to_string(),
    }
}

/// Console output that honors `--silent`. Errors are always printed.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    silent: bool,
}

impl Output {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn line(&self, text: impl Display) {
        if !self.silent {
            aprintln!("{text}");
        }
    }

    /// Prints a titled block of plan lines.
    pub fn plan(&self, title: &str, lines: &[String]) {
        if self.silent {
            return;
        }
        aprintln!("{}", p_c(title));
        for line in lines {
            aprintln!("  {}", mark(line));
        }
        aprintln!();
    }

    pub fn error(&self, text: impl Display) {
        aeprintln!("{} {text}", p_r("error:"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_wraps_in_reset() {
        let text = p_g("ok");
        assert!(text.starts_with(colors::TKN_GREEN));
        assert!(text.ends_with(colors::RESET));
        assert!(text.contains("ok"));
    }

    #[test]
    fn test_mark_follows_leading_marker() {
        assert!(mark("+ Create table: real").starts_with(colors::TKN_GREEN));
        assert!(mark("  + GSI: GSI-A1").starts_with(colors::TKN_GREEN));
        assert!(mark("- Delete table: real").starts_with(colors::TKN_RED));
        assert!(mark("~ Update table: real").starts_with(colors::TKN_YELLOW));
        assert_eq!(mark("= Table 'real' is up to date"), "= Table 'real' is up to date");
    }
}
