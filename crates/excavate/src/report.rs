//! Verbosity-gated, colored progress output.
//!
//! A `Reporter` is built once in `main` from the parsed flags and handed by
//! `&mut` to every step of the run. Colors are only emitted when the target
//! stream is a terminal and `NO_COLOR` is unset.

use std::fmt::Display;
use std::io::{IsTerminal, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

pub const QUIET: u8 = 0;
pub const NORMAL: u8 = 1;
pub const DEBUG: u8 = 2;

pub fn resolve_color_choice(is_terminal: bool) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() || !is_terminal {
        return ColorChoice::Never;
    }
    ColorChoice::Auto
}

pub struct Reporter {
    verbosity: u8,
    stdout: StandardStream,
    stderr: StandardStream,
}

impl Reporter {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            stdout: StandardStream::stdout(resolve_color_choice(std::io::stdout().is_terminal())),
            stderr: StandardStream::stderr(resolve_color_choice(std::io::stderr().is_terminal())),
        }
    }

    /// Reporter that prints nothing except fatal errors.
    pub fn silent() -> Self {
        Self::new(QUIET)
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    fn emit(stream: &mut StandardStream, text: &dyn Display, color: Option<Color>) {
        if color.is_some() {
            let mut spec = ColorSpec::new();
            spec.set_fg(color);
            let _ = stream.set_color(&spec);
        }
        let _ = writeln!(stream, "{text}");
        if color.is_some() {
            let _ = stream.reset();
        }
        let _ = stream.flush();
    }

    /// Progress line, shown at verbosity >= 1.
    pub fn log(&mut self, msg: impl Display) {
        if self.verbosity >= NORMAL {
            Self::emit(&mut self.stdout, &msg, None);
        }
    }

    /// Section header (blue), shown at verbosity >= 1.
    pub fn header(&mut self, msg: impl Display) {
        if self.verbosity >= NORMAL {
            Self::emit(&mut self.stdout, &msg, Some(Color::Blue));
        }
    }

    /// Dry-run banner (yellow), shown at verbosity >= 1.
    pub fn banner(&mut self, msg: impl Display) {
        if self.verbosity >= NORMAL {
            Self::emit(&mut self.stdout, &msg, Some(Color::Yellow));
        }
    }

    pub fn debug(&mut self, msg: impl Display) {
        if self.verbosity >= DEBUG {
            Self::emit(&mut self.stdout, &msg, None);
        }
    }

    /// Errors that end the run are printed even when quiet.
    pub fn fatal(&mut self, msg: impl Display) {
        Self::emit(&mut self.stderr, &msg, Some(Color::Red));
    }
}
