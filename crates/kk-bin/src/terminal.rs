//! Raw-mode alternate screen for the interactive player.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::stdout;

/// RAII guard restoring the terminal even if the caller early-returns or panics.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    pub fn enter(title: &str) -> Result<Self> {
        enable_raw_mode()?;
        let guard = Self { active: true };
        execute!(stdout(), EnterAlternateScreen, Hide, SetTitle(title))?;
        Ok(guard)
    }

    pub fn leave(&mut self) -> Result<()> {
        if self.active {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.active = false;
        }
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}
