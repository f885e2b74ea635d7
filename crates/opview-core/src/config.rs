#![forbid(unsafe_code)]

//! Window sizing configuration and environment overrides.
//!
//! # Environment Variables
//!
//! - `OPVIEW_ROW_HEIGHT` - estimated height of one row, in viewport units
//! - `OPVIEW_INITIAL_SCREENS` - screens of rows materialized on a new view
//! - `OPVIEW_LOOKAHEAD_SCREENS` - distance from the bottom that triggers growth
//! - `OPVIEW_BATCH_SIZE` - rows added per growth step
//!
//! Values that are not positive integers are ignored.

pub const ENV_ROW_HEIGHT: &str = "OPVIEW_ROW_HEIGHT";
pub const ENV_INITIAL_SCREENS: &str = "OPVIEW_INITIAL_SCREENS";
pub const ENV_LOOKAHEAD_SCREENS: &str = "OPVIEW_LOOKAHEAD_SCREENS";
pub const ENV_BATCH_SIZE: &str = "OPVIEW_BATCH_SIZE";

/// Tuning knobs for [`ViewportWindow`](crate::ViewportWindow).
///
/// Heights are in whatever unit the painter measures its viewport in
/// (pixels for a browser-like surface, lines for a terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    /// Estimated height of a single collapsed row.
    pub row_height: u32,
    /// Screens' worth of rows materialized when a view is installed.
    pub initial_screens: u32,
    /// Grow once the scroll position is within this many viewport heights of
    /// the bottom of the rendered content.
    pub lookahead_screens: u32,
    /// Rows appended per growth step.
    pub batch_size: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            row_height: 30,
            initial_screens: 5,
            lookahead_screens: 2,
            batch_size: 20,
        }
    }
}

impl WindowConfig {
    #[must_use]
    pub fn with_row_height(mut self, row_height: u32) -> Self {
        self.row_height = row_height.max(1);
        self
    }

    #[must_use]
    pub fn with_initial_screens(mut self, screens: u32) -> Self {
        self.initial_screens = screens.max(1);
        self
    }

    #[must_use]
    pub fn with_lookahead_screens(mut self, screens: u32) -> Self {
        self.lookahead_screens = screens;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using a custom environment lookup.
    #[must_use]
    pub fn with_env_overrides_from<F>(mut self, get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(n) = positive(&get_env, ENV_ROW_HEIGHT) {
            self.row_height = n;
        }
        if let Some(n) = positive(&get_env, ENV_INITIAL_SCREENS) {
            self.initial_screens = n;
        }
        if let Some(n) = positive(&get_env, ENV_LOOKAHEAD_SCREENS) {
            self.lookahead_screens = n;
        }
        if let Some(n) = positive(&get_env, ENV_BATCH_SIZE) {
            self.batch_size = n as usize;
        }
        self
    }
}

fn positive<F>(get_env: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = get_env(key)?;
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Some(n),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid window setting");
            None
        }
    }
}
