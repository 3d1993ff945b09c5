use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Day of January each year is pinned to on the slider.
const YEAR_ANCHOR_DAY: u32 = 2;

/// Slider timestamp for `year`: `YYYY-01-02T00:00:00Z` in epoch milliseconds.
pub fn timestamp_ms_for_year(year: i32) -> Option<i64> {
    NaiveDate::from_ymd_opt(year, 1, YEAR_ANCHOR_DAY)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Calendar year (UTC) of a slider timestamp.
pub fn year_from_timestamp_ms(timestamp_ms: i64) -> Option<i32> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.year())
}

/// Year player settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerOptions {
    /// Milliseconds between steps while playing.
    pub transition_time: u32,
    /// Wrap from the last year back to the first instead of stopping.
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    /// Pressing play on the last year restarts from the first.
    pub start_over: bool,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            transition_time: 1000,
            loop_playback: false,
            start_over: true,
        }
    }
}

/// What the player does on its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStep {
    Advance(i32),
    Stop,
}

/// Inclusive, one-year-period range the slider covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    /// Range spanning the first and last of `years`, if any.
    pub fn from_years(years: &[i32]) -> Option<Self> {
        let start = years.iter().min()?;
        let end = years.iter().max()?;
        Some(Self::new(*start, *end))
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.start, self.end)
    }

    pub fn step_forward(&self, current: i32) -> i32 {
        self.clamp(current.saturating_add(1))
    }

    pub fn step_backward(&self, current: i32) -> i32 {
        self.clamp(current.saturating_sub(1))
    }

    /// Year playback starts from when play is pressed at `current`.
    pub fn play_from(&self, current: i32, options: &PlayerOptions) -> i32 {
        if options.start_over && current >= self.end {
            self.start
        } else {
            self.clamp(current)
        }
    }

    /// Next playback step after `current`.
    pub fn tick(&self, current: i32, options: &PlayerOptions) -> PlaybackStep {
        if current < self.end {
            PlaybackStep::Advance(self.step_forward(current))
        } else if options.loop_playback && self.start < self.end {
            PlaybackStep::Advance(self.start)
        } else {
            PlaybackStep::Stop
        }
    }
}
