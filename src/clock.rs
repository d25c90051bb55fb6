//! Game clock (time remaining in a period) and period counter.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

pub const MAX_MINUTES: u32 = 60;
pub const MAX_SECONDS: u32 = 59;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid clock '{0}', expected MM:SS")]
pub struct ClockParseError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockUnit {
    Minutes,
    Seconds,
}

impl FromStr for ClockUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "min" | "m" | "minutes" => Ok(Self::Minutes),
            "sec" | "s" | "seconds" => Ok(Self::Seconds),
            other => Err(format!("unknown clock unit: {other}")),
        }
    }
}

/// MM:SS time remaining. Minutes stay in [0,60], seconds in [0,59].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct GameClock {
    minutes: u32,
    seconds: u32,
}

impl Default for GameClock {
    fn default() -> Self {
        Self {
            minutes: 15,
            seconds: 0,
        }
    }
}

impl GameClock {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self {
            minutes: minutes.min(MAX_MINUTES),
            seconds: seconds.min(MAX_SECONDS),
        }
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// One second step with carry into / borrow from minutes.
    /// Minutes never leave [0,60]; the seconds wrap regardless.
    #[cfg(test)]
    fn step_seconds(&mut self, up: bool) {
        if up {
            if self.seconds == MAX_SECONDS {
                self.seconds = 0;
                self.minutes = (self.minutes + 1).min(MAX_MINUTES);
            } else {
                self.seconds += 1;
            }
        } else if self.seconds == 0 {
            self.seconds = MAX_SECONDS;
            self.minutes = self.minutes.saturating_sub(1);
        } else {
            self.seconds -= 1;
        }
    }

    /// Same result as `delta` single steps of `unit`, in constant time.
    /// Every wrap of the seconds moves the minutes the same way, so the
    /// minutes saturate once at the end.
    pub fn adjust(&mut self, unit: ClockUnit, delta: i32) {
        let max = i64::from(MAX_MINUTES);
        let minutes = i64::from(self.minutes);
        match unit {
            ClockUnit::Minutes => {
                self.minutes = (minutes + i64::from(delta)).clamp(0, max) as u32;
            }
            ClockUnit::Seconds => {
                let t = i64::from(self.seconds) + i64::from(delta);
                self.seconds = t.rem_euclid(60) as u32;
                self.minutes = (minutes + t.div_euclid(60)).clamp(0, max) as u32;
            }
        }
    }
}

impl fmt::Display for GameClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

impl FromStr for GameClock {
    type Err = ClockParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (m, sec) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| ClockParseError(s.to_string()))?;
        let m: u32 = m.parse().map_err(|_| ClockParseError(s.to_string()))?;
        let sec: u32 = sec.parse().map_err(|_| ClockParseError(s.to_string()))?;
        if m > MAX_MINUTES || sec > MAX_SECONDS {
            return Err(ClockParseError(s.to_string()));
        }
        Ok(Self::new(m, sec))
    }
}

impl From<GameClock> for String {
    fn from(c: GameClock) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for GameClock {
    type Error = ClockParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Step the period counter by `delta`, never below 1 nor above `max`.
pub fn step_period(period: u32, delta: i32, max: u32) -> u32 {
    let max = max.max(1);
    let next = i64::from(period) + i64::from(delta);
    next.clamp(1, i64::from(max)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(s: &str) -> GameClock {
        s.parse().unwrap()
    }

    #[test]
    fn test_seconds_borrow_clamps_minutes_at_zero() {
        let mut c = clock("00:00");
        c.adjust(ClockUnit::Seconds, -1);
        assert_eq!(c.to_string(), "00:59");
    }

    #[test]
    fn test_seconds_carry_into_minutes() {
        let mut c = clock("14:59");
        c.adjust(ClockUnit::Seconds, 1);
        assert_eq!(c.to_string(), "15:00");
    }

    #[test]
    fn test_seconds_borrow_from_minutes() {
        let mut c = clock("10:00");
        c.adjust(ClockUnit::Seconds, -1);
        assert_eq!(c.to_string(), "09:59");
    }

    #[test]
    fn test_minutes_clamp() {
        let mut c = clock("59:30");
        c.adjust(ClockUnit::Minutes, 3);
        assert_eq!(c.to_string(), "60:30");
        c.adjust(ClockUnit::Minutes, -70);
        assert_eq!(c.to_string(), "00:30");
    }

    #[test]
    fn test_seconds_carry_at_max_minutes() {
        let mut c = clock("60:59");
        c.adjust(ClockUnit::Seconds, 1);
        assert_eq!(c.to_string(), "60:00");
    }

    #[test]
    fn test_adjust_matches_single_steps() {
        for start in ["00:00", "00:30", "14:59", "59:59", "60:00"] {
            for delta in [-3700, -61, -60, -1, 0, 1, 59, 60, 125, 3700] {
                let mut fast = clock(start);
                fast.adjust(ClockUnit::Seconds, delta);
                let mut slow = clock(start);
                for _ in 0..delta.unsigned_abs() {
                    slow.step_seconds(delta > 0);
                }
                assert_eq!(fast, slow, "{start} {delta:+}");
            }
        }
    }

    #[test]
    fn test_extreme_deltas() {
        let mut c = clock("15:00");
        c.adjust(ClockUnit::Seconds, i32::MIN);
        assert_eq!(c.to_string(), "00:52");

        let mut c = clock("15:00");
        c.adjust(ClockUnit::Seconds, i32::MAX);
        assert_eq!(c.to_string(), "60:07");

        let mut c = clock("15:00");
        c.adjust(ClockUnit::Minutes, i32::MIN);
        assert_eq!(c.to_string(), "00:00");
        c.adjust(ClockUnit::Minutes, i32::MAX);
        assert_eq!(c.to_string(), "60:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1500".parse::<GameClock>().is_err());
        assert!("15:60".parse::<GameClock>().is_err());
        assert!("61:00".parse::<GameClock>().is_err());
        assert!("ab:cd".parse::<GameClock>().is_err());
        assert_eq!(clock("5:7").to_string(), "05:07");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&clock("03:09")).unwrap();
        assert_eq!(json, "\"03:09\"");
        let back: GameClock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clock("03:09"));
        assert!(serde_json::from_str::<GameClock>("\"99:99\"").is_err());
    }

    #[test]
    fn test_step_period_clamps() {
        assert_eq!(step_period(1, -1, 4), 1);
        assert_eq!(step_period(4, 1, 4), 4);
        assert_eq!(step_period(2, 1, 4), 3);
        assert_eq!(step_period(1, 5, 0), 1);
    }
}
