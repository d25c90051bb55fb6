//! Derived statistics over a shot list.
//!
//! Everything here is recomputed from the full list on every call.
//! Percentages are `round(part / whole * 100)` and `0` when `whole` is 0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shot::{GameSituation, ShotEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total: u32,
    pub saves: u32,
    pub goals: u32,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodStats {
    pub period: u32,
    pub total: u32,
    pub saves: u32,
    pub goals: u32,
    pub pct: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControlledSaveStats {
    pub total_saves: u32,
    pub controlled_saves: u32,
    pub controlled_pct: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PenaltyKillStats {
    pub pk_total: u32,
    pub pk_saves: u32,
    pub pk_pct: u32,
}

/// Every aggregate at once, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsReport {
    pub overall: OverallStats,
    pub per_period: Vec<PeriodStats>,
    pub controlled: ControlledSaveStats,
    pub penalty_kill: PenaltyKillStats,
}

pub fn percentage(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(whole) * 100.0).round() as u32
}

fn count<'a>(
    events: impl IntoIterator<Item = &'a ShotEvent>,
    pred: impl Fn(&ShotEvent) -> bool,
) -> u32 {
    events.into_iter().filter(|e| pred(*e)).count() as u32
}

pub fn overall_stats(events: &[ShotEvent]) -> OverallStats {
    let total = events.len() as u32;
    let saves = count(events, ShotEvent::is_save);
    let goals = count(events, ShotEvent::is_goal);
    OverallStats {
        total,
        saves,
        goals,
        percentage: percentage(saves, total),
    }
}

/// One record per period that has events, ascending by period number.
pub fn per_period_stats(events: &[ShotEvent]) -> Vec<PeriodStats> {
    let mut by_period: BTreeMap<u32, Vec<&ShotEvent>> = BTreeMap::new();
    for e in events {
        by_period.entry(e.period).or_default().push(e);
    }
    by_period
        .into_iter()
        .map(|(period, shots)| {
            let total = shots.len() as u32;
            let saves = count(shots.iter().copied(), ShotEvent::is_save);
            let goals = count(shots.iter().copied(), ShotEvent::is_goal);
            PeriodStats {
                period,
                total,
                saves,
                goals,
                pct: percentage(saves, total),
            }
        })
        .collect()
}

/// Controlled saves as a share of all saves, not of all shots.
pub fn controlled_save_stats(events: &[ShotEvent]) -> ControlledSaveStats {
    let total_saves = count(events, ShotEvent::is_save);
    let controlled_saves = count(events, ShotEvent::is_controlled_save);
    ControlledSaveStats {
        total_saves,
        controlled_saves,
        controlled_pct: percentage(controlled_saves, total_saves),
    }
}

pub fn penalty_kill_stats(events: &[ShotEvent]) -> PenaltyKillStats {
    let pk = || events.iter().filter(|e| e.situation == GameSituation::PenaltyKill);
    let pk_total = pk().count() as u32;
    let pk_saves = count(pk(), ShotEvent::is_save);
    PenaltyKillStats {
        pk_total,
        pk_saves,
        pk_pct: percentage(pk_saves, pk_total),
    }
}

pub fn report(events: &[ShotEvent]) -> StatsReport {
    StatsReport {
        overall: overall_stats(events),
        per_period: per_period_stats(events),
        controlled: controlled_save_stats(events),
        penalty_kill: penalty_kill_stats(events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shot::ShotOutcome::{self, Goal, Miss, Save};
    use crate::shot::fixtures::shot;

    fn shots(spec: &[(ShotOutcome, u32)]) -> Vec<ShotEvent> {
        spec.iter().map(|&(o, p)| shot(o, p)).collect()
    }

    #[test]
    fn test_overall_eight_of_ten() {
        let mut spec = vec![(Save, 1); 8];
        spec.extend([(Goal, 1), (Goal, 2)]);
        let s = overall_stats(&shots(&spec));
        assert_eq!(
            s,
            OverallStats {
                total: 10,
                saves: 8,
                goals: 2,
                percentage: 80
            }
        );
    }

    #[test]
    fn test_percentage_rounds_not_truncates() {
        // 2/3 = 66.67 -> 67, 1/3 -> 33, 1/8 = 12.5 -> 13
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
        let s = overall_stats(&shots(&[(Save, 1), (Save, 1), (Goal, 1)]));
        assert_eq!(s.percentage, 67);
    }

    #[test]
    fn test_miss_counts_toward_total_only() {
        let s = overall_stats(&shots(&[(Save, 1), (Miss, 1)]));
        assert_eq!((s.total, s.saves, s.goals, s.percentage), (2, 1, 0, 50));
    }

    #[test]
    fn test_per_period_omits_empty_periods() {
        let rows = per_period_stats(&shots(&[(Save, 3), (Goal, 1), (Save, 1), (Save, 3)]));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].period, 1);
        assert_eq!(rows[1].period, 3);
        assert_eq!((rows[0].total, rows[0].saves, rows[0].goals, rows[0].pct), (2, 1, 1, 50));
        assert_eq!((rows[1].total, rows[1].saves, rows[1].pct), (2, 2, 100));
    }

    #[test]
    fn test_per_period_sorts_numerically() {
        let rows = per_period_stats(&shots(&[(Save, 10), (Save, 2), (Save, 1)]));
        let periods: Vec<u32> = rows.iter().map(|r| r.period).collect();
        assert_eq!(periods, vec![1, 2, 10]);
    }

    #[test]
    fn test_controlled_pct_uses_saves_as_base() {
        let mut events = shots(&[(Save, 1); 5]);
        events.extend(shots(&[(Goal, 1); 3]));
        events[0].is_controlled = true;
        events[1].is_controlled = true;
        // a controlled flag on a goal never counts
        events[6].is_controlled = true;
        let s = controlled_save_stats(&events);
        assert_eq!(s.total_saves, 5);
        assert_eq!(s.controlled_saves, 2);
        assert_eq!(s.controlled_pct, 40);
    }

    #[test]
    fn test_penalty_kill() {
        let mut events = shots(&[(Save, 1), (Goal, 1), (Save, 2), (Save, 2)]);
        events[0].situation = GameSituation::PenaltyKill;
        events[1].situation = GameSituation::PenaltyKill;
        events[2].situation = GameSituation::PenaltyKill;
        events[3].situation = GameSituation::PowerPlay;
        let s = penalty_kill_stats(&events);
        assert_eq!(
            s,
            PenaltyKillStats {
                pk_total: 3,
                pk_saves: 2,
                pk_pct: 67
            }
        );
    }

    #[test]
    fn test_empty_log_is_all_zero() {
        let r = report(&[]);
        assert_eq!(r.overall, OverallStats::default());
        assert!(r.per_period.is_empty());
        assert_eq!(r.controlled, ControlledSaveStats::default());
        assert_eq!(r.penalty_kill, PenaltyKillStats::default());
    }

    #[test]
    fn test_no_saves_gives_zero_controlled_pct() {
        let s = controlled_save_stats(&shots(&[(Goal, 1), (Goal, 2)]));
        assert_eq!(s, ControlledSaveStats::default());
    }
}
