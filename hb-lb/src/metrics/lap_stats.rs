//! Per-pilot, per-race lap formulas

use crate::normalize::Lap;

/// Single-lap and consecutive-window value when too few laps exist
pub const UNSET_LAP_TIME: f64 = 999.0;

/// Race-time value when the target lap count is not met
pub const UNSET_RACE_TIME: f64 = 9999.0;

/// Longest "first K laps" window tracked
pub const FIRST_LAPS_MAX: usize = 3;

/// Values derived from one pilot's valid laps in one race
///
/// `None` means the formula's precondition was not met.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LapStats {
    /// Laps numbered 1 and above
    pub lap_count: usize,
    /// Sum of every lap including the holeshot
    pub total_time: Option<f64>,
    pub best_lap: Option<f64>,
    pub consecutive_2: Option<f64>,
    pub consecutive_3: Option<f64>,
    pub race_time: Option<f64>,
    /// Index `k - 1` holds the sum of the first `k` racing laps
    pub first_without_hs: [Option<f64>; FIRST_LAPS_MAX],
    /// Index `k - 1` holds holeshot plus the first `k` racing laps
    pub first_with_hs: [Option<f64>; FIRST_LAPS_MAX],
}

impl LapStats {
    /// Compute every formula over laps sorted ascending by lap number
    pub fn compute(laps: &[Lap], target_laps: u32) -> Self {
        let racing: Vec<f64> = laps
            .iter()
            .filter(|lap| lap.number >= 1)
            .map(|lap| lap.seconds)
            .collect();
        let holeshot = laps.iter().find(|lap| lap.number == 0).map(|lap| lap.seconds);

        let total_time = if laps.is_empty() {
            None
        } else {
            Some(laps.iter().map(|lap| lap.seconds).sum())
        };

        let best_lap = racing.iter().copied().reduce(f64::min);

        let mut first_without_hs = [None; FIRST_LAPS_MAX];
        let mut first_with_hs = [None; FIRST_LAPS_MAX];
        for k in 1..=FIRST_LAPS_MAX {
            if racing.len() >= k {
                let sum: f64 = racing[..k].iter().sum();
                first_without_hs[k - 1] = Some(sum);
                first_with_hs[k - 1] = holeshot.map(|hs| hs + sum);
            }
        }

        Self {
            lap_count: racing.len(),
            total_time,
            best_lap,
            consecutive_2: best_window(&racing, 2),
            consecutive_3: best_window(&racing, 3),
            race_time: race_time(laps, holeshot.is_some(), target_laps),
            first_without_hs,
            first_with_hs,
        }
    }
}

/// Minimum sum over every run of `window` adjacent values
pub fn best_window(times: &[f64], window: usize) -> Option<f64> {
    if window == 0 || times.len() < window {
        return None;
    }
    times
        .windows(window)
        .map(|w| w.iter().sum::<f64>())
        .reduce(f64::min)
}

/// Sum of the first `target` laps, or `target + 1` when a holeshot leads
fn race_time(laps: &[Lap], has_holeshot: bool, target_laps: u32) -> Option<f64> {
    let needed = target_laps as usize + usize::from(has_holeshot);
    if laps.len() < needed {
        return None;
    }
    Some(laps[..needed].iter().map(|lap| lap.seconds).sum())
}
