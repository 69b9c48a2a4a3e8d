use crate::error::ScheduleError;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

pub const DAYS_PER_WEEK: usize = 7;
pub const HOURS_PER_DAY: usize = 24;

type Grid = [[bool; HOURS_PER_DAY]; DAYS_PER_WEEK];

/// Day-by-hour on/off grid for a scheduled behaviour.
///
/// Day 0 is Monday. An empty schedule means the schedule feature is disabled
/// and the behaviour is always active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<bool>>", into = "Vec<Vec<bool>>")]
pub struct WeeklySchedule {
    grid: Option<Box<Grid>>,
}

impl WeeklySchedule {
    /// Schedule that is always active
    pub fn always() -> Self {
        Self { grid: None }
    }

    /// Build from a day-major grid, rejecting anything that is neither empty nor 7x24
    pub fn from_grid(grid: &[Vec<bool>]) -> Result<Self, ScheduleError> {
        if grid.is_empty() {
            return Ok(Self::always());
        }

        if grid.len() != DAYS_PER_WEEK {
            return Err(ScheduleError::DayCount { days: grid.len() });
        }

        let mut cells: Grid = [[false; HOURS_PER_DAY]; DAYS_PER_WEEK];
        for (day, hours) in grid.iter().enumerate() {
            if hours.len() != HOURS_PER_DAY {
                return Err(ScheduleError::HourCount {
                    day,
                    hours: hours.len(),
                });
            }
            cells[day].copy_from_slice(hours);
        }

        Ok(Self {
            grid: Some(Box::new(cells)),
        })
    }

    /// Whether a grid was supplied (false means "always on")
    pub fn is_configured(&self) -> bool {
        self.grid.is_some()
    }

    /// Look up a single cell. Hours outside 0..24 are rejected.
    pub fn is_active(&self, day: Weekday, hour: u32) -> Result<bool, ScheduleError> {
        if hour as usize >= HOURS_PER_DAY {
            return Err(ScheduleError::HourOutOfRange { hour });
        }

        Ok(match &self.grid {
            Some(grid) => grid[day.num_days_from_monday() as usize][hour as usize],
            None => true,
        })
    }

    /// Evaluate the schedule for a wall-clock instant in its own timezone
    pub fn is_active_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        match &self.grid {
            Some(grid) => grid[now.weekday().num_days_from_monday() as usize][now.hour() as usize],
            None => true,
        }
    }
}

impl TryFrom<Vec<Vec<bool>>> for WeeklySchedule {
    type Error = ScheduleError;

    fn try_from(grid: Vec<Vec<bool>>) -> Result<Self, Self::Error> {
        Self::from_grid(&grid)
    }
}

impl From<WeeklySchedule> for Vec<Vec<bool>> {
    fn from(schedule: WeeklySchedule) -> Self {
        match schedule.grid {
            Some(grid) => grid.iter().map(|day| day.to_vec()).collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const ALL_DAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    fn filled(value: bool) -> Vec<Vec<bool>> {
        vec![vec![value; HOURS_PER_DAY]; DAYS_PER_WEEK]
    }

    #[test]
    fn test_empty_schedule_is_always_active() {
        let schedule = WeeklySchedule::from_grid(&[]).unwrap();
        assert!(!schedule.is_configured());

        for day in ALL_DAYS {
            for hour in 0..24 {
                assert!(schedule.is_active(day, hour).unwrap());
            }
        }
    }

    #[test]
    fn test_all_false_schedule_is_never_active() {
        let schedule = WeeklySchedule::from_grid(&filled(false)).unwrap();
        assert!(schedule.is_configured());

        for day in ALL_DAYS {
            for hour in 0..24 {
                assert!(!schedule.is_active(day, hour).unwrap());
            }
        }
    }

    #[test]
    fn test_single_cell_lookup() {
        let mut grid = filled(false);
        grid[2][13] = true; // Wednesday 13:00-13:59
        let schedule = WeeklySchedule::from_grid(&grid).unwrap();

        assert!(schedule.is_active(Weekday::Wed, 13).unwrap());
        assert!(!schedule.is_active(Weekday::Wed, 12).unwrap());
        assert!(!schedule.is_active(Weekday::Thu, 13).unwrap());

        // 2024-01-03 was a Wednesday
        let inside = Utc.with_ymd_and_hms(2024, 1, 3, 13, 30, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 1, 3, 14, 0, 0).unwrap();
        assert!(schedule.is_active_at(&inside));
        assert!(!schedule.is_active_at(&outside));
    }

    #[test]
    fn test_malformed_grids_rejected() {
        let short = vec![vec![true; 24]; 6];
        assert_eq!(
            WeeklySchedule::from_grid(&short),
            Err(ScheduleError::DayCount { days: 6 })
        );

        let mut ragged = filled(true);
        ragged[4].pop();
        assert_eq!(
            WeeklySchedule::from_grid(&ragged),
            Err(ScheduleError::HourCount { day: 4, hours: 23 })
        );
    }

    #[test]
    fn test_out_of_range_hour_rejected() {
        let schedule = WeeklySchedule::always();
        assert_eq!(
            schedule.is_active(Weekday::Mon, 24),
            Err(ScheduleError::HourOutOfRange { hour: 24 })
        );
    }

    #[test]
    fn test_serde_round_trip_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Holder {
            schedule: WeeklySchedule,
        }

        let mut grid = filled(false);
        grid[6][23] = true;
        let holder = Holder {
            schedule: WeeklySchedule::from_grid(&grid).unwrap(),
        };

        let text = toml::to_string(&holder).unwrap();
        let parsed: Holder = toml::from_str(&text).unwrap();
        assert!(parsed.schedule.is_active(Weekday::Sun, 23).unwrap());

        let bad: Result<Holder, _> = toml::from_str("schedule = [[true, false]]");
        assert!(bad.is_err());
    }
}
