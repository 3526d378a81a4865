use chrono::{NaiveTime, Weekday};
use tracing::debug;

use crate::resources::classes::ScheduleItem;

const SCHOOL_DAYS: [Weekday; 5] = [
  Weekday::Mon,
  Weekday::Tue,
  Weekday::Wed,
  Weekday::Thu,
  Weekday::Fri,
];

#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
  pub day: Weekday,
  pub items: Vec<ScheduleItem>,
}

/// Schedule items grouped by weekday. Monday to Friday are always present,
/// in order; Saturday and Sunday follow only when something is on them.
pub fn timetable_by_day(items: &[ScheduleItem]) -> Vec<DaySchedule> {
  let mut days: Vec<DaySchedule> = SCHOOL_DAYS
    .iter()
    .map(|&day| DaySchedule {
      day,
      items: Vec::new(),
    })
    .collect();

  for item in items {
    let Ok(day) = item.day_of_week.trim().parse::<Weekday>() else {
      debug!(id = item.id, day = %item.day_of_week, "Skipping schedule item with unknown day");
      continue;
    };
    match days.iter_mut().find(|bucket| bucket.day == day) {
      Some(bucket) => bucket.items.push(item.clone()),
      None => days.push(DaySchedule {
        day,
        items: vec![item.clone()],
      }),
    }
  }

  days.sort_by_key(|bucket| bucket.day.num_days_from_monday());
  for bucket in &mut days {
    bucket
      .items
      .sort_by_cached_key(|item| {
        let time = start_time(&item.start_time);
        (time.is_none(), time, item.start_time.clone())
      });
  }
  days
}

/// `HH:MM` or `HH:MM:SS`. Unparseable times sort after every parsed one.
fn start_time(raw: &str) -> Option<NaiveTime> {
  let raw = raw.trim();
  NaiveTime::parse_from_str(raw, "%H:%M:%S")
    .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
    .ok()
}
