//! State pages derive from fetched data: result totals, timetables,
//! attendance and payment figures.

mod results;
mod timetable;
mod totals;

pub use results::{latest_result_per_exam, letter_grade, merge_duplicate_results, ResultTotals};
pub use timetable::{timetable_by_day, DaySchedule};
pub use totals::{attendance_rate, payment_totals, PaymentTotals};
