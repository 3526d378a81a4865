use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;

use crate::resources::exams::ExamResult;

/// When a result was last marked: `graded_at`, else `updated_at`.
/// Unparseable or missing timestamps sort before every real one.
fn marked_at(result: &ExamResult) -> Option<DateTime<Utc>> {
  result
    .graded_at
    .as_deref()
    .or(result.updated_at.as_deref())
    .and_then(parse_timestamp)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
    return Some(at.with_timezone(&Utc));
  }
  if let Ok(at) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
    return Some(at.and_utc());
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|day| day.and_hms_opt(0, 0, 0))
    .map(|at| at.and_utc())
}

/// Keep the newest result per group, in order of each group's first
/// appearance. Ties go to the earlier result.
fn newest_by<K, F>(results: &[ExamResult], group: F) -> Vec<ExamResult>
where
  K: std::hash::Hash + Eq,
  F: Fn(&ExamResult) -> K,
{
  let mut slots: HashMap<K, usize> = HashMap::new();
  let mut kept: Vec<ExamResult> = Vec::new();

  for result in results {
    match slots.get(&group(result)) {
      Some(&slot) => {
        if marked_at(result) > marked_at(&kept[slot]) {
          kept[slot] = result.clone();
        }
      }
      None => {
        slots.insert(group(result), kept.len());
        kept.push(result.clone());
      }
    }
  }
  kept
}

/// One result per exam, the most recently graded.
pub fn latest_result_per_exam(results: &[ExamResult]) -> Vec<ExamResult> {
  newest_by(results, |r| r.exam)
}

/// Collapse regraded duplicates: one result per `(exam, student)`.
pub fn merge_duplicate_results(results: &[ExamResult]) -> Vec<ExamResult> {
  newest_by(results, |r| (r.exam, r.student.clone()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResultTotals {
  pub total: usize,
  pub passed: usize,
  /// Whole percent
  pub pass_rate: u32,
  /// Rounded to whole marks
  pub average_marks: f64,
}

impl ResultTotals {
  /// Totals over the latest result of each exam, so a regraded exam
  /// counts once.
  pub fn from_results(results: &[ExamResult]) -> Self {
    let latest = latest_result_per_exam(results);
    if latest.is_empty() {
      return Self::default();
    }

    let total = latest.len();
    let passed = latest.iter().filter(|r| r.is_passed).count();
    let sum: f64 = latest.iter().map(|r| r.marks_obtained).sum();

    Self {
      total,
      passed,
      pass_rate: (passed as f64 / total as f64 * 100.0).round() as u32,
      average_marks: (sum / total as f64).round(),
    }
  }

  pub fn failed(&self) -> usize {
    self.total - self.passed
  }
}

/// A, B, C, D or F for a percentage score.
pub fn letter_grade(percent: f64) -> char {
  match percent {
    p if p >= 90.0 => 'A',
    p if p >= 80.0 => 'B',
    p if p >= 70.0 => 'C',
    p if p >= 60.0 => 'D',
    _ => 'F',
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(
    id: u64,
    exam: u64,
    student: &str,
    marks: f64,
    passed: bool,
    graded_at: Option<&str>,
    updated_at: Option<&str>,
  ) -> ExamResult {
    ExamResult {
      id,
      exam,
      student: student.to_string(),
      student_name: String::new(),
      marks_obtained: marks,
      grade: String::new(),
      is_passed: passed,
      remarks: None,
      graded_at: graded_at.map(str::to_string),
      updated_at: updated_at.map(str::to_string),
      created_at: None,
    }
  }

  #[test]
  fn test_latest_prefers_graded_at_then_updated_at() {
    let results = vec![
      result(1, 10, "s-1", 40.0, false, Some("2024-03-01T10:00:00Z"), None),
      result(2, 10, "s-1", 70.0, true, None, Some("2024-03-05T08:00:00Z")),
      result(3, 11, "s-1", 90.0, true, Some("2024-02-01"), None),
      result(4, 10, "s-1", 55.0, false, Some("not a date"), None),
    ];

    let latest = latest_result_per_exam(&results);
    assert_eq!(latest.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);
  }

  #[test]
  fn test_totals_count_each_exam_once() {
    let results = vec![
      result(1, 10, "s-1", 40.0, false, Some("2024-03-01T10:00:00Z"), None),
      result(2, 10, "s-1", 71.0, true, Some("2024-03-02T10:00:00Z"), None),
      result(3, 11, "s-1", 90.0, true, Some("2024-03-01T10:00:00Z"), None),
      result(4, 12, "s-1", 30.0, false, Some("2024-03-01T10:00:00Z"), None),
    ];

    let totals = ResultTotals::from_results(&results);
    assert_eq!(totals.total, 3);
    assert_eq!(totals.passed, 2);
    assert_eq!(totals.failed(), 1);
    assert_eq!(totals.pass_rate, 67);
    assert_eq!(totals.average_marks, 64.0);
    assert_eq!(ResultTotals::from_results(&[]), ResultTotals::default());
  }

  #[test]
  fn test_merge_keeps_one_per_student_and_exam() {
    let results = vec![
      result(1, 10, "s-1", 40.0, false, Some("2024-03-01T10:00:00+01:00"), None),
      result(2, 10, "s-2", 80.0, true, Some("2024-03-01T10:00:00Z"), None),
      result(3, 10, "s-1", 60.0, true, Some("2024-03-01T09:30:00Z"), None),
    ];

    let merged = merge_duplicate_results(&results);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].id, 3);
    assert_eq!(merged[1].student, "s-2");
  }

  #[test]
  fn test_letter_grade_boundaries() {
    assert_eq!(letter_grade(90.0), 'A');
    assert_eq!(letter_grade(89.9), 'B');
    assert_eq!(letter_grade(80.0), 'B');
    assert_eq!(letter_grade(70.0), 'C');
    assert_eq!(letter_grade(60.0), 'D');
    assert_eq!(letter_grade(59.5), 'F');
  }
}
