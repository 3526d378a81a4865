//! Which cached queries each mutation makes stale.
//!
//! Every mutation is declared once here as a `MutationSpec`: its name plus
//! the key prefixes to invalidate after it succeeds. A prefix segment can be
//! - a literal (`"payments"`)
//! - `":field"`, read from the mutation input, then from its result
//! - `"$"`, the input itself when the input is a bare id
//!
//! A parameter that cannot be resolved truncates the prefix at that point,
//! so `["student-payment-summary", ":student"]` falls back to invalidating
//! every student's summary.

use serde_json::Value;

use super::key::QueryKey;

pub type KeyTemplate = &'static [&'static str];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSpec {
  pub name: &'static str,
  pub invalidates: &'static [KeyTemplate],
}

impl MutationSpec {
  pub const fn new(name: &'static str, invalidates: &'static [KeyTemplate]) -> Self {
    Self { name, invalidates }
  }

  /// Concrete key prefixes for one successful call.
  pub fn resolve(&self, input: &Value, output: &Value) -> Vec<QueryKey> {
    let mut keys: Vec<QueryKey> = Vec::with_capacity(self.invalidates.len());
    for template in self.invalidates {
      let key = resolve_template(template, input, output);
      if !key.is_empty() && !keys.contains(&key) {
        keys.push(key);
      }
    }
    keys
  }
}

fn resolve_template(template: &[&str], input: &Value, output: &Value) -> QueryKey {
  let mut segments = Vec::with_capacity(template.len());
  for segment in template {
    let resolved = if *segment == "$" {
      scalar(input)
    } else if let Some(field) = segment.strip_prefix(':') {
      lookup(input, field).or_else(|| lookup(output, field))
    } else {
      Some((*segment).to_string())
    };

    match resolved {
      Some(s) => segments.push(s),
      None => break,
    }
  }
  QueryKey::from_segments(segments)
}

/// Dotted path lookup (`data.student`) returning a scalar as a string.
fn lookup(value: &Value, path: &str) -> Option<String> {
  let mut current = value;
  for part in path.split('.') {
    current = current.get(part)?;
  }
  scalar(current)
}

fn scalar(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

macro_rules! mutations {
  ($($ident:ident = $name:literal => [$([$($seg:literal),+ $(,)?]),* $(,)?];)*) => {
    $(
      pub const $ident: MutationSpec = MutationSpec::new($name, &[$(&[$($seg),+]),*]);
    )*

    /// Every declared mutation, for lookup by name.
    pub const ALL: &[MutationSpec] = &[$($ident),*];
  };
}

mutations! {
  // auth
  REGISTER = "auth.register" => [];
  PROFILE_UPDATE = "auth.update_profile" => [];
  CHANGE_PASSWORD = "auth.change_password" => [];
  PASSWORD_RESET_REQUEST = "auth.request_password_reset" => [];
  PASSWORD_RESET_CONFIRM = "auth.confirm_password_reset" => [];
  VERIFY_EMAIL = "auth.verify_email" => [["user"]];
  RESEND_VERIFICATION = "auth.resend_verification" => [];

  // students
  STUDENT_CREATE = "students.create" => [["students"]];
  STUDENT_UPDATE = "students.update" => [["students"], ["student", ":id"]];
  STUDENT_DELETE = "students.delete" => [["students"], ["student", "$"]];

  // parents
  PARENT_CREATE = "parents.create" => [["parents"]];
  PARENT_UPDATE = "parents.update" => [["parents"], ["parent", ":id"]];
  PARENT_DELETE = "parents.delete" => [["parents"], ["parent", "$"]];

  // payments
  PAYMENT_CREATE = "payments.create" => [
    ["payments"],
    ["payment-summary"],
    ["pending-payments"],
    ["overdue-payments"],
    ["payments-by-status"],
    ["payments-by-type"],
    ["student-payment-summary", ":student"],
    ["parent-payments", ":parent"],
    ["monthly-payments", ":student"],
  ];
  PAYMENT_UPDATE = "payments.update" => [
    ["payments"],
    ["payment", ":id"],
    ["payment-summary"],
    ["pending-payments"],
    ["overdue-payments"],
    ["payments-by-status"],
    ["payments-by-type"],
    ["student-payment-summary", ":student"],
    ["parent-payments", ":parent"],
    ["monthly-payments", ":student"],
  ];
  PAYMENT_MARK_PAID = "payments.mark_paid" => [
    ["payments"],
    ["payment", "$"],
    ["payment-summary"],
    ["pending-payments"],
    ["overdue-payments"],
    ["payments-by-status"],
    ["student-payment-summary", ":student"],
    ["parent-payments", ":parent"],
    ["monthly-payments", ":student"],
  ];
  PAYMENT_DELETE = "payments.delete" => [
    ["payments"],
    ["payment", "$"],
    ["payment-summary"],
    ["pending-payments"],
    ["overdue-payments"],
    ["payments-by-status"],
    ["payments-by-type"],
    ["student-payment-summary"],
    ["parent-payments"],
    ["monthly-payments"],
  ];
  PARENT_PAYMENT_CREATE = "payments.create_for_parent" => [
    ["parent-payments", ":parent_id"],
    ["payments"],
    ["payment-summary"],
    ["pending-payments"],
    ["payments-by-status"],
    ["student-payment-summary", ":data.student"],
    ["monthly-payments", ":data.student"],
  ];

  // salaries
  SALARY_CREATE = "salaries.create" => [
    ["salaries"],
    ["salary-summary"],
    ["monthly-salary-summary"],
    ["pending-salaries"],
    ["employee-salary-records", ":employee"],
  ];
  SALARY_CREATE_FOR_EMPLOYEE = "salaries.create_for_employee" => [
    ["employee-salary-records", ":employee_id"],
    ["salaries"],
    ["salary-summary"],
    ["monthly-salary-summary"],
    ["pending-salaries"],
  ];
  SALARY_UPDATE = "salaries.update" => [
    ["salaries"],
    ["salary", ":id"],
    ["salary-summary"],
    ["monthly-salary-summary"],
    ["pending-salaries"],
    ["overdue-salaries"],
    ["employee-salary-records", ":employee"],
  ];
  SALARY_MARK_PAID = "salaries.mark_paid" => [
    ["salaries"],
    ["salary", "$"],
    ["salary-summary"],
    ["monthly-salary-summary"],
    ["pending-salaries"],
    ["overdue-salaries"],
    ["employee-salary-records", ":employee"],
  ];
  SALARY_BULK_MARK_PAID = "salaries.bulk_mark_paid" => [
    ["salaries"],
    ["salary"],
    ["salary-summary"],
    ["monthly-salary-summary"],
    ["pending-salaries"],
    ["overdue-salaries"],
    ["employee-salary-records"],
  ];
  SALARY_DELETE = "salaries.delete" => [
    ["salaries"],
    ["salary", "$"],
    ["salary-summary"],
    ["monthly-salary-summary"],
    ["pending-salaries"],
    ["overdue-salaries"],
    ["employee-salary-records"],
  ];

  // attendance
  ATTENDANCE_CREATE = "attendance.create" => [["attendance"]];
  ATTENDANCE_UPDATE = "attendance.update" => [["attendance"]];
  ATTENDANCE_DELETE = "attendance.delete" => [["attendance"]];
  ATTENDANCE_BULK_CREATE = "attendance.bulk_create" => [["attendance"]];
  ATTENDANCE_BULK_UPDATE = "attendance.bulk_update" => [["attendance"]];

  // exams
  EXAM_CREATE = "exams.create" => [["exams"]];
  EXAM_UPDATE = "exams.update" => [["exams"], ["exam", ":id"]];
  EXAM_DELETE = "exams.delete" => [["exams"], ["exam", "$"]];
  EXAM_RESULT_CREATE = "exam_results.create" => [
    ["exam", ":exam"],
    ["exams"],
    ["exam-results-by-student", ":student"],
  ];
  EXAM_RESULT_UPDATE = "exam_results.update" => [
    ["exam", ":exam"],
    ["exams"],
    ["exam-results-by-student", ":student"],
  ];
  EXAM_RESULT_DELETE = "exam_results.delete" => [
    ["exam"],
    ["exams"],
    ["exam-results-by-student"],
  ];

  // academic structure
  DEPARTMENT_CREATE = "departments.create" => [["departments"]];
  DEPARTMENT_UPDATE = "departments.update" => [["departments"], ["department", ":id"]];
  DEPARTMENT_DELETE = "departments.delete" => [["departments"], ["department", "$"]];
  LEVEL_CREATE = "levels.create" => [["levels"]];
  LEVEL_UPDATE = "levels.update" => [["levels"], ["level", ":id"]];
  LEVEL_DELETE = "levels.delete" => [["levels"], ["level", "$"], ["level-subjects"]];
  SECTION_CREATE = "sections.create" => [["sections"]];
  SECTION_UPDATE = "sections.update" => [["sections"], ["section", ":id"]];
  SECTION_DELETE = "sections.delete" => [["sections"], ["section", "$"], ["section-subjects"]];
  SUBJECT_CREATE = "subjects.create" => [["subjects"]];
  SUBJECT_UPDATE = "subjects.update" => [["subjects"], ["subject", ":id"], ["subjects-by-level-section"]];
  SUBJECT_DELETE = "subjects.delete" => [
    ["subjects"],
    ["subject", "$"],
    ["level-subjects"],
    ["section-subjects"],
    ["subjects-by-level-section"],
  ];
  LEVEL_SUBJECT_CREATE = "level_subjects.create" => [["level-subjects"], ["subjects-by-level-section"]];
  LEVEL_SUBJECT_DELETE = "level_subjects.delete" => [["level-subjects"], ["subjects-by-level-section"]];
  SECTION_SUBJECT_CREATE = "section_subjects.create" => [["section-subjects"], ["subjects-by-level-section"]];
  SECTION_SUBJECT_DELETE = "section_subjects.delete" => [["section-subjects"], ["subjects-by-level-section"]];

  // classes
  CLASS_CREATE = "classes.create" => [["classes"]];
  CLASS_UPDATE = "classes.update" => [["classes"], ["class", ":id"]];
  CLASS_DELETE = "classes.delete" => [["classes"], ["class", "$"], ["class-schedules"]];
  CLASS_SCHEDULE_CREATE = "class_schedules.create" => [["class-schedules"], ["class", ":class_assigned"]];
  CLASS_SCHEDULE_UPDATE = "class_schedules.update" => [["class-schedules"]];
  CLASS_SCHEDULE_DELETE = "class_schedules.delete" => [["class-schedules"]];

  // teachers
  TEACHER_CREATE = "teachers.create" => [["teachers"]];
  TEACHER_UPDATE = "teachers.update" => [["teachers"], ["teacher", ":id"]];
  TEACHER_DELETE = "teachers.delete" => [["teachers"], ["teacher", "$"]];
  TEACHER_ADD_SUBJECT = "teachers.add_subject" => [["teacher", ":teacher_id"], ["teachers"]];
  TEACHER_ADD_CLASS = "teachers.add_class" => [["teacher", ":teacher_id"], ["teachers"]];
  TEACHER_ADD_PERFORMANCE = "teachers.add_performance" => [["teacher", ":teacher"], ["teachers"]];

  // employees
  EMPLOYEE_CREATE = "employees.create" => [["employees"]];
  EMPLOYEE_UPDATE = "employees.update" => [["employees"], ["employee", ":id"]];
  EMPLOYEE_DELETE = "employees.delete" => [["employees"], ["employee", "$"]];
  EMPLOYEE_MARK_ATTENDANCE = "employees.mark_attendance" => [["employee-attendance", ":employee_id"]];

  // diary
  DIARY_CREATE = "diary.create" => [["student-diary"]];
  DIARY_UPDATE = "diary.update" => [["student-diary"], ["student-diary-entry", ":id"]];
  DIARY_DELETE = "diary.delete" => [["student-diary"], ["student-diary-entry", "$"]];
  DIARY_MARK_COMPLETED = "diary.mark_completed" => [["student-diary"], ["student-diary-entry", ":id"]];

  // accounts
  ACCOUNT_CREATE = "accounts.create" => [["users-without-accounts"], ["user-accounts"]];
  ACCOUNT_RESET_PASSWORD = "accounts.reset_password" => [["user-accounts"]];

  // assessments
  ASSESSMENT_CREATE = "assessments.create" => [["assessments"]];
  ASSESSMENT_UPDATE = "assessments.update" => [["assessments"], ["assessment", ":id"]];
  ASSESSMENT_DELETE = "assessments.delete" => [["assessments"], ["assessment", "$"]];
  ASSESSMENT_GRADE_SUBMISSION = "assessments.grade_submission" => [["assessment"], ["assessments"]];
  ASSESSMENT_BULK_GRADE = "assessments.bulk_grade" => [["assessment"], ["assessments"]];

  // events
  EVENT_CREATE = "events.create" => [["events"]];
  EVENT_UPDATE = "events.update" => [["events"], ["event", ":id"]];
  EVENT_DELETE = "events.delete" => [["events"], ["event", "$"]];
  EVENT_STATUS = "events.update_status" => [["events"], ["event", ":id"]];
  EVENT_REGISTER = "events.register" => [["event", ":owner"], ["events"], ["activity-participation"]];
  EVENT_UNREGISTER = "events.unregister" => [["event", ":owner"], ["events"], ["activity-participation"]];
  EVENT_CONFIRM_PARTICIPANT = "events.confirm_participant" => [["event", ":owner"]];
  EVENT_NOTIFY = "events.notify" => [];

  // clubs
  CLUB_CREATE = "clubs.create" => [["clubs"]];
  CLUB_UPDATE = "clubs.update" => [["clubs"], ["club", ":id"]];
  CLUB_DELETE = "clubs.delete" => [["clubs"], ["club", "$"]];
  CLUB_STATUS = "clubs.update_status" => [["clubs"], ["club", ":id"]];
  CLUB_ADD_MEMBER = "clubs.add_member" => [["club", ":owner"], ["clubs"], ["activity-participation"]];
  CLUB_UPDATE_MEMBER = "clubs.update_member" => [["club", ":owner"], ["activity-participation"]];
  CLUB_REMOVE_MEMBER = "clubs.remove_member" => [["club", ":owner"], ["clubs"], ["activity-participation"]];
  CLUB_RECORD_ATTENDANCE = "clubs.record_attendance" => [["club", ":owner"]];

  // sports teams
  TEAM_CREATE = "sports.create" => [["sports-teams"]];
  TEAM_UPDATE = "sports.update" => [["sports-teams"], ["sports-team", ":id"]];
  TEAM_DELETE = "sports.delete" => [["sports-teams"], ["sports-team", "$"]];
  TEAM_STATUS = "sports.update_status" => [["sports-teams"], ["sports-team", ":id"]];
  TEAM_ADD_PLAYER = "sports.add_player" => [["sports-team", ":owner"], ["sports-teams"], ["activity-participation"]];
  TEAM_UPDATE_PLAYER = "sports.update_player" => [["sports-team", ":owner"]];
  TEAM_REMOVE_PLAYER = "sports.remove_player" => [["sports-team", ":owner"], ["sports-teams"], ["activity-participation"]];
  TEAM_ADD_GAME = "sports.add_game" => [["sports-team", ":owner"]];
  TEAM_UPDATE_GAME = "sports.update_game" => [["sports-team", ":owner"]];
  TEAM_DELETE_GAME = "sports.delete_game" => [["sports-team", ":owner"]];

  // activity participation
  PARTICIPATION_CREATE = "activities.create" => [["activity-participation"]];
  PARTICIPATION_UPDATE = "activities.update" => [["activity-participation"], ["activity-participant", ":id"]];
  PARTICIPATION_DELETE = "activities.delete" => [["activity-participation"], ["activity-participant", "$"]];
  PARTICIPATION_STATUS = "activities.update_status" => [["activity-participation"], ["activity-participant", ":id"]];
  ACTIVITY_ATTENDANCE_RECORD = "activities.record_attendance" => [
    ["activity-participant", ":participation_id"],
    ["activity-participation", "statistics"],
    ["activity-participation", "student"],
  ];
  ACTIVITY_ATTENDANCE_UPDATE = "activities.update_attendance" => [
    ["activity-participant", ":participation_id"],
    ["activity-participation", "statistics"],
    ["activity-participation", "student"],
  ];
  ACTIVITY_ATTENDANCE_DELETE = "activities.delete_attendance" => [
    ["activity-participant"],
    ["activity-participation", "statistics"],
    ["activity-participation", "student"],
  ];

  // finance
  TRANSACTION_CREATE = "finance.transactions.create" => [
    ["financial-transactions"],
    ["financial-overview"],
    ["monthly-trend"],
    ["category-breakdown"],
  ];
  TRANSACTION_UPDATE = "finance.transactions.update" => [
    ["financial-transactions"],
    ["financial-transaction", ":id"],
    ["financial-overview"],
    ["monthly-trend"],
    ["category-breakdown"],
  ];
  TRANSACTION_DELETE = "finance.transactions.delete" => [
    ["financial-transactions"],
    ["financial-transaction", "$"],
    ["financial-overview"],
    ["monthly-trend"],
    ["category-breakdown"],
  ];
  RECORD_STUDENT_PAYMENT = "finance.record_student_payment" => [
    ["financial-transactions"],
    ["financial-overview"],
    ["monthly-trend"],
    ["category-breakdown"],
    ["payments"],
    ["payment-summary"],
    ["pending-payments"],
    ["student-payment-summary", ":student"],
  ];
  RECORD_SALARY_PAYMENT = "finance.record_salary_payment" => [
    ["financial-transactions"],
    ["financial-overview"],
    ["monthly-trend"],
    ["category-breakdown"],
    ["salaries"],
    ["salary-summary"],
    ["pending-salaries"],
    ["employee-salary-records", ":employee"],
  ];
  SUMMARY_GENERATE = "finance.summaries.generate" => [["financial-summaries"]];
  BUDGET_CREATE = "finance.budgets.create" => [["budgets"], ["current-year-budgets"], ["over-budget-items"]];
  BUDGET_UPDATE = "finance.budgets.update" => [
    ["budgets"],
    ["budget", ":id"],
    ["current-year-budgets"],
    ["over-budget-items"],
  ];
  BUDGET_UPDATE_ACTUAL = "finance.budgets.update_actual" => [
    ["budgets"],
    ["budget", ":id"],
    ["current-year-budgets"],
    ["over-budget-items"],
  ];
  BUDGET_DELETE = "finance.budgets.delete" => [
    ["budgets"],
    ["budget", "$"],
    ["current-year-budgets"],
    ["over-budget-items"],
  ];
}

/// Find a declared mutation by name.
pub fn find(name: &str) -> Option<&'static MutationSpec> {
  ALL.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::collections::HashSet;

  #[test]
  fn test_payment_create_targets_student_summary() {
    let input = json!({"student": "s-42", "parent": 7, "amount": "150.00"});
    let keys = PAYMENT_CREATE.resolve(&input, &json!({"pay_id": 1}));

    assert!(keys.contains(&QueryKey::new("payments")));
    assert!(keys.contains(&QueryKey::from(["student-payment-summary", "s-42"])));
    assert!(keys.contains(&QueryKey::from(["parent-payments", "7"])));
  }

  #[test]
  fn test_field_falls_back_to_output() {
    let input = json!({"id": 3, "data": {"status": "paid"}});
    let output = json!({"pay_id": 3, "student": "s-9"});
    let keys = PAYMENT_UPDATE.resolve(&input, &output);

    assert!(keys.contains(&QueryKey::from(["payment", "3"])));
    assert!(keys.contains(&QueryKey::from(["student-payment-summary", "s-9"])));
  }

  #[test]
  fn test_scalar_input_and_unresolved_truncation() {
    let keys = PAYMENT_DELETE.resolve(&json!(12), &Value::Null);
    assert!(keys.contains(&QueryKey::from(["payment", "12"])));
    assert!(keys.contains(&QueryKey::new("student-payment-summary")));

    let keys = SALARY_MARK_PAID.resolve(&json!("77"), &json!({"status": "paid"}));
    assert!(keys.contains(&QueryKey::from(["salary", "77"])));
    assert!(keys.contains(&QueryKey::new("employee-salary-records")));
  }

  #[test]
  fn test_nested_field_lookup() {
    let input = json!({"parent_id": 5, "data": {"student": "s-1"}});
    let keys = PARENT_PAYMENT_CREATE.resolve(&input, &Value::Null);
    assert!(keys.contains(&QueryKey::from(["parent-payments", "5"])));
    assert!(keys.contains(&QueryKey::from(["student-payment-summary", "s-1"])));
  }

  #[test]
  fn test_resolved_prefixes_are_deduplicated() {
    let keys = DIARY_MARK_COMPLETED.resolve(&json!({"id": 4}), &Value::Null);
    assert_eq!(
      keys,
      vec![QueryKey::new("student-diary"), QueryKey::from(["student-diary-entry", "4"])]
    );
    let keys = SALARY_BULK_MARK_PAID.resolve(&json!(["1", "2"]), &Value::Null);
    assert_eq!(keys.len(), 7);
  }

  #[test]
  fn test_names_are_unique_and_findable() {
    let mut seen = HashSet::new();
    for spec in ALL {
      assert!(seen.insert(spec.name), "duplicate mutation name {}", spec.name);
      assert_eq!(find(spec.name), Some(spec));
    }
    assert!(find("nope").is_none());
  }
}
