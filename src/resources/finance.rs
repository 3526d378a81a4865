//! The school ledger: transactions, period summaries and budgets.
//!
//! Recording a student or salary payment here writes both the ledger and
//! the payments/salaries side, so those mutations refresh both.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{decimal, Crud, Ctx, Resource, Update};
use crate::api::{Method, Page};
use crate::query::{invalidation, Filters, Mutation, Query, QueryKey};

pub static TRANSACTIONS: Resource = Resource {
  name: "financial-transactions",
  detail: "financial-transaction",
  path: "/financial-transactions/",
  create: &invalidation::TRANSACTION_CREATE,
  update: &invalidation::TRANSACTION_UPDATE,
  delete: &invalidation::TRANSACTION_DELETE,
};

pub static BUDGETS: Resource = Resource {
  name: "budgets",
  detail: "budget",
  path: "/budgets/",
  create: &invalidation::BUDGET_CREATE,
  update: &invalidation::BUDGET_UPDATE,
  delete: &invalidation::BUDGET_DELETE,
};

const SUMMARIES_PATH: &str = "/financial-summaries/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
  Revenue,
  Expense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
  pub transaction_id: u64,
  pub transaction_type: Flow,
  pub category: String,
  #[serde(deserialize_with = "decimal")]
  pub amount: f64,
  #[serde(default)]
  pub description: String,
  pub transaction_date: String,
  #[serde(default)]
  pub payment_method: Option<String>,
  #[serde(default)]
  pub reference_id: Option<String>,
  #[serde(default)]
  pub reference_type: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionFilters {
  pub transaction_type: Option<Flow>,
  pub category: Option<String>,
  pub search: Option<String>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Period {
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
  #[serde(default, deserialize_with = "decimal")]
  pub total_revenue: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_expenses: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub net_profit: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub profit_margin: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub student_fees_revenue: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub other_revenue: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub salary_expenses: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub operational_expenses: f64,
  #[serde(default)]
  pub total_transactions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTrend {
  pub month: u32,
  #[serde(default)]
  pub month_name: String,
  #[serde(default, deserialize_with = "decimal")]
  pub revenue: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub expenses: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub net_profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
  pub category: String,
  #[serde(default, deserialize_with = "decimal")]
  pub total: f64,
  #[serde(default)]
  pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BreakdownFilters {
  #[serde(rename = "type")]
  pub flow: Option<Flow>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
}

/// Fee payment recorded through the ledger. Amounts are decimal strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentPaymentRecord {
  pub parent: u64,
  pub student: String,
  pub payment_type: String,
  pub amount: String,
  pub due_date: String,
  pub payment_date: String,
  pub status: String,
  pub academic_year: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_method: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub transaction_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub semester: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub late_fee: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub discount: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalaryPaymentRecord {
  pub employee: u64,
  pub salary_type: String,
  pub amount: String,
  /// `YYYY-MM`
  pub month: String,
  pub basic_salary: String,
  pub pay_date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub allowances: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub deductions: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub overtime_hours: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub overtime_rate: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tax_deduction: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
  pub summary_id: u64,
  /// monthly or yearly
  pub period_type: String,
  pub year: i32,
  #[serde(default)]
  pub month: Option<u32>,
  #[serde(default, deserialize_with = "decimal")]
  pub total_revenue: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub total_expenses: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub net_profit: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub profit_margin: f64,
  #[serde(default)]
  pub transaction_count: u64,
  #[serde(default)]
  pub period_display: String,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryPeriod {
  pub period_type: String,
  pub year: Option<i32>,
  pub month: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
  pub budget_id: u64,
  pub name: String,
  /// annual, quarterly or monthly
  pub budget_type: String,
  pub category: Flow,
  pub year: i32,
  #[serde(default)]
  pub quarter: Option<u32>,
  #[serde(default)]
  pub month: Option<u32>,
  #[serde(default, deserialize_with = "decimal")]
  pub budgeted_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub actual_amount: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub variance: f64,
  #[serde(default, deserialize_with = "decimal")]
  pub utilization_percentage: f64,
  #[serde(default)]
  pub is_over_budget: bool,
  #[serde(default)]
  pub is_active: bool,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetFilters {
  pub budget_type: Option<String>,
  pub category: Option<Flow>,
  pub year: Option<i32>,
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActualAmount {
  pub id: u64,
  pub actual_amount: f64,
}

#[derive(Clone)]
pub struct Finance {
  ctx: Ctx,
  transactions: Crud<Transaction>,
  budgets: Crud<Budget>,
}

impl Finance {
  pub fn new(ctx: Ctx) -> Self {
    Self {
      transactions: Crud::new(ctx.clone(), &TRANSACTIONS),
      budgets: Crud::new(ctx.clone(), &BUDGETS),
      ctx,
    }
  }

  pub fn transactions(&self, filters: &TransactionFilters) -> Query<Page<Transaction>> {
    self.transactions.list(&Filters::from_serialize(filters))
  }

  pub fn transaction(&self, id: u64) -> Query<Transaction> {
    self.transactions.get(&id)
  }

  pub fn overview(&self, period: &Period) -> Query<Overview> {
    let filters = Filters::from_serialize(period);
    self.ctx.query(
      QueryKey::new("financial-overview").with_filters(&filters),
      filters.apply_to(&format!("{}overview/", TRANSACTIONS.path)),
    )
  }

  pub fn monthly_trend(&self, year: Option<i32>) -> Query<Vec<MonthlyTrend>> {
    let filters = Filters::new().with("year", year);
    self.ctx.query(
      QueryKey::new("monthly-trend").with_filters(&filters),
      filters.apply_to(&format!("{}monthly_trend/", TRANSACTIONS.path)),
    )
  }

  pub fn category_breakdown(&self, filters: &BreakdownFilters) -> Query<Vec<CategoryTotal>> {
    let filters = Filters::from_serialize(filters);
    self.ctx.query(
      QueryKey::new("category-breakdown").with_filters(&filters),
      filters.apply_to(&format!("{}category_breakdown/", TRANSACTIONS.path)),
    )
  }

  pub fn create_transaction(&self) -> Mutation<Value, Transaction> {
    self.transactions.create()
  }

  pub fn update_transaction(&self) -> Mutation<Update<Value>, Transaction> {
    self.transactions.update(Method::PATCH)
  }

  pub fn delete_transaction(&self) -> Mutation<u64, Value> {
    self.transactions.delete()
  }

  pub fn record_student_payment(&self) -> Mutation<StudentPaymentRecord, Value> {
    self.ctx.mutation(
      &invalidation::RECORD_STUDENT_PAYMENT,
      |client, record: StudentPaymentRecord| async move {
        client
          .post(&format!("{}record_student_payment/", TRANSACTIONS.path), &record)
          .await
      },
    )
  }

  pub fn record_salary_payment(&self) -> Mutation<SalaryPaymentRecord, Value> {
    self.ctx.mutation(
      &invalidation::RECORD_SALARY_PAYMENT,
      |client, record: SalaryPaymentRecord| async move {
        client
          .post(&format!("{}record_salary_payment/", TRANSACTIONS.path), &record)
          .await
      },
    )
  }

  pub fn summaries(&self, period: &SummaryPeriod) -> Query<Page<FinancialSummary>> {
    let filters = Filters::from_serialize(period);
    self.ctx.page(
      QueryKey::new("financial-summaries").with_filters(&filters),
      filters.apply_to(SUMMARIES_PATH),
    )
  }

  pub fn generate_summary(&self) -> Mutation<SummaryPeriod, FinancialSummary> {
    self.ctx.mutation(
      &invalidation::SUMMARY_GENERATE,
      |client, period: SummaryPeriod| async move {
        client
          .post(&format!("{}generate_summary/", SUMMARIES_PATH), &period)
          .await
      },
    )
  }

  pub fn budgets(&self, filters: &BudgetFilters) -> Query<Page<Budget>> {
    self.budgets.list(&Filters::from_serialize(filters))
  }

  pub fn budget(&self, id: u64) -> Query<Budget> {
    self.budgets.get(&id)
  }

  pub fn current_year_budgets(&self) -> Query<Page<Budget>> {
    self.ctx.page(
      QueryKey::new("current-year-budgets"),
      format!("{}current_year/", BUDGETS.path),
    )
  }

  pub fn over_budget(&self) -> Query<Page<Budget>> {
    self.ctx.page(
      QueryKey::new("over-budget-items"),
      format!("{}over_budget/", BUDGETS.path),
    )
  }

  pub fn create_budget(&self) -> Mutation<Value, Budget> {
    self.budgets.create()
  }

  pub fn update_budget(&self) -> Mutation<Update<Value>, Budget> {
    self.budgets.update(Method::PATCH)
  }

  pub fn update_actual(&self) -> Mutation<ActualAmount, Budget> {
    self.ctx.mutation(
      &invalidation::BUDGET_UPDATE_ACTUAL,
      |client, actual: ActualAmount| async move {
        client
          .post(
            &format!("{}{}/update_actual/", BUDGETS.path, actual.id),
            &json!({ "actual_amount": actual.actual_amount }),
          )
          .await
      },
    )
  }

  pub fn delete_budget(&self) -> Mutation<u64, Value> {
    self.budgets.delete()
  }
}
