use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::Audit;
use crate::common::validation;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub full_name: String,
    pub phone: String,
    pub position: String,
    pub salary: Decimal,
    pub hired_at: NaiveDate,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    #[validate(length(min = 1, max = 255))]
    pub full_name: String,
    #[validate(custom(function = "validation::phone"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255))]
    pub position: String,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub salary: Decimal,
    pub hired_at: NaiveDate,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    #[validate(length(min = 1, max = 255))]
    pub full_name: Option<String>,
    #[validate(custom(function = "validation::phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub position: Option<String>,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub salary: Option<Decimal>,
    pub hired_at: Option<NaiveDate>,
}

/// Payroll sheet of one employee for one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub id: i64,
    pub employee_id: i64,
    pub year: i64,
    pub month: i64,
    pub salary: Decimal,
    pub bonus: Decimal,
    pub comment: Option<String>,
    pub penalties_total: Decimal,
    pub prepayments_total: Decimal,
    /// `salary + bonus - penalties_total - prepayments_total`
    pub payable: Decimal,
    #[serde(flatten)]
    pub audit: Audit,
}

impl MonthlyRecord {
    pub fn compute_payable(salary: Decimal, bonus: Decimal, penalties: Decimal, prepayments: Decimal) -> Decimal {
        salary + bonus - penalties - prepayments
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewMonthlyRecord {
    pub employee_id: i64,
    #[validate(range(min = 2000, max = 2100))]
    pub year: i64,
    #[validate(range(min = 1, max = 12))]
    pub month: i64,
    /// Defaults to the employee's current salary.
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub salary: Option<Decimal>,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub bonus: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecordUpdate {
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub salary: Option<Decimal>,
    #[validate(custom(function = "validation::non_negative_decimal"))]
    pub bonus: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecordFilter {
    pub employee_id: Option<i64>,
    pub year: Option<i64>,
    pub month: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalty {
    pub id: i64,
    pub monthly_record_id: i64,
    pub amount: Decimal,
    pub reason: String,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPenalty {
    #[validate(custom(function = "validation::positive_decimal"))]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prepayment {
    pub id: i64,
    pub monthly_record_id: i64,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPrepayment {
    #[validate(custom(function = "validation::positive_decimal"))]
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
}
