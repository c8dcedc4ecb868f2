//! # HR (Colaboradores)
//!
//! Employee records and the compensation figures the HR screen shows.
//! Benefits are itemized (vale-transporte, vale-refeição, plano de saúde)
//! and count toward the monthly cost of an employee.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_cpf, validate_price_cents, ValidationResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Benefit {
    pub name: String,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub bank: String,
    pub agency: String,
    pub account: String,
    pub pix_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub tenant_id: String,
    pub full_name: String,
    /// Digits only.
    pub cpf: String,
    pub role: String,
    pub department: String,
    #[ts(as = "String")]
    pub hired_at: NaiveDate,
    pub base_salary_cents: i64,
    pub benefits: Vec<Benefit>,
    pub bank_account: Option<BankAccount>,
    /// Login linked to this employee, if any.
    pub user_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn base_salary(&self) -> Money {
        Money::from_cents(self.base_salary_cents)
    }

    pub fn benefits_total(&self) -> Money {
        self.benefits
            .iter()
            .map(|b| Money::from_cents(b.amount_cents))
            .sum()
    }

    /// Base salary plus all benefits.
    pub fn total_compensation(&self) -> Money {
        self.base_salary() + self.benefits_total()
    }
}

/// Input for hiring or editing an employee.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub full_name: String,
    pub cpf: String,
    pub role: String,
    pub department: String,
    #[ts(as = "String")]
    pub hired_at: NaiveDate,
    pub base_salary_cents: i64,
    #[serde(default)]
    pub benefits: Vec<Benefit>,
    pub bank_account: Option<BankAccount>,
    pub user_id: Option<String>,
}

impl NewEmployee {
    /// Validates the record and returns the CPF normalized to digits.
    pub fn validate(&self) -> ValidationResult<String> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "full_name".to_string(),
            });
        }
        if self.department.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "department".to_string(),
            });
        }
        validate_price_cents(self.base_salary_cents)?;
        for benefit in &self.benefits {
            if benefit.name.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "benefit name".to_string(),
                });
            }
            if benefit.amount_cents < 0 {
                return Err(ValidationError::OutOfRange {
                    field: "benefit amount".to_string(),
                    min: 0,
                    max: i64::MAX,
                });
            }
        }
        validate_cpf(&self.cpf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPayroll {
    pub department: String,
    pub headcount: usize,
    pub total_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PayrollSummary {
    pub headcount: usize,
    pub total_base: Money,
    pub total_benefits: Money,
    pub total_cost: Money,
    /// Alphabetical by department.
    pub by_department: Vec<DepartmentPayroll>,
}

impl PayrollSummary {
    /// Monthly payroll of active employees.
    pub fn from_employees(employees: &[Employee]) -> Self {
        let mut departments: BTreeMap<&str, DepartmentPayroll> = BTreeMap::new();
        let mut summary = PayrollSummary {
            headcount: 0,
            total_base: Money::zero(),
            total_benefits: Money::zero(),
            total_cost: Money::zero(),
            by_department: Vec::new(),
        };

        for employee in employees.iter().filter(|e| e.is_active) {
            let cost = employee.total_compensation();
            summary.headcount += 1;
            summary.total_base += employee.base_salary();
            summary.total_benefits += employee.benefits_total();
            summary.total_cost += cost;

            let dept = departments
                .entry(employee.department.as_str())
                .or_insert_with(|| DepartmentPayroll {
                    department: employee.department.clone(),
                    headcount: 0,
                    total_cost: Money::zero(),
                });
            dept.headcount += 1;
            dept.total_cost += cost;
        }

        summary.by_department = departments.into_values().collect();
        summary
    }
}
