//! # HR Commands
//!
//! Employee records and the payroll summary.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::state::DbState;
use ipe_core::hr::{Employee, NewEmployee, PayrollSummary};

/// Employee as shown in the HR list. The CPF is masked and bank data is
/// left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDto {
    pub id: String,
    pub full_name: String,
    pub cpf_masked: String,
    pub role: String,
    pub department: String,
    pub hired_at: String,
    pub base_salary_cents: i64,
    pub benefits_cents: i64,
    pub total_compensation_cents: i64,
    pub is_active: bool,
}

impl From<Employee> for EmployeeDto {
    fn from(e: Employee) -> Self {
        EmployeeDto {
            cpf_masked: mask_cpf(&e.cpf),
            benefits_cents: e.benefits_total().cents(),
            total_compensation_cents: e.total_compensation().cents(),
            hired_at: e.hired_at.to_string(),
            id: e.id,
            full_name: e.full_name,
            role: e.role,
            department: e.department,
            base_salary_cents: e.base_salary_cents,
            is_active: e.is_active,
        }
    }
}

/// `52998224725` → `***.982.247-**`
fn mask_cpf(cpf: &str) -> String {
    if cpf.len() != 11 || !cpf.is_ascii() {
        return "***".to_string();
    }
    format!("***.{}.{}-**", &cpf[3..6], &cpf[6..9])
}

pub async fn register_employee(db: &DbState, employee: NewEmployee) -> Result<EmployeeDto, ApiError> {
    let saved = db.inner().employees().insert(&employee, Utc::now()).await?;
    Ok(saved.into())
}

pub async fn list_employees(db: &DbState, include_inactive: bool) -> Result<Vec<EmployeeDto>, ApiError> {
    let employees = db.inner().employees().list(include_inactive).await?;
    debug!(count = employees.len(), include_inactive, "list_employees");
    Ok(employees.into_iter().map(EmployeeDto::from).collect())
}

/// Full record, bank data included, for the edit form.
pub async fn get_employee(db: &DbState, id: &str) -> Result<Employee, ApiError> {
    db.inner()
        .employees()
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee", id))
}

pub async fn update_employee(
    db: &DbState,
    id: &str,
    changes: NewEmployee,
) -> Result<EmployeeDto, ApiError> {
    let updated = db.inner().employees().update(id, &changes).await?;
    Ok(updated.into())
}

pub async fn deactivate_employee(db: &DbState, id: &str) -> Result<(), ApiError> {
    Ok(db.inner().employees().deactivate(id).await?)
}

pub async fn payroll_summary(db: &DbState) -> Result<PayrollSummary, ApiError> {
    Ok(db.inner().employees().payroll().await?)
}
