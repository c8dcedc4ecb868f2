//! # Employee Repository
//!
//! Benefits and bank details are stored as JSON columns and decoded into
//! [`Employee`] on read.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use ipe_core::hr::{BankAccount, Benefit, Employee, NewEmployee, PayrollSummary};

const EMPLOYEE_COLUMNS: &str = r#"
    id, tenant_id, full_name, cpf, role, department, hired_at,
    base_salary_cents, benefits_json, bank_json, user_id, is_active, created_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    id: String,
    tenant_id: String,
    full_name: String,
    cpf: String,
    role: String,
    department: String,
    hired_at: NaiveDate,
    base_salary_cents: i64,
    benefits_json: String,
    bank_json: Option<String>,
    user_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = DbError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let benefits: Vec<Benefit> = serde_json::from_str(&row.benefits_json)?;
        let bank_account: Option<BankAccount> = match row.bank_json {
            Some(json) => Some(serde_json::from_str(&json)?),
            None => None,
        };

        Ok(Employee {
            id: row.id,
            tenant_id: row.tenant_id,
            full_name: row.full_name,
            cpf: row.cpf,
            role: row.role,
            department: row.department,
            hired_at: row.hired_at,
            base_salary_cents: row.base_salary_cents,
            benefits,
            bank_account,
            user_id: row.user_id,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
    tenant_id: String,
}

impl EmployeeRepository {
    pub fn new(pool: SqlitePool, tenant_id: &str) -> Self {
        EmployeeRepository {
            pool,
            tenant_id: tenant_id.to_string(),
        }
    }

    pub async fn insert(&self, new: &NewEmployee, now: DateTime<Utc>) -> DbResult<Employee> {
        let cpf = new.validate()?;

        let employee = Employee {
            id: Uuid::new_v4().to_string(),
            tenant_id: self.tenant_id.clone(),
            full_name: new.full_name.trim().to_string(),
            cpf,
            role: new.role.trim().to_string(),
            department: new.department.trim().to_string(),
            hired_at: new.hired_at,
            base_salary_cents: new.base_salary_cents,
            benefits: new.benefits.clone(),
            bank_account: new.bank_account.clone(),
            user_id: new.user_id.clone(),
            is_active: true,
            created_at: now,
        };

        let benefits_json = serde_json::to_string(&employee.benefits)?;
        let bank_json = employee
            .bank_account
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO employees (
                id, tenant_id, full_name, cpf, role, department, hired_at,
                base_salary_cents, benefits_json, bank_json, user_id, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&employee.id)
        .bind(&employee.tenant_id)
        .bind(&employee.full_name)
        .bind(&employee.cpf)
        .bind(&employee.role)
        .bind(&employee.department)
        .bind(employee.hired_at)
        .bind(employee.base_salary_cents)
        .bind(&benefits_json)
        .bind(&bank_json)
        .bind(&employee.user_id)
        .bind(employee.is_active)
        .bind(employee.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("cpf", &employee.cpf),
            other => other,
        })?;

        info!(id = %employee.id, department = %employee.department, "Employee registered");
        Ok(employee)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Employee>> {
        let sql = format!(
            "SELECT {} FROM employees WHERE id = ?1 AND tenant_id = ?2",
            EMPLOYEE_COLUMNS
        );
        let row = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(id)
            .bind(&self.tenant_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Employee::try_from).transpose()
    }

    /// Employees ordered by name; former employees only on request.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Employee>> {
        let sql = format!(
            r#"
            SELECT {} FROM employees
            WHERE tenant_id = ?1 AND (?2 OR is_active = 1)
            ORDER BY full_name
            "#,
            EMPLOYEE_COLUMNS
        );
        let rows = sqlx::query_as::<_, EmployeeRow>(&sql)
            .bind(&self.tenant_id)
            .bind(include_inactive)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Employee::try_from).collect()
    }

    /// Replaces salary, role and benefits of an existing employee.
    pub async fn update(&self, id: &str, changes: &NewEmployee) -> DbResult<Employee> {
        let cpf = changes.validate()?;
        let benefits_json = serde_json::to_string(&changes.benefits)?;
        let bank_json = changes
            .bank_account
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE employees SET
                full_name = ?3, cpf = ?4, role = ?5, department = ?6, hired_at = ?7,
                base_salary_cents = ?8, benefits_json = ?9, bank_json = ?10, user_id = ?11
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(&self.tenant_id)
        .bind(changes.full_name.trim())
        .bind(&cpf)
        .bind(changes.role.trim())
        .bind(changes.department.trim())
        .bind(changes.hired_at)
        .bind(changes.base_salary_cents)
        .bind(&benefits_json)
        .bind(&bank_json)
        .bind(&changes.user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("cpf", &cpf),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE employees SET is_active = 0 WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(&self.tenant_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        info!(id = %id, "Employee deactivated");
        Ok(())
    }

    pub async fn payroll(&self) -> DbResult<PayrollSummary> {
        Ok(PayrollSummary::from_employees(&self.list(false).await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn new_employee(name: &str, cpf: &str, dept: &str, salary: i64) -> NewEmployee {
        NewEmployee {
            full_name: name.to_string(),
            cpf: cpf.to_string(),
            role: "Vendedor".to_string(),
            department: dept.to_string(),
            hired_at: NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(),
            base_salary_cents: salary,
            benefits: vec![Benefit {
                name: "Vale-refeição".to_string(),
                amount_cents: 60000,
            }],
            bank_account: Some(BankAccount {
                bank: "341".to_string(),
                agency: "0001".to_string(),
                account: "12345-6".to_string(),
                pix_key: None,
            }),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back_json_columns() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db
            .employees()
            .insert(&new_employee("Ana Souza", "529.982.247-25", "Vendas", 250000), Utc::now())
            .await
            .unwrap();
        assert_eq!(created.cpf, "52998224725");

        let loaded = db.employees().get(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.benefits.len(), 1);
        assert_eq!(loaded.bank_account.as_ref().map(|b| b.bank.as_str()), Some("341"));
        assert_eq!(loaded.total_compensation().cents(), 310000);

        let err = db
            .employees()
            .insert(&new_employee("Outra Pessoa", "52998224725", "Vendas", 1000), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "52998224725"));
    }

    #[tokio::test]
    async fn test_invalid_cpf_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .employees()
            .insert(&new_employee("Ana", "111.111.111-11", "Vendas", 1000), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_deactivate_and_payroll() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.employees();
        let ana = repo
            .insert(&new_employee("Ana", "52998224725", "Vendas", 250000), Utc::now())
            .await
            .unwrap();
        let caio = repo
            .insert(&new_employee("Caio", "11144477735", "Logística", 180000), Utc::now())
            .await
            .unwrap();

        let mut raise = new_employee("Ana", "52998224725", "Vendas", 300000);
        raise.benefits.clear();
        let updated = repo.update(&ana.id, &raise).await.unwrap();
        assert_eq!(updated.total_compensation().cents(), 300000);

        repo.deactivate(&caio.id).await.unwrap();
        assert_eq!(repo.list(false).await.unwrap().len(), 1);
        assert_eq!(repo.list(true).await.unwrap().len(), 2);

        let payroll = repo.payroll().await.unwrap();
        assert_eq!(payroll.headcount, 1);
        assert_eq!(payroll.total_cost.cents(), 300000);
    }
}
