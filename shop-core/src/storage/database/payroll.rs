use super::rows::*;
use super::*;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::storage::traits::PayrollStore;
use async_trait::async_trait;
use tracing::info;

const EMPLOYEE_COLUMNS: &str = "id, full_name, phone, position, salary, hired_at, created_at, updated_at, deleted_at";

const RECORD_COLUMNS: &str = "id, employee_id, year, month, salary, bonus, comment, created_at, updated_at, deleted_at";

fn employee_from_row(row: &Record) -> Result<Employee> {
    Ok(Employee {
        id: get_i64(row, 0)?,
        full_name: get_string(row, 1)?,
        phone: get_string(row, 2)?,
        position: get_string(row, 3)?,
        salary: get_decimal(row, 4)?,
        hired_at: get_date(row, 5)?,
        audit: get_audit(row, 6)?,
    })
}

fn penalty_from_row(row: &Record) -> Result<Penalty> {
    Ok(Penalty {
        id: get_i64(row, 0)?,
        monthly_record_id: get_i64(row, 1)?,
        amount: get_decimal(row, 2)?,
        reason: get_string(row, 3)?,
        audit: get_audit(row, 4)?,
    })
}

fn prepayment_from_row(row: &Record) -> Result<Prepayment> {
    Ok(Prepayment {
        id: get_i64(row, 0)?,
        monthly_record_id: get_i64(row, 1)?,
        amount: get_decimal(row, 2)?,
        paid_at: get_ts(row, 3)?,
        audit: get_audit(row, 4)?,
    })
}

async fn load_employee(conn: &Connection, id: i64) -> Result<Employee> {
    let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?1 AND deleted_at IS NULL");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => employee_from_row(&row),
        None => Err(ShopError::not_found("Employee", id)),
    }
}

async fn ensure_phone_free(conn: &Connection, phone: &str, except: Option<i64>) -> Result<()> {
    let taken = exists(
        conn,
        "SELECT 1 FROM employees WHERE phone = ?1 AND deleted_at IS NULL AND id != ?2",
        vec![text(phone), int(except.unwrap_or(0))],
    )
    .await?;
    if taken {
        Err(ShopError::Conflict(format!("employee with phone {phone} already exists")))
    } else {
        Ok(())
    }
}

/// Amounts are TEXT decimals, so they are summed here rather than in SQL.
async fn sum_amounts(conn: &Connection, table: &str, record_id: i64) -> Result<Decimal> {
    let sql = format!("SELECT amount FROM {table} WHERE monthly_record_id = ?1");
    let mut total = Decimal::ZERO;
    for row in fetch_all(conn, &sql, vec![int(record_id)]).await? {
        total += get_decimal(&row, 0)?;
    }
    Ok(total)
}

async fn record_from_row(conn: &Connection, row: &Record) -> Result<MonthlyRecord> {
    let id = get_i64(row, 0)?;
    let salary = get_decimal(row, 4)?;
    let bonus = get_decimal(row, 5)?;
    let penalties_total = sum_amounts(conn, "penalties", id).await?;
    let prepayments_total = sum_amounts(conn, "prepayments", id).await?;

    Ok(MonthlyRecord {
        id,
        employee_id: get_i64(row, 1)?,
        year: get_i64(row, 2)?,
        month: get_i64(row, 3)?,
        salary,
        bonus,
        comment: get_opt_string(row, 6)?,
        penalties_total,
        prepayments_total,
        payable: MonthlyRecord::compute_payable(salary, bonus, penalties_total, prepayments_total),
        audit: get_audit(row, 7)?,
    })
}

async fn load_record(conn: &Connection, id: i64) -> Result<MonthlyRecord> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM monthly_records WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => record_from_row(conn, &row).await,
        None => Err(ShopError::not_found("Monthly record", id)),
    }
}

async fn ensure_record_exists(conn: &Connection, id: i64) -> Result<()> {
    if exists(conn, "SELECT 1 FROM monthly_records WHERE id = ?1", vec![int(id)]).await? {
        Ok(())
    } else {
        Err(ShopError::not_found("Monthly record", id))
    }
}

#[async_trait]
impl PayrollStore for DatabaseStorage {
    async fn create_employee(&self, input: NewEmployee) -> Result<Employee> {
        let conn = self.db.connection().await;
        ensure_phone_free(&conn, &input.phone, None).await?;

        let id = insert_returning_id(
            &conn,
            "INSERT INTO employees (full_name, phone, position, salary, hired_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6) RETURNING id",
            vec![
                text(input.full_name),
                text(input.phone),
                text(input.position),
                dec(input.salary),
                date(input.hired_at),
                now(),
            ],
        )
        .await?;
        let employee = load_employee(&conn, id).await?;

        info!("Created employee {} ({})", employee.id, employee.full_name);
        Ok(employee)
    }

    async fn get_employee(&self, id: i64) -> Result<Employee> {
        let conn = self.db.connection().await;
        load_employee(&conn, id).await
    }

    async fn list_employees(&self, params: ListParams) -> Result<Page<Employee>> {
        let conn = self.db.connection().await;
        let total = fetch_count(&conn, "SELECT COUNT(*) FROM employees WHERE deleted_at IS NULL", vec![]).await?;
        let sql = format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE deleted_at IS NULL ORDER BY full_name, id LIMIT ?1 OFFSET ?2"
        );
        let rows = fetch_all(&conn, &sql, vec![int(params.limit()), int(params.offset())]).await?;
        let items = rows.iter().map(employee_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn update_employee(&self, id: i64, input: EmployeeUpdate) -> Result<Employee> {
        let conn = self.db.connection().await;
        let current = load_employee(&conn, id).await?;
        if let Some(phone) = &input.phone {
            ensure_phone_free(&conn, phone, Some(id)).await?;
        }

        conn.execute(
            "UPDATE employees SET full_name = ?2, phone = ?3, position = ?4, salary = ?5, hired_at = ?6,
             updated_at = ?7 WHERE id = ?1",
            vec![
                int(id),
                text(input.full_name.unwrap_or(current.full_name)),
                text(input.phone.unwrap_or(current.phone)),
                text(input.position.unwrap_or(current.position)),
                dec(input.salary.unwrap_or(current.salary)),
                date(input.hired_at.unwrap_or(current.hired_at)),
                now(),
            ],
        )
        .await?;
        load_employee(&conn, id).await
    }

    async fn delete_employee(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn
            .execute(
                "UPDATE employees SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
                vec![int(id), now()],
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::not_found("Employee", id));
        }
        info!("Soft-deleted employee {}", id);
        Ok(())
    }

    async fn create_monthly_record(&self, input: NewMonthlyRecord) -> Result<MonthlyRecord> {
        let conn = self.db.connection().await;
        let employee = load_employee(&conn, input.employee_id).await?;

        let id = insert_returning_id(
            &conn,
            "INSERT INTO monthly_records (employee_id, year, month, salary, bonus, comment, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) RETURNING id",
            vec![
                int(employee.id),
                int(input.year),
                int(input.month),
                dec(input.salary.unwrap_or(employee.salary)),
                dec(input.bonus.unwrap_or(Decimal::ZERO)),
                opt_text(input.comment),
                now(),
            ],
        )
        .await
        .map_err(|e| {
            unique_as_conflict(
                e,
                format!(
                    "employee {} already has a record for {}-{:02}",
                    employee.id, input.year, input.month
                ),
            )
        })?;
        let record = load_record(&conn, id).await?;

        info!(
            "Created monthly record {} for employee {} ({}-{:02})",
            record.id, record.employee_id, record.year, record.month
        );
        Ok(record)
    }

    async fn get_monthly_record(&self, id: i64) -> Result<MonthlyRecord> {
        let conn = self.db.connection().await;
        load_record(&conn, id).await
    }

    async fn list_monthly_records(
        &self,
        filter: MonthlyRecordFilter,
        params: ListParams,
    ) -> Result<Page<MonthlyRecord>> {
        let conn = self.db.connection().await;
        let mut w = Where::new();
        if let Some(employee_id) = filter.employee_id {
            w.and("employee_id = ?", int(employee_id));
        }
        if let Some(year) = filter.year {
            w.and("year = ?", int(year));
        }
        if let Some(month) = filter.month {
            w.and("month = ?", int(month));
        }

        let total = fetch_count(&conn, &format!("SELECT COUNT(*) FROM monthly_records{}", w.sql()), w.params()).await?;
        let (values, n) = paged(w.params(), &params);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM monthly_records{} ORDER BY year DESC, month DESC, id LIMIT ?{n} OFFSET ?{}",
            w.sql(),
            n + 1
        );
        let rows = fetch_all(&conn, &sql, values).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(record_from_row(&conn, row).await?);
        }
        Ok(Page::new(items, total))
    }

    async fn update_monthly_record(&self, id: i64, input: MonthlyRecordUpdate) -> Result<MonthlyRecord> {
        let conn = self.db.connection().await;
        let current = load_record(&conn, id).await?;
        conn.execute(
            "UPDATE monthly_records SET salary = ?2, bonus = ?3, comment = ?4, updated_at = ?5 WHERE id = ?1",
            vec![
                int(id),
                dec(input.salary.unwrap_or(current.salary)),
                dec(input.bonus.unwrap_or(current.bonus)),
                opt_text(input.comment.or(current.comment)),
                now(),
            ],
        )
        .await?;
        load_record(&conn, id).await
    }

    async fn delete_monthly_record(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        // penalties and prepayments cascade
        let affected = conn.execute("DELETE FROM monthly_records WHERE id = ?1", vec![int(id)]).await?;
        if affected == 0 {
            return Err(ShopError::not_found("Monthly record", id));
        }
        info!("Deleted monthly record {}", id);
        Ok(())
    }

    async fn add_penalty(&self, record_id: i64, input: NewPenalty) -> Result<Penalty> {
        let conn = self.db.connection().await;
        ensure_record_exists(&conn, record_id).await?;
        let row = fetch_one(
            &conn,
            "INSERT INTO penalties (monthly_record_id, amount, reason, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id, monthly_record_id, amount, reason, created_at, updated_at, deleted_at",
            vec![int(record_id), dec(input.amount), text(input.reason), now()],
        )
        .await?
        .ok_or_else(|| ShopError::Internal("insert returned no row".to_string()))?;
        penalty_from_row(&row)
    }

    async fn list_penalties(&self, record_id: i64) -> Result<Vec<Penalty>> {
        let conn = self.db.connection().await;
        ensure_record_exists(&conn, record_id).await?;
        let sql = format!(
            "SELECT id, monthly_record_id, amount, reason, {AUDIT_COLUMNS} FROM penalties
             WHERE monthly_record_id = ?1 ORDER BY id"
        );
        fetch_all(&conn, &sql, vec![int(record_id)])
            .await?
            .iter()
            .map(penalty_from_row)
            .collect()
    }

    async fn delete_penalty(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn.execute("DELETE FROM penalties WHERE id = ?1", vec![int(id)]).await?;
        if affected == 0 {
            return Err(ShopError::not_found("Penalty", id));
        }
        Ok(())
    }

    async fn add_prepayment(&self, record_id: i64, input: NewPrepayment) -> Result<Prepayment> {
        let conn = self.db.connection().await;
        ensure_record_exists(&conn, record_id).await?;
        let stamp = now();
        let row = fetch_one(
            &conn,
            "INSERT INTO prepayments (monthly_record_id, amount, paid_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             RETURNING id, monthly_record_id, amount, paid_at, created_at, updated_at, deleted_at",
            vec![
                int(record_id),
                dec(input.amount),
                input.paid_at.map(ts).unwrap_or_else(|| stamp.clone()),
                stamp,
            ],
        )
        .await?
        .ok_or_else(|| ShopError::Internal("insert returned no row".to_string()))?;
        prepayment_from_row(&row)
    }

    async fn list_prepayments(&self, record_id: i64) -> Result<Vec<Prepayment>> {
        let conn = self.db.connection().await;
        ensure_record_exists(&conn, record_id).await?;
        let sql = format!(
            "SELECT id, monthly_record_id, amount, paid_at, {AUDIT_COLUMNS} FROM prepayments
             WHERE monthly_record_id = ?1 ORDER BY paid_at, id"
        );
        fetch_all(&conn, &sql, vec![int(record_id)])
            .await?
            .iter()
            .map(prepayment_from_row)
            .collect()
    }

    async fn delete_prepayment(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn.execute("DELETE FROM prepayments WHERE id = ?1", vec![int(id)]).await?;
        if affected == 0 {
            return Err(ShopError::not_found("Prepayment", id));
        }
        Ok(())
    }
}
