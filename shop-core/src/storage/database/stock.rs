use super::rows::*;
use super::*;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::pricing::line_sum;
use crate::storage::traits::StockStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

const ARRIVAL_COLUMNS: &str =
    "id, product_id, quantity, purchase_price, sum, comment, arrived_at, created_at, updated_at, deleted_at";
const REALIZATION_COLUMNS: &str =
    "id, product_id, employee_id, quantity, price, sum, cost, realized_at, created_at, updated_at, deleted_at";
const DISCOUNT_COLUMNS: &str = "id, product_id, percent, starts_at, ends_at, created_at, updated_at, deleted_at";

fn arrival_from_row(row: &Record) -> Result<Arrival> {
    Ok(Arrival {
        id: get_i64(row, 0)?,
        product_id: get_i64(row, 1)?,
        quantity: get_i64(row, 2)?,
        purchase_price: get_decimal(row, 3)?,
        sum: get_decimal(row, 4)?,
        comment: get_opt_string(row, 5)?,
        arrived_at: get_ts(row, 6)?,
        audit: get_audit(row, 7)?,
    })
}

fn realization_from_row(row: &Record) -> Result<Realization> {
    Ok(Realization {
        id: get_i64(row, 0)?,
        product_id: get_i64(row, 1)?,
        employee_id: get_opt_i64(row, 2)?,
        quantity: get_i64(row, 3)?,
        price: get_decimal(row, 4)?,
        sum: get_decimal(row, 5)?,
        cost: get_decimal(row, 6)?,
        realized_at: get_ts(row, 7)?,
        audit: get_audit(row, 8)?,
    })
}

fn discount_from_row(row: &Record) -> Result<Discount> {
    Ok(Discount {
        id: get_i64(row, 0)?,
        product_id: get_i64(row, 1)?,
        percent: get_i64(row, 2)?,
        starts_at: get_ts(row, 3)?,
        ends_at: get_ts(row, 4)?,
        audit: get_audit(row, 5)?,
    })
}

async fn load_arrival(conn: &Connection, id: i64) -> Result<Arrival> {
    let sql = format!("SELECT {ARRIVAL_COLUMNS} FROM arrivals WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => arrival_from_row(&row),
        None => Err(ShopError::not_found("Arrival", id)),
    }
}

async fn load_realization(conn: &Connection, id: i64) -> Result<Realization> {
    let sql = format!("SELECT {REALIZATION_COLUMNS} FROM realizations WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => realization_from_row(&row),
        None => Err(ShopError::not_found("Realization", id)),
    }
}

async fn load_discount(conn: &Connection, id: i64) -> Result<Discount> {
    let sql = format!("SELECT {DISCOUNT_COLUMNS} FROM discounts WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => discount_from_row(&row),
        None => Err(ShopError::not_found("Discount", id)),
    }
}

/// Conflict when `[starts_at, ends_at)` overlaps another discount of the product.
async fn ensure_no_overlap(
    conn: &Connection,
    product_id: i64,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    except: Option<i64>,
) -> Result<()> {
    let overlapping = fetch_one(
        conn,
        "SELECT id FROM discounts
         WHERE product_id = ?1 AND id != ?2 AND starts_at < ?4 AND ends_at > ?3
         LIMIT 1",
        vec![int(product_id), int(except.unwrap_or(0)), ts(starts_at), ts(ends_at)],
    )
    .await?;
    match overlapping {
        Some(row) => Err(ShopError::Conflict(format!(
            "discount overlaps existing discount {} of product {}",
            get_i64(&row, 0)?,
            product_id
        ))),
        None => Ok(()),
    }
}

/// Filter on product and a time column.
fn stock_where(filter: &StockFilter, time_column: &str) -> Where {
    let mut w = Where::new();
    if let Some(product_id) = filter.product_id {
        w.and("product_id = ?", int(product_id));
    }
    if let Some(from) = filter.from {
        w.and(&format!("{time_column} >= ?"), ts(from));
    }
    if let Some(to) = filter.to {
        w.and(&format!("{time_column} < ?"), ts(to));
    }
    w
}

async fn list_rows(
    conn: &Connection,
    table: &str,
    columns: &str,
    time_column: &str,
    filter: &StockFilter,
    params: &ListParams,
) -> Result<(Vec<Record>, i64)> {
    let w = stock_where(filter, time_column);
    let total = fetch_count(conn, &format!("SELECT COUNT(*) FROM {table}{}", w.sql()), w.params()).await?;
    let (values, n) = paged(w.params(), params);
    let sql = format!(
        "SELECT {columns} FROM {table}{} ORDER BY {time_column} DESC, id DESC LIMIT ?{n} OFFSET ?{}",
        w.sql(),
        n + 1
    );
    Ok((fetch_all(conn, &sql, values).await?, total))
}

#[async_trait]
impl StockStore for DatabaseStorage {
    async fn create_arrival(&self, input: NewArrival) -> Result<Arrival> {
        let tx = self.db.begin().await?;
        let result = async {
            let level = load_stock_level(&tx, input.product_id).await?;
            let sum = line_sum(input.purchase_price, input.quantity)?;
            store_stock_level(&tx, input.product_id, level.receive(input.quantity, sum)?).await?;

            let stamp = now();
            let id = insert_returning_id(
                &tx,
                "INSERT INTO arrivals (product_id, quantity, purchase_price, sum, comment, arrived_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7) RETURNING id",
                vec![
                    int(input.product_id),
                    int(input.quantity),
                    dec(input.purchase_price),
                    dec(sum),
                    opt_text(input.comment.clone()),
                    input.arrived_at.map(ts).unwrap_or_else(|| stamp.clone()),
                    stamp,
                ],
            )
            .await?;
            load_arrival(&tx, id).await
        }
        .await;
        let arrival = tx.finish(result).await?;

        info!(
            "Arrival {} added {} units to product {}",
            arrival.id, arrival.quantity, arrival.product_id
        );
        Ok(arrival)
    }

    async fn get_arrival(&self, id: i64) -> Result<Arrival> {
        let conn = self.db.connection().await;
        load_arrival(&conn, id).await
    }

    async fn list_arrivals(&self, filter: StockFilter, params: ListParams) -> Result<Page<Arrival>> {
        let conn = self.db.connection().await;
        let (rows, total) = list_rows(&conn, "arrivals", ARRIVAL_COLUMNS, "arrived_at", &filter, &params).await?;
        let items = rows.iter().map(arrival_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn update_arrival(&self, id: i64, input: ArrivalUpdate) -> Result<Arrival> {
        let tx = self.db.begin().await?;
        let result = async {
            let current = load_arrival(&tx, id).await?;
            let quantity = input.quantity.unwrap_or(current.quantity);
            let purchase_price = input.purchase_price.unwrap_or(current.purchase_price);
            let sum = line_sum(purchase_price, quantity)?;

            let level = load_stock_level(&tx, current.product_id).await?;
            let level = level
                .unreceive(current.quantity, current.sum)?
                .receive(quantity, sum)?;
            store_stock_level(&tx, current.product_id, level).await?;

            tx.execute(
                "UPDATE arrivals SET quantity = ?2, purchase_price = ?3, sum = ?4, comment = ?5,
                 arrived_at = ?6, updated_at = ?7 WHERE id = ?1",
                vec![
                    int(id),
                    int(quantity),
                    dec(purchase_price),
                    dec(sum),
                    opt_text(input.comment.or(current.comment)),
                    ts(input.arrived_at.unwrap_or(current.arrived_at)),
                    now(),
                ],
            )
            .await?;
            load_arrival(&tx, id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn delete_arrival(&self, id: i64) -> Result<()> {
        let tx = self.db.begin().await?;
        let result = async {
            let arrival = load_arrival(&tx, id).await?;
            let level = load_stock_level(&tx, arrival.product_id).await?;
            store_stock_level(&tx, arrival.product_id, level.unreceive(arrival.quantity, arrival.sum)?).await?;
            tx.execute("DELETE FROM arrivals WHERE id = ?1", vec![int(id)]).await?;
            Ok::<_, ShopError>(arrival)
        }
        .await;
        let arrival = tx.finish(result).await?;

        info!("Deleted arrival {} of product {}", id, arrival.product_id);
        Ok(())
    }

    async fn create_realization(&self, input: NewRealization) -> Result<Realization> {
        let tx = self.db.begin().await?;
        let result = async {
            let product = load_product(&tx, input.product_id).await?;
            if let Some(employee_id) = input.employee_id {
                let known = exists(
                    &tx,
                    "SELECT 1 FROM employees WHERE id = ?1 AND deleted_at IS NULL",
                    vec![int(employee_id)],
                )
                .await?;
                if !known {
                    return Err(ShopError::not_found("Employee", employee_id));
                }
            }

            let level = load_stock_level(&tx, product.id).await?;
            let (level, cost) = level.sell(input.quantity)?;
            store_stock_level(&tx, product.id, level).await?;

            let price = input.price.unwrap_or(product.effective_price);
            let stamp = now();
            let id = insert_returning_id(
                &tx,
                "INSERT INTO realizations
                 (product_id, employee_id, quantity, price, sum, cost, realized_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8) RETURNING id",
                vec![
                    int(product.id),
                    opt_int(input.employee_id),
                    int(input.quantity),
                    dec(price),
                    dec(line_sum(price, input.quantity)?),
                    dec(cost),
                    input.realized_at.map(ts).unwrap_or_else(|| stamp.clone()),
                    stamp,
                ],
            )
            .await?;
            load_realization(&tx, id).await
        }
        .await;
        let realization = tx.finish(result).await?;

        info!(
            "Realization {} took {} units of product {}",
            realization.id, realization.quantity, realization.product_id
        );
        Ok(realization)
    }

    async fn get_realization(&self, id: i64) -> Result<Realization> {
        let conn = self.db.connection().await;
        load_realization(&conn, id).await
    }

    async fn list_realizations(&self, filter: StockFilter, params: ListParams) -> Result<Page<Realization>> {
        let conn = self.db.connection().await;
        let (rows, total) =
            list_rows(&conn, "realizations", REALIZATION_COLUMNS, "realized_at", &filter, &params).await?;
        let items = rows.iter().map(realization_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn delete_realization(&self, id: i64) -> Result<()> {
        let tx = self.db.begin().await?;
        let result = async {
            let realization = load_realization(&tx, id).await?;
            let level = load_stock_level(&tx, realization.product_id).await?;
            store_stock_level(
                &tx,
                realization.product_id,
                level.unsell(realization.quantity, realization.cost)?,
            )
            .await?;
            tx.execute("DELETE FROM realizations WHERE id = ?1", vec![int(id)]).await?;
            Ok::<_, ShopError>(())
        }
        .await;
        tx.finish(result).await?;

        info!("Deleted realization {}", id);
        Ok(())
    }

    async fn create_discount(&self, input: NewDiscount) -> Result<Discount> {
        let tx = self.db.begin().await?;
        let result = async {
            load_product(&tx, input.product_id).await?;
            ensure_no_overlap(&tx, input.product_id, input.starts_at, input.ends_at, None).await?;
            let id = insert_returning_id(
                &tx,
                "INSERT INTO discounts (product_id, percent, starts_at, ends_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING id",
                vec![
                    int(input.product_id),
                    int(input.percent),
                    ts(input.starts_at),
                    ts(input.ends_at),
                    now(),
                ],
            )
            .await?;
            load_discount(&tx, id).await
        }
        .await;
        let discount = tx.finish(result).await?;

        info!(
            "Discount {} of {}% on product {}",
            discount.id, discount.percent, discount.product_id
        );
        Ok(discount)
    }

    async fn get_discount(&self, id: i64) -> Result<Discount> {
        let conn = self.db.connection().await;
        load_discount(&conn, id).await
    }

    async fn list_discounts(&self, filter: StockFilter, params: ListParams) -> Result<Page<Discount>> {
        let conn = self.db.connection().await;
        let (rows, total) = list_rows(&conn, "discounts", DISCOUNT_COLUMNS, "starts_at", &filter, &params).await?;
        let items = rows.iter().map(discount_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, total))
    }

    async fn update_discount(&self, id: i64, input: DiscountUpdate) -> Result<Discount> {
        let tx = self.db.begin().await?;
        let result = async {
            let current = load_discount(&tx, id).await?;
            let starts_at = input.starts_at.unwrap_or(current.starts_at);
            let ends_at = input.ends_at.unwrap_or(current.ends_at);
            if starts_at >= ends_at {
                return Err(ShopError::BadRequest("startsAt must be before endsAt".to_string()));
            }
            ensure_no_overlap(&tx, current.product_id, starts_at, ends_at, Some(id)).await?;

            tx.execute(
                "UPDATE discounts SET percent = ?2, starts_at = ?3, ends_at = ?4, updated_at = ?5 WHERE id = ?1",
                vec![
                    int(id),
                    int(input.percent.unwrap_or(current.percent)),
                    ts(starts_at),
                    ts(ends_at),
                    now(),
                ],
            )
            .await?;
            load_discount(&tx, id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn delete_discount(&self, id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        let affected = conn.execute("DELETE FROM discounts WHERE id = ?1", vec![int(id)]).await?;
        if affected == 0 {
            return Err(ShopError::not_found("Discount", id));
        }
        info!("Deleted discount {}", id);
        Ok(())
    }
}
