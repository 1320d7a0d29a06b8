use super::rows::*;
use super::*;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use crate::pricing::{line_sum, total_of};
use crate::storage::traits::SalesStore;
use async_trait::async_trait;
use tracing::{debug, info};

const ORDER_COLUMNS: &str = "id, user_id, status, phone, address, comment, total, created_at, updated_at, deleted_at";

/// Live, active product that can be put in a basket or ordered.
async fn load_buyable(conn: &Connection, product_id: i64) -> Result<Product> {
    let product = load_product(conn, product_id).await?;
    if !product.is_active {
        return Err(ShopError::not_found("Product", product_id));
    }
    Ok(product)
}

fn ensure_in_stock(product: &Product, quantity: i64) -> Result<()> {
    if quantity > product.quantity {
        return Err(ShopError::BadRequest(format!(
            "only {} units of product {} in stock, requested {}",
            product.quantity, product.id, quantity
        )));
    }
    Ok(())
}

async fn load_basket(conn: &Connection, user_id: i64) -> Result<Basket> {
    let sql = "SELECT b.id, b.product_id, b.quantity, b.price, b.created_at, b.updated_at, b.deleted_at
               FROM basket_items b JOIN products p ON p.id = b.product_id
               WHERE b.user_id = ?1 AND p.deleted_at IS NULL
               ORDER BY b.id";
    let mut items = Vec::new();
    for row in fetch_all(conn, sql, vec![int(user_id)]).await? {
        let quantity = get_i64(&row, 2)?;
        let price = get_decimal(&row, 3)?;
        items.push(BasketItem {
            id: get_i64(&row, 0)?,
            product_id: get_i64(&row, 1)?,
            quantity,
            price,
            sum: line_sum(price, quantity)?,
            audit: get_audit(&row, 4)?,
        });
    }
    Ok(Basket::new(user_id, items))
}

/// Product of the basket line `item_id` owned by `user_id`.
async fn basket_line_product(conn: &Connection, user_id: i64, item_id: i64) -> Result<i64> {
    let row = fetch_one(
        conn,
        "SELECT product_id FROM basket_items WHERE id = ?1 AND user_id = ?2",
        vec![int(item_id), int(user_id)],
    )
    .await?
    .ok_or_else(|| ShopError::not_found("Basket item", item_id))?;
    get_i64(&row, 0)
}

async fn load_favorites(conn: &Connection, user_id: i64) -> Result<FavoriteList> {
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM favorites f JOIN products p ON p.id = f.product_id
         WHERE f.user_id = ?1 AND p.deleted_at IS NULL
         ORDER BY f.created_at, p.id"
    );
    let mut products = Vec::new();
    for row in fetch_all(conn, &sql, vec![int(user_id)]).await? {
        products.push(product_from_row(conn, &row).await?);
    }
    Ok(FavoriteList { user_id, products })
}

async fn order_products(conn: &Connection, order_id: i64) -> Result<Vec<OrderProduct>> {
    fetch_all(
        conn,
        "SELECT id, product_id, quantity, price, sum, cost FROM order_products WHERE order_id = ?1 ORDER BY id",
        vec![int(order_id)],
    )
    .await?
    .iter()
    .map(|row| {
        Ok(OrderProduct {
            id: get_i64(row, 0)?,
            product_id: get_opt_i64(row, 1)?,
            quantity: get_i64(row, 2)?,
            price: get_decimal(row, 3)?,
            sum: get_decimal(row, 4)?,
            cost: get_decimal(row, 5)?,
        })
    })
    .collect()
}

async fn order_from_row(conn: &Connection, row: &Record) -> Result<Order> {
    let id = get_i64(row, 0)?;
    Ok(Order {
        id,
        user_id: get_opt_i64(row, 1)?,
        status: get_string(row, 2)?.parse()?,
        phone: get_string(row, 3)?,
        address: get_string(row, 4)?,
        comment: get_opt_string(row, 5)?,
        total: get_decimal(row, 6)?,
        products: order_products(conn, id).await?,
        audit: get_audit(row, 7)?,
    })
}

async fn load_order(conn: &Connection, id: i64) -> Result<Order> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
    match fetch_one(conn, &sql, vec![int(id)]).await? {
        Some(row) => order_from_row(conn, &row).await,
        None => Err(ShopError::not_found("Order", id)),
    }
}

/// Put the units of an order back in stock. Lines whose product row is gone
/// are skipped; soft-deleted products still get their counters back.
async fn restore_stock(conn: &Connection, order: &Order) -> Result<()> {
    for line in &order.products {
        let Some(product_id) = line.product_id else {
            continue;
        };
        let Some(row) = fetch_one(
            conn,
            "SELECT quantity, sum, sale_quantity FROM products WHERE id = ?1",
            vec![int(product_id)],
        )
        .await?
        else {
            continue;
        };
        let level = StockLevel {
            quantity: get_i64(&row, 0)?,
            sum: get_decimal(&row, 1)?,
            sale_quantity: get_i64(&row, 2)?,
        };
        store_stock_level(conn, product_id, level.unsell(line.quantity, line.cost)?).await?;
    }
    debug!("Restored stock of order {}", order.id);
    Ok(())
}

#[async_trait]
impl SalesStore for DatabaseStorage {
    async fn get_basket(&self, user_id: i64) -> Result<Basket> {
        let conn = self.db.connection().await;
        load_basket(&conn, user_id).await
    }

    async fn add_to_basket(&self, user_id: i64, input: NewBasketItem) -> Result<Basket> {
        let tx = self.db.begin().await?;
        let result = async {
            let product = load_buyable(&tx, input.product_id).await?;
            let existing = fetch_one(
                &tx,
                "SELECT id, quantity FROM basket_items WHERE user_id = ?1 AND product_id = ?2",
                vec![int(user_id), int(product.id)],
            )
            .await?;

            match existing {
                Some(row) => {
                    let quantity = get_i64(&row, 1)? + input.quantity;
                    ensure_in_stock(&product, quantity)?;
                    tx.execute(
                        "UPDATE basket_items SET quantity = ?2, price = ?3, updated_at = ?4 WHERE id = ?1",
                        vec![int(get_i64(&row, 0)?), int(quantity), dec(product.effective_price), now()],
                    )
                    .await?;
                }
                None => {
                    ensure_in_stock(&product, input.quantity)?;
                    tx.execute(
                        "INSERT INTO basket_items (user_id, product_id, quantity, price, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                        vec![
                            int(user_id),
                            int(product.id),
                            int(input.quantity),
                            dec(product.effective_price),
                            now(),
                        ],
                    )
                    .await?;
                }
            }
            load_basket(&tx, user_id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn update_basket_item(&self, user_id: i64, item_id: i64, input: BasketItemUpdate) -> Result<Basket> {
        let tx = self.db.begin().await?;
        let result = async {
            let product_id = basket_line_product(&tx, user_id, item_id).await?;
            let product = load_buyable(&tx, product_id).await?;
            ensure_in_stock(&product, input.quantity)?;
            tx.execute(
                "UPDATE basket_items SET quantity = ?2, price = ?3, updated_at = ?4 WHERE id = ?1",
                vec![int(item_id), int(input.quantity), dec(product.effective_price), now()],
            )
            .await?;
            load_basket(&tx, user_id).await
        }
        .await;
        tx.finish(result).await
    }

    async fn remove_basket_item(&self, user_id: i64, item_id: i64) -> Result<Basket> {
        let conn = self.db.connection().await;
        let affected = conn
            .execute(
                "DELETE FROM basket_items WHERE id = ?1 AND user_id = ?2",
                vec![int(item_id), int(user_id)],
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::not_found("Basket item", item_id));
        }
        load_basket(&conn, user_id).await
    }

    async fn clear_basket(&self, user_id: i64) -> Result<()> {
        let conn = self.db.connection().await;
        conn.execute("DELETE FROM basket_items WHERE user_id = ?1", vec![int(user_id)])
            .await?;
        Ok(())
    }

    async fn list_favorites(&self, user_id: i64) -> Result<FavoriteList> {
        let conn = self.db.connection().await;
        load_favorites(&conn, user_id).await
    }

    async fn add_favorite(&self, user_id: i64, product_id: i64) -> Result<FavoriteList> {
        let conn = self.db.connection().await;
        load_product(&conn, product_id).await?;
        conn.execute(
            "INSERT INTO favorites (user_id, product_id, created_at) VALUES (?1, ?2, ?3)",
            vec![int(user_id), int(product_id), now()],
        )
        .await
        .map_err(|e| conflict_on_unique(e, format!("product {product_id} is already a favorite")))?;
        load_favorites(&conn, user_id).await
    }

    async fn remove_favorite(&self, user_id: i64, product_id: i64) -> Result<FavoriteList> {
        let conn = self.db.connection().await;
        let affected = conn
            .execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND product_id = ?2",
                vec![int(user_id), int(product_id)],
            )
            .await?;
        if affected == 0 {
            return Err(ShopError::NotFound(format!("product {product_id} is not a favorite")));
        }
        load_favorites(&conn, user_id).await
    }

    async fn create_order(&self, user_id: i64, input: NewOrder) -> Result<Order> {
        let tx = self.db.begin().await?;
        let result = async {
            let from_basket = input.products.is_empty();
            let lines: Vec<(i64, i64)> = if from_basket {
                let basket = load_basket(&tx, user_id).await?;
                if basket.items.is_empty() {
                    return Err(ShopError::BadRequest("basket is empty".to_string()));
                }
                basket.items.iter().map(|i| (i.product_id, i.quantity)).collect()
            } else {
                input.products.iter().map(|l| (l.product_id, l.quantity)).collect()
            };

            let order_id = insert_returning_id(
                &tx,
                "INSERT INTO orders (user_id, status, phone, address, comment, total, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, '0', ?6, ?6) RETURNING id",
                vec![
                    int(user_id),
                    text(OrderStatus::New.as_str()),
                    text(input.phone.as_str()),
                    text(input.address.as_str()),
                    opt_text(input.comment.clone()),
                    now(),
                ],
            )
            .await?;

            let mut sums = Vec::with_capacity(lines.len());
            for (product_id, quantity) in &lines {
                let product = load_buyable(&tx, *product_id).await?;
                let (level, cost) = load_stock_level(&tx, product.id).await?.sell(*quantity)?;
                store_stock_level(&tx, product.id, level).await?;

                let sum = line_sum(product.effective_price, *quantity)?;
                sums.push(sum);
                tx.execute(
                    "INSERT INTO order_products (order_id, product_id, quantity, price, sum, cost)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    vec![
                        int(order_id),
                        int(product.id),
                        int(*quantity),
                        dec(product.effective_price),
                        dec(sum),
                        dec(cost),
                    ],
                )
                .await?;
            }

            tx.execute(
                "UPDATE orders SET total = ?2 WHERE id = ?1",
                vec![int(order_id), dec(total_of(sums)?)],
            )
            .await?;

            if from_basket {
                tx.execute("DELETE FROM basket_items WHERE user_id = ?1", vec![int(user_id)])
                    .await?;
            } else {
                for (product_id, _) in &lines {
                    tx.execute(
                        "DELETE FROM basket_items WHERE user_id = ?1 AND product_id = ?2",
                        vec![int(user_id), int(*product_id)],
                    )
                    .await?;
                }
            }
            load_order(&tx, order_id).await
        }
        .await;
        let order = tx.finish(result).await?;

        info!(
            "User {} placed order {} with {} lines, total {}",
            user_id,
            order.id,
            order.products.len(),
            order.total
        );
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> Result<Order> {
        let conn = self.db.connection().await;
        load_order(&conn, id).await
    }

    async fn list_orders(&self, filter: OrderFilter, params: ListParams) -> Result<Page<Order>> {
        let conn = self.db.connection().await;
        let mut w = Where::new();
        if let Some(user_id) = filter.user_id {
            w.and("user_id = ?", int(user_id));
        }
        if let Some(status) = filter.status {
            w.and("status = ?", text(status.as_str()));
        }

        let total = fetch_count(&conn, &format!("SELECT COUNT(*) FROM orders{}", w.sql()), w.params()).await?;
        let (values, n) = paged(w.params(), &params);
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders{} ORDER BY id DESC LIMIT ?{n} OFFSET ?{}",
            w.sql(),
            n + 1
        );
        let rows = fetch_all(&conn, &sql, values).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push(order_from_row(&conn, row).await?);
        }
        Ok(Page::new(items, total))
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order> {
        let tx = self.db.begin().await?;
        let result = async {
            let order = load_order(&tx, id).await?;
            if !order.status.can_transition_to(status) {
                return Err(ShopError::BadRequest(format!(
                    "order {} cannot go from {} to {}",
                    id, order.status, status
                )));
            }
            if status == OrderStatus::Cancelled {
                restore_stock(&tx, &order).await?;
            }
            tx.execute(
                "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1",
                vec![int(id), text(status.as_str()), now()],
            )
            .await?;
            load_order(&tx, id).await
        }
        .await;
        let order = tx.finish(result).await?;

        info!("Order {} is now {}", order.id, order.status);
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<()> {
        let tx = self.db.begin().await?;
        let result = async {
            let order = load_order(&tx, id).await?;
            if order.status != OrderStatus::Cancelled {
                restore_stock(&tx, &order).await?;
            }
            tx.execute("DELETE FROM orders WHERE id = ?1", vec![int(id)]).await?;
            Ok::<_, ShopError>(())
        }
        .await;
        tx.finish(result).await?;

        info!("Deleted order {}", id);
        Ok(())
    }
}
