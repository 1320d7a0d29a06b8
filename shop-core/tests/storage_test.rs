use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use shop_core::storage::*;
use shop_core::*;
use tempfile::TempDir;

async fn storage() -> (DatabaseStorage, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");
    let storage = DatabaseStorage::open(path.to_str().unwrap(), None).await.unwrap();
    (storage, dir)
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn en(title: &str) -> Vec<Translation> {
    vec![Translation {
        lang: "en".to_string(),
        title: title.to_string(),
        description: None,
    }]
}

fn new_product(article: &str, price: &str) -> NewProduct {
    NewProduct {
        subcategory_id: None,
        article: article.to_string(),
        barcode: None,
        price: d(price),
        is_active: true,
        translations: en(article),
    }
}

async fn stocked_product(storage: &DatabaseStorage, article: &str, quantity: i64, purchase: &str) -> Product {
    let product = storage.create_product(new_product(article, "10.00")).await.unwrap();
    storage
        .create_arrival(NewArrival {
            product_id: product.id,
            quantity,
            purchase_price: d(purchase),
            comment: None,
            arrived_at: None,
        })
        .await
        .unwrap();
    storage.get_product(product.id).await.unwrap()
}

async fn user(storage: &DatabaseStorage, phone: &str) -> User {
    storage
        .create_user(NewUser {
            phone: phone.to_string(),
            full_name: "Test User".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn category_titles_are_unique_per_language() {
    let (storage, _dir) = storage().await;
    storage
        .create_category(NewCategory { position: 0, translations: en("Kitchen") })
        .await
        .unwrap();

    let err = storage
        .create_category(NewCategory { position: 1, translations: en("Kitchen") })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");

    // Same title in another language is fine.
    let ru = vec![Translation {
        lang: "ru".to_string(),
        title: "Kitchen".to_string(),
        description: None,
    }];
    storage
        .create_category(NewCategory { position: 1, translations: ru })
        .await
        .unwrap();
}

#[tokio::test]
async fn category_with_subcategories_cannot_be_deleted() {
    let (storage, _dir) = storage().await;
    let category = storage
        .create_category(NewCategory { position: 0, translations: en("Garden") })
        .await
        .unwrap();
    let subcategory = storage
        .create_subcategory(NewSubcategory {
            category_id: category.id,
            position: 0,
            translations: en("Tools"),
        })
        .await
        .unwrap();

    let err = storage.delete_category(category.id).await.unwrap_err();
    assert!(matches!(err, ShopError::Forbidden(_)), "{err:?}");

    storage.delete_subcategory(subcategory.id).await.unwrap();
    storage.delete_category(category.id).await.unwrap();
    assert!(matches!(
        storage.get_category(category.id).await,
        Err(ShopError::NotFound(_))
    ));
}

#[tokio::test]
async fn deleting_a_subcategory_detaches_its_products() {
    let (storage, _dir) = storage().await;
    let category = storage
        .create_category(NewCategory { position: 0, translations: en("Home") })
        .await
        .unwrap();
    let subcategory = storage
        .create_subcategory(NewSubcategory {
            category_id: category.id,
            position: 0,
            translations: en("Lamps"),
        })
        .await
        .unwrap();
    let product = storage
        .create_product(NewProduct {
            subcategory_id: Some(subcategory.id),
            ..new_product("LAMP-1", "25.00")
        })
        .await
        .unwrap();

    storage.delete_subcategory(subcategory.id).await.unwrap();
    let product = storage.get_product(product.id).await.unwrap();
    assert_eq!(product.subcategory_id, None);
}

#[tokio::test]
async fn duplicate_article_conflicts_until_soft_deleted() {
    let (storage, _dir) = storage().await;
    let first = storage.create_product(new_product("MUG-1", "5.00")).await.unwrap();

    let err = storage.create_product(new_product("MUG-1", "6.00")).await.unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");

    storage.delete_product(first.id).await.unwrap();
    assert!(matches!(storage.get_product(first.id).await, Err(ShopError::NotFound(_))));

    let second = storage.create_product(new_product("MUG-1", "6.00")).await.unwrap();
    assert_ne!(first.id, second.id);
}

#[tokio::test]
async fn product_search_matches_titles_case_insensitively() {
    let (storage, _dir) = storage().await;
    storage.create_product(new_product("Blue Teapot", "5.00")).await.unwrap();
    storage.create_product(new_product("Red Kettle", "5.00")).await.unwrap();

    let page = storage
        .list_products(
            ProductFilter {
                search: Some("teapot".to_string()),
                ..Default::default()
            },
            ListParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].article, "Blue Teapot");

    let by_lang = storage
        .list_products(
            ProductFilter {
                lang: Some("ru".to_string()),
                ..Default::default()
            },
            ListParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_lang.total, 0);
}

#[tokio::test]
async fn category_keeps_every_translation() {
    let (storage, _dir) = storage().await;
    let translations = vec![
        Translation {
            lang: "en".to_string(),
            title: "Shoes".to_string(),
            description: Some("All kinds".to_string()),
        },
        Translation {
            lang: "ru".to_string(),
            title: "Обувь".to_string(),
            description: None,
        },
    ];
    let created = storage
        .create_category(NewCategory { position: 0, translations })
        .await
        .unwrap();
    assert_eq!(created.translations.len(), 2);

    let loaded = storage.get_category(created.id).await.unwrap();
    let titles: Vec<_> = loaded.translations.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Shoes", "Обувь"]);
    assert_eq!(loaded.translations[0].description.as_deref(), Some("All kinds"));

    let page = storage.list_categories(ListParams::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].translations.len(), 2);
}

#[tokio::test]
async fn product_search_folds_cyrillic_case() {
    let (storage, _dir) = storage().await;
    storage
        .create_product(NewProduct {
            translations: vec![Translation {
                lang: "ru".to_string(),
                title: "Обувь летняя".to_string(),
                description: None,
            }],
            ..new_product("SHOE-1", "30.00")
        })
        .await
        .unwrap();
    storage.create_product(new_product("Summer hat", "8.00")).await.unwrap();

    for (search, lang) in [("обувь", None), ("ЛЕТНЯЯ", Some("ru")), ("100%", None)] {
        let page = storage
            .list_products(
                ProductFilter {
                    search: Some(search.to_string()),
                    lang: lang.map(str::to_string),
                    ..Default::default()
                },
                ListParams::default(),
            )
            .await
            .unwrap();
        let expected = if search == "100%" { 0 } else { 1 };
        assert_eq!(page.total, expected, "search {search:?}");
        if expected == 1 {
            assert_eq!(page.items[0].article, "SHOE-1");
        }
    }
}

#[tokio::test]
async fn deleting_a_product_clears_baskets_and_favorites() {
    let (storage, _dir) = storage().await;
    let product = stocked_product(&storage, "CUP-1", 5, "2.00").await;
    let buyer = user(&storage, "+998901010101").await;
    storage
        .add_to_basket(buyer.id, NewBasketItem { product_id: product.id, quantity: 1 })
        .await
        .unwrap();
    storage.add_favorite(buyer.id, product.id).await.unwrap();

    storage.delete_product(product.id).await.unwrap();
    assert!(storage.get_basket(buyer.id).await.unwrap().items.is_empty());
    assert!(storage.list_favorites(buyer.id).await.unwrap().products.is_empty());
    assert!(matches!(storage.delete_product(product.id).await, Err(ShopError::NotFound(_))));
}

#[tokio::test]
async fn oversized_arrivals_are_rejected_without_moving_stock() {
    let (storage, _dir) = storage().await;
    let huge = i64::MAX / 2 + 1;
    let product = stocked_product(&storage, "BOLT-1", huge, "0.00").await;

    let err = storage
        .create_arrival(NewArrival {
            product_id: product.id,
            quantity: huge,
            purchase_price: d("0.00"),
            comment: None,
            arrived_at: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::BadRequest(_)), "{err:?}");

    let after = storage.get_product(product.id).await.unwrap();
    assert_eq!(after.quantity, huge);
    let arrivals = storage
        .list_arrivals(
            StockFilter { product_id: Some(product.id), from: None, to: None },
            ListParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(arrivals.total, 1);
}

#[tokio::test]
async fn arrivals_and_realizations_move_stock() {
    let (storage, _dir) = storage().await;
    let product = stocked_product(&storage, "BOLT", 10, "2.50").await;
    assert_eq!(product.quantity, 10);
    assert_eq!(product.sum, d("25.00"));

    let realization = storage
        .create_realization(NewRealization {
            product_id: product.id,
            employee_id: None,
            quantity: 4,
            price: None,
            realized_at: None,
        })
        .await
        .unwrap();
    assert_eq!(realization.price, d("10.00"));
    assert_eq!(realization.sum, d("40.00"));
    assert_eq!(realization.cost, d("10.00"));

    let after_sale = storage.get_product(product.id).await.unwrap();
    assert_eq!(after_sale.quantity, 6);
    assert_eq!(after_sale.sale_quantity, 4);
    assert_eq!(after_sale.sum, d("15.00"));

    let err = storage
        .create_realization(NewRealization {
            product_id: product.id,
            employee_id: None,
            quantity: 7,
            price: None,
            realized_at: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::BadRequest(_)), "{err:?}");

    storage.delete_realization(realization.id).await.unwrap();
    let restored = storage.get_product(product.id).await.unwrap();
    assert_eq!(restored.quantity, 10);
    assert_eq!(restored.sale_quantity, 0);
    assert_eq!(restored.sum, d("25.00"));
}

#[tokio::test]
async fn arrival_cannot_be_deleted_after_its_units_sold() {
    let (storage, _dir) = storage().await;
    let product = stocked_product(&storage, "NUT", 3, "1.00").await;
    let arrivals = storage
        .list_arrivals(
            StockFilter {
                product_id: Some(product.id),
                ..Default::default()
            },
            ListParams::default(),
        )
        .await
        .unwrap();
    assert_eq!(arrivals.total, 1);

    storage
        .create_realization(NewRealization {
            product_id: product.id,
            employee_id: None,
            quantity: 2,
            price: Some(d("3.00")),
            realized_at: None,
        })
        .await
        .unwrap();

    let err = storage.delete_arrival(arrivals.items[0].id).await.unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");
    assert_eq!(storage.get_product(product.id).await.unwrap().quantity, 1);
}

#[tokio::test]
async fn updating_an_arrival_reapplies_it() {
    let (storage, _dir) = storage().await;
    let product = stocked_product(&storage, "WASHER", 5, "2.00").await;
    let arrival = storage
        .list_arrivals(StockFilter::default(), ListParams::default())
        .await
        .unwrap()
        .items
        .remove(0);

    let updated = storage
        .update_arrival(
            arrival.id,
            ArrivalUpdate {
                quantity: Some(8),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.sum, d("16.00"));

    let product = storage.get_product(product.id).await.unwrap();
    assert_eq!(product.quantity, 8);
    assert_eq!(product.sum, d("16.00"));
}

#[tokio::test]
async fn discounts_set_effective_price_and_cannot_overlap() {
    let (storage, _dir) = storage().await;
    let product = storage.create_product(new_product("LAMP", "80.00")).await.unwrap();
    let now = Utc::now();

    storage
        .create_discount(NewDiscount {
            product_id: product.id,
            percent: 25,
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
        })
        .await
        .unwrap();
    let product = storage.get_product(product.id).await.unwrap();
    assert_eq!(product.effective_price, d("60.00"));

    let err = storage
        .create_discount(NewDiscount {
            product_id: product.id,
            percent: 10,
            starts_at: now,
            ends_at: now + Duration::days(1),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");

    // Back-to-back windows do not overlap.
    storage
        .create_discount(NewDiscount {
            product_id: product.id,
            percent: 10,
            starts_at: now + Duration::hours(1),
            ends_at: now + Duration::days(1),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn monthly_record_totals_and_uniqueness() {
    let (storage, _dir) = storage().await;
    let employee = storage
        .create_employee(NewEmployee {
            full_name: "Ann Smith".to_string(),
            phone: "+998901234567".to_string(),
            position: "Cashier".to_string(),
            salary: d("3000.00"),
            hired_at: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        })
        .await
        .unwrap();

    let record = storage
        .create_monthly_record(NewMonthlyRecord {
            employee_id: employee.id,
            year: 2024,
            month: 3,
            salary: None,
            bonus: Some(d("200.00")),
            comment: None,
        })
        .await
        .unwrap();
    assert_eq!(record.salary, d("3000.00"));

    storage
        .add_penalty(record.id, NewPenalty { amount: d("150.00"), reason: "Late".to_string() })
        .await
        .unwrap();
    storage
        .add_prepayment(record.id, NewPrepayment { amount: d("1000.00"), paid_at: None })
        .await
        .unwrap();

    let record = storage.get_monthly_record(record.id).await.unwrap();
    assert_eq!(record.penalties_total, d("150.00"));
    assert_eq!(record.prepayments_total, d("1000.00"));
    assert_eq!(record.payable, d("2050.00"));

    let err = storage
        .create_monthly_record(NewMonthlyRecord {
            employee_id: employee.id,
            year: 2024,
            month: 3,
            salary: None,
            bonus: None,
            comment: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");

    storage.delete_monthly_record(record.id).await.unwrap();
    assert!(matches!(
        storage.list_penalties(record.id).await,
        Err(ShopError::NotFound(_))
    ));
}

#[tokio::test]
async fn employee_phone_is_unique_among_live_rows() {
    let (storage, _dir) = storage().await;
    let input = NewEmployee {
        full_name: "Bob".to_string(),
        phone: "+998900000001".to_string(),
        position: "Driver".to_string(),
        salary: d("1000"),
        hired_at: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
    };
    let bob = storage.create_employee(input.clone()).await.unwrap();
    assert!(matches!(
        storage.create_employee(input.clone()).await,
        Err(ShopError::Conflict(_))
    ));

    storage.delete_employee(bob.id).await.unwrap();
    storage.create_employee(input).await.unwrap();
}

#[tokio::test]
async fn basket_respects_stock_and_merges_lines() {
    let (storage, _dir) = storage().await;
    let buyer = user(&storage, "+998911111111").await;
    let product = stocked_product(&storage, "CUP", 5, "1.00").await;

    storage
        .add_to_basket(buyer.id, NewBasketItem { product_id: product.id, quantity: 2 })
        .await
        .unwrap();
    let basket = storage
        .add_to_basket(buyer.id, NewBasketItem { product_id: product.id, quantity: 2 })
        .await
        .unwrap();
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 4);
    assert_eq!(basket.total, d("40.00"));

    let err = storage
        .add_to_basket(buyer.id, NewBasketItem { product_id: product.id, quantity: 2 })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::BadRequest(_)), "{err:?}");

    let item_id = basket.items[0].id;
    let other = user(&storage, "+998922222222").await;
    assert!(matches!(
        storage.remove_basket_item(other.id, item_id).await,
        Err(ShopError::NotFound(_))
    ));

    let basket = storage
        .update_basket_item(buyer.id, item_id, BasketItemUpdate { quantity: 1 })
        .await
        .unwrap();
    assert_eq!(basket.total, d("10.00"));
}

#[tokio::test]
async fn order_lifecycle_moves_stock() {
    let (storage, _dir) = storage().await;
    let buyer = user(&storage, "+998933333333").await;
    let product = stocked_product(&storage, "PLATE", 10, "4.00").await;

    let err = storage
        .create_order(
            buyer.id,
            NewOrder {
                phone: "+998933333333".to_string(),
                address: "1 Main St".to_string(),
                comment: None,
                products: vec![],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::BadRequest(_)), "{err:?}");

    storage
        .add_to_basket(buyer.id, NewBasketItem { product_id: product.id, quantity: 3 })
        .await
        .unwrap();
    let order = storage
        .create_order(
            buyer.id,
            NewOrder {
                phone: "+998933333333".to_string(),
                address: "1 Main St".to_string(),
                comment: Some("ring twice".to_string()),
                products: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::New);
    assert_eq!(order.total, d("30.00"));
    assert_eq!(order.products.len(), 1);
    assert!(storage.get_basket(buyer.id).await.unwrap().items.is_empty());
    assert_eq!(storage.get_product(product.id).await.unwrap().quantity, 7);

    let err = storage
        .update_order_status(order.id, OrderStatus::Delivered)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::BadRequest(_)), "{err:?}");

    storage.update_order_status(order.id, OrderStatus::Confirmed).await.unwrap();
    let cancelled = storage.update_order_status(order.id, OrderStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);

    let product = storage.get_product(product.id).await.unwrap();
    assert_eq!(product.quantity, 10);
    assert_eq!(product.sale_quantity, 0);
    assert_eq!(product.sum, d("40.00"));

    // Already cancelled, so deleting does not restore a second time.
    storage.delete_order(order.id).await.unwrap();
    assert_eq!(storage.get_product(product.id).await.unwrap().quantity, 10);
}

#[tokio::test]
async fn deleting_an_open_order_restores_stock() {
    let (storage, _dir) = storage().await;
    let buyer = user(&storage, "+998944444444").await;
    let product = stocked_product(&storage, "BOWL", 4, "3.00").await;

    let order = storage
        .create_order(
            buyer.id,
            NewOrder {
                phone: "+998944444444".to_string(),
                address: "2 Side St".to_string(),
                comment: None,
                products: vec![OrderLine { product_id: product.id, quantity: 4 }],
            },
        )
        .await
        .unwrap();
    let sold_out = storage.get_product(product.id).await.unwrap();
    assert_eq!(sold_out.quantity, 0);
    assert_eq!(sold_out.sum, Decimal::ZERO);

    storage.delete_order(order.id).await.unwrap();
    let product = storage.get_product(product.id).await.unwrap();
    assert_eq!(product.quantity, 4);
    assert_eq!(product.sum, d("12.00"));
}

#[tokio::test]
async fn favorites_conflict_and_not_found() {
    let (storage, _dir) = storage().await;
    let fan = user(&storage, "+998955555555").await;
    let product = storage.create_product(new_product("VASE", "15.00")).await.unwrap();

    let list = storage.add_favorite(fan.id, product.id).await.unwrap();
    assert_eq!(list.products.len(), 1);
    assert!(matches!(
        storage.add_favorite(fan.id, product.id).await,
        Err(ShopError::Conflict(_))
    ));

    storage.remove_favorite(fan.id, product.id).await.unwrap();
    assert!(matches!(
        storage.remove_favorite(fan.id, product.id).await,
        Err(ShopError::NotFound(_))
    ));
}

#[tokio::test]
async fn reviews_feed_product_rating() {
    let (storage, _dir) = storage().await;
    let product = storage.create_product(new_product("CHAIR", "99.00")).await.unwrap();
    let a = user(&storage, "+998966666661").await;
    let b = user(&storage, "+998966666662").await;

    for (author, rating) in [(&a, 5), (&b, 4)] {
        storage
            .create_review(author.id, NewReview { product_id: product.id, rating, text: None })
            .await
            .unwrap();
    }
    let err = storage
        .create_review(a.id, NewReview { product_id: product.id, rating: 1, text: None })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");

    let product = storage.get_product(product.id).await.unwrap();
    assert_eq!(product.rating.count, 2);
    assert_eq!(product.rating.average, d("4.5"));
}

#[tokio::test]
async fn permissions_build_the_ability() {
    let (storage, _dir) = storage().await;
    let admin = storage
        .create_admin(NewAdminUser {
            login: "clerk".to_string(),
            full_name: "Clerk".to_string(),
            password: "clerk-password".to_string(),
            is_super: false,
        })
        .await
        .unwrap();

    let grant = |subject: &str, action: &str| PermissionGrant {
        subject: subject.to_string(),
        action: action.to_string(),
    };
    storage.grant_permission(admin.id, grant("product", "manage")).await.unwrap();
    storage.grant_permission(admin.id, grant("order", "read")).await.unwrap();
    assert!(matches!(
        storage.grant_permission(admin.id, grant("order", "read")).await,
        Err(ShopError::Conflict(_))
    ));
    assert!(matches!(
        storage.grant_permission(admin.id, grant("spaceship", "read")).await,
        Err(ShopError::NotFound(_))
    ));

    let ability = storage.ability_for(admin.id).await.unwrap();
    assert!(ability.can("delete", "product"));
    assert!(ability.can("read", "order"));
    assert!(!ability.can("update", "order"));

    storage.revoke_permission(admin.id, "order", "read").await.unwrap();
    assert!(matches!(
        storage.revoke_permission(admin.id, "order", "read").await,
        Err(ShopError::NotFound(_))
    ));
    assert!(!storage.ability_for(admin.id).await.unwrap().can("read", "order"));
}

#[tokio::test]
async fn credentials_and_refresh_sessions() {
    let (storage, _dir) = storage().await;
    let created = user(&storage, "+998977777777").await;

    let ok = storage
        .verify_user_credentials("+998977777777", "correct horse")
        .await
        .unwrap();
    assert_eq!(ok.id, created.id);
    assert!(matches!(
        storage.verify_user_credentials("+998977777777", "wrong").await,
        Err(ShopError::Unauthorized(_))
    ));
    assert!(matches!(
        storage.create_user(NewUser {
            phone: "+998977777777".to_string(),
            full_name: "Dup".to_string(),
            password: "another password".to_string(),
        })
        .await,
        Err(ShopError::Conflict(_))
    ));

    let digest = security::token_digest("refresh-token");
    let session = storage
        .create_session(AccountKind::User, created.id, &digest, Utc::now() + Duration::days(1))
        .await
        .unwrap();
    let found = storage.find_session(&digest).await.unwrap().unwrap();
    assert_eq!(found.id, session.id);
    assert!(found.is_usable_at(Utc::now()));

    assert!(storage.revoke_session(&session.id).await.unwrap());
    let revoked = storage.find_session(&digest).await.unwrap().unwrap();
    assert!(!revoked.is_usable_at(Utc::now()));
    // A second revoke finds nothing left to consume.
    assert!(!storage.revoke_session(&session.id).await.unwrap());

    let stale_digest = security::token_digest("stale-token");
    let stale = storage
        .create_session(AccountKind::User, created.id, &stale_digest, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert!(!storage.revoke_session(&stale.id).await.unwrap());
}

#[tokio::test]
async fn media_links_cascade_on_delete() {
    let (storage, _dir) = storage().await;
    let product = storage.create_product(new_product("FRAME", "12.00")).await.unwrap();
    let media = storage
        .create_media(NewMedia {
            file_name: "abc.png".to_string(),
            original_name: "frame.png".to_string(),
            mime_type: "image/png".to_string(),
            size: 42,
        })
        .await
        .unwrap();

    let product = storage.attach_product_media(product.id, media.id).await.unwrap();
    assert_eq!(product.media_ids, vec![media.id]);
    assert!(matches!(
        storage.attach_product_media(product.id, media.id).await,
        Err(ShopError::Conflict(_))
    ));

    storage.delete_media(media.id).await.unwrap();
    assert!(storage.get_product(product.id).await.unwrap().media_ids.is_empty());
}
