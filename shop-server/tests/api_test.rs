use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shop_core::storage::{AccessStore, CatalogStore};
use shop_core::{BlobStore, DatabaseStorage, LocalBlobStore, NewAdminUser, PermissionGrant, Storage};
use shop_server::{create_server, AppState, Config};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    storage: Arc<DatabaseStorage>,
    _dir: TempDir,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("shop.db");
    let storage = Arc::new(DatabaseStorage::open(db_path.to_str().unwrap(), None).await.unwrap());
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(dir.path().join("media")).await.unwrap());

    let mut config = Config::default();
    config.auth.jwt_secret = "api-test-secret".to_string();
    config.media.max_bytes = 1024;

    let shared: Arc<dyn Storage> = storage.clone();
    let router = create_server(AppState::new(shared, blobs, config));
    TestApp {
        router,
        storage,
        _dir: dir,
    }
}

impl TestApp {
    async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Reply { status, headers, body }
    }

    async fn admin_token(&self, login: &str, is_super: bool, grants: &[(&str, &str)]) -> String {
        let admin = self
            .storage
            .create_admin(NewAdminUser {
                login: login.to_string(),
                full_name: "Test Admin".to_string(),
                password: "admin-password".to_string(),
                is_super,
            })
            .await
            .unwrap();
        for (subject, action) in grants {
            self.storage
                .grant_permission(
                    admin.id,
                    PermissionGrant {
                        subject: subject.to_string(),
                        action: action.to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let reply = self
            .request(
                Method::POST,
                "/admin/auth/login",
                None,
                Some(json!({"login": login, "password": "admin-password"})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.body["accessToken"].as_str().unwrap().to_string()
    }

    async fn register(&self, phone: &str) -> Reply {
        self.request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"phone": phone, "fullName": "Customer", "password": "customer-password"})),
        )
        .await
    }
}

fn refresh_cookie(headers: &HeaderMap) -> String {
    let set_cookie = headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn translations(title: &str) -> Value {
    json!([{"lang": "en", "title": title}])
}

#[tokio::test]
async fn health_reports_version() {
    let app = app().await;
    let reply = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "healthy");
    assert!(reply.body["version"].is_string());
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let app = app().await;
    let reply = app
        .request(
            Method::POST,
            "/categories",
            None,
            Some(json!({"translations": translations("Garden")})),
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["statusCode"], 401);
    assert_eq!(reply.body["error"], "Unauthorized");
}

#[tokio::test]
async fn customer_token_does_not_open_admin_routes() {
    let app = app().await;
    let registered = app.register("+998901112233").await;
    let token = registered.body["accessToken"].as_str().unwrap();

    let reply = app.request(Method::GET, "/admin/me", Some(token), None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_article_is_a_conflict() {
    let app = app().await;
    let token = app.admin_token("root", true, &[]).await;
    let product = json!({"article": "A-100", "price": "12.50", "translations": translations("Kettle")});

    let first = app.request(Method::POST, "/products", Some(&token), Some(product.clone())).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    assert_eq!(first.body["effectivePrice"], "12.50");

    let mut again = product;
    again["translations"] = translations("Another kettle");
    let second = app.request(Method::POST, "/products", Some(&token), Some(again)).await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["statusCode"], 409);
}

#[tokio::test]
async fn category_with_subcategories_cannot_be_deleted() {
    let app = app().await;
    let token = app.admin_token("root", true, &[]).await;

    let category = app
        .request(
            Method::POST,
            "/categories",
            Some(&token),
            Some(json!({"translations": translations("Kitchen")})),
        )
        .await;
    let category_id = category.body["id"].as_i64().unwrap();
    let sub = app
        .request(
            Method::POST,
            "/subcategories",
            Some(&token),
            Some(json!({"categoryId": category_id, "translations": translations("Pots")})),
        )
        .await;
    assert_eq!(sub.status, StatusCode::CREATED, "{}", sub.body);

    let uri = format!("/categories/{category_id}");
    let reply = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let sub_uri = format!("/subcategories/{}", sub.body["id"]);
    let removed = app.request(Method::DELETE, &sub_uri, Some(&token), None).await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let reply = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(reply.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn admin_actions_follow_granted_abilities() {
    let app = app().await;
    let token = app
        .admin_token("clerk", false, &[("product", "read"), ("category", "manage")])
        .await;

    let forbidden = app
        .request(
            Method::POST,
            "/products",
            Some(&token),
            Some(json!({"article": "B-1", "price": "1.00", "translations": translations("Spoon")})),
        )
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.body["message"], "not allowed to create product");

    let allowed = app
        .request(
            Method::POST,
            "/categories",
            Some(&token),
            Some(json!({"translations": translations("Tools")})),
        )
        .await;
    assert_eq!(allowed.status, StatusCode::CREATED);

    let me = app.request(Method::GET, "/admin/me", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["admin"]["login"], "clerk");
    assert_eq!(me.body["ability"]["rules"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn admins_cannot_escalate_beyond_their_own_rules() {
    let app = app().await;
    let root = app.admin_token("root", true, &[]).await;
    let helpdesk = app
        .admin_token(
            "helpdesk",
            false,
            &[("admin_user", "read"), ("admin_user", "update"), ("admin_user", "delete")],
        )
        .await;
    let root_id = app.request(Method::GET, "/admin/me", Some(&root), None).await.body["admin"]["id"]
        .as_i64()
        .unwrap();
    let own_id = app.request(Method::GET, "/admin/me", Some(&helpdesk), None).await.body["admin"]["id"]
        .as_i64()
        .unwrap();
    let own_permissions = format!("/admin/users/{own_id}/permissions");

    let wildcard = app
        .request(
            Method::POST,
            &own_permissions,
            Some(&helpdesk),
            Some(json!({"subject": "all", "action": "manage"})),
        )
        .await;
    assert_eq!(wildcard.status, StatusCode::FORBIDDEN);

    let unheld = app
        .request(
            Method::POST,
            &own_permissions,
            Some(&helpdesk),
            Some(json!({"subject": "employee", "action": "delete"})),
        )
        .await;
    assert_eq!(unheld.status, StatusCode::FORBIDDEN);

    let root_uri = format!("/admin/users/{root_id}");
    let password_change = app
        .request(
            Method::PATCH,
            &root_uri,
            Some(&helpdesk),
            Some(json!({"password": "taken-over-password"})),
        )
        .await;
    assert_eq!(password_change.status, StatusCode::FORBIDDEN);
    let removal = app.request(Method::DELETE, &root_uri, Some(&helpdesk), None).await;
    assert_eq!(removal.status, StatusCode::FORBIDDEN);

    let me = app.request(Method::GET, "/admin/me", Some(&helpdesk), None).await;
    assert_eq!(me.body["ability"]["rules"].as_array().unwrap().len(), 3);

    let granted = app
        .request(
            Method::POST,
            &own_permissions,
            Some(&root),
            Some(json!({"subject": "all", "action": "manage"})),
        )
        .await;
    assert_eq!(granted.status, StatusCode::CREATED, "{}", granted.body);
}

#[tokio::test]
async fn subjects_and_actions_can_be_fetched_by_id() {
    let app = app().await;
    let token = app.admin_token("root", true, &[]).await;

    let subjects = app.request(Method::GET, "/admin/subjects", Some(&token), None).await;
    assert_eq!(subjects.status, StatusCode::OK);
    let first = &subjects.body.as_array().unwrap()[0];
    let one = app
        .request(Method::GET, &format!("/admin/subjects/{}", first["id"]), Some(&token), None)
        .await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.body["name"], first["name"]);

    let created = app
        .request(
            Method::POST,
            "/admin/actions",
            Some(&token),
            Some(json!({"name": "export"})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    let action_uri = format!("/admin/actions/{}", created.body["id"]);
    let fetched = app.request(Method::GET, &action_uri, Some(&token), None).await;
    assert_eq!(fetched.body["name"], "export");

    let missing = app.request(Method::GET, "/admin/actions/999999", Some(&token), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_arrival_is_a_bad_request() {
    let app = app().await;
    let token = app.admin_token("root", true, &[]).await;
    let product = app
        .request(
            Method::POST,
            "/products",
            Some(&token),
            Some(json!({"article": "NUT-1", "price": "0.10", "translations": translations("Nut")})),
        )
        .await;
    let product_id = product.body["id"].as_i64().unwrap();

    for (quantity, price) in [(i64::MAX / 2 + 1, json!("1.00")), (10, json!("99999999999999999"))] {
        let reply = app
            .request(
                Method::POST,
                "/arrivals",
                Some(&token),
                Some(json!({"productId": product_id, "quantity": quantity, "purchasePrice": price})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{}", reply.body);
    }

    let after = app
        .request(Method::GET, &format!("/products/{product_id}"), None, None)
        .await;
    assert_eq!(after.body["quantity"], 0);
}

#[tokio::test]
async fn invalid_registration_is_a_bad_request() {
    let app = app().await;
    let reply = app.register("not-a-phone").await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["statusCode"], 400);

    assert_eq!(app.register("+998907776655").await.status, StatusCode::CREATED);
    assert_eq!(app.register("+998907776655").await.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn refresh_tokens_rotate_and_cannot_be_reused() {
    let app = app().await;
    let registered = app.register("+998901234567").await;
    assert_eq!(registered.status, StatusCode::CREATED);
    let access = registered.body["accessToken"].as_str().unwrap().to_string();
    let cookie = refresh_cookie(&registered.headers);
    assert!(cookie.starts_with("refresh_token="));

    let me = app.request(Method::GET, "/me", Some(&access), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["phone"], "+998901234567");
    assert!(me.body.get("passwordHash").is_none());

    let refresh = |cookie: String| {
        Request::builder()
            .method(Method::POST)
            .uri("/auth/refresh")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let rotated = app.send(refresh(cookie.clone())).await;
    assert_eq!(rotated.status, StatusCode::OK);
    let next_cookie = refresh_cookie(&rotated.headers);
    assert_ne!(next_cookie, cookie);

    let reused = app.send(refresh(cookie)).await;
    assert_eq!(reused.status, StatusCode::UNAUTHORIZED);

    let logout = Request::builder()
        .method(Method::POST)
        .uri("/auth/logout")
        .header(header::COOKIE, next_cookie.clone())
        .body(Body::empty())
        .unwrap();
    let logged_out = app.send(logout).await;
    assert_eq!(logged_out.status, StatusCode::NO_CONTENT);
    assert!(refresh_cookie(&logged_out.headers).ends_with('='));

    assert_eq!(app.send(refresh(next_cookie)).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn orders_are_private_to_their_customer() {
    let app = app().await;
    let admin = app.admin_token("root", true, &[]).await;

    let product = app
        .request(
            Method::POST,
            "/products",
            Some(&admin),
            Some(json!({"article": "C-7", "price": "5.00", "translations": translations("Cup")})),
        )
        .await;
    let product_id = product.body["id"].as_i64().unwrap();
    let arrival = app
        .request(
            Method::POST,
            "/arrivals",
            Some(&admin),
            Some(json!({"productId": product_id, "quantity": 10, "purchasePrice": "2.00"})),
        )
        .await;
    assert_eq!(arrival.status, StatusCode::CREATED, "{}", arrival.body);

    let alice = app.register("+998900000001").await.body["accessToken"].as_str().unwrap().to_string();
    let bob = app.register("+998900000002").await.body["accessToken"].as_str().unwrap().to_string();

    let basket = app
        .request(
            Method::POST,
            "/basket/items",
            Some(&alice),
            Some(json!({"productId": product_id, "quantity": 3})),
        )
        .await;
    assert_eq!(basket.status, StatusCode::OK, "{}", basket.body);
    assert_eq!(basket.body["total"], "15.00");

    let order = app
        .request(
            Method::POST,
            "/orders",
            Some(&alice),
            Some(json!({"phone": "+998900000001", "address": "Main street 1"})),
        )
        .await;
    assert_eq!(order.status, StatusCode::CREATED, "{}", order.body);
    assert_eq!(order.body["status"], "new");
    let order_uri = format!("/orders/{}", order.body["id"]);

    let emptied = app.request(Method::GET, "/basket", Some(&alice), None).await;
    assert_eq!(emptied.body["items"].as_array().unwrap().len(), 0);

    assert_eq!(app.request(Method::GET, &order_uri, Some(&alice), None).await.status, StatusCode::OK);
    assert_eq!(app.request(Method::GET, &order_uri, Some(&bob), None).await.status, StatusCode::NOT_FOUND);

    let mine = app.request(Method::GET, "/orders", Some(&bob), None).await;
    assert_eq!(mine.body["total"], 0);

    let stock = app.storage.get_product(product_id).await.unwrap();
    assert_eq!(stock.quantity, 7);

    let cancel = app
        .request(
            Method::PATCH,
            &format!("/admin/orders/{}/status", order.body["id"]),
            Some(&admin),
            Some(json!({"status": "cancelled"})),
        )
        .await;
    assert_eq!(cancel.status, StatusCode::OK);
    assert_eq!(app.storage.get_product(product_id).await.unwrap().quantity, 10);
}

#[tokio::test]
async fn reviews_can_only_be_changed_by_their_author() {
    let app = app().await;
    let admin = app.admin_token("root", true, &[]).await;
    let product = app
        .request(
            Method::POST,
            "/products",
            Some(&admin),
            Some(json!({"article": "R-1", "price": "3.00", "translations": translations("Mug")})),
        )
        .await;
    let product_id = product.body["id"].as_i64().unwrap();

    let author = app.register("+998911111111").await.body["accessToken"].as_str().unwrap().to_string();
    let other = app.register("+998922222222").await.body["accessToken"].as_str().unwrap().to_string();

    let review = app
        .request(
            Method::POST,
            "/reviews",
            Some(&author),
            Some(json!({"productId": product_id, "rating": 4})),
        )
        .await;
    assert_eq!(review.status, StatusCode::CREATED);
    let uri = format!("/reviews/{}", review.body["id"]);

    let hijack = app
        .request(Method::PATCH, &uri, Some(&other), Some(json!({"rating": 1})))
        .await;
    assert_eq!(hijack.status, StatusCode::FORBIDDEN);

    let rated = app.request(Method::GET, &format!("/products/{product_id}"), None, None).await;
    assert_eq!(rated.body["rating"]["count"], 1);

    let removed = app
        .request(Method::DELETE, &format!("/admin/reviews/{}", review.body["id"]), Some(&admin), None)
        .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
}

fn multipart(content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "shop-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"; filename=\"pixel.png\"\r\n");
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[tokio::test]
async fn media_upload_checks_type_and_serves_bytes() {
    let app = app().await;
    let token = app.admin_token("root", true, &[]).await;

    let upload = |content_type: &str, bytes: &[u8]| {
        let (header_value, body) = multipart(content_type, bytes);
        Request::builder()
            .method(Method::POST)
            .uri("/media")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, header_value)
            .body(Body::from(body))
            .unwrap()
    };

    let rejected = app.send(upload("application/pdf", &b"%PDF-1.4"[..])).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);

    let too_big = app.send(upload("image/png", &[0u8; 2048][..])).await;
    assert_eq!(too_big.status, StatusCode::BAD_REQUEST);

    let png = b"\x89PNG\r\n\x1a\nfake";
    let stored = app.send(upload("image/png", &png[..])).await;
    assert_eq!(stored.status, StatusCode::CREATED, "{}", stored.body);
    assert_eq!(stored.body["mimeType"], "image/png");
    assert_eq!(stored.body["size"], png.len());

    let download = Request::builder()
        .uri(format!("/media/{}", stored.body["id"]))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(download).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], &png[..]);
}

#[tokio::test]
async fn deleting_media_removes_file_then_row() {
    let app = app().await;
    let token = app.admin_token("root", true, &[]).await;

    let upload = |bytes: &[u8]| {
        let (header_value, body) = multipart("image/gif", bytes);
        Request::builder()
            .method(Method::POST)
            .uri("/media")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, header_value)
            .body(Body::from(body))
            .unwrap()
    };
    let media_dir = app._dir.path().join("media");

    let first = app.send(upload(&b"GIF89a-one"[..])).await;
    assert_eq!(first.status, StatusCode::CREATED, "{}", first.body);
    let file = media_dir.join(first.body["fileName"].as_str().unwrap());
    assert!(file.exists());

    let uri = format!("/media/{}", first.body["id"]);
    let deleted = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(!file.exists());
    assert_eq!(app.request(Method::GET, &uri, None, None).await.status, StatusCode::NOT_FOUND);

    // A row whose file is already gone can still be deleted.
    let second = app.send(upload(&b"GIF89a-two"[..])).await;
    std::fs::remove_file(media_dir.join(second.body["fileName"].as_str().unwrap())).unwrap();
    let uri = format!("/media/{}", second.body["id"]);
    let deleted = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.request(Method::GET, &uri, None, None).await.status, StatusCode::NOT_FOUND);
}
