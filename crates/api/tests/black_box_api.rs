use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_api::app::{build_app, services::AppServices};
use stockroom_api::config::AppConfig;
use stockroom_auth::{Role, User, UserDirectory};
use stockroom_catalog::{Category, NewCategory, NewProduct, NewSupplier, Product, Supplier};
use stockroom_core::{CategoryId, ProductId, SupplierId, UserId};
use stockroom_infra::{CatalogStore, CatalogTx, InMemoryCatalogStore, StoreError, StoreResult};

const JWT_SECRET: &str = "test-secret";

const ADMIN: i64 = 1;
const STAFF: i64 = 2;
const CUSTOMER: i64 = 3;

struct TestServer {
    base_url: String,
    store: InMemoryCatalogStore,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let store = seeded_store().await;
        Self::serve(store.clone(), Arc::new(store), &[]).await
    }

    /// Serve `backend` with extra environment `vars`; `store` is the state
    /// the assertions inspect.
    async fn serve(
        store: InMemoryCatalogStore,
        backend: Arc<dyn CatalogStore>,
        vars: &[(&'static str, &'static str)],
    ) -> Self {
        let vars = vars.to_vec();
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()),
        })
        .expect("test config");

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(AppServices::new(config, backend));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            store,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        read(res).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        read(res).await
    }

    async fn create_category(&self, name: &str) -> i64 {
        let (status, body) = self
            .post("/api/categories/", &token_for(ADMIN), json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["category"]["id"].as_i64().unwrap()
    }

    async fn create_product(&self, sku: &str, category_id: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/products/",
                &token_for(STAFF),
                json!({ "name": format!("Item {sku}"), "sku": sku, "unit_price": 1999, "category_id": category_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["product"]["id"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn seeded_store() -> InMemoryCatalogStore {
    let store = InMemoryCatalogStore::new();
    store.add_user("admin", "admin@example.com", Role::Admin).await;
    store.add_user("staff", "staff@example.com", Role::Staff).await;
    store.add_user("customer", "customer@example.com", Role::User).await;
    store
}

/// Store whose writes land and then fail, so only rollback keeps them out.
/// `count_users` fails outright.
struct FaultyStore {
    inner: InMemoryCatalogStore,
    fault: &'static str,
}

#[async_trait]
impl UserDirectory for FaultyStore {
    async fn find_user(&self, id: UserId) -> anyhow::Result<Option<User>> {
        self.inner.find_user(id).await
    }
}

#[async_trait]
impl CatalogStore for FaultyStore {
    async fn count_users(&self) -> StoreResult<i64> {
        Err(StoreError::Backend(self.fault.to_string()))
    }
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.inner.list_categories().await
    }
    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        self.inner.get_category(id).await
    }
    async fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        self.inner.find_category_by_name(name).await
    }
    async fn count_products_in_category(&self, id: CategoryId) -> StoreResult<i64> {
        self.inner.count_products_in_category(id).await
    }
    async fn list_products(&self, category_id: Option<CategoryId>) -> StoreResult<Vec<Product>> {
        self.inner.list_products(category_id).await
    }
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        self.inner.get_product(id).await
    }
    async fn find_product_by_sku(&self, sku: &str) -> StoreResult<Option<Product>> {
        self.inner.find_product_by_sku(sku).await
    }
    async fn list_suppliers(&self) -> StoreResult<Vec<Supplier>> {
        self.inner.list_suppliers().await
    }
    async fn get_supplier(&self, id: SupplierId) -> StoreResult<Option<Supplier>> {
        self.inner.get_supplier(id).await
    }
    async fn find_supplier_by_name(&self, name: &str) -> StoreResult<Option<Supplier>> {
        self.inner.find_supplier_by_name(name).await
    }
    async fn begin(&self) -> StoreResult<Box<dyn CatalogTx>> {
        Ok(Box::new(FaultyTx {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }
}

struct FaultyTx {
    inner: Box<dyn CatalogTx>,
    fault: &'static str,
}

impl FaultyTx {
    fn fail<T>(&self) -> StoreResult<T> {
        Err(StoreError::Backend(self.fault.to_string()))
    }
}

#[async_trait]
impl CatalogTx for FaultyTx {
    async fn insert_category(&mut self, new: NewCategory) -> StoreResult<Category> {
        self.inner.insert_category(new).await?;
        self.fail()
    }
    async fn update_category(&mut self, category: &Category) -> StoreResult<Category> {
        self.inner.update_category(category).await?;
        self.fail()
    }
    async fn delete_category(&mut self, id: CategoryId) -> StoreResult<()> {
        self.inner.delete_category(id).await?;
        self.fail()
    }
    async fn insert_product(&mut self, new: NewProduct) -> StoreResult<Product> {
        self.inner.insert_product(new).await?;
        self.fail()
    }
    async fn update_product(&mut self, product: &Product) -> StoreResult<Product> {
        self.inner.update_product(product).await?;
        self.fail()
    }
    async fn delete_product(&mut self, id: ProductId) -> StoreResult<()> {
        self.inner.delete_product(id).await?;
        self.fail()
    }
    async fn insert_supplier(&mut self, new: NewSupplier) -> StoreResult<Supplier> {
        self.inner.insert_supplier(new).await?;
        self.fail()
    }
    async fn update_supplier(&mut self, supplier: &Supplier) -> StoreResult<Supplier> {
        self.inner.update_supplier(supplier).await?;
        self.fail()
    }
    async fn delete_supplier(&mut self, id: SupplierId) -> StoreResult<()> {
        self.inner.delete_supplier(id).await?;
        self.fail()
    }
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.inner.commit().await
    }
    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.inner.rollback().await
    }
}

/// Seeded store holding one committed category, served through `FaultyStore`.
async fn faulty_server(vars: &[(&'static str, &'static str)]) -> (TestServer, Category) {
    let store = seeded_store().await;
    let mut tx = store.begin().await.unwrap();
    let mats = tx
        .insert_category(NewCategory::new(Some("Mats".into()), None, None).unwrap())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let backend = Arc::new(FaultyStore {
        inner: store.clone(),
        fault: "disk full",
    });
    (TestServer::serve(store, backend, vars).await, mats)
}

async fn read(res: reqwest::Response) -> (StatusCode, Value) {
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

fn mint_jwt(secret: &str, sub: Value, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = json!({
        "sub": sub,
        "iat": now.timestamp(),
        "exp": (now + ttl).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn token_for(user_id: i64) -> String {
    mint_jwt(JWT_SECRET, json!(user_id.to_string()), ChronoDuration::minutes(10))
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "healthy", "message": "Stockroom API is running" }));

    let (status, body) = srv.get("/api/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn debug_reports_configuration_and_user_count() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/debug").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "debug_info");
    assert_eq!(body["jwt_secret_configured"], true);
    assert_eq!(body["database_accessible"], true);
    assert_eq!(body["user_count"], 3);
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn admin_creates_category_and_duplicate_is_rejected() {
    let srv = TestServer::spawn().await;
    let token = token_for(ADMIN);

    let (status, body) = srv.post("/api/categories/", &token, json!({ "name": "Yoga Mats" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Category created successfully");
    assert_eq!(body["category"]["name"], "Yoga Mats");
    assert!(body["category"]["id"].is_i64());

    let (status, body) = srv.post("/api/categories/", &token, json!({ "name": "Yoga Mats" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Category already exists" }));

    let (_, body) = srv.get("/api/categories/").await;
    let matching = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["name"] == "Yoga Mats")
        .count();
    assert_eq!(matching, 1);
}

#[tokio::test]
async fn staff_created_category_is_retrievable_unchanged() {
    let srv = TestServer::spawn().await;
    let parent = srv.create_category("Shoes").await;

    let (status, body) = srv
        .post(
            "/api/categories",
            &token_for(STAFF),
            json!({ "name": "Running Shoes", "description": "Trail and road", "parent_id": parent }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["category"]["id"].as_i64().unwrap();

    let (status, body) = srv.get(&format!("/api/categories/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"]["name"], "Running Shoes");
    assert_eq!(body["category"]["description"], "Trail and road");
    assert_eq!(body["category"]["parent_id"], parent);
}

#[tokio::test]
async fn create_validates_payload_after_the_gate() {
    let srv = TestServer::spawn().await;
    let token = token_for(STAFF);

    let (status, body) = srv.post("/api/categories/", &token, json!({ "description": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");

    let (status, body) = srv.post("/api/categories/", &token, json!({ "name": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");

    let (status, body) = srv
        .post("/api/categories/", &token, json!({ "name": "Orphan", "parent_id": 999 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Parent category not found");

    let res = srv
        .client
        .post(srv.url("/api/categories/"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    // A base-role caller is refused before the bad payload is looked at.
    let res = srv
        .client
        .post(srv.url("/api/categories/"))
        .bearer_auth(token_for(CUSTOMER))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn base_role_cannot_create_or_update() {
    let srv = TestServer::spawn().await;
    let id = srv.create_category("Bags").await;
    let token = token_for(CUSTOMER);

    let (status, body) = srv.post("/api/categories/", &token, json!({ "name": "Hats" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Insufficient permissions" }));

    let (status, _) = srv
        .put(&format!("/api/categories/{id}"), &token, json!({ "name": "Totes" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = srv.get("/api/categories/").await;
    let names: Vec<&str> = body["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Bags"]);
}

#[tokio::test]
async fn rename_to_existing_name_is_rejected() {
    let srv = TestServer::spawn().await;
    let shoes = srv.create_category("Shoes").await;
    let boots = srv.create_category("Boots").await;
    let token = token_for(STAFF);

    let (status, body) = srv
        .put(&format!("/api/categories/{boots}"), &token, json!({ "name": "Shoes" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Category name already exists");

    let (_, body) = srv.get(&format!("/api/categories/{shoes}")).await;
    assert_eq!(body["category"]["name"], "Shoes");
    let (_, body) = srv.get(&format!("/api/categories/{boots}")).await;
    assert_eq!(body["category"]["name"], "Boots");

    // Keeping its own name is not a conflict.
    let (status, _) = srv
        .put(&format!("/api/categories/{boots}"), &token, json!({ "name": "Boots" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn partial_update_touches_only_present_fields() {
    let srv = TestServer::spawn().await;
    let parent = srv.create_category("Outdoor").await;
    let token = token_for(ADMIN);

    let (_, body) = srv
        .post(
            "/api/categories/",
            &token,
            json!({ "name": "Tents", "description": "Shelter", "parent_id": parent }),
        )
        .await;
    let id = body["category"]["id"].as_i64().unwrap();

    let (status, body) = srv
        .put(&format!("/api/categories/{id}"), &token, json!({ "description": null }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Category updated successfully");
    assert_eq!(body["category"]["name"], "Tents");
    assert_eq!(body["category"]["description"], Value::Null);
    assert_eq!(body["category"]["parent_id"], parent);

    let (status, body) = srv
        .put(&format!("/api/categories/{id}"), &token, json!({ "name": null }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Name is required");

    let (status, body) = srv
        .put("/api/categories/424242", &token, json!({ "name": "Ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Category not found");
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let category = srv.create_category("Kettles").await;
    let product = srv.create_product("KT-1", category).await;

    let (status, body) = srv
        .delete(&format!("/api/categories/{category}"), &token_for(ADMIN))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete category with products");

    let (status, _) = srv.get(&format!("/api/categories/{category}")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = srv.get(&format!("/api/products/{product}")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn only_admin_deletes_empty_category() {
    let srv = TestServer::spawn().await;
    let id = srv.create_category("Clearance").await;
    let path = format!("/api/categories/{id}");

    let (status, body) = srv.delete(&path, &token_for(STAFF)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Insufficient permissions - admin access required");

    let (status, body) = srv.delete(&path, &token_for(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Category deleted successfully" }));

    let (status, _) = srv.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_tokens_are_rejected_before_domain_logic() {
    let srv = TestServer::spawn().await;
    let body = json!({ "name": "Never" });

    let res = srv.client.post(srv.url("/api/categories/")).json(&body).send().await.unwrap();
    let (status, err) = read(res).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Authorization token is required");

    let expired = mint_jwt(JWT_SECRET, json!("1"), ChronoDuration::minutes(-5));
    let (status, err) = srv.post("/api/categories/", &expired, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Token has expired");

    let forged = mint_jwt("other-secret", json!("1"), ChronoDuration::minutes(10));
    let (status, err) = srv.post("/api/categories/", &forged, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Invalid token");

    let (status, _) = srv.post("/api/categories/", "garbage", body).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(srv.store.list_categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_or_unknown_identity() {
    let srv = TestServer::spawn().await;
    let body = json!({ "name": "Never" });
    let ttl = ChronoDuration::minutes(10);

    let token = mint_jwt(JWT_SECRET, json!("abc"), ttl);
    let (status, err) = srv.post("/api/categories/", &token, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Invalid token - identity is not a valid user ID");

    let token = mint_jwt(JWT_SECRET, Value::Null, ttl);
    let (status, err) = srv.post("/api/categories/", &token, body.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(err["error"], "Invalid token - no identity found");

    let token = mint_jwt(JWT_SECRET, json!(999), ttl);
    let (status, err) = srv.post("/api/categories/", &token, body.clone()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"], "User not found");

    // Integer subjects resolve like their string form.
    let token = mint_jwt(JWT_SECRET, json!(ADMIN), ttl);
    let (status, _) = srv.post("/api/categories/", &token, body).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn non_integer_ids_are_not_found() {
    let srv = TestServer::spawn().await;

    let (status, body) = srv.get("/api/categories/shoes").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Category not found");

    let (status, body) = srv.get("/api/products/xyz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Product not found");
}

#[tokio::test]
async fn product_lifecycle() {
    let srv = TestServer::spawn().await;
    let lamps = srv.create_category("Lamps").await;
    let rugs = srv.create_category("Rugs").await;
    let staff = token_for(STAFF);

    let lamp = srv.create_product("LMP-1", lamps).await;
    srv.create_product("RUG-1", rugs).await;

    let (status, body) = srv
        .post(
            "/api/products/",
            &staff,
            json!({ "name": "Copy", "sku": "LMP-1", "category_id": lamps }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product with this SKU already exists");

    let (status, body) = srv
        .post(
            "/api/products/",
            &staff,
            json!({ "name": "Lost", "sku": "LST-1", "category_id": 999 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Category not found");

    let (status, body) = srv
        .post(
            "/api/products/",
            &staff,
            json!({ "name": "Cheap", "sku": "CHP-1", "unit_price": -1, "category_id": lamps }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unit price must not be negative");

    let (status, body) = srv.get(&format!("/api/products?category_id={lamps}")).await;
    assert_eq!(status, StatusCode::OK);
    let skus: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["sku"].as_str().unwrap())
        .collect();
    assert_eq!(skus, vec!["LMP-1"]);

    let (status, _) = srv.delete(&format!("/api/products/{lamp}"), &staff).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.delete(&format!("/api/products/{lamp}"), &token_for(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");

    // With its only product gone the category can be deleted.
    let (status, _) = srv.delete(&format!("/api/categories/{lamps}"), &token_for(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn store_faults_roll_back_and_return_the_fault() {
    let (srv, mats) = faulty_server(&[]).await;
    let admin = token_for(ADMIN);
    let path = format!("/api/categories/{}", mats.id);

    let (status, body) = srv.post("/api/categories/", &admin, json!({ "name": "Blocks" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "disk full" }));
    assert_eq!(srv.store.list_categories().await.unwrap(), vec![mats.clone()]);

    let (status, body) = srv.put(&path, &admin, json!({ "name": "Rugs" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "disk full");
    assert_eq!(srv.store.get_category(mats.id).await.unwrap().unwrap().name, "Mats");

    let (status, body) = srv.delete(&path, &admin).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "disk full");
    assert!(srv.store.get_category(mats.id).await.unwrap().is_some());

    let (status, _) = srv
        .post(
            "/api/products/",
            &admin,
            json!({ "name": "Mat", "sku": "MAT-1", "category_id": mats.id }),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(srv.store.list_products(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn production_hides_fault_messages() {
    let (srv, _) = faulty_server(&[("APP_ENV", "production")]).await;

    let (status, body) = srv
        .post("/api/categories/", &token_for(ADMIN), json!({ "name": "Blocks" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
    assert_eq!(srv.store.list_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn debug_reports_an_unreachable_store() {
    let (srv, _) = faulty_server(&[]).await;

    let (status, body) = srv.get("/api/debug").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database_accessible"], false);
    assert_eq!(body["error"], "disk full");
    assert!(body.get("user_count").is_none());
}

#[tokio::test]
async fn unrouted_methods_on_protected_paths_require_a_token() {
    let srv = TestServer::spawn().await;
    let id = srv.create_category("Straps").await;

    let res = srv
        .client
        .patch(srv.url(&format!("/api/categories/{id}")))
        .json(&json!({ "name": "Belts" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Unknown paths are not behind the token check.
    let res = srv.client.patch(srv.url("/api/widgets/1")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_partial_update() {
    let srv = TestServer::spawn().await;
    let bottles = srv.create_category("Bottles").await;
    let flasks = srv.create_category("Flasks").await;
    let steel = srv.create_product("BTL-1", bottles).await;
    srv.create_product("BTL-2", bottles).await;
    let path = format!("/api/products/{steel}");
    let staff = token_for(STAFF);

    let (status, body) = srv.put(&path, &staff, json!({ "sku": "BTL-2" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Product with this SKU already exists");

    let (status, body) = srv.put(&path, &staff, json!({ "category_id": 999 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Category not found");

    let (status, body) = srv.put(&path, &staff, json!({ "unit_price": -3 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unit price must not be negative");

    let (status, _) = srv.put(&path, &token_for(CUSTOMER), json!({ "unit_price": 1 })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv
        .put(&path, &staff, json!({ "sku": "BTL-1", "unit_price": 2499, "category_id": flasks }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product updated successfully");
    assert_eq!(body["product"]["sku"], "BTL-1");
    assert_eq!(body["product"]["unit_price"], 2499);
    assert_eq!(body["product"]["category_id"], flasks);
    assert_eq!(body["product"]["name"], "Item BTL-1");

    let (status, _) = srv.put("/api/products/777", &staff, json!({ "unit_price": 1 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn supplier_lifecycle() {
    let srv = TestServer::spawn().await;
    let staff = token_for(STAFF);

    let (status, body) = srv
        .post(
            "/api/suppliers/",
            &staff,
            json!({ "name": "Acme Textiles", "contact_person": "Dana", "email": "dana@acme.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Supplier created successfully");
    let acme = body["supplier"]["id"].as_i64().unwrap();

    let (status, body) = srv.post("/api/suppliers", &staff, json!({ "name": "Acme Textiles" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Supplier already exists");

    let (_, body) = srv.post("/api/suppliers", &staff, json!({ "name": "Globex" })).await;
    let globex = body["supplier"]["id"].as_i64().unwrap();

    let (status, body) = srv
        .put(&format!("/api/suppliers/{globex}"), &staff, json!({ "name": "Acme Textiles" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Supplier name already exists");

    let (status, body) = srv
        .put(&format!("/api/suppliers/{acme}"), &staff, json!({ "contact_person": null, "phone": "555-0100" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["supplier"]["contact_person"], Value::Null);
    assert_eq!(body["supplier"]["phone"], "555-0100");
    assert_eq!(body["supplier"]["email"], "dana@acme.test");

    let (status, _) = srv.delete(&format!("/api/suppliers/{acme}"), &staff).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = srv.delete(&format!("/api/suppliers/{acme}"), &token_for(ADMIN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Supplier deleted successfully");

    let (status, body) = srv.get("/api/suppliers/").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["suppliers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Globex"]);

    let (status, body) = srv.get("/api/suppliers/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Supplier not found");
}
