use crate::ability::Ability;
use crate::common::error::Result;
use crate::common::pagination::{ListParams, Page};
use crate::domain::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Categories, subcategories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_category(&self, input: NewCategory) -> Result<Category>;
    async fn get_category(&self, id: i64) -> Result<Category>;
    async fn list_categories(&self, params: ListParams) -> Result<Page<Category>>;
    async fn update_category(&self, id: i64, input: CategoryUpdate) -> Result<Category>;
    /// Forbidden while the category still has subcategories.
    async fn delete_category(&self, id: i64) -> Result<()>;

    async fn create_subcategory(&self, input: NewSubcategory) -> Result<Subcategory>;
    async fn get_subcategory(&self, id: i64) -> Result<Subcategory>;
    async fn list_subcategories(
        &self,
        filter: SubcategoryFilter,
        params: ListParams,
    ) -> Result<Page<Subcategory>>;
    async fn update_subcategory(&self, id: i64, input: SubcategoryUpdate) -> Result<Subcategory>;
    /// Products of the subcategory are detached, not deleted.
    async fn delete_subcategory(&self, id: i64) -> Result<()>;

    async fn create_product(&self, input: NewProduct) -> Result<Product>;
    async fn get_product(&self, id: i64) -> Result<Product>;
    async fn list_products(&self, filter: ProductFilter, params: ListParams) -> Result<Page<Product>>;
    async fn update_product(&self, id: i64, input: ProductUpdate) -> Result<Product>;
    /// Soft delete.
    async fn delete_product(&self, id: i64) -> Result<()>;
    async fn attach_product_media(&self, product_id: i64, media_id: i64) -> Result<Product>;
    async fn detach_product_media(&self, product_id: i64, media_id: i64) -> Result<Product>;
}

/// Arrivals, realizations and discounts. Every write adjusts product counters
/// inside one transaction.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn create_arrival(&self, input: NewArrival) -> Result<Arrival>;
    async fn get_arrival(&self, id: i64) -> Result<Arrival>;
    async fn list_arrivals(&self, filter: StockFilter, params: ListParams) -> Result<Page<Arrival>>;
    async fn update_arrival(&self, id: i64, input: ArrivalUpdate) -> Result<Arrival>;
    async fn delete_arrival(&self, id: i64) -> Result<()>;

    async fn create_realization(&self, input: NewRealization) -> Result<Realization>;
    async fn get_realization(&self, id: i64) -> Result<Realization>;
    async fn list_realizations(&self, filter: StockFilter, params: ListParams) -> Result<Page<Realization>>;
    async fn delete_realization(&self, id: i64) -> Result<()>;

    async fn create_discount(&self, input: NewDiscount) -> Result<Discount>;
    async fn get_discount(&self, id: i64) -> Result<Discount>;
    async fn list_discounts(&self, filter: StockFilter, params: ListParams) -> Result<Page<Discount>>;
    async fn update_discount(&self, id: i64, input: DiscountUpdate) -> Result<Discount>;
    async fn delete_discount(&self, id: i64) -> Result<()>;
}

/// Employees and their monthly payroll sheets.
#[async_trait]
pub trait PayrollStore: Send + Sync {
    async fn create_employee(&self, input: NewEmployee) -> Result<Employee>;
    async fn get_employee(&self, id: i64) -> Result<Employee>;
    async fn list_employees(&self, params: ListParams) -> Result<Page<Employee>>;
    async fn update_employee(&self, id: i64, input: EmployeeUpdate) -> Result<Employee>;
    async fn delete_employee(&self, id: i64) -> Result<()>;

    async fn create_monthly_record(&self, input: NewMonthlyRecord) -> Result<MonthlyRecord>;
    async fn get_monthly_record(&self, id: i64) -> Result<MonthlyRecord>;
    async fn list_monthly_records(
        &self,
        filter: MonthlyRecordFilter,
        params: ListParams,
    ) -> Result<Page<MonthlyRecord>>;
    async fn update_monthly_record(&self, id: i64, input: MonthlyRecordUpdate) -> Result<MonthlyRecord>;
    async fn delete_monthly_record(&self, id: i64) -> Result<()>;

    async fn add_penalty(&self, record_id: i64, input: NewPenalty) -> Result<Penalty>;
    async fn list_penalties(&self, record_id: i64) -> Result<Vec<Penalty>>;
    async fn delete_penalty(&self, id: i64) -> Result<()>;

    async fn add_prepayment(&self, record_id: i64, input: NewPrepayment) -> Result<Prepayment>;
    async fn list_prepayments(&self, record_id: i64) -> Result<Vec<Prepayment>>;
    async fn delete_prepayment(&self, id: i64) -> Result<()>;
}

/// Customer accounts and refresh sessions for both account kinds.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, input: NewUser) -> Result<User>;
    async fn get_user(&self, id: i64) -> Result<User>;
    /// Unauthorized on unknown phone or wrong password.
    async fn verify_user_credentials(&self, phone: &str, password: &str) -> Result<User>;

    async fn create_session(
        &self,
        kind: AccountKind,
        owner_id: i64,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshSession>;
    async fn find_session(&self, token_hash: &str) -> Result<Option<RefreshSession>>;
    /// Revoke a live session. Returns false if it was already revoked or has
    /// expired, so only one caller can consume a refresh token.
    async fn revoke_session(&self, id: &str) -> Result<bool>;
}

/// Admin users, permission subjects/actions and grants.
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn create_admin(&self, input: NewAdminUser) -> Result<AdminUser>;
    async fn get_admin(&self, id: i64) -> Result<AdminUser>;
    async fn list_admins(&self, params: ListParams) -> Result<Page<AdminUser>>;
    async fn update_admin(&self, id: i64, input: AdminUserUpdate) -> Result<AdminUser>;
    async fn delete_admin(&self, id: i64) -> Result<()>;
    /// Unauthorized on unknown login or wrong password.
    async fn verify_admin_credentials(&self, login: &str, password: &str) -> Result<AdminUser>;

    async fn create_subject(&self, input: NewNamed) -> Result<Subject>;
    async fn get_subject(&self, id: i64) -> Result<Subject>;
    async fn list_subjects(&self) -> Result<Vec<Subject>>;
    async fn update_subject(&self, id: i64, input: NamedUpdate) -> Result<Subject>;
    async fn delete_subject(&self, id: i64) -> Result<()>;

    async fn create_action(&self, input: NewNamed) -> Result<Action>;
    async fn get_action(&self, id: i64) -> Result<Action>;
    async fn list_actions(&self) -> Result<Vec<Action>>;
    async fn update_action(&self, id: i64, input: NamedUpdate) -> Result<Action>;
    async fn delete_action(&self, id: i64) -> Result<()>;

    async fn grant_permission(&self, admin_id: i64, grant: PermissionGrant) -> Result<Permission>;
    async fn revoke_permission(&self, admin_id: i64, subject: &str, action: &str) -> Result<()>;
    async fn list_permissions(&self, admin_id: i64) -> Result<Vec<Permission>>;
    async fn ability_for(&self, admin_id: i64) -> Result<Ability>;
}

/// Baskets, favorites and orders.
#[async_trait]
pub trait SalesStore: Send + Sync {
    async fn get_basket(&self, user_id: i64) -> Result<Basket>;
    async fn add_to_basket(&self, user_id: i64, input: NewBasketItem) -> Result<Basket>;
    async fn update_basket_item(&self, user_id: i64, item_id: i64, input: BasketItemUpdate) -> Result<Basket>;
    async fn remove_basket_item(&self, user_id: i64, item_id: i64) -> Result<Basket>;
    async fn clear_basket(&self, user_id: i64) -> Result<()>;

    async fn list_favorites(&self, user_id: i64) -> Result<FavoriteList>;
    async fn add_favorite(&self, user_id: i64, product_id: i64) -> Result<FavoriteList>;
    async fn remove_favorite(&self, user_id: i64, product_id: i64) -> Result<FavoriteList>;

    async fn create_order(&self, user_id: i64, input: NewOrder) -> Result<Order>;
    async fn get_order(&self, id: i64) -> Result<Order>;
    async fn list_orders(&self, filter: OrderFilter, params: ListParams) -> Result<Page<Order>>;
    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<Order>;
    async fn delete_order(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn create_review(&self, user_id: i64, input: NewReview) -> Result<Review>;
    async fn get_review(&self, id: i64) -> Result<Review>;
    async fn list_reviews(&self, filter: ReviewFilter, params: ListParams) -> Result<Page<Review>>;
    async fn update_review(&self, id: i64, input: ReviewUpdate) -> Result<Review>;
    async fn delete_review(&self, id: i64) -> Result<()>;
}

/// Media metadata. File bytes go through [`BlobStore`](super::BlobStore).
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn create_media(&self, input: NewMedia) -> Result<Media>;
    async fn get_media(&self, id: i64) -> Result<Media>;
    async fn list_media(&self, params: ListParams) -> Result<Page<Media>>;
    /// Returns the deleted row so the caller can remove the file.
    async fn delete_media(&self, id: i64) -> Result<Media>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Storage:
    CatalogStore + StockStore + PayrollStore + AccountStore + AccessStore + SalesStore + ReviewStore + MediaStore
{
}

impl<T> Storage for T where
    T: CatalogStore + StockStore + PayrollStore + AccountStore + AccessStore + SalesStore + ReviewStore + MediaStore
{
}
