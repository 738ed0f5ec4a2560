//! Domain services and their request-scoped registry.
//!
//! Services are resolved per request through [`Scoped`]; each kind is bound
//! exactly once by [`default_registry`].

pub mod account;
pub mod auth;
pub mod email;
pub mod entity;
pub mod registry;

pub use account::AccountService;
pub use email::EmailService;
pub use entity::*;
pub use registry::{
    RegistryBuilder, RegistryError, ResolveError, Scoped, ScopedService, ServiceKind,
    ServiceRegistry, ServiceScope,
};

/// Bind every service kind to its implementation.
///
/// # Errors
///
/// Returns `RegistryError` if a kind is bound twice or left unbound.
pub fn default_registry() -> Result<ServiceRegistry, RegistryError> {
    ServiceRegistry::builder()
        .bind::<AppVersionService>()?
        .bind::<BrandService>()?
        .bind::<CategoryService>()?
        .bind::<SubCategoryService>()?
        .bind::<ChildCategoryService>()?
        .bind::<CountryService>()?
        .bind::<StateService>()?
        .bind::<CityService>()?
        .bind::<ZoneService>()?
        .bind::<ZipCodeService>()?
        .bind::<DeviceService>()?
        .bind::<FilterTypeService>()?
        .bind::<FilterRangeService>()?
        .bind::<UnitService>()?
        .bind::<VegTypeService>()?
        .bind::<StoreService>()?
        .bind::<StoreDetailService>()?
        .bind::<FavoriteStoreDetailService>()?
        .bind::<ProductService>()?
        .bind::<ProductDetailService>()?
        .bind::<ProductImageService>()?
        .bind::<OrderService>()?
        .bind::<OrderItemService>()?
        .bind::<AccountService>()?
        .bind::<EmailService>()?
        .build()
}
