//! Pass-through CRUD services, one per entity.

use crate::db::{EntityRepository, RepositoryError};
use crate::models::{Entity, Page, catalog, device, location, order, store};

use super::registry::{ResolveError, ScopedService, ServiceKind, ServiceScope};

/// CRUD façade over one entity's repository.
pub struct EntityService<E> {
    repo: EntityRepository<E>,
}

impl<E: Entity> EntityService<E> {
    /// List one page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the query fails.
    pub async fn list(&self, page: Page) -> Result<Vec<E>, RepositoryError> {
        self.repo.list(page).await
    }

    /// Get by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it does not exist.
    pub async fn get(&self, id: E::Id) -> Result<E, RepositoryError> {
        self.repo.get(id).await
    }

    /// Create from input.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on constraint violations.
    pub async fn create(&self, input: &E::Input) -> Result<E, RepositoryError> {
        let created = self.repo.insert(input).await?;
        tracing::debug!(table = E::TABLE, "Row created");
        Ok(created)
    }

    /// Replace by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` or `RepositoryError::Conflict`.
    pub async fn update(&self, id: E::Id, input: &E::Input) -> Result<E, RepositoryError> {
        self.repo.update(id, input).await
    }

    /// Delete by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` or `RepositoryError::Conflict`.
    pub async fn delete(&self, id: E::Id) -> Result<(), RepositoryError> {
        self.repo.delete(id).await
    }
}

impl<E: Entity> ScopedService for EntityService<E> {
    const KIND: ServiceKind = E::KIND;

    fn create(scope: &ServiceScope) -> Result<Self, ResolveError> {
        Ok(Self {
            repo: EntityRepository::new(scope.db().clone()),
        })
    }
}

pub type AppVersionService = EntityService<device::AppVersion>;
pub type DeviceService = EntityService<device::Device>;
pub type BrandService = EntityService<catalog::Brand>;
pub type CategoryService = EntityService<catalog::Category>;
pub type SubCategoryService = EntityService<catalog::SubCategory>;
pub type ChildCategoryService = EntityService<catalog::ChildCategory>;
pub type FilterTypeService = EntityService<catalog::FilterType>;
pub type FilterRangeService = EntityService<catalog::FilterRange>;
pub type UnitService = EntityService<catalog::Unit>;
pub type VegTypeService = EntityService<catalog::VegType>;
pub type ProductService = EntityService<catalog::Product>;
pub type ProductDetailService = EntityService<catalog::ProductDetail>;
pub type ProductImageService = EntityService<catalog::ProductImage>;
pub type CountryService = EntityService<location::Country>;
pub type StateService = EntityService<location::State>;
pub type CityService = EntityService<location::City>;
pub type ZoneService = EntityService<location::Zone>;
pub type ZipCodeService = EntityService<location::ZipCode>;
pub type StoreService = EntityService<store::Store>;
pub type StoreDetailService = EntityService<store::StoreDetail>;
pub type FavoriteStoreDetailService = EntityService<store::FavoriteStoreDetail>;
pub type OrderService = EntityService<order::Order>;
pub type OrderItemService = EntityService<order::OrderItem>;
