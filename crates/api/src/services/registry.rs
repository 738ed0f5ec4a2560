//! Explicit, request-scoped service registry.
//!
//! Every [`ServiceKind`] is bound to exactly one factory when the application
//! starts. A [`ServiceScope`] is created for each request; resolving a kind
//! within a scope constructs the service on first use and hands out the same
//! instance afterwards. Instances never outlive their scope.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use thiserror::Error;

use crate::db::DataContext;
use crate::error::AppError;
use crate::state::AppState;

/// Every service the API can resolve per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    AppVersion,
    Brand,
    Category,
    SubCategory,
    ChildCategory,
    Country,
    State,
    City,
    Zone,
    ZipCode,
    Device,
    FilterType,
    FilterRange,
    Unit,
    VegType,
    Store,
    StoreDetail,
    FavoriteStoreDetail,
    Product,
    ProductDetail,
    ProductImage,
    Order,
    OrderItem,
    Account,
    Email,
}

impl ServiceKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 25] = [
        Self::AppVersion,
        Self::Brand,
        Self::Category,
        Self::SubCategory,
        Self::ChildCategory,
        Self::Country,
        Self::State,
        Self::City,
        Self::Zone,
        Self::ZipCode,
        Self::Device,
        Self::FilterType,
        Self::FilterRange,
        Self::Unit,
        Self::VegType,
        Self::Store,
        Self::StoreDetail,
        Self::FavoriteStoreDetail,
        Self::Product,
        Self::ProductDetail,
        Self::ProductImage,
        Self::Order,
        Self::OrderItem,
        Self::Account,
        Self::Email,
    ];

    /// Number of kinds.
    pub const COUNT: usize = Self::ALL.len();

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Registry misconfiguration, detected while building at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A kind was bound twice.
    #[error("{kind} is already bound to {existing}; refusing to rebind it to {attempted}")]
    DuplicateBinding {
        kind: ServiceKind,
        existing: &'static str,
        attempted: &'static str,
    },

    /// A kind was never bound.
    #[error("no binding for {0}")]
    MissingBinding(ServiceKind),
}

/// Failure to produce a service inside a scope.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The registry has no factory for this kind.
    #[error("no binding for {0}")]
    Unbound(ServiceKind),

    /// The bound implementation is not the requested type.
    #[error("{kind} is bound to {bound}, not {requested}")]
    TypeMismatch {
        kind: ServiceKind,
        bound: &'static str,
        requested: &'static str,
    },

    /// The factory itself failed.
    #[error("failed to construct {kind}: {reason}")]
    Construction { kind: ServiceKind, reason: String },
}

/// A service constructed once per request scope.
pub trait ScopedService: Send + Sync + 'static {
    /// Registry slot this implementation fills.
    const KIND: ServiceKind;

    /// Build the service. May resolve other services from the same scope.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if a dependency cannot be resolved.
    fn create(scope: &ServiceScope) -> Result<Self, ResolveError>
    where
        Self: Sized;
}

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = fn(&ServiceScope) -> Result<Instance, ResolveError>;

#[derive(Clone, Copy)]
struct Binding {
    factory: Factory,
    type_id: TypeId,
    type_name: &'static str,
}

fn construct<S: ScopedService>(scope: &ServiceScope) -> Result<Instance, ResolveError> {
    Ok(Arc::new(S::create(scope)?))
}

/// Collects bindings before the registry is frozen.
pub struct RegistryBuilder {
    bindings: [Option<Binding>; ServiceKind::COUNT],
}

impl RegistryBuilder {
    /// Start with nothing bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: [None; ServiceKind::COUNT],
        }
    }

    /// Bind `S` to its kind.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateBinding` if the kind is already bound.
    pub fn bind<S: ScopedService>(mut self) -> Result<Self, RegistryError> {
        let slot = self
            .bindings
            .get_mut(S::KIND.index())
            .ok_or(RegistryError::MissingBinding(S::KIND))?;

        if let Some(existing) = slot {
            return Err(RegistryError::DuplicateBinding {
                kind: S::KIND,
                existing: existing.type_name,
                attempted: type_name::<S>(),
            });
        }

        *slot = Some(Binding {
            factory: construct::<S>,
            type_id: TypeId::of::<S>(),
            type_name: type_name::<S>(),
        });
        Ok(self)
    }

    /// Freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::MissingBinding` naming the first unbound kind.
    pub fn build(self) -> Result<ServiceRegistry, RegistryError> {
        let bindings = self
            .bindings
            .into_iter()
            .zip(ServiceKind::ALL)
            .map(|(slot, kind)| slot.ok_or(RegistryError::MissingBinding(kind)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ServiceRegistry { bindings })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable kind-to-factory table, shared by every scope.
pub struct ServiceRegistry {
    bindings: Vec<Binding>,
}

impl ServiceRegistry {
    /// Start a new registry.
    #[must_use]
    pub const fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn binding(&self, kind: ServiceKind) -> Result<&Binding, ResolveError> {
        self.bindings
            .get(kind.index())
            .ok_or(ResolveError::Unbound(kind))
    }

    /// Name of the type bound to a kind.
    #[must_use]
    pub fn bound_type(&self, kind: ServiceKind) -> Option<&'static str> {
        self.bindings.get(kind.index()).map(|b| b.type_name)
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                ServiceKind::ALL
                    .iter()
                    .zip(&self.bindings)
                    .map(|(kind, binding)| (kind, binding.type_name)),
            )
            .finish()
    }
}

/// Per-request service container.
pub struct ServiceScope {
    registry: Arc<ServiceRegistry>,
    state: AppState,
    db: DataContext,
    instances: [OnceLock<Instance>; ServiceKind::COUNT],
}

impl ServiceScope {
    /// Open a scope using the application's registry.
    #[must_use]
    pub fn new(state: AppState) -> Self {
        let registry = Arc::clone(state.registry());
        Self::with_registry(registry, state)
    }

    /// Open a scope over an explicit registry.
    #[must_use]
    pub fn with_registry(registry: Arc<ServiceRegistry>, state: AppState) -> Self {
        let db = DataContext::new(state.pool().clone());
        Self {
            registry,
            state,
            db,
            instances: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    /// Application state, for factories that need shared resources.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// This scope's persistence context.
    #[must_use]
    pub const fn db(&self) -> &DataContext {
        &self.db
    }

    /// Resolve `S`, constructing it on first use within this scope.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the kind is unbound, bound to a different
    /// type, or its factory fails.
    pub fn resolve<S: ScopedService>(&self) -> Result<Arc<S>, ResolveError> {
        let binding = *self.registry.binding(S::KIND)?;
        if binding.type_id != TypeId::of::<S>() {
            return Err(ResolveError::TypeMismatch {
                kind: S::KIND,
                bound: binding.type_name,
                requested: type_name::<S>(),
            });
        }

        let slot = self
            .instances
            .get(S::KIND.index())
            .ok_or(ResolveError::Unbound(S::KIND))?;

        let instance = if let Some(existing) = slot.get() {
            Arc::clone(existing)
        } else {
            let created = (binding.factory)(self)?;
            // A concurrent resolve may have won the race; the first one stays.
            let _ = slot.set(created);
            slot.get().map(Arc::clone).ok_or(ResolveError::Unbound(S::KIND))?
        };

        instance
            .downcast::<S>()
            .map_err(|_| ResolveError::TypeMismatch {
                kind: S::KIND,
                bound: binding.type_name,
                requested: type_name::<S>(),
            })
    }

    /// Whether a kind has already been constructed in this scope.
    #[must_use]
    pub fn is_resolved(&self, kind: ServiceKind) -> bool {
        self.instances
            .get(kind.index())
            .is_some_and(|slot| slot.get().is_some())
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved: Vec<ServiceKind> = ServiceKind::ALL
            .into_iter()
            .filter(|kind| self.is_resolved(*kind))
            .collect();
        f.debug_struct("ServiceScope")
            .field("resolved", &resolved)
            .finish_non_exhaustive()
    }
}

/// Extractor resolving a service from the request's scope.
///
/// ```rust,ignore
/// async fn list(Scoped(products): Scoped<ProductService>) -> Result<Json<Vec<Product>>> {
///     Ok(Json(products.list(Page::default()).await?))
/// }
/// ```
pub struct Scoped<S>(pub Arc<S>);

impl<S> Deref for Scoped<S> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, St> FromRequestParts<St> for Scoped<S>
where
    S: ScopedService,
    St: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let scope = parts
            .extensions
            .get::<Arc<ServiceScope>>()
            .ok_or_else(|| AppError::Internal("service scope middleware not installed".into()))?;

        Ok(Self(scope.resolve::<S>()?))
    }
}
