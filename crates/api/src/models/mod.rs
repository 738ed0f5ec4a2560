//! Domain models for the Chef API.
//!
//! Each persisted entity is declared once with [`define_entity!`], which
//! produces the row type, its writable `…Input` counterpart and the
//! [`Entity`] description used by the generic repository, service and routes.

use serde::{Deserialize, Serialize};
use sqlx::Postgres;
use sqlx::postgres::{PgArguments, PgRow};
use utoipa::{IntoParams, ToSchema};

use crate::services::ServiceKind;

/// Query builder an entity binds its writable columns onto.
pub type EntityQuery<'q, E> = sqlx::query::QueryAs<'q, Postgres, E, PgArguments>;

/// Who may call an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Anyone, including anonymous callers.
    Public,
    /// Any caller with a valid bearer token.
    Authenticated,
    /// Bearer token with the admin role.
    Admin,
}

/// A persisted entity with a generic CRUD surface.
pub trait Entity:
    for<'r> sqlx::FromRow<'r, PgRow> + Serialize + ToSchema + Send + Sync + Unpin + 'static
{
    /// Typed primary key.
    type Id: From<i32> + Into<i32> + Copy + Send + Sync + 'static;
    /// Writable fields, accepted on create and update.
    type Input: serde::de::DeserializeOwned + ToSchema + Send + Sync + 'static;

    /// Registry slot of this entity's service.
    const KIND: ServiceKind;
    /// Table name.
    const TABLE: &'static str;
    /// Route prefix, e.g. `/api/products`.
    const PATH: &'static str;
    /// OpenAPI tag.
    const TAG: &'static str;
    /// Schema name of the row type.
    const NAME: &'static str;
    /// Schema name of the input type.
    const INPUT_NAME: &'static str;
    /// Writable columns, in the order `bind_input` binds them.
    const COLUMNS: &'static [&'static str];
    /// Access policy of `GET` endpoints.
    const READ: Access;
    /// Access policy of `POST`, `PUT` and `DELETE` endpoints.
    const WRITE: Access;

    /// Bind every writable column of `input`, in [`Entity::COLUMNS`] order.
    fn bind_input<'q>(input: &'q Self::Input, query: EntityQuery<'q, Self>)
    -> EntityQuery<'q, Self>;
}

/// Pagination parameters for list endpoints.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Page {
    /// 1-based page number.
    #[serde(default = "Page::default_page")]
    pub page: u32,
    /// Items per page (max 100).
    #[serde(default = "Page::default_per_page")]
    pub per_page: u32,
}

impl Page {
    /// Largest page size a caller can request.
    pub const MAX_PER_PAGE: u32 = 100;

    const fn default_page() -> u32 {
        1
    }

    const fn default_per_page() -> u32 {
        20
    }

    /// Row limit after clamping.
    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    /// Row offset after clamping.
    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: Self::default_page(),
            per_page: Self::default_per_page(),
        }
    }
}

/// Declare an entity: row struct, input struct and [`Entity`] impl.
///
/// Fields typed `Option<…>` are left out of serialized output when `None`.
macro_rules! define_entity {
    (@fields $head:tt [$($acc:tt)*] $(,)?) => {
        define_entity!(@emit $head $($acc)*);
    };
    (@fields $head:tt [$($acc:tt)*]
        $(#[$fmeta:meta])* $field:ident : Option<$inner:ty> $(, $($rest:tt)*)?
    ) => {
        define_entity!(@fields $head [
            $($acc)*
            { [$(#[$fmeta])* #[serde(skip_serializing_if = "Option::is_none")]] $field : Option<$inner> }
        ] $($($rest)*)?);
    };
    (@fields $head:tt [$($acc:tt)*]
        $(#[$fmeta:meta])* $field:ident : $fty:ty $(, $($rest:tt)*)?
    ) => {
        define_entity!(@fields $head [
            $($acc)*
            { [$(#[$fmeta])*] $field : $fty }
        ] $($($rest)*)?);
    };
    (@emit
        [
            $(#[$meta:meta])*
            $name:ident / $input:ident {
                id: $id:ty,
                kind: $kind:ident,
                table: $table:literal,
                path: $path:literal,
                tag: $tag:literal,
                read: $read:ident,
                write: $write:ident $(,)?
            }
        ]
        $( { [$($fattr:tt)*] $field:ident : $fty:ty } )+
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize, ::sqlx::FromRow, ::utoipa::ToSchema)]
        pub struct $name {
            pub id: $id,
            $( $($fattr)* pub $field: $fty, )+
            pub created_at: ::chrono::DateTime<::chrono::Utc>,
            pub updated_at: ::chrono::DateTime<::chrono::Utc>,
        }

        #[doc = concat!("Writable fields of [`", stringify!($name), "`].")]
        #[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize, ::utoipa::ToSchema)]
        pub struct $input {
            $( $($fattr)* pub $field: $fty, )+
        }

        impl $crate::models::Entity for $name {
            type Id = $id;
            type Input = $input;

            const KIND: $crate::services::ServiceKind = $crate::services::ServiceKind::$kind;
            const TABLE: &'static str = $table;
            const PATH: &'static str = $path;
            const TAG: &'static str = $tag;
            const NAME: &'static str = stringify!($name);
            const INPUT_NAME: &'static str = stringify!($input);
            const COLUMNS: &'static [&'static str] = &[$(stringify!($field)),+];
            const READ: $crate::models::Access = $crate::models::Access::$read;
            const WRITE: $crate::models::Access = $crate::models::Access::$write;

            fn bind_input<'q>(
                input: &'q Self::Input,
                query: $crate::models::EntityQuery<'q, Self>,
            ) -> $crate::models::EntityQuery<'q, Self> {
                query $( .bind(&input.$field) )+
            }
        }
    };
    (
        $(#[$meta:meta])*
        $name:ident / $input:ident { $($header:tt)* }
        { $($fields:tt)* }
    ) => {
        define_entity!(@fields [$(#[$meta])* $name / $input { $($header)* }] [] $($fields)*);
    };
}

pub mod account;
pub mod catalog;
pub mod device;
pub mod location;
pub mod order;
pub mod session;
pub mod store;
