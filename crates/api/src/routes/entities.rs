//! Generic CRUD handlers, instantiated once per entity.

use axum::{
    Json,
    extract::{Path, Query},
    http::StatusCode,
};

use crate::error::Result;
use crate::models::{Entity, Page};
use crate::services::{EntityService, Scoped};

use super::Endpoint;

/// `GET {prefix}`
pub async fn list<E: Entity>(
    service: Scoped<EntityService<E>>,
    Query(page): Query<Page>,
) -> Result<Json<Vec<E>>> {
    Ok(Json(service.list(page).await?))
}

/// `GET {prefix}/{id}`
pub async fn show<E: Entity>(
    service: Scoped<EntityService<E>>,
    Path(id): Path<i32>,
) -> Result<Json<E>> {
    Ok(Json(service.get(E::Id::from(id)).await?))
}

/// `POST {prefix}`
pub async fn create<E: Entity>(
    service: Scoped<EntityService<E>>,
    Json(input): Json<E::Input>,
) -> Result<(StatusCode, Json<E>)> {
    let created = service.create(&input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PUT {prefix}/{id}`
pub async fn update<E: Entity>(
    service: Scoped<EntityService<E>>,
    Path(id): Path<i32>,
    Json(input): Json<E::Input>,
) -> Result<Json<E>> {
    Ok(Json(service.update(E::Id::from(id), &input).await?))
}

/// `DELETE {prefix}/{id}`
pub async fn remove<E: Entity>(
    service: Scoped<EntityService<E>>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    service.delete(E::Id::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The five endpoints of one entity.
pub fn endpoints<E: Entity>() -> Vec<Endpoint> {
    let item = format!("{}/{{id}}", E::PATH);
    vec![
        Endpoint::get(E::PATH, list::<E>)
            .tag(E::TAG)
            .summary(format!("List {}", E::TAG.to_lowercase()))
            .access(E::READ)
            .query::<Page>()
            .returns_list::<E>(),
        Endpoint::post(E::PATH, create::<E>)
            .tag(E::TAG)
            .summary(format!("Create a {}", E::NAME))
            .access(E::WRITE)
            .status(StatusCode::CREATED)
            .accepts::<E::Input>()
            .returns::<E>(),
        Endpoint::get(item.clone(), show::<E>)
            .tag(E::TAG)
            .summary(format!("Get a {} by id", E::NAME))
            .access(E::READ)
            .returns::<E>(),
        Endpoint::put(item.clone(), update::<E>)
            .tag(E::TAG)
            .summary(format!("Replace a {}", E::NAME))
            .access(E::WRITE)
            .accepts::<E::Input>()
            .returns::<E>(),
        Endpoint::delete(item, remove::<E>)
            .tag(E::TAG)
            .summary(format!("Delete a {}", E::NAME))
            .access(E::WRITE)
            .status(StatusCode::NO_CONTENT),
    ]
}
