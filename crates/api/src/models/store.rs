//! Stores, their branches and customer favourites.

use chef_core::{AccountId, CityId, FavoriteStoreDetailId, StoreDetailId, StoreId, ZoneId};

define_entity! {
    /// A merchant selling through the platform.
    Store / StoreInput {
        id: StoreId,
        kind: Store,
        table: "store",
        path: "/api/stores",
        tag: "Stores",
        read: Public,
        write: Admin,
    }
    {
        owner_account_id: Option<AccountId>,
        zone_id: Option<ZoneId>,
        name: String,
        phone: Option<String>,
        email: Option<String>,
        is_active: bool,
    }
}

define_entity! {
    /// Physical branch of a store.
    StoreDetail / StoreDetailInput {
        id: StoreDetailId,
        kind: StoreDetail,
        table: "store_detail",
        path: "/api/store-details",
        tag: "Stores",
        read: Public,
        write: Admin,
    }
    {
        store_id: StoreId,
        address: String,
        city_id: Option<CityId>,
        zip_code: Option<String>,
        latitude: Option<f64>,
        longitude: Option<f64>,
        /// Free-form, e.g. `Mon-Sat 08:00-22:00`.
        opening_hours: Option<String>,
    }
}

define_entity! {
    /// A branch an account marked as favourite.
    FavoriteStoreDetail / FavoriteStoreDetailInput {
        id: FavoriteStoreDetailId,
        kind: FavoriteStoreDetail,
        table: "favorite_store_detail",
        path: "/api/favorite-store-details",
        tag: "Stores",
        read: Authenticated,
        write: Authenticated,
    }
    {
        account_id: AccountId,
        store_detail_id: StoreDetailId,
    }
}
