//! Delivery geography: country, state, city, zone and zip code.

use chef_core::{CityId, CountryId, StateId, ZipCodeId, ZoneId};
use rust_decimal::Decimal;

define_entity! {
    Country / CountryInput {
        id: CountryId,
        kind: Country,
        table: "country",
        path: "/api/countries",
        tag: "Locations",
        read: Public,
        write: Admin,
    }
    {
        name: String,
        /// ISO 3166-1 alpha-2 code.
        iso_code: String,
        phone_code: Option<String>,
    }
}

define_entity! {
    State / StateInput {
        id: StateId,
        kind: State,
        table: "state",
        path: "/api/states",
        tag: "Locations",
        read: Public,
        write: Admin,
    }
    {
        country_id: CountryId,
        name: String,
        code: Option<String>,
    }
}

define_entity! {
    City / CityInput {
        id: CityId,
        kind: City,
        table: "city",
        path: "/api/cities",
        tag: "Locations",
        read: Public,
        write: Admin,
    }
    {
        state_id: StateId,
        name: String,
    }
}

define_entity! {
    /// Delivery zone inside a city, with its own delivery charge.
    Zone / ZoneInput {
        id: ZoneId,
        kind: Zone,
        table: "zone",
        path: "/api/zones",
        tag: "Locations",
        read: Public,
        write: Admin,
    }
    {
        city_id: CityId,
        name: String,
        delivery_charge: Decimal,
        is_active: bool,
    }
}

define_entity! {
    ZipCode / ZipCodeInput {
        id: ZipCodeId,
        kind: ZipCode,
        table: "zip_code",
        path: "/api/zip-codes",
        tag: "Locations",
        read: Public,
        write: Admin,
    }
    {
        city_id: CityId,
        zone_id: Option<ZoneId>,
        code: String,
    }
}
