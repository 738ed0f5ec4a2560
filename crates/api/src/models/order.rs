//! Customer orders and their line items.

use chef_core::{AccountId, OrderId, OrderItemId, OrderStatus, ProductDetailId, ProductId, StoreId, ZoneId};
use rust_decimal::Decimal;

define_entity! {
    /// An order placed by an account with one store.
    Order / OrderInput {
        id: OrderId,
        kind: Order,
        table: "customer_order",
        path: "/api/orders",
        tag: "Orders",
        read: Authenticated,
        write: Authenticated,
    }
    {
        account_id: AccountId,
        store_id: StoreId,
        zone_id: Option<ZoneId>,
        status: OrderStatus,
        total: Decimal,
        delivery_address: Option<String>,
    }
}

define_entity! {
    OrderItem / OrderItemInput {
        id: OrderItemId,
        kind: OrderItem,
        table: "order_item",
        path: "/api/order-items",
        tag: "Orders",
        read: Authenticated,
        write: Authenticated,
    }
    {
        order_id: OrderId,
        product_id: ProductId,
        product_detail_id: Option<ProductDetailId>,
        quantity: i32,
        /// Price per unit at the time of ordering.
        unit_price: Decimal,
    }
}
