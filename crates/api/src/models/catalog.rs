//! Catalog entities: taxonomy, filters, units and products.

use chef_core::{
    BrandId, CategoryId, ChildCategoryId, FilterRangeId, FilterTypeId, ProductDetailId, ProductId,
    ProductImageId, StoreId, SubCategoryId, UnitId, VegTypeId,
};
use rust_decimal::Decimal;

define_entity! {
    /// A product brand.
    Brand / BrandInput {
        id: BrandId,
        kind: Brand,
        table: "brand",
        path: "/api/brands",
        tag: "Brands",
        read: Public,
        write: Admin,
    }
    {
        name: String,
        image_url: Option<String>,
        is_active: bool,
    }
}

define_entity! {
    /// Top level of the category tree.
    Category / CategoryInput {
        id: CategoryId,
        kind: Category,
        table: "category",
        path: "/api/categories",
        tag: "Categories",
        read: Public,
        write: Admin,
    }
    {
        name: String,
        image_url: Option<String>,
        /// Display position, ascending.
        sort_order: i32,
        is_active: bool,
    }
}

define_entity! {
    /// Second level of the category tree.
    SubCategory / SubCategoryInput {
        id: SubCategoryId,
        kind: SubCategory,
        table: "sub_category",
        path: "/api/sub-categories",
        tag: "Categories",
        read: Public,
        write: Admin,
    }
    {
        category_id: CategoryId,
        name: String,
        image_url: Option<String>,
        is_active: bool,
    }
}

define_entity! {
    /// Leaf level of the category tree.
    ChildCategory / ChildCategoryInput {
        id: ChildCategoryId,
        kind: ChildCategory,
        table: "child_category",
        path: "/api/child-categories",
        tag: "Categories",
        read: Public,
        write: Admin,
    }
    {
        sub_category_id: SubCategoryId,
        name: String,
        is_active: bool,
    }
}

define_entity! {
    /// A facet shoppers can filter on (price, weight, ...).
    FilterType / FilterTypeInput {
        id: FilterTypeId,
        kind: FilterType,
        table: "filter_type",
        path: "/api/filter-types",
        tag: "Filters",
        read: Public,
        write: Admin,
    }
    {
        name: String,
        is_active: bool,
    }
}

define_entity! {
    /// A bucket of a [`FilterType`].
    FilterRange / FilterRangeInput {
        id: FilterRangeId,
        kind: FilterRange,
        table: "filter_range",
        path: "/api/filter-ranges",
        tag: "Filters",
        read: Public,
        write: Admin,
    }
    {
        filter_type_id: FilterTypeId,
        label: String,
        min_value: Decimal,
        max_value: Decimal,
    }
}

define_entity! {
    /// Unit of measure (kg, litre, piece).
    Unit / UnitInput {
        id: UnitId,
        kind: Unit,
        table: "unit",
        path: "/api/units",
        tag: "Units",
        read: Public,
        write: Admin,
    }
    {
        name: String,
        abbreviation: String,
    }
}

define_entity! {
    /// Dietary marker (veg, non-veg, vegan).
    VegType / VegTypeInput {
        id: VegTypeId,
        kind: VegType,
        table: "veg_type",
        path: "/api/veg-types",
        tag: "Units",
        read: Public,
        write: Admin,
    }
    {
        name: String,
        icon_url: Option<String>,
    }
}

define_entity! {
    /// A product sold by a store.
    Product / ProductInput {
        id: ProductId,
        kind: Product,
        table: "product",
        path: "/api/products",
        tag: "Products",
        read: Public,
        write: Admin,
    }
    {
        store_id: StoreId,
        category_id: CategoryId,
        sub_category_id: Option<SubCategoryId>,
        child_category_id: Option<ChildCategoryId>,
        brand_id: Option<BrandId>,
        unit_id: Option<UnitId>,
        veg_type_id: Option<VegTypeId>,
        name: String,
        description: Option<String>,
        /// Base price in the store currency.
        price: Decimal,
        is_active: bool,
    }
}

define_entity! {
    /// A purchasable variant of a product (size, pack).
    ProductDetail / ProductDetailInput {
        id: ProductDetailId,
        kind: ProductDetail,
        table: "product_detail",
        path: "/api/product-details",
        tag: "Products",
        read: Public,
        write: Admin,
    }
    {
        product_id: ProductId,
        unit_id: Option<UnitId>,
        quantity: Decimal,
        price: Decimal,
        discount_price: Option<Decimal>,
        stock: i32,
    }
}

define_entity! {
    /// Product gallery image.
    ProductImage / ProductImageInput {
        id: ProductImageId,
        kind: ProductImage,
        table: "product_image",
        path: "/api/product-images",
        tag: "Products",
        read: Public,
        write: Admin,
    }
    {
        product_id: ProductId,
        image_url: String,
        sort_order: i32,
    }
}
