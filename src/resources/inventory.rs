//! `starbucks_inventory`: stock level of one SKU in one store.

use super::{Field, FieldKind, ResourceDescriptor};

pub const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "inventory",
    noun: "inventory item",
    description: "Manages inventory items for a store.",
    collection: "/inventory",
    fields: &[
        Field::id("Unique identifier"),
        Field::required("store_id", FieldKind::String, "ID of the store holding the stock")
            .force_new(),
        Field::required("item_sku", FieldKind::String, "Stock keeping unit").force_new(),
        Field::required("quantity", FieldKind::Int64, "Units on hand"),
        Field::optional("threshold", FieldKind::Int64, "Reorder threshold"),
    ],
    refresh: &["quantity"],
    initial_status: None,
};
