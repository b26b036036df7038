//! `starbucks_menu_item`: a drink or food item on the menu.

use super::{Field, FieldKind, ResourceDescriptor};

pub const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "menu_item",
    noun: "menu item",
    description: "Manages a Starbucks menu item.",
    collection: "/menu_items",
    fields: &[
        Field::id("Unique identifier"),
        Field::required("name", FieldKind::String, "Menu item name"),
        Field::optional("category", FieldKind::String, "Menu category"),
        Field::optional("size", FieldKind::String, "Serving size"),
        Field::optional("price", FieldKind::Float64, "Price (USD)"),
        Field::optional("calories", FieldKind::Int64, "Calories per serving"),
        Field::optional("description", FieldKind::String, "Description"),
        Field::optional_computed(
            "is_available",
            FieldKind::Bool,
            "Whether the item can currently be ordered",
        ),
        Field::optional_computed(
            "is_seasonal",
            FieldKind::Bool,
            "Whether the item is a seasonal offering",
        ),
    ],
    refresh: &["name"],
    initial_status: None,
};
