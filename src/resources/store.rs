//! `starbucks_store`: a store location.

use super::{DefaultValue, Field, FieldKind, ResourceDescriptor};

pub const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "store",
    noun: "store",
    description: "Manages a Starbucks store location with full configuration options.",
    collection: "/stores",
    fields: &[
        Field::id("Unique identifier for the store"),
        Field::required("name", FieldKind::String, "Store name/location description"),
        Field::required(
            "store_number",
            FieldKind::String,
            "Official Starbucks store number",
        )
        .force_new(),
        Field::required("address", FieldKind::String, "Street address"),
        Field::required("city", FieldKind::String, "City"),
        Field::required("state", FieldKind::String, "State/Province"),
        Field::required("zip_code", FieldKind::String, "ZIP/Postal code"),
        Field::optional(
            "country",
            FieldKind::String,
            "Country code (ISO 3166-1 alpha-2)",
        ),
        Field::required("phone_number", FieldKind::String, "Contact phone number"),
        Field::optional("latitude", FieldKind::Float64, "Latitude coordinate"),
        Field::optional("longitude", FieldKind::Float64, "Longitude coordinate"),
        Field::optional(
            "opening_hours",
            FieldKind::String,
            "Store opening hours (e.g., 'Mon-Fri: 6AM-9PM, Sat-Sun: 7AM-8PM')",
        ),
        Field::optional_computed(
            "has_drive_thru",
            FieldKind::Bool,
            "Whether store has drive-thru service",
        )
        .with_default(DefaultValue::Bool(false)),
        Field::optional_computed("has_wifi", FieldKind::Bool, "Whether store offers WiFi")
            .with_default(DefaultValue::Bool(true)),
        Field::optional_computed(
            "has_mobile_order",
            FieldKind::Bool,
            "Whether store supports mobile order & pay",
        )
        .with_default(DefaultValue::Bool(true)),
        Field::optional_computed("capacity", FieldKind::Int64, "Maximum customer capacity")
            .with_default(DefaultValue::Int64(50)),
        Field::optional(
            "store_type",
            FieldKind::String,
            "Store type: standard, reserve, express, drive_thru_only",
        ),
        Field::optional("manager_email", FieldKind::String, "Store manager email"),
        Field::computed(
            "status",
            FieldKind::String,
            "Store status: active, temporarily_closed, permanently_closed",
        ),
    ],
    refresh: &["status"],
    initial_status: Some("active"),
};
