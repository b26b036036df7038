//! `starbucks_promotion`: a promotional campaign.

use super::{Field, FieldKind, ResourceDescriptor};

pub const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "promotion",
    noun: "promotion",
    description: "Manages promotional campaigns.",
    collection: "/promotions",
    fields: &[
        Field::id("Unique identifier"),
        Field::required("name", FieldKind::String, "Campaign name"),
        Field::optional("description", FieldKind::String, "Campaign description"),
        Field::optional("start_date", FieldKind::String, "First day of the campaign"),
        Field::optional("end_date", FieldKind::String, "Last day of the campaign"),
        Field::optional_computed("active", FieldKind::Bool, "Whether the campaign is running"),
    ],
    refresh: &["active"],
    initial_status: None,
};
