//! `starbucks_store` data source: one store by id.

use super::{DataSourceDescriptor, Lookup};
use crate::resources::{Field, FieldKind};

pub const DESCRIPTOR: DataSourceDescriptor = DataSourceDescriptor {
    name: "store",
    noun: "store",
    description: "Look up a single Starbucks store by id.",
    collection: "/stores",
    lookup: Lookup::ById,
    fields: &[
        Field::required("id", FieldKind::String, "Store identifier"),
        Field::computed("name", FieldKind::String, "Store name"),
        Field::computed("city", FieldKind::String, "City"),
        Field::computed("state", FieldKind::String, "State/Province"),
    ],
};
