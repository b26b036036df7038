//! `starbucks_stores` data source: every store.

use super::{DataSourceDescriptor, Lookup};
use crate::resources::{Field, FieldKind};

pub const DESCRIPTOR: DataSourceDescriptor = DataSourceDescriptor {
    name: "stores",
    noun: "stores",
    description: "List all Starbucks stores.",
    collection: "/stores",
    lookup: Lookup::List {
        attribute: "stores",
    },
    fields: &[
        Field::computed("id", FieldKind::String, "Store identifier"),
        Field::computed("name", FieldKind::String, "Store name"),
        Field::computed("city", FieldKind::String, "City"),
    ],
};
