//! `starbucks_employee`: a partner assigned to a store.

use super::{DefaultValue, Field, FieldKind, ResourceDescriptor};

pub const DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "employee",
    noun: "employee",
    description: "Manages a Starbucks employee (partner) with full employee lifecycle.",
    collection: "/employees",
    fields: &[
        Field::id("Unique identifier"),
        Field::required(
            "employee_number",
            FieldKind::String,
            "Unique employee/partner number",
        )
        .force_new(),
        Field::required("first_name", FieldKind::String, "First name"),
        Field::required("last_name", FieldKind::String, "Last name"),
        Field::required("email", FieldKind::String, "Email address"),
        Field::optional("phone_number", FieldKind::String, "Contact phone number"),
        Field::required("store_id", FieldKind::String, "ID of the assigned store"),
        Field::required(
            "position",
            FieldKind::String,
            "Job position: barista, shift_supervisor, store_manager, assistant_manager",
        ),
        Field::required("hire_date", FieldKind::String, "Hire date (YYYY-MM-DD format)"),
        Field::optional("hourly_rate", FieldKind::Float64, "Hourly pay rate (USD)"),
        Field::optional_computed(
            "is_barista",
            FieldKind::Bool,
            "Whether employee is a certified barista",
        )
        .with_default(DefaultValue::Bool(true)),
        Field::optional_computed(
            "is_shift_supervisor",
            FieldKind::Bool,
            "Whether employee is a shift supervisor",
        )
        .with_default(DefaultValue::Bool(false)),
        Field::optional_computed(
            "is_certified",
            FieldKind::Bool,
            "Whether employee completed all certifications",
        )
        .with_default(DefaultValue::Bool(false)),
        Field::optional(
            "available_hours",
            FieldKind::String,
            "Available working hours (e.g., 'Mon-Fri: 9AM-5PM')",
        ),
        Field::optional(
            "employment_type",
            FieldKind::String,
            "Employment type: full_time, part_time, seasonal",
        ),
        Field::computed("status", FieldKind::String, "Employment status"),
    ],
    refresh: &["status"],
    initial_status: Some("active"),
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plan_create_defaults() {
        let plan = DESCRIPTOR
            .plan(
                None,
                &json!({
                    "employee_number": "E-100",
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": "ada@example.com",
                    "store_id": "s-1",
                    "position": "barista",
                    "hire_date": "2024-01-15"
                }),
            )
            .unwrap();

        assert_eq!(plan.planned_state["is_barista"], json!(true));
        assert_eq!(plan.planned_state["is_shift_supervisor"], json!(false));
        assert_eq!(plan.planned_state["is_certified"], json!(false));
        assert!(plan.planned_state["status"].is_null());
    }

    #[test]
    fn test_schema() {
        let schema = DESCRIPTOR.schema();
        assert_eq!(schema.block.attributes.len(), 16);
        assert!(schema.attribute("employee_number").unwrap().force_new);
        assert!(schema.attribute("status").unwrap().flags.computed);
        assert!(schema.attribute("hourly_rate").unwrap().flags.optional);
    }
}
