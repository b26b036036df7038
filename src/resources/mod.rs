//! Managed resources.
//!
//! Each resource type is a [`ResourceDescriptor`]: a static list of fields plus
//! the API collection it lives in. A single [`ResourceHandler`] drives CRUD for
//! all of them.

mod handler;

pub mod employee;
pub mod inventory;
pub mod menu_item;
pub mod promotion;
pub mod store;

pub use handler::ResourceHandler;

use serde_json::{json, Map, Value};

use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::types::{AttributeChange, ImportedResource, PlanResult, PROVIDER_TYPE_NAME};

/// Every resource descriptor, in registration order.
pub static ALL: &[&ResourceDescriptor] = &[
    &store::DESCRIPTOR,
    &employee::DESCRIPTOR,
    &menu_item::DESCRIPTOR,
    &inventory::DESCRIPTOR,
    &promotion::DESCRIPTOR,
];

/// Scalar kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Int64,
    Float64,
    Bool,
}

impl FieldKind {
    /// Schema type for this kind.
    pub fn attribute_type(self) -> AttributeType {
        match self {
            Self::String => AttributeType::String,
            Self::Int64 => AttributeType::Int64,
            Self::Float64 => AttributeType::Float64,
            Self::Bool => AttributeType::Bool,
        }
    }

    /// Convert an API value to this kind, if it has a compatible type.
    ///
    /// Numbers convert between integer and float; an integer field only
    /// accepts whole numbers.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        match self {
            Self::String => value.as_str().map(|s| Value::String(s.to_string())),
            Self::Bool => value.as_bool().map(Value::Bool),
            Self::Float64 => value.as_f64().map(|f| json!(f)),
            Self::Int64 => match value.as_i64() {
                Some(i) => Some(json!(i)),
                None => value
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| json!(f as i64)),
            },
        }
    }
}

/// How a field may be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    Required,
    Optional,
    /// Set by the provider only.
    Computed,
    /// Set in configuration, or filled in by the provider when omitted.
    OptionalComputed,
}

/// Static default applied when an optional field is not configured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int64(i64),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(b),
            Self::Int64(i) => json!(i),
        }
    }
}

/// One attribute of a resource or data source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub mode: FieldMode,
    pub default: Option<DefaultValue>,
    /// Changing the value requires destroying and recreating the resource.
    pub force_new: bool,
    pub description: &'static str,
}

impl Field {
    const fn new(
        name: &'static str,
        kind: FieldKind,
        mode: FieldMode,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            mode,
            default: None,
            force_new: false,
            description,
        }
    }

    pub const fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self::new(name, kind, FieldMode::Required, description)
    }

    pub const fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self::new(name, kind, FieldMode::Optional, description)
    }

    pub const fn computed(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self::new(name, kind, FieldMode::Computed, description)
    }

    pub const fn optional_computed(
        name: &'static str,
        kind: FieldKind,
        description: &'static str,
    ) -> Self {
        Self::new(name, kind, FieldMode::OptionalComputed, description)
    }

    /// The `id` attribute shared by every resource.
    pub const fn id(description: &'static str) -> Self {
        Self::computed("id", FieldKind::String, description)
    }

    pub const fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Whether the value is set by the provider only.
    pub fn is_computed_only(&self) -> bool {
        self.mode == FieldMode::Computed
    }

    /// Whether the provider may fill the value in.
    pub fn is_computed(&self) -> bool {
        matches!(self.mode, FieldMode::Computed | FieldMode::OptionalComputed)
    }

    /// Schema attribute for this field.
    pub fn attribute(&self) -> Attribute {
        let flags = match self.mode {
            FieldMode::Required => AttributeFlags::required(),
            FieldMode::Optional => AttributeFlags::optional(),
            FieldMode::Computed => AttributeFlags::computed(),
            FieldMode::OptionalComputed => AttributeFlags::optional_computed(),
        };
        let mut attr =
            Attribute::new(self.kind.attribute_type(), flags).with_description(self.description);
        if let Some(default) = self.default {
            attr = attr.with_default(default.to_value());
        }
        if self.force_new {
            attr = attr.with_force_new();
        }
        attr
    }
}

/// Declarative description of a resource type.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor {
    /// Type name without the provider prefix, e.g. `menu_item`.
    pub name: &'static str,
    /// Used in error messages, e.g. "Unable to create menu item".
    pub noun: &'static str,
    pub description: &'static str,
    /// Collection path, e.g. `/stores`. Items live at `{collection}/{id}`.
    pub collection: &'static str,
    pub fields: &'static [Field],
    /// Fields copied from the API response on read.
    pub refresh: &'static [&'static str],
    /// Value assigned to `status` after a successful create.
    pub initial_status: Option<&'static str>,
}

impl ResourceDescriptor {
    /// Full type name, e.g. `starbucks_store`.
    pub fn type_name(&self) -> String {
        format!("{}_{}", PROVIDER_TYPE_NAME, self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn schema(&self) -> Schema {
        self.fields.iter().fold(
            Schema::v0().with_description(self.description),
            |schema, field| schema.with_attribute(field.name, field.attribute()),
        )
    }

    pub(crate) fn item_path(&self, id: &str) -> String {
        format!("{}/{}", self.collection, id)
    }

    /// Seed a state with just the id; the host reads the rest.
    pub fn import(&self, id: &str) -> Result<ImportedResource, ProviderError> {
        if id.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "import id must not be empty".to_string(),
            ));
        }
        Ok(ImportedResource::new(self.type_name(), json!({ "id": id })))
    }

    /// Compute the planned state and attribute changes.
    ///
    /// A missing or null `prior` plans a create; a null `proposed` plans a
    /// destroy; anything else plans an update.
    pub fn plan(&self, prior: Option<&Value>, proposed: &Value) -> Result<PlanResult, ProviderError> {
        match prior.filter(|p| !p.is_null()) {
            None => self.plan_create(proposed),
            Some(prior) if proposed.is_null() => self.plan_delete(prior),
            Some(prior) => self.plan_update(prior, proposed),
        }
    }

    fn plan_create(&self, proposed: &Value) -> Result<PlanResult, ProviderError> {
        let proposed = state_object(proposed, "proposed state")?;
        let mut planned = Map::new();
        let mut changes = Vec::new();

        for field in self.fields {
            let value = if field.is_computed_only() {
                Value::Null
            } else {
                configured(proposed, field)
            };
            if !value.is_null() {
                changes.push(AttributeChange::added(field.name, value.clone()));
            }
            planned.insert(field.name.to_string(), value);
        }

        Ok(PlanResult::with_changes(Value::Object(planned), changes, false))
    }

    fn plan_update(&self, prior: &Value, proposed: &Value) -> Result<PlanResult, ProviderError> {
        let prior = state_object(prior, "prior state")?;
        let proposed = state_object(proposed, "proposed state")?;
        let mut planned = Map::new();
        let mut changes = Vec::new();
        let mut requires_replace = false;

        for field in self.fields {
            let before = prior.get(field.name).cloned().unwrap_or(Value::Null);
            let after = match field.mode {
                FieldMode::Computed => before.clone(),
                FieldMode::OptionalComputed if field.default.is_none() => {
                    match proposed.get(field.name) {
                        Some(v) if !v.is_null() => v.clone(),
                        _ => before.clone(),
                    }
                }
                _ => configured(proposed, field),
            };

            if after != before {
                // A value the state never had is not a change of identity.
                requires_replace |= field.force_new && !before.is_null();
                changes.push(AttributeChange::modified(field.name, before, after.clone()));
            }
            planned.insert(field.name.to_string(), after);
        }

        if changes.is_empty() {
            return Ok(PlanResult::no_change(Value::Object(planned)));
        }

        // A replacement gets fresh provider-assigned values.
        if requires_replace {
            for field in self.fields.iter().filter(|f| f.is_computed_only()) {
                planned.insert(field.name.to_string(), Value::Null);
            }
        }

        Ok(PlanResult::with_changes(
            Value::Object(planned),
            changes,
            requires_replace,
        ))
    }

    fn plan_delete(&self, prior: &Value) -> Result<PlanResult, ProviderError> {
        let prior = state_object(prior, "prior state")?;
        let changes = self
            .fields
            .iter()
            .filter_map(|field| match prior.get(field.name) {
                Some(v) if !v.is_null() => Some(AttributeChange::removed(field.name, v.clone())),
                _ => None,
            })
            .collect();

        Ok(PlanResult::with_changes(Value::Null, changes, false))
    }
}

/// The configured value of a field, falling back to its static default.
fn configured(proposed: &Map<String, Value>, field: &Field) -> Value {
    match proposed.get(field.name) {
        Some(v) if !v.is_null() => v.clone(),
        _ => field.default.map(DefaultValue::to_value).unwrap_or(Value::Null),
    }
}

/// Borrow a state value as an object.
pub(crate) fn state_object<'a>(
    value: &'a Value,
    what: &str,
) -> Result<&'a Map<String, Value>, ProviderError> {
    value
        .as_object()
        .ok_or_else(|| ProviderError::InvalidRequest(format!("{} must be an object", what)))
}

/// Extract a non-empty string `id` from a state.
pub(crate) fn state_id(state: &Value) -> Result<&str, ProviderError> {
    match state.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ProviderError::InvalidRequest(
            "state has no resource id".to_string(),
        )),
    }
}
