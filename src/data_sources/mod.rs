//! Read-only data sources.

pub mod store;
pub mod stores;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::client::ApiClient;
use crate::error::{ClientError, ProviderError};
use crate::resources::Field;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::types::PROVIDER_TYPE_NAME;

/// Every data source descriptor, in registration order.
pub static ALL: &[&DataSourceDescriptor] = &[&store::DESCRIPTOR, &stores::DESCRIPTOR];

/// How a data source finds its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// `GET {collection}/{id}` with `id` taken from the configuration.
    ById,
    /// `GET {collection}`; the array is stored under `attribute`.
    List { attribute: &'static str },
}

/// Declarative description of a data source type.
#[derive(Debug, Clone, Copy)]
pub struct DataSourceDescriptor {
    pub name: &'static str,
    pub noun: &'static str,
    pub description: &'static str,
    pub collection: &'static str,
    pub lookup: Lookup,
    /// For [`Lookup::ById`] the data source attributes; for [`Lookup::List`]
    /// the attributes projected from each list entry.
    pub fields: &'static [Field],
}

impl DataSourceDescriptor {
    /// Full type name, e.g. `starbucks_stores`.
    pub fn type_name(&self) -> String {
        format!("{}_{}", PROVIDER_TYPE_NAME, self.name)
    }

    pub fn schema(&self) -> Schema {
        let schema = Schema::v0().with_description(self.description);
        match self.lookup {
            Lookup::ById => self.fields.iter().fold(schema, |schema, field| {
                schema.with_attribute(field.name, field.attribute())
            }),
            Lookup::List { attribute } => {
                let element = AttributeType::object(
                    self.fields
                        .iter()
                        .map(|f| (f.name, f.kind.attribute_type())),
                );
                schema.with_attribute(
                    attribute,
                    Attribute::new(AttributeType::list(element), AttributeFlags::computed())
                        .with_description(format!("All {}", self.noun)),
                )
            }
        }
    }
}

/// Reads one data source type through a configured API client.
#[derive(Debug, Clone)]
pub struct DataSourceHandler {
    descriptor: &'static DataSourceDescriptor,
    client: Arc<ApiClient>,
}

impl DataSourceHandler {
    pub fn new(descriptor: &'static DataSourceDescriptor, client: Arc<ApiClient>) -> Self {
        Self { descriptor, client }
    }

    pub fn descriptor(&self) -> &'static DataSourceDescriptor {
        self.descriptor
    }

    #[instrument(skip_all, fields(data_source = self.descriptor.name))]
    pub async fn read(&self, config: &Value) -> Result<Value, ProviderError> {
        match self.descriptor.lookup {
            Lookup::ById => self.read_by_id(config).await,
            Lookup::List { attribute } => self.read_list(attribute).await,
        }
    }

    async fn read_by_id(&self, config: &Value) -> Result<Value, ProviderError> {
        let mut state = match config {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let id = match state.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ProviderError::InvalidRequest(format!(
                    "{} requires a non-empty id",
                    self.descriptor.type_name()
                )))
            }
        };
        let action = format!("Unable to read {}", self.descriptor.noun);

        let body = self
            .client
            .get(&format!("{}/{}", self.descriptor.collection, id))
            .await
            .map_err(ProviderError::during(action.as_str()))?;
        let response: Map<String, Value> =
            ApiClient::parse_json(&body).map_err(ProviderError::during(action.as_str()))?;

        for field in self.descriptor.fields.iter().filter(|f| f.is_computed()) {
            let value = response
                .get(field.name)
                .and_then(|v| field.kind.coerce(v))
                .unwrap_or(Value::Null);
            state.insert(field.name.to_string(), value);
        }

        debug!(id = %id, "Read {}", self.descriptor.noun);
        Ok(Value::Object(state))
    }

    async fn read_list(&self, attribute: &str) -> Result<Value, ProviderError> {
        let action = format!("Unable to list {}", self.descriptor.noun);

        let body = self
            .client
            .get(self.descriptor.collection)
            .await
            .map_err(ProviderError::during(action.as_str()))?;
        let response: Value =
            ApiClient::parse_json(&body).map_err(ProviderError::during(action.as_str()))?;

        let entries = response
            .as_array()
            .ok_or_else(|| parse_error(&action, "expected a JSON array"))?;
        let items = entries
            .iter()
            .map(|entry| {
                let entry = entry
                    .as_object()
                    .ok_or_else(|| parse_error(&action, "expected an array of objects"))?;
                Ok(self.project(entry))
            })
            .collect::<Result<Vec<_>, ProviderError>>()?;

        debug!(count = items.len(), "Listed {}", self.descriptor.noun);
        let mut state = Map::new();
        state.insert(attribute.to_string(), Value::Array(items));
        Ok(Value::Object(state))
    }

    fn project(&self, entry: &Map<String, Value>) -> Value {
        let projected = self
            .descriptor
            .fields
            .iter()
            .map(|field| {
                let value = entry
                    .get(field.name)
                    .and_then(|v| field.kind.coerce(v))
                    .unwrap_or(Value::Null);
                (field.name.to_string(), value)
            })
            .collect();
        Value::Object(projected)
    }
}

fn parse_error(action: &str, msg: &str) -> ProviderError {
    ProviderError::client(action, ClientError::Parse(msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation;
    use serde_json::json;

    #[test]
    fn test_type_names() {
        let names: Vec<_> = ALL.iter().map(|d| d.type_name()).collect();
        assert_eq!(names, vec!["starbucks_store", "starbucks_stores"]);
    }

    #[test]
    fn test_store_schema() {
        let schema = store::DESCRIPTOR.schema();
        assert!(schema.attribute("id").unwrap().flags.required);
        assert!(schema.attribute("name").unwrap().flags.computed);
        assert!(validation::is_valid(&schema, &json!({"id": "s-1"})));
        assert!(!validation::is_valid(&schema, &json!({})));
    }

    #[test]
    fn test_stores_schema() {
        let schema = stores::DESCRIPTOR.schema();
        let attr = schema.attribute("stores").unwrap();

        assert!(attr.flags.computed);
        assert_eq!(
            attr.attr_type,
            AttributeType::list(AttributeType::object([
                ("id", AttributeType::String),
                ("name", AttributeType::String),
                ("city", AttributeType::String),
            ]))
        );
    }
}
