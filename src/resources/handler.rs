use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::{state_id, state_object, ResourceDescriptor};
use crate::client::ApiClient;
use crate::error::{ClientError, ProviderError};

/// CRUD operations for one resource type, bound to a configured API client.
#[derive(Debug, Clone)]
pub struct ResourceHandler {
    descriptor: &'static ResourceDescriptor,
    client: Arc<ApiClient>,
}

impl ResourceHandler {
    pub fn new(descriptor: &'static ResourceDescriptor, client: Arc<ApiClient>) -> Self {
        Self { descriptor, client }
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    /// POST the configured fields and return the new state.
    #[instrument(skip_all, fields(resource = self.descriptor.name))]
    pub async fn create(&self, planned: &Value) -> Result<Value, ProviderError> {
        let planned = state_object(planned, "planned state")?;
        let action = format!("Unable to create {}", self.descriptor.noun);

        let payload: Map<String, Value> = self
            .descriptor
            .fields
            .iter()
            .filter(|f| !f.is_computed_only())
            .filter_map(|f| match planned.get(f.name) {
                Some(v) if !v.is_null() => Some((f.name.to_string(), v.clone())),
                _ => None,
            })
            .collect();

        let body = self
            .client
            .post(self.descriptor.collection, &payload)
            .await
            .map_err(ProviderError::during(action.as_str()))?;
        let response: Map<String, Value> =
            ApiClient::parse_json(&body).map_err(ProviderError::during(action.as_str()))?;

        let id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::client(
                    action.as_str(),
                    ClientError::Parse("response has no string \"id\" field".to_string()),
                )
            })?
            .to_string();

        let mut state = planned.clone();
        for field in self.descriptor.fields.iter().filter(|f| f.is_computed()) {
            if !is_unset(&state, field.name) {
                continue;
            }
            if let Some(value) = response.get(field.name).and_then(|v| field.kind.coerce(v)) {
                state.insert(field.name.to_string(), value);
            }
        }
        state.insert("id".to_string(), Value::String(id.clone()));
        if let Some(status) = self.descriptor.initial_status {
            state.insert("status".to_string(), Value::String(status.to_string()));
        }

        info!(id = %id, "Created {}", self.descriptor.noun);
        Ok(Value::Object(state))
    }

    /// GET the resource, refresh the tracked fields and fill in any
    /// attribute missing from `current`.
    #[instrument(skip_all, fields(resource = self.descriptor.name))]
    pub async fn read(&self, current: &Value) -> Result<Value, ProviderError> {
        let id = state_id(current)?;
        let action = format!("Unable to read {}", self.descriptor.noun);

        let body = self
            .client
            .get(&self.descriptor.item_path(id))
            .await
            .map_err(ProviderError::during(action.as_str()))?;
        let response: Map<String, Value> =
            ApiClient::parse_json(&body).map_err(ProviderError::during(action.as_str()))?;

        let mut state = state_object(current, "current state")?.clone();
        for field in self.descriptor.fields {
            // Refresh fields always follow the API; others are only filled
            // when the state has never seen them, as after an import.
            if !self.descriptor.refresh.contains(&field.name) && state.contains_key(field.name) {
                continue;
            }
            if let Some(value) = response.get(field.name).and_then(|v| field.kind.coerce(v)) {
                state.insert(field.name.to_string(), value);
            }
        }

        debug!(id = %id, "Read {}", self.descriptor.noun);
        Ok(Value::Object(state))
    }

    /// PUT every mutable field; unset optionals are sent as null.
    #[instrument(skip_all, fields(resource = self.descriptor.name))]
    pub async fn update(&self, prior: &Value, planned: &Value) -> Result<Value, ProviderError> {
        let id = state_id(prior)?;
        let planned = state_object(planned, "planned state")?;
        let action = format!("Unable to update {}", self.descriptor.noun);

        let payload: Map<String, Value> = self
            .descriptor
            .fields
            .iter()
            .filter(|f| !f.is_computed_only() && !f.force_new)
            .map(|f| {
                let value = planned.get(f.name).cloned().unwrap_or(Value::Null);
                (f.name.to_string(), value)
            })
            .collect();

        self.client
            .put(&self.descriptor.item_path(id), &payload)
            .await
            .map_err(ProviderError::during(action))?;

        let mut state = planned.clone();
        for field in self.descriptor.fields.iter().filter(|f| f.is_computed()) {
            if is_unset(&state, field.name) {
                if let Some(v) = prior.get(field.name) {
                    state.insert(field.name.to_string(), v.clone());
                }
            }
        }

        info!(id = %id, "Updated {}", self.descriptor.noun);
        Ok(Value::Object(state))
    }

    #[instrument(skip_all, fields(resource = self.descriptor.name))]
    pub async fn delete(&self, current: &Value) -> Result<(), ProviderError> {
        let id = state_id(current)?;
        self.client
            .delete(&self.descriptor.item_path(id))
            .await
            .map_err(ProviderError::during(format!(
                "Unable to delete {}",
                self.descriptor.noun
            )))?;

        info!(id = %id, "Deleted {}", self.descriptor.noun);
        Ok(())
    }
}

fn is_unset(state: &Map<String, Value>, name: &str) -> bool {
    state.get(name).map_or(true, Value::is_null)
}
