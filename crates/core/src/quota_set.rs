//! Wire representation of a project's quota set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ValidationError;
use crate::limit::ResourceQuota;
use crate::resource::QuotaResource;
use crate::types::ProjectId;

/// A flat `{"id": ..., "<resource>": <value>, ...}` object.
///
/// Keys are kept in a `BTreeMap` so the serialized order is stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSet {
    pub id: ProjectId,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

impl QuotaSet {
    fn build<T, F>(
        id: &ProjectId,
        source: &BTreeMap<QuotaResource, T>,
        supported: &[QuotaResource],
        render: F,
    ) -> Self
    where
        F: Fn(&T) -> Value,
    {
        let values = source
            .iter()
            .filter(|(resource, _)| supported.contains(resource))
            .map(|(resource, value)| (resource.as_str().to_owned(), render(value)))
            .collect();
        Self {
            id: id.clone(),
            values,
        }
    }

    /// Limits only, one integer per enabled resource.
    #[must_use]
    pub fn from_limits(
        id: &ProjectId,
        quotas: &BTreeMap<QuotaResource, ResourceQuota>,
        supported: &[QuotaResource],
    ) -> Self {
        Self::build(id, quotas, supported, |q| json!(q.limit))
    }

    /// Limits with usage figures, one object per enabled resource.
    #[must_use]
    pub fn from_details(
        id: &ProjectId,
        quotas: &BTreeMap<QuotaResource, ResourceQuota>,
        supported: &[QuotaResource],
    ) -> Self {
        Self::build(id, quotas, supported, |q| {
            json!({
                "limit": q.limit,
                "in_use": q.in_use,
                "reserved": q.reserved,
                "allocated": q.allocated,
            })
        })
    }

    /// Default limits, one integer per enabled resource.
    #[must_use]
    pub fn from_defaults(
        id: &ProjectId,
        defaults: &BTreeMap<QuotaResource, i64>,
        supported: &[QuotaResource],
    ) -> Self {
        Self::build(id, defaults, supported, |limit| json!(limit))
    }

    /// Wrap in the `{"quota_set": ...}` envelope.
    #[must_use]
    pub fn into_envelope(self) -> QuotaSetEnvelope {
        QuotaSetEnvelope { quota_set: self }
    }
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSetEnvelope {
    pub quota_set: QuotaSet,
}

/// Body of an update request: `{"quota_set": {"<key>": <value>, ...}}`.
///
/// Values are kept raw so each key can be parsed, validated, and written in
/// turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuotaSetUpdate {
    pub quota_set: Map<String, Value>,
}

impl QuotaSetUpdate {
    /// Decode an update body from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedBody`] when the body is not an
    /// object with a `quota_set` object inside.
    pub fn from_value(body: Value) -> Result<Self, ValidationError> {
        serde_json::from_value(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }

    /// An update setting every given resource to `"0"`.
    #[must_use]
    pub fn zeroed(resources: &[QuotaResource]) -> Self {
        let quota_set = resources
            .iter()
            .map(|r| (r.as_str().to_owned(), Value::String("0".to_owned())))
            .collect();
        Self { quota_set }
    }

    /// The raw `force` entry, if present.
    #[must_use]
    pub fn force(&self) -> Option<&Value> {
        self.quota_set.get("force")
    }
}
