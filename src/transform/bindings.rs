//! Resolver binding registry.
//!
//! Every count field is wired to the single shared executor. Bindings are keyed by
//! `(typeName, fieldName)`; registering the same identity for the same table again merges
//! into the existing entry instead of producing a second resolver. The same identity for a
//! different table is a conflict.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{TransformError, TransformResult};
use crate::mapping::{RequestTransform, ResponseTransform};

/// Logical id of the shared count executor.
pub const COUNT_EXECUTOR_ID: &str = "countResolver";

/// Name of the data source binding the executor to the API.
pub const COUNT_DATA_SOURCE: &str = "countResolverDataSource";

/// Store actions granted to the executor on each counted table.
pub const SCAN_ACTIONS: &[&str] = &["dynamodb:Scan", "dynamodb:DescribeTable"];

/// The store-side table backing a model type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRef {
    pub model: String,
    pub table_name: String,
    pub logical_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
}

impl TableRef {
    pub fn new(model: &str, table_name: String, index_name: Option<String>) -> Self {
        Self {
            model: model.to_string(),
            table_name,
            logical_id: format!("{model}Table"),
            index_name,
        }
    }

    /// ARN of the table, with the account and region left for the deployer to substitute.
    pub fn arn(&self) -> String {
        format!(
            "arn:aws:dynamodb:${{AWS::Region}}:${{AWS::AccountId}}:table/{}",
            self.table_name
        )
    }

    pub fn index_arn(&self) -> Option<String> {
        self.index_name
            .as_ref()
            .map(|index| format!("{}/index/{index}", self.arn()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingKey {
    pub type_name: String,
    pub field_name: String,
}

impl BindingKey {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

/// A count field wired to the shared executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverBinding {
    pub key: BindingKey,
    pub table: TableRef,
    pub executor: &'static str,
    pub request: RequestTransform,
    pub response: ResponseTransform,
}

impl ResolverBinding {
    pub fn new(key: BindingKey, table: TableRef) -> Self {
        let request = RequestTransform::new(table.table_name.clone(), table.index_name.clone());
        Self {
            key,
            table,
            executor: COUNT_EXECUTOR_ID,
            request,
            response: ResponseTransform,
        }
    }
}

/// Scan permission for the executor on one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGrant {
    pub principal: String,
    pub table_name: String,
    pub actions: Vec<String>,
    pub resources: BTreeSet<String>,
}

/// Outcome of [`BindingRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    Merged,
}

#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: BTreeMap<BindingKey, ResolverBinding>,
    grants: BTreeMap<String, TableGrant>,
}

impl BindingRegistry {
    /// Insert `binding` unless its identity is already registered for the same table.
    pub fn register(&mut self, binding: ResolverBinding) -> TransformResult<Registration> {
        if let Some(existing) = self.bindings.get(&binding.key) {
            if existing.table != binding.table {
                return Err(TransformError::ConflictingBinding {
                    bound_type: binding.key.type_name.clone(),
                    field_name: binding.key.field_name.clone(),
                    type_name: binding.table.model.clone(),
                    existing_type: existing.table.model.clone(),
                });
            }
            debug!(
                type_name = %binding.key.type_name,
                field_name = %binding.key.field_name,
                "Binding already registered, merging"
            );
            return Ok(Registration::Merged);
        }
        debug!(
            type_name = %binding.key.type_name,
            field_name = %binding.key.field_name,
            table = %binding.table.table_name,
            "Registered count binding"
        );
        self.bindings.insert(binding.key.clone(), binding);
        Ok(Registration::Created)
    }

    /// Grant the executor scan access to `table` (and its index, if any).
    pub fn grant_scan(&mut self, table: &TableRef) {
        let grant = self
            .grants
            .entry(table.table_name.clone())
            .or_insert_with(|| TableGrant {
                principal: COUNT_EXECUTOR_ID.to_string(),
                table_name: table.table_name.clone(),
                actions: SCAN_ACTIONS.iter().map(|a| a.to_string()).collect(),
                resources: BTreeSet::new(),
            });
        grant.resources.insert(table.arn());
        if let Some(index_arn) = table.index_arn() {
            grant.resources.insert(index_arn);
        }
    }

    pub fn get(&self, type_name: &str, field_name: &str) -> Option<&ResolverBinding> {
        self.bindings.get(&BindingKey::new(type_name, field_name))
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ResolverBinding> {
        self.bindings.values()
    }

    pub fn grants(&self) -> impl Iterator<Item = &TableGrant> {
        self.grants.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(model: &str) -> TableRef {
        TableRef::new(model, format!("{model}-api-dev"), None)
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = BindingRegistry::default();
        let binding = ResolverBinding::new(BindingKey::new("Query", "countFoo"), table("Foo"));

        assert_eq!(registry.register(binding.clone()), Ok(Registration::Created));
        assert_eq!(registry.register(binding), Ok(Registration::Merged));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("Query", "countFoo").unwrap().executor,
            COUNT_EXECUTOR_ID
        );
    }

    #[test]
    fn test_same_identity_for_another_table_conflicts() {
        let mut registry = BindingRegistry::default();
        let key = BindingKey::new("Query", "countFoo");
        registry
            .register(ResolverBinding::new(key.clone(), table("Foo")))
            .unwrap();

        let result = registry.register(ResolverBinding::new(key, table("foo")));
        assert_eq!(
            result,
            Err(TransformError::ConflictingBinding {
                bound_type: "Query".into(),
                field_name: "countFoo".into(),
                type_name: "foo".into(),
                existing_type: "Foo".into(),
            })
        );
        assert_eq!(registry.get("Query", "countFoo").unwrap().table.model, "Foo");
    }

    #[test]
    fn test_grants_are_scoped_per_table() {
        let mut registry = BindingRegistry::default();
        registry.grant_scan(&table("Foo"));
        registry.grant_scan(&table("Foo"));
        registry.grant_scan(&TableRef::new("Bar", "Bar-api-dev".into(), Some("byOwner".into())));

        let grants: Vec<_> = registry.grants().collect();
        assert_eq!(grants.len(), 2);
        for grant in &grants {
            assert!(grant.resources.iter().all(|r| !r.ends_with('*')));
        }
        let bar = grants.iter().find(|g| g.table_name == "Bar-api-dev").unwrap();
        assert_eq!(bar.resources.len(), 2);
        assert!(bar.resources.iter().any(|r| r.ends_with("/index/byOwner")));
    }
}
