//! Infrastructure descriptors produced by a transform run.
//!
//! The plan is plain data: the deployer turns it into compute, data-source, resolver and
//! permission resources. It always holds exactly one compute resource and one data
//! source, however many bindings there are.

use std::collections::HashSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::bindings::{BindingRegistry, COUNT_DATA_SOURCE, COUNT_EXECUTOR_ID, TableGrant};
use super::TransformOptions;
use crate::schema::to_pascal_case;

pub const COUNT_STACK_NAME: &str = "countResolverStack";

/// Deployment parameters the artifact location is resolved against.
const S3_BUCKET_PARAMETER: &str = "S3DeploymentBucket";
const S3_ROOT_KEY_PARAMETER: &str = "S3DeploymentRootKey";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    pub local_path: String,
    pub bucket_parameter: String,
    pub root_key_parameter: String,
    /// Key relative to the deployment root key.
    pub relative_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeResource {
    pub logical_id: String,
    pub handler: String,
    pub runtime: String,
    pub code: ArtifactLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_sha256: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceDescriptor {
    pub name: String,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverDescriptor {
    pub logical_id: String,
    pub type_name: String,
    pub field_name: String,
    pub data_source: String,
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub request_mapping_template: String,
    pub response_mapping_template: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructurePlan {
    pub stack_name: String,
    pub function: ComputeResource,
    pub data_source: DataSourceDescriptor,
    pub resolvers: Vec<ResolverDescriptor>,
    pub grants: Vec<TableGrant>,
}

impl InfrastructurePlan {
    pub fn build(options: &TransformOptions, bindings: &BindingRegistry) -> Self {
        let function = ComputeResource {
            logical_id: COUNT_EXECUTOR_ID.to_string(),
            handler: "handler".to_string(),
            runtime: options.handler_runtime.clone(),
            code: ArtifactLocation {
                local_path: options.handler_artifact.clone(),
                bucket_parameter: S3_BUCKET_PARAMETER.to_string(),
                root_key_parameter: S3_ROOT_KEY_PARAMETER.to_string(),
                relative_key: format!("functions/{COUNT_EXECUTOR_ID}.zip"),
            },
            code_sha256: None,
        };

        let data_source = DataSourceDescriptor {
            name: COUNT_DATA_SOURCE.to_string(),
            function: COUNT_EXECUTOR_ID.to_string(),
        };

        let mut used_ids = HashSet::new();
        let resolvers = bindings
            .bindings()
            .map(|binding| {
                let base = format!(
                    "{}Resolver",
                    to_pascal_case(&[binding.key.type_name.as_str(), binding.key.field_name.as_str()])
                );
                let mut logical_id = base.clone();
                let mut suffix = 1;
                while !used_ids.insert(logical_id.clone()) {
                    suffix += 1;
                    logical_id = format!("{base}{suffix}");
                }

                ResolverDescriptor {
                    logical_id,
                    type_name: binding.key.type_name.clone(),
                    field_name: binding.key.field_name.clone(),
                    data_source: COUNT_DATA_SOURCE.to_string(),
                    table_name: binding.table.table_name.clone(),
                    index_name: binding.table.index_name.clone(),
                    request_mapping_template: binding.request.render(COUNT_DATA_SOURCE),
                    response_mapping_template: binding.response.render(),
                }
            })
            .collect();

        Self {
            stack_name: COUNT_STACK_NAME.to_string(),
            function,
            data_source,
            resolvers,
            grants: bindings.grants().cloned().collect(),
        }
    }

    /// Record the sha256 of the packaged executor so redeploys pick up code changes.
    pub fn with_artifact_digest(mut self, artifact: &[u8]) -> Self {
        let digest = Sha256::digest(artifact);
        self.function.code_sha256 = Some(format!("{digest:x}"));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{BindingKey, ResolverBinding, TableRef};

    fn registry_with(keys: &[(&str, &str)]) -> BindingRegistry {
        let mut registry = BindingRegistry::default();
        for (type_name, field_name) in keys {
            let table = TableRef::new("Foo", "Foo-local-NONE".into(), None);
            registry.grant_scan(&table);
            registry
                .register(ResolverBinding::new(BindingKey::new(*type_name, *field_name), table))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_single_executor_many_resolvers() {
        let registry = registry_with(&[("Query", "countFoo"), ("Query", "countBar")]);
        let plan = InfrastructurePlan::build(&TransformOptions::default(), &registry);
        assert_eq!(plan.resolvers.len(), 2);
        assert_eq!(plan.data_source.function, plan.function.logical_id);
        assert!(plan.resolvers.iter().all(|r| r.data_source == plan.data_source.name));
        assert_eq!(plan.function.code.relative_key, "functions/countResolver.zip");
    }

    #[test]
    fn test_resolver_logical_ids_are_unique() {
        let registry = registry_with(&[("Foo", "barBaz"), ("FooBar", "baz")]);
        let plan = InfrastructurePlan::build(&TransformOptions::default(), &registry);
        let ids: HashSet<_> = plan.resolvers.iter().map(|r| r.logical_id.as_str()).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_artifact_digest() {
        let plan = InfrastructurePlan::build(&TransformOptions::default(), &BindingRegistry::default())
            .with_artifact_digest(b"abc");
        assert_eq!(
            plan.function.code_sha256.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
