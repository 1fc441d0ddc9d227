//! The `@count` schema transform.
//!
//! A run has three phases:
//!
//! 1. [`DirectiveProcessor`] visits every `@count` occurrence and validates it, producing a
//!    list of [`CountAnnotation`]s. Nothing is mutated here.
//! 2. [`Synthesizer`] walks the annotations once, adds query fields, filter inputs and
//!    shadow counter fields to the document, and registers resolver bindings.
//! 3. [`InfrastructurePlan`] turns the binding registry into deployable descriptors: one
//!    shared count executor, one data source, one resolver per binding, one grant per table.
//!
//! Any validation error aborts the run before a plan exists.

pub mod bindings;
pub mod directive;
mod filter_input;
pub mod infra;
mod synth;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use crate::error::TransformResult;
use crate::schema::{Document, parse_document, print_document, validate_document};

pub use bindings::{BindingKey, BindingRegistry, Registration, ResolverBinding, TableGrant, TableRef};
pub use directive::{CountAnnotation, CountFieldConfig, CountType, Counter, DirectiveProcessor, ModelCount};
pub use infra::InfrastructurePlan;
pub use synth::Synthesizer;

pub const COUNT_DIRECTIVE: &str = "count";
pub const MODEL_DIRECTIVE: &str = "model";
pub const HAS_MANY_DIRECTIVE: &str = "hasMany";
pub const INDEX_DIRECTIVE: &str = "index";

/// How a field-level `@count` locates the table it counts.
///
/// Selected once per deployment; the two strategies never coexist in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrategy {
    /// The field carries `@hasMany`; the related model's table is scanned.
    #[default]
    Relationship,
    /// The field carries `@index(name: ...)`; the related model's table is scanned through
    /// the named index.
    Index,
}

impl BindingStrategy {
    /// Directive a field must carry under this strategy.
    pub fn directive(self) -> &'static str {
        match self {
            BindingStrategy::Relationship => HAS_MANY_DIRECTIVE,
            BindingStrategy::Index => INDEX_DIRECTIVE,
        }
    }
}

impl FromStr for BindingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relationship" | "hasmany" => Ok(BindingStrategy::Relationship),
            "index" => Ok(BindingStrategy::Index),
            other => Err(format!(
                "unknown binding strategy '{other}' (expected 'relationship' or 'index')"
            )),
        }
    }
}

impl fmt::Display for BindingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingStrategy::Relationship => write!(f, "relationship"),
            BindingStrategy::Index => write!(f, "index"),
        }
    }
}

/// Settings for one transform run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub binding_strategy: BindingStrategy,
    pub api_id: String,
    pub env_name: String,
    pub handler_artifact: String,
    pub handler_runtime: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            binding_strategy: BindingStrategy::default(),
            api_id: "local".to_string(),
            env_name: "NONE".to_string(),
            handler_artifact: "handler/handler.zip".to_string(),
            handler_runtime: "provided.al2023".to_string(),
        }
    }
}

impl TransformOptions {
    /// Backing table name for a model type: `<Type>-<apiId>-<env>`.
    pub fn table_name(&self, model: &str) -> String {
        format!("{model}-{}-{}", self.api_id, self.env_name)
    }
}

/// Everything a transform run produces.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// The augmented schema as SDL.
    pub schema: String,
    pub document: Document,
    pub bindings: BindingRegistry,
    pub plan: InfrastructurePlan,
}

pub const SCHEMA_FILE: &str = "schema.graphql";
pub const PLAN_FILE: &str = "plan.json";

impl TransformOutput {
    /// Write the schema and the plan into `out_dir`, creating it if needed.
    ///
    /// Returns the paths written, schema first.
    pub async fn write_to(&self, out_dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
        tokio::fs::create_dir_all(out_dir).await?;

        let schema_path = out_dir.join(SCHEMA_FILE);
        tokio::fs::write(&schema_path, &self.schema).await?;

        let plan_path = out_dir.join(PLAN_FILE);
        let plan_json = serde_json::to_string_pretty(&self.plan)?;
        tokio::fs::write(&plan_path, plan_json).await?;

        Ok((schema_path, plan_path))
    }
}

/// Entry point tying the three phases together.
#[derive(Debug, Clone, Default)]
pub struct CountTransformer {
    options: TransformOptions,
}

impl CountTransformer {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn transform(&self, sdl: &str) -> TransformResult<TransformOutput> {
        let document = parse_document(sdl)?;
        self.transform_document(document)
    }

    pub fn transform_document(&self, mut document: Document) -> TransformResult<TransformOutput> {
        let annotations = DirectiveProcessor::new(&self.options).visit(&document)?;

        let mut bindings = BindingRegistry::default();
        Synthesizer::new(&self.options).apply(&mut document, &annotations, &mut bindings)?;

        document.strip_directive(COUNT_DIRECTIVE);
        validate_document(&document)?;

        let plan = InfrastructurePlan::build(&self.options, &bindings);
        info!(
            annotations = annotations.len(),
            bindings = bindings.len(),
            grants = plan.grants.len(),
            strategy = %self.options.binding_strategy,
            "Count transform complete"
        );

        Ok(TransformOutput {
            schema: print_document(&document),
            document,
            bindings,
            plan,
        })
    }
}
