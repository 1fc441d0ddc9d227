//! Schema & binding synthesizer.

use tracing::debug;

use super::bindings::{BindingKey, BindingRegistry, ResolverBinding, TableRef};
use super::directive::{
    CountAnnotation, CountFieldConfig, Counter, ModelCount, validate_model_presence,
};
use super::filter_input::{ensure_filter_input, model_filter_input_name};
use super::TransformOptions;
use crate::error::{TransformError, TransformResult};
use crate::schema::{
    Document, FieldDefinition, InputValue, TypeRef, to_camel_case, to_pascal_case,
};

/// Name of the generated query field for a model: `count<Type>`.
pub fn count_query_name(type_name: &str) -> String {
    to_camel_case(&["count", type_name])
}

pub struct Synthesizer<'a> {
    options: &'a TransformOptions,
}

impl<'a> Synthesizer<'a> {
    pub fn new(options: &'a TransformOptions) -> Self {
        Self { options }
    }

    /// Apply every annotation to `document` and register its bindings.
    ///
    /// Object-level annotations are checked for `@model` before anything is added, so a
    /// failing run leaves neither schema additions nor bindings behind.
    pub fn apply(
        &self,
        document: &mut Document,
        annotations: &[CountAnnotation],
        bindings: &mut BindingRegistry,
    ) -> TransformResult<()> {
        for annotation in annotations {
            if let CountAnnotation::Object(model) = annotation {
                let definition = document.get_type(&model.type_name).ok_or_else(|| {
                    TransformError::MissingModelAnnotation {
                        type_name: model.type_name.clone(),
                    }
                })?;
                validate_model_presence(definition)?;
            }
        }

        for annotation in annotations {
            match annotation {
                CountAnnotation::Object(model) => self.apply_model(document, model, bindings)?,
                CountAnnotation::Field(config) => self.apply_field(document, config, bindings)?,
            }
        }
        Ok(())
    }

    fn apply_model(
        &self,
        document: &mut Document,
        model: &ModelCount,
        bindings: &mut BindingRegistry,
    ) -> TransformResult<()> {
        let type_name = &model.type_name;
        let query_name = count_query_name(type_name);
        let table = TableRef::new(type_name, self.options.table_name(type_name), None);

        // Registering first rejects a query name already claimed by another model.
        let key = BindingKey::new(document.query_type.clone(), query_name.clone());
        bindings.register(ResolverBinding::new(key, table.clone()))?;
        bindings.grant_scan(&table);

        let filter_input = model_filter_input_name(type_name);
        ensure_filter_input(document, type_name, &filter_input);

        let field = FieldDefinition::new(&query_name, TypeRef::named("Int"))
            .with_argument(InputValue::new("filter", TypeRef::named(&filter_input)));
        if !document.add_query_field(field) {
            debug!(field = %query_name, "Query field already present, keeping it");
        }
        Ok(())
    }

    fn apply_field(
        &self,
        document: &mut Document,
        config: &CountFieldConfig,
        bindings: &mut BindingRegistry,
    ) -> TransformResult<()> {
        if let Counter::Shadow(shadow) = &config.counter {
            self.synthesize_shadow_field(document, config, shadow)?;
        }

        bindings.grant_scan(&config.table);
        for (type_name, field_name) in config.bound_fields() {
            let key = BindingKey::new(type_name, field_name);
            bindings.register(ResolverBinding::new(key, config.table.clone()))?;
        }
        Ok(())
    }

    /// Add `<shadow>(filter: Model<Shadow>FilterInput): Int!` to the related type.
    ///
    /// An existing field with the same name is kept as is.
    pub fn synthesize_shadow_field(
        &self,
        document: &mut Document,
        config: &CountFieldConfig,
        shadow: &str,
    ) -> TransformResult<bool> {
        let related = &config.related_type;
        if document.object(related).is_some_and(|o| o.has_field(shadow)) {
            debug!(related = %related, field = %shadow, "Shadow counter field exists, skipping");
            return Ok(false);
        }

        let filter_input = to_pascal_case(&["Model", shadow, "FilterInput"]);
        ensure_filter_input(document, related, &filter_input);

        let field = FieldDefinition::new(shadow, TypeRef::non_null(TypeRef::named("Int")))
            .with_argument(InputValue::new("filter", TypeRef::named(&filter_input)));
        document
            .add_field_if_absent(related, field)
            .ok_or_else(|| TransformError::UnresolvableRelatedType {
                type_name: config.owner_type.clone(),
                field_name: config.field_name.clone(),
                related: related.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::schema::parse_document;
    use crate::transform::DirectiveProcessor;

    const BLOG: &str = r#"
        type Blog @model {
            id: ID!
            title: String
            posts: [Post] @hasMany @count
        }
        type Post @model {
            id: ID!
            title: String
        }
    "#;

    fn run(sdl: &str) -> TransformResult<(Document, BindingRegistry)> {
        let options = TransformOptions::default();
        let mut document = parse_document(sdl)?;
        let annotations = DirectiveProcessor::new(&options).visit(&document)?;
        let mut bindings = BindingRegistry::default();
        Synthesizer::new(&options).apply(&mut document, &annotations, &mut bindings)?;
        Ok((document, bindings))
    }

    #[test]
    fn test_count_query_name() {
        assert_eq!(count_query_name("Foo"), "countFoo");
    }

    #[test]
    fn test_model_count_adds_query_and_binding() {
        let (document, bindings) = run("type Foo @model @count { id: ID! name: String }").unwrap();
        let query = document.object("Query").unwrap();
        let field = query.field("countFoo").unwrap();
        assert_eq!(field.ty.to_string(), "Int");
        assert_eq!(field.arguments[0].ty.to_string(), "ModelFooFilterInput");
        assert!(document.has_type("ModelFooFilterInput"));

        let binding = bindings.get("Query", "countFoo").unwrap();
        assert_eq!(binding.table.table_name, "Foo-local-NONE");
    }

    #[test]
    fn test_missing_model_aborts_before_any_binding() {
        let options = TransformOptions::default();
        let mut document =
            parse_document("type Foo @model @count { id: ID! } type Bar @count { id: ID! }").unwrap();
        let before = document.clone();
        let annotations = DirectiveProcessor::new(&options).visit(&document).unwrap();
        let mut bindings = BindingRegistry::default();

        let result = Synthesizer::new(&options).apply(&mut document, &annotations, &mut bindings);
        assert_matches!(result, Err(TransformError::MissingModelAnnotation { type_name }) if type_name == "Bar");
        assert!(bindings.is_empty());
        assert_eq!(document, before);
    }

    #[test]
    fn test_colliding_query_names_are_rejected() {
        let result = run("type Foo @model @count { id: ID! } type foo @model @count { id: ID! }");
        assert_matches!(
            result,
            Err(TransformError::ConflictingBinding { type_name, existing_type, field_name, .. })
                if type_name == "foo" && existing_type == "Foo" && field_name == "countFoo"
        );
    }

    #[test]
    fn test_shadow_field_on_related_type() {
        let (document, bindings) = run(BLOG).unwrap();
        let post = document.object("Post").unwrap();
        let shadow = post.field("blogPostsId").unwrap();
        assert_eq!(shadow.ty.to_string(), "Int!");
        assert_eq!(shadow.arguments[0].ty.to_string(), "ModelBlogPostsIdFilterInput");
        assert!(document.has_type("ModelBlogPostsIdFilterInput"));
        assert!(bindings.get("Post", "blogPostsId").is_some());
    }

    #[test]
    fn test_field_synthesis_is_idempotent() {
        let options = TransformOptions::default();
        let mut document = parse_document(BLOG).unwrap();
        let annotations = DirectiveProcessor::new(&options).visit(&document).unwrap();
        let synthesizer = Synthesizer::new(&options);
        let mut bindings = BindingRegistry::default();

        synthesizer.apply(&mut document, &annotations, &mut bindings).unwrap();
        synthesizer.apply(&mut document, &annotations, &mut bindings).unwrap();

        let post = document.object("Post").unwrap();
        let shadows = post.fields.iter().filter(|f| f.name == "blogPostsId").count();
        assert_eq!(shadows, 1);
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_existing_shadow_field_is_authoritative() {
        let sdl = r#"
            type Blog @model { id: ID! posts: [Post] @hasMany @count }
            type Post @model { id: ID! blogPostsId: Int }
        "#;
        let (document, bindings) = run(sdl).unwrap();
        let shadow = document.object("Post").unwrap().field("blogPostsId").unwrap();
        assert_eq!(shadow.ty.to_string(), "Int");
        assert!(shadow.arguments.is_empty());
        assert!(bindings.get("Post", "blogPostsId").is_some());
    }

    #[test]
    fn test_explicit_fields_are_bound_not_synthesized() {
        let sdl = r#"
            type Blog @model {
                id: ID!
                postCount: Int
                posts: [Post] @hasMany @count(fields: ["postCount"])
            }
            type Post @model { id: ID! }
        "#;
        let (document, bindings) = run(sdl).unwrap();
        assert_eq!(document.object("Post").unwrap().fields.len(), 1);
        let binding = bindings.get("Blog", "postCount").unwrap();
        assert_eq!(binding.table.model, "Post");
    }
}
