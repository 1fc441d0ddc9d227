//! Integration tests for the `@count` schema transform
//!
//! These tests run the full transform over annotated schemas and check:
//! - Validation failures abort the run
//! - Generated query fields and shadow counters
//! - The infrastructure plan shape

use count_transformer::schema::{Directive, parse_document, validate_document};
use count_transformer::{BindingStrategy, CountTransformer, TransformError, TransformOptions};

// ============================================================================
// Validation
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn test_count_without_model_fails() {
        let err = CountTransformer::default()
            .transform("type Foo @count { id: ID! }")
            .unwrap_err();
        assert!(matches!(err, TransformError::MissingModelAnnotation { .. }));
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn test_field_count_on_non_list_fails() {
        let err = CountTransformer::default()
            .transform(
                r#"
                type Blog @model { id: ID! post: Post @hasMany @count }
                type Post @model { id: ID! }
                "#,
            )
            .unwrap_err();
        assert!(matches!(err, TransformError::NotAListType { .. }));
        assert!(err.to_string().contains("Blog.post"));
    }

    #[test]
    fn test_distinct_is_rejected() {
        let err = CountTransformer::default()
            .transform(
                r#"
                type Blog @model { id: ID! posts: [Post] @hasMany @count(type: distinct) }
                type Post @model { id: ID! }
                "#,
            )
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedCountType { .. }));
    }

    #[test]
    fn test_models_with_colliding_count_names_fail() {
        let err = CountTransformer::default()
            .transform(
                r#"
                type Foo @model @count { id: ID! }
                type foo @model @count { id: ID! }
                "#,
            )
            .unwrap_err();
        assert!(matches!(err, TransformError::ConflictingBinding { .. }));
        let message = err.to_string();
        assert!(message.contains("'Foo'") && message.contains("'foo'"));
    }

    #[test]
    fn test_relationship_field_cannot_count_itself() {
        let err = CountTransformer::default()
            .transform(
                r#"
                type Blog @model { id: ID! posts: [Post] @hasMany @count(fields: ["posts"]) }
                type Post @model { id: ID! }
                "#,
            )
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidCounterField { .. }));
        assert!(err.to_string().contains("Blog.posts"));
    }

    #[test]
    fn test_strategy_directive_is_required() {
        let options = TransformOptions {
            binding_strategy: BindingStrategy::Index,
            ..TransformOptions::default()
        };
        let err = CountTransformer::new(options)
            .transform(
                r#"
                type Blog @model { id: ID! posts: [Post] @hasMany @count }
                type Post @model { id: ID! }
                "#,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            TransformError::MissingRelationshipAnnotation { expected: "@index", .. }
        ));
    }
}

// ============================================================================
// Model-level counts
// ============================================================================

mod model_counts {
    use super::*;

    #[test]
    fn test_single_model_yields_one_query_field() {
        let output = CountTransformer::default()
            .transform("type Foo @model @count { id: ID! name: String }")
            .unwrap();

        let reparsed = parse_document(&output.schema).unwrap();
        validate_document(&reparsed).unwrap();

        let query = reparsed.object("Query").unwrap();
        let counts: Vec<_> = query
            .fields
            .iter()
            .filter(|f| f.name.starts_with("count"))
            .collect();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].name, "countFoo");
        assert!(!output.schema.contains("@count"));
        assert!(output.schema.contains("@model"));
    }

    #[test]
    fn test_many_models_share_one_executor() {
        let output = CountTransformer::default()
            .transform(
                r#"
                type Foo @model @count { id: ID! }
                type Bar @model @count { id: ID! }
                "#,
            )
            .unwrap();

        let plan = &output.plan;
        assert_eq!(plan.resolvers.len(), 2);
        assert_eq!(plan.data_source.function, plan.function.logical_id);
        assert!(plan.resolvers.iter().all(|r| r.data_source == plan.data_source.name));
        assert!(
            plan.resolvers
                .iter()
                .all(|r| r.request_mapping_template.contains(&r.table_name))
        );
        assert_eq!(plan.grants.len(), 2);
        assert_eq!(output.bindings.len(), 2);
    }

    #[test]
    fn test_existing_query_type_is_extended() {
        let output = CountTransformer::default()
            .transform(
                r#"
                type Query { hello: String }
                type Foo @model @count { id: ID! }
                "#,
            )
            .unwrap();
        let query = output.document.object("Query").unwrap();
        assert!(query.has_field("hello"));
        assert!(query.has_field("countFoo"));
    }

    #[test]
    fn test_plan_serializes_templates() {
        let output = CountTransformer::default()
            .transform("type Foo @model @count { id: ID! }")
            .unwrap();
        let json = serde_json::to_value(&output.plan).unwrap();
        assert_eq!(json["stackName"], "countResolverStack");
        assert_eq!(json["function"]["logicalId"], "countResolver");
        let resolver = &json["resolvers"][0];
        assert_eq!(resolver["typeName"], "Query");
        assert_eq!(resolver["fieldName"], "countFoo");
        assert_eq!(resolver["tableName"], "Foo-local-NONE");
        assert!(
            resolver["requestMappingTemplate"]
                .as_str()
                .unwrap()
                .contains("\"tableName\": \"Foo-local-NONE\"")
        );
    }
}

// ============================================================================
// Field-level counts
// ============================================================================

mod field_counts {
    use super::*;

    const BLOG: &str = r#"
        type Blog @model {
            id: ID!
            name: String
            posts: [Post] @hasMany @count
        }
        type Post @model {
            id: ID!
            title: String
        }
    "#;

    #[test]
    fn test_shadow_counter_on_related_type() {
        let output = CountTransformer::default().transform(BLOG).unwrap();
        let post = output.document.object("Post").unwrap();
        let shadow = post.field("blogPostsId").unwrap();
        assert_eq!(shadow.ty.to_string(), "Int!");

        let binding = output.bindings.get("Post", "blogPostsId").unwrap();
        assert_eq!(binding.table.table_name, "Post-local-NONE");
        assert_eq!(output.plan.resolvers.len(), 1);
        assert_eq!(output.plan.resolvers[0].type_name, "Post");
    }

    #[test]
    fn test_transforming_output_again_adds_nothing() {
        let transformer = CountTransformer::default();
        let first = transformer.transform(BLOG).unwrap();

        // The output no longer carries @count; put it back on the relationship field.
        let mut document = first.document.clone();
        let blog = document.get_type_mut("Blog").unwrap().as_object_mut().unwrap();
        let posts = blog.fields.iter_mut().find(|f| f.name == "posts").unwrap();
        posts.directives.push(Directive::new("count"));
        let second = transformer.transform_document(document).unwrap();

        let post = second.document.object("Post").unwrap();
        assert_eq!(post.fields.iter().filter(|f| f.name == "blogPostsId").count(), 1);
        assert_eq!(second.bindings.len(), 1);
    }

    #[test]
    fn test_index_strategy_grants_index_arn() {
        let options = TransformOptions {
            binding_strategy: BindingStrategy::Index,
            api_id: "api".into(),
            env_name: "dev".into(),
            ..TransformOptions::default()
        };
        let output = CountTransformer::new(options)
            .transform(
                r#"
                type Blog @model { id: ID! posts: [Post] @index(name: "byBlog") @count }
                type Post @model { id: ID! blogId: ID }
                "#,
            )
            .unwrap();

        let grant = &output.plan.grants[0];
        assert_eq!(grant.table_name, "Post-api-dev");
        assert!(grant.resources.iter().any(|r| r.ends_with("table/Post-api-dev/index/byBlog")));
        assert_eq!(output.plan.resolvers[0].index_name.as_deref(), Some("byBlog"));
    }
}
