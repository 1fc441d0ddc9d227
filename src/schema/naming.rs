//! Naming rules shared by generated schema elements.
//!
//! Words keep their inner casing: `["Model", "HTTPLog", "FilterInput"]` becomes
//! `ModelHTTPLogFilterInput`, matching the names the model transformer already emits.

/// Upper-case the first character of each word and concatenate.
pub fn to_pascal_case<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(|word| {
            let mut chars = word.as_ref().chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Pascal case with the first character lower-cased.
pub fn to_camel_case<S: AsRef<str>>(words: &[S]) -> String {
    let pascal = to_pascal_case(words);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

const AWS_SCALARS: &[&str] = &[
    "AWSDate",
    "AWSTime",
    "AWSDateTime",
    "AWSTimestamp",
    "AWSEmail",
    "AWSJSON",
    "AWSURL",
    "AWSPhone",
    "AWSIPAddress",
];

/// Scalars the gateway provides without a declaration.
pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name) || AWS_SCALARS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case() {
        assert_eq!(to_camel_case(&["count", "Foo"]), "countFoo");
        assert_eq!(to_camel_case(&["Blog", "posts"]), "blogPosts");
        assert_eq!(to_camel_case(&["count", "HTTPLog"]), "countHTTPLog");
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(
            to_pascal_case(&["Model", "Foo", "FilterInput"]),
            "ModelFooFilterInput"
        );
        assert_eq!(
            to_pascal_case(&["Model", "blogPostsId", "FilterInput"]),
            "ModelBlogPostsIdFilterInput"
        );
        assert_eq!(to_pascal_case::<&str>(&[]), "");
    }

    #[test]
    fn test_builtin_scalars() {
        assert!(is_builtin_scalar("ID"));
        assert!(is_builtin_scalar("AWSDateTime"));
        assert!(!is_builtin_scalar("Post"));
    }
}
