//! JSON manifest of every generated binding.

use crate::analyzer::schema::TypeTag;
use crate::analyzer::MethodDescriptor;
use crate::config::CompilerConfig;
use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Manifest<'a> {
    #[serde(rename = "_generated")]
    generated: &'static str,
    function_count: usize,
    functions: BTreeMap<String, ManifestEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEntry<'a> {
    name: &'a str,
    source_location: String,
    parameters: Vec<ManifestParameter<'a>>,
    return_type_tag: &'a TypeTag,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestParameter<'a> {
    name: &'a str,
    type_tag: &'a TypeTag,
    optional: bool,
}

pub(super) fn render(functions: &[&MethodDescriptor]) -> Result<String> {
    let functions: BTreeMap<String, ManifestEntry<'_>> = functions
        .iter()
        .map(|f| {
            let entry = ManifestEntry {
                name: &f.name,
                source_location: f.source_location(),
                parameters: f
                    .parameters
                    .iter()
                    .map(|p| ManifestParameter {
                        name: &p.name,
                        type_tag: &p.type_tag,
                        optional: p.optional,
                    })
                    .collect(),
                return_type_tag: &f.return_type_tag,
            };
            (f.identity(), entry)
        })
        .collect();

    let manifest = Manifest {
        generated: CompilerConfig::GENERATED_MARKER,
        function_count: functions.len(),
        functions,
    };
    let mut text = serde_json::to_string_pretty(&manifest)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample;
    use super::super::{generate, GeneratorOptions};

    #[test]
    fn test_manifest_layout() {
        let text = generate(&sample(), &GeneratorOptions::new()).unwrap().manifest;
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["functionCount"], 4);
        let get_user = &json["functions"]["api/users.get_user"];
        assert_eq!(get_user["name"], "get_user");
        assert_eq!(get_user["sourceLocation"], "api/users.rs:10");
        assert_eq!(get_user["returnTypeTag"], "User | null");
        assert_eq!(get_user["parameters"][0]["name"], "id");
        assert_eq!(get_user["parameters"][0]["typeTag"], "string");
        assert_eq!(get_user["parameters"][0]["optional"], false);

        let keys: Vec<&String> = json["functions"].as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "api/posts.create_post",
                "api/posts.get_post",
                "api/users.get_all_users",
                "api/users.get_user"
            ]
        );
        assert!(text.ends_with("}\n"));
    }
}
