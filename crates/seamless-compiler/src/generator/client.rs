//! Client stub rendering.

use super::{
    converts_with_from, header, named_use_line, param_type, rust_type, use_line, GeneratorOptions,
    Imports, StubNames,
};
use crate::analyzer::MethodDescriptor;

pub(super) fn render(
    functions: &[&MethodDescriptor],
    names: &StubNames,
    options: &GeneratorOptions,
) -> String {
    let mut imports = Imports::default();
    let mut body = String::new();

    for f in functions {
        if !imports.core.contains("RpcClient") {
            imports.core.insert("RpcClient");
            imports.core.insert("RpcError");
        }

        let mut params = vec!["client: &RpcClient".to_string()];
        let mut args = Vec::new();
        for p in &f.parameters {
            params.push(format!(
                "{}: {}",
                p.name,
                param_type(&p.type_tag, p.optional, &mut imports)
            ));
            if converts_with_from(&p.type_tag) {
                imports.core.insert("Value");
                args.push(format!("Value::from({})", p.name));
            } else {
                imports.core.insert("to_value");
                args.push(format!("to_value(&{})?", p.name));
            }
        }

        let returns = rust_type(&f.return_type_tag, &mut imports);
        let call = if returns == "Value" {
            "call"
        } else {
            "call_typed"
        };

        body.push('\n');
        body.push_str(&format!(
            "/// Calls `{}` ({}).\n",
            f.identity(),
            f.source_location()
        ));
        body.push_str(&format!(
            "pub async fn {}({}) -> Result<{}, RpcError> {{\n",
            names.stub(f),
            params.join(", "),
            returns
        ));
        body.push_str("    client\n");
        body.push_str(&format!(
            "        .{}(\"{}\", vec![{}])\n",
            call,
            f.identity(),
            args.join(", ")
        ));
        body.push_str("        .await\n");
        body.push_str("}\n");
    }

    let mut out = header("//");
    out.push_str(&use_line(&options.core_crate, &imports.core));
    out.push_str(&named_use_line(options, &imports.named));
    out.push_str(&body);
    out
}
