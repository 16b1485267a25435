//! Server registration rendering.

use super::{
    converts_with_from, header, module_rust_path, use_line, GeneratorOptions, ModuleAliases,
};
use crate::analyzer::MethodDescriptor;
use std::collections::BTreeSet;

pub(super) fn render(
    functions: &[&MethodDescriptor],
    aliases: &ModuleAliases,
    options: &GeneratorOptions,
) -> String {
    let mut core: BTreeSet<&'static str> = BTreeSet::new();
    core.insert("FunctionRegistry");

    let mut body = String::new();
    body.push_str("\n/// Registers every discovered function with `registry`.\n");
    body.push_str("pub fn register_functions(registry: &FunctionRegistry) {\n");

    for f in functions {
        core.insert("handler_fn");

        let mut args = Vec::new();
        if f.takes_context {
            args.push("&ctx".to_string());
        }
        for (index, p) in f.parameters.iter().enumerate() {
            args.push(format!("params.arg({}, \"{}\")?", index, p.name));
        }

        let ctx = if f.takes_context { "ctx" } else { "_ctx" };
        let params = if f.parameters.is_empty() {
            "_params"
        } else {
            "params"
        };
        let propagate = if f.fallible { "?" } else { "" };
        let wrap = if converts_with_from(&f.return_type_tag) {
            core.insert("Value");
            "Ok(Value::from(result))"
        } else {
            core.insert("to_value");
            "Ok(to_value(&result)?)"
        };

        body.push_str("    registry.register(\n");
        body.push_str(&format!("        \"{}\",\n", f.identity()));
        body.push_str(&format!(
            "        handler_fn(|{}, {}| async move {{\n",
            ctx, params
        ));
        body.push_str(&format!(
            "            let result = {}::{}({}).await{};\n",
            aliases.alias(&f.module_path),
            f.name,
            args.join(", "),
            propagate
        ));
        body.push_str(&format!("            {}\n", wrap));
        body.push_str("        }),\n");
        body.push_str("    );\n");
    }
    body.push_str("}\n");

    let mut out = header("//");
    out.push_str(&use_line(&options.core_crate, &core));
    // One import per source module.
    for (alias, module_path) in aliases.imports() {
        out.push_str(&format!(
            "use {} as {};\n",
            module_rust_path(&options.server_module_root, module_path),
            alias
        ));
    }
    out.push_str(&body);
    out
}
