//! Type contract rendering.
//!
//! Each contract is a `fn` pointer alias matching the generated client stub
//! minus the client argument, so implementations and mocks can be checked
//! against it.

use super::{header, named_use_line, param_type, rust_type, use_line, GeneratorOptions, Imports, StubNames};
use crate::analyzer::MethodDescriptor;

pub(super) fn render(
    functions: &[&MethodDescriptor],
    names: &StubNames,
    options: &GeneratorOptions,
) -> String {
    let mut imports = Imports::default();
    imports.core.insert("BoxFuture");
    imports.core.insert("RpcError");

    let mut body = String::new();
    for f in functions {
        let params: Vec<String> = f
            .parameters
            .iter()
            .map(|p| param_type(&p.type_tag, p.optional, &mut imports))
            .collect();
        let returns = rust_type(&f.return_type_tag, &mut imports);

        body.push_str(&format!(
            "\n/// `{}`: ({}) -> {}\n",
            f.identity(),
            f.parameters
                .iter()
                .map(|p| format!("{}{}: {}", p.name, if p.optional { "?" } else { "" }, p.type_tag))
                .collect::<Vec<_>>()
                .join(", "),
            f.return_type_tag
        ));
        body.push_str(&format!(
            "pub type {} = fn({}) -> BoxFuture<'static, Result<{}, RpcError>>;\n",
            names.contract(f),
            params.join(", "),
            returns
        ));
    }

    let mut out = header("//");
    out.push_str(&use_line(&options.core_crate, &imports.core));
    out.push_str(&named_use_line(options, &imports.named));
    out.push_str(&body);
    out
}
