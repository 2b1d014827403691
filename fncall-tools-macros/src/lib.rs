//! Procedural macros for function descriptors.
//!
//! `#[tool]` reads a plain Rust function's signature and doc comment and emits
//! two companions next to it: `<fn>_descriptor()`, returning the
//! `FunctionDescriptor`, and `<fn>_binding()`, returning a `FunctionBinding`
//! that decodes keyword arguments from JSON, calls the function, and encodes
//! the result.

use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{
    Attribute, Error, Expr, ExprLit, FnArg, GenericArgument, Ident, ItemFn, Lit, LitStr, Meta,
    Pat, PathArguments, ReturnType, Type,
};

/// Derives a descriptor and a JSON binding for a free function.
///
/// The doc comment becomes the description. Parameter types map to schema
/// types: integers to `integer`, `f32`/`f64` to `number`, `String` to
/// `string`, `bool` to `boolean`, `Vec<T>` to `array`, `HashMap`/`BTreeMap`
/// to `object`, `serde_json::Value` to an unconstrained value, and
/// `Option<T>` to an optional `T`. A parameter annotated with
/// `#[tool(default = <json>)]` may be omitted by the caller.
///
/// ```ignore
/// /// Looks up the forecast for a city.
/// #[tool]
/// fn forecast(city: String, #[tool(default = "celsius")] unit: String) -> String {
///     format!("sunny in {city}, 21 {unit}")
/// }
///
/// let descriptor = forecast_descriptor()?;
/// registry.register_binding(forecast_binding()?)?;
/// ```
///
/// A `null` default is only allowed on `Option<T>` parameters, where it is the
/// same as leaving the attribute off.
///
/// Options: `#[tool(name = "other_name")]` overrides the advertised name and
/// `#[tool(description = "...")]` overrides the doc comment.
///
/// Generated code reaches the runtime through `fncall-tools` when the caller
/// depends on it directly and through `fncall::tools` otherwise.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut options = ToolOptions::default();
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            options.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("description") {
            options.description = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported tool option; expected `name` or `description`"))
        }
    });
    syn::parse_macro_input!(attr with parser);

    let function = syn::parse_macro_input!(item as ItemFn);
    expand(&options, &tools_crate(), function)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

#[derive(Default)]
struct ToolOptions {
    name: Option<LitStr>,
    description: Option<LitStr>,
}

struct Param {
    ident: Ident,
    name: String,
    ty: Type,
    spec: TokenStream2,
}

/// Path to the `fncall-tools` crate as seen from the crate being compiled.
fn tools_crate() -> TokenStream2 {
    let root = |name: String| {
        let ident = Ident::new(&name, Span::call_site());
        quote! { ::#ident }
    };
    match crate_name("fncall-tools") {
        Ok(FoundCrate::Name(name)) => root(name),
        // `fncall-tools` declares `extern crate self as fncall_tools`.
        Ok(FoundCrate::Itself) => quote! { ::fncall_tools },
        Err(_) => match crate_name("fncall") {
            Ok(FoundCrate::Name(name)) => {
                let facade = root(name);
                quote! { #facade::tools }
            }
            Ok(FoundCrate::Itself) => quote! { crate::tools },
            Err(_) => quote! { ::fncall_tools },
        },
    }
}

fn expand(
    options: &ToolOptions,
    krate: &TokenStream2,
    mut function: ItemFn,
) -> syn::Result<TokenStream2> {
    let sig = &function.sig;
    if let Some(asyncness) = sig.asyncness {
        return Err(Error::new(
            asyncness.span(),
            "#[tool] functions are called synchronously; remove `async`",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(Error::new(
            sig.generics.span(),
            "#[tool] functions cannot be generic",
        ));
    }

    let ident = sig.ident.clone();
    let name = match &options.name {
        Some(name) => name.value(),
        None => ident.unraw().to_string(),
    };
    if !is_function_name(&name) {
        return Err(Error::new(
            options.name.as_ref().map_or(ident.span(), LitStr::span),
            format!("`{name}` is not a valid function name"),
        ));
    }

    let description = match &options.description {
        Some(text) => Some(text.value()),
        None => doc_text(&function.attrs),
    };
    let fallible = returns_result(&sig.output);

    let mut params = Vec::new();
    for input in &mut function.sig.inputs {
        let FnArg::Typed(pat_type) = input else {
            return Err(Error::new(
                input.span(),
                "#[tool] only supports free functions without `self`",
            ));
        };
        let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
            return Err(Error::new(
                pat_type.pat.span(),
                "#[tool] parameters must be plain identifiers",
            ));
        };

        let default = take_default(&mut pat_type.attrs)?;
        let param_ident = pat_ident.ident.clone();
        let param_name = param_ident.unraw().to_string();
        let (schema_type, optional) = describe(krate, &pat_type.ty)?;

        let default = match default {
            Some(default) if is_null(&default) => {
                if !optional {
                    return Err(Error::new(
                        default.span(),
                        "a `null` default needs an `Option<T>` parameter",
                    ));
                }
                None
            }
            other => other,
        };

        let spec = match (default, optional) {
            (Some(default), _) => quote! {
                #krate::ParameterSpec::defaulted(
                    #param_name,
                    #schema_type,
                    #krate::__private::json!(#default),
                )
            },
            (None, true) => quote! {
                #krate::ParameterSpec::optional(#param_name, #schema_type)
            },
            (None, false) => quote! {
                #krate::ParameterSpec::required(#param_name, #schema_type)
            },
        };

        params.push(Param {
            ident: param_ident,
            name: param_name,
            ty: (*pat_type.ty).clone(),
            spec,
        });
    }

    let vis = &function.vis;
    let descriptor_ident = format_ident!("{}_descriptor", ident.unraw());
    let binding_ident = format_ident!("{}_binding", ident.unraw());
    let descriptor_doc = format!("Describes [`{ident}`] for function-calling agents.");
    let binding_doc = format!("Binds [`{ident}`] for registration in a `FunctionRegistry`.");

    let describe_call = description.map(|text| quote! { .description(#text) });
    let specs = params.iter().map(|param| &param.spec);
    let arg_idents: Vec<_> = params.iter().map(|param| &param.ident).collect();
    let arg_types = params.iter().map(|param| &param.ty);
    let arg_names = params.iter().map(|param| &param.name);

    let call = if fallible {
        quote! {
            #ident(#(#arg_idents),*)
                .map_err(|err| #krate::ToolError::execution(err.to_string()))?
        }
    } else {
        quote! { #ident(#(#arg_idents),*) }
    };

    Ok(quote! {
        #function

        #[doc = #descriptor_doc]
        #vis fn #descriptor_ident()
            -> #krate::ToolResult<#krate::FunctionDescriptor>
        {
            #krate::FunctionDescriptor::builder(#name)
                #describe_call
                #(.parameter(#specs))*
                .build()
        }

        #[doc = #binding_doc]
        #vis fn #binding_ident()
            -> #krate::ToolResult<#krate::FunctionBinding>
        {
            #[allow(unused_mut, unused_variables)]
            fn execute(
                mut args: #krate::FunctionArgs,
            ) -> #krate::ToolResult<#krate::__private::Value> {
                #(
                    let #arg_idents: #arg_types =
                        #krate::__private::take_argument(#name, &mut args, #arg_names)?;
                )*
                let output = #call;
                #krate::__private::to_output(#name, output)
            }

            Ok(#krate::FunctionBinding::new(#descriptor_ident()?, execute))
        }
    })
}

/// Removes `#[tool(default = ...)]` from a parameter, returning the default.
fn take_default(attrs: &mut Vec<Attribute>) -> syn::Result<Option<Expr>> {
    let mut default = None;
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("tool") {
            kept.push(attr);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("default") {
                if default.is_some() {
                    return Err(meta.error("duplicate `default`"));
                }
                default = Some(meta.value()?.parse::<Expr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported parameter option; expected `default`"))
            }
        })?;
    }
    *attrs = kept;
    Ok(default)
}

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Path(path) if path.qself.is_none() && path.path.is_ident("null"))
}

/// Maps a Rust parameter type to a schema type, flagging `Option<T>`.
fn describe(krate: &TokenStream2, ty: &Type) -> syn::Result<(TokenStream2, bool)> {
    if let Some(inner) = generic_of(ty, "Option") {
        let (schema_type, nested) = describe(krate, inner)?;
        if nested {
            return Err(Error::new(ty.span(), "nested `Option` is not supported"));
        }
        return Ok((schema_type, true));
    }
    Ok((schema_type(krate, ty)?, false))
}

fn schema_type(krate: &TokenStream2, ty: &Type) -> syn::Result<TokenStream2> {
    if let Type::Reference(reference) = ty {
        return Err(Error::new(
            reference.span(),
            "#[tool] parameters must be owned; use `String` or `Vec<T>` instead of references",
        ));
    }

    if let Some(inner) = generic_of(ty, "Vec") {
        let items = schema_type(krate, inner)?;
        return Ok(quote! { #krate::ParamType::array(#items) });
    }

    let Some(last) = last_segment(ty) else {
        return Err(unsupported(ty));
    };
    let variant = match last.as_str() {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => quote! { Integer },
        "f32" | "f64" => quote! { Number },
        "String" => quote! { String },
        "bool" => quote! { Boolean },
        "HashMap" | "BTreeMap" | "Map" => quote! { Object },
        "Value" => quote! { Any },
        _ => return Err(unsupported(ty)),
    };
    Ok(quote! { #krate::ParamType::#variant })
}

fn unsupported(ty: &Type) -> Error {
    Error::new(
        ty.span(),
        "#[tool] cannot describe this parameter type; use an integer, float, `String`, \
         `bool`, `Vec<T>`, a map, `serde_json::Value`, or `Option` of those",
    )
}

fn last_segment(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            path.path.segments.last().map(|seg| seg.ident.to_string())
        }
        Type::Paren(inner) => last_segment(&inner.elem),
        Type::Group(inner) => last_segment(&inner.elem),
        _ => None,
    }
}

/// Returns `T` when `ty` is `<wrapper><T>`.
fn generic_of<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => last_segment(ty).is_some_and(|name| name == "Result"),
    }
}

/// Joins `///` lines, dropping the single leading space rustdoc inserts.
fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(text),
                    ..
                }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').map(str::to_owned).unwrap_or(line))
        .collect();

    let text = lines.join("\n").trim().to_owned();
    (!text.is_empty()).then_some(text)
}

fn is_function_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    /// Expands `function` as seen from a crate that only depends on `fncall`.
    fn expand_through_facade(function: ItemFn) -> syn::Result<String> {
        let krate = quote! { ::fncall::tools };
        expand(&ToolOptions::default(), &krate, function)
            .map(|tokens| tokens.to_string().split_whitespace().collect())
    }

    #[test]
    fn generated_paths_follow_the_resolved_crate() {
        let expanded = expand_through_facade(parse_quote! {
            fn double(x: i64) -> i64 { x * 2 }
        })
        .unwrap();
        assert!(expanded.contains("::fncall::tools::FunctionDescriptor::builder"));
        assert!(expanded.contains("::fncall::tools::__private::take_argument"));
        assert!(!expanded.contains("fncall_tools"));
    }

    #[test]
    fn null_default_needs_an_option() {
        let err = expand_through_facade(parse_quote! {
            fn greet(#[tool(default = null)] name: String) -> String { name }
        })
        .unwrap_err();
        assert!(err.to_string().contains("Option<T>"));

        let expanded = expand_through_facade(parse_quote! {
            fn greet(#[tool(default = null)] name: Option<String>) -> String {
                name.unwrap_or_default()
            }
        })
        .unwrap();
        assert!(expanded.contains("ParameterSpec::optional(\"name\""));
        assert!(!expanded.contains("defaulted"));
    }
}
