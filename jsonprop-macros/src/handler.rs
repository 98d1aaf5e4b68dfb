//! Handler attribute macro implementation
//!
//! Rewrites a handler with typed parameters into one that takes the request,
//! binds every `#[from_json_property]` parameter and extracts the rest.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::ParseStream;
use syn::{parse_macro_input, Attribute, FnArg, Ident, ItemFn, LitStr, Meta, Pat, Type};

const ANNOTATION: &str = "from_json_property";

/// Implementation of the `#[handler]` attribute macro
///
/// Transforms:
/// ```rust,ignore
/// #[handler]
/// pub async fn store(#[from_json_property] count: i32, req: Request) -> Response { ... }
/// ```
///
/// Into (simplified):
/// ```rust,ignore
/// fn __jsonprop_param_store_0() -> ParameterMetadata {
///     ParameterMetadata::new::<i32>("app::store", "count").attribute(FromJsonProperty::default())
/// }
/// inventory::submit! { HandlerParameterEntry { .. } }
///
/// pub async fn store(__jsonprop_req: Request) -> Response {
///     let mut __jsonprop_req = __jsonprop_req;
///     let mut __jsonprop_state = Binding::binder().model_state();
///     let __jsonprop_bound_0 = bind_parameter::<i32>(&mut __jsonprop_req, &meta, &mut __jsonprop_state).await;
///     if let Err(e) = __jsonprop_state.into_result() {
///         return Err(e.into());
///     }
///     let count: i32 = /* __jsonprop_bound_0 */;
///     let req: Request = __jsonprop_req;
///     // original body
/// }
/// ```
pub fn handler_impl(_attr: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    match expand(input_fn) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// A `#[from_json_property]` parameter
struct PropertyParam {
    ident: Ident,
    pat: Box<Pat>,
    ty: Box<Type>,
    key: Option<String>,
}

/// The one parameter extracted with `FromRequest`
struct ExtractedParam {
    pat: Box<Pat>,
    ty: Box<Type>,
}

fn expand(input_fn: ItemFn) -> syn::Result<TokenStream2> {
    let fn_vis = &input_fn.vis;
    let fn_name = &input_fn.sig.ident;
    let fn_generics = &input_fn.sig.generics;
    let where_clause = &input_fn.sig.generics.where_clause;
    let fn_output = &input_fn.sig.output;
    let fn_block = &input_fn.block;
    let fn_attrs = &input_fn.attrs;

    let is_async = input_fn.sig.asyncness.is_some();
    let async_token = if is_async {
        quote! { async }
    } else {
        quote! {}
    };

    let mut properties = Vec::new();
    let mut extracted: Option<ExtractedParam> = None;

    for input in &input_fn.sig.inputs {
        let pat_type = match input {
            FnArg::Typed(pat_type) => pat_type,
            FnArg::Receiver(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "#[handler] does not support methods with self receiver",
                ))
            }
        };

        match property_key(&pat_type.attrs)? {
            Some(key) => {
                let Pat::Ident(pat_ident) = pat_type.pat.as_ref() else {
                    return Err(syn::Error::new_spanned(
                        &pat_type.pat,
                        "#[from_json_property] parameters must be plain identifiers",
                    ));
                };
                properties.push(PropertyParam {
                    ident: pat_ident.ident.clone(),
                    pat: pat_type.pat.clone(),
                    ty: pat_type.ty.clone(),
                    key,
                });
            }
            None if extracted.is_some() => {
                return Err(syn::Error::new_spanned(
                    pat_type,
                    "#[handler] can extract only one parameter from the request; \
                     annotate body properties with #[from_json_property]",
                ));
            }
            None => {
                extracted = Some(ExtractedParam {
                    pat: pat_type.pat.clone(),
                    ty: pat_type.ty.clone(),
                });
            }
        }
    }

    if !properties.is_empty() && !is_async {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "#[from_json_property] parameters require an async handler",
        ));
    }

    let fn_name_str = parameter_name(fn_name);
    let handler_path = quote! { concat!(module_path!(), "::", #fn_name_str) };

    let mut registrations = Vec::new();
    let mut binds = Vec::new();
    let mut lets = Vec::new();

    for (index, property) in properties.iter().enumerate() {
        let pat = &property.pat;
        let ty = &property.ty;
        let param_name = parameter_name(&property.ident);
        // The index keeps builder names unique among handlers of one module.
        let build_fn = format_ident!("__jsonprop_param_{}_{}", fn_name_str, index);
        let bound = format_ident!("__jsonprop_bound_{}", index);

        let attribute = match &property.key {
            Some(key) => quote! { ::jsonprop::binding::FromJsonProperty::named(#key) },
            None => quote! { ::jsonprop::binding::FromJsonProperty::default() },
        };
        let optional = if is_option_type(ty) {
            quote! { .optional() }
        } else {
            quote! {}
        };

        registrations.push(quote! {
            #[doc(hidden)]
            #[allow(non_snake_case)]
            fn #build_fn() -> ::jsonprop::binding::ParameterMetadata {
                ::jsonprop::binding::ParameterMetadata::new::<#ty>(#handler_path, #param_name)
                    .attribute(#attribute)
                    #optional
            }

            ::jsonprop::inventory::submit! {
                ::jsonprop::binding::HandlerParameterEntry {
                    handler: #handler_path,
                    parameter: #param_name,
                    build: #build_fn,
                }
            }
        });

        binds.push(quote! {
            let #bound: ::std::option::Option<#ty> =
                match ::jsonprop::binding::resolve_parameter(#handler_path, #param_name, #build_fn) {
                    Ok(__jsonprop_meta) => {
                        ::jsonprop::binding::bind_parameter::<#ty>(
                            &mut __jsonprop_req,
                            &__jsonprop_meta,
                            &mut __jsonprop_state,
                        )
                        .await
                    }
                    Err(e) => return Err(e.into()),
                };
        });

        lets.push(quote! {
            let #pat: #ty = match #bound {
                Some(v) => v,
                None => {
                    return Err(::jsonprop::FrameworkError::internal(
                        concat!("parameter '", #param_name, "' was not bound"),
                    )
                    .into())
                }
            };
        });
    }

    let binding = if properties.is_empty() {
        quote! {}
    } else {
        quote! {
            let mut __jsonprop_req = __jsonprop_req;
            let mut __jsonprop_state = ::jsonprop::binding::Binding::binder().model_state();
            #(#binds)*
            if let Err(e) = __jsonprop_state.into_result() {
                return Err(e.into());
            }
            #(#lets)*
        }
    };

    let extraction = match &extracted {
        Some(ExtractedParam { pat, ty }) if is_request_type(ty) => quote! {
            let #pat: #ty = __jsonprop_req;
        },
        Some(ExtractedParam { pat, ty }) => quote! {
            let #pat: #ty = match <#ty as ::jsonprop::FromRequest>::from_request(__jsonprop_req).await {
                Ok(v) => v,
                Err(e) => return Err(e.into()),
            };
        },
        None => quote! {
            let _ = __jsonprop_req;
        },
    };

    Ok(quote! {
        #(#registrations)*

        #(#fn_attrs)*
        #fn_vis #async_token fn #fn_name #fn_generics(__jsonprop_req: ::jsonprop::Request) #fn_output #where_clause {
            #binding
            #extraction
            #fn_block
        }
    })
}

/// The property key of a parameter, if it is annotated
///
/// `Ok(Some(None))` means the parameter name is the key. More than one
/// annotation on a parameter is rejected.
fn property_key(attrs: &[Attribute]) -> syn::Result<Option<Option<String>>> {
    let mut annotations = attrs.iter().filter(|attr| attr.path().is_ident(ANNOTATION));
    let Some(first) = annotations.next() else {
        return Ok(None);
    };
    if let Some(duplicate) = annotations.next() {
        return Err(syn::Error::new_spanned(
            duplicate,
            "duplicate #[from_json_property] annotation; a parameter binds to one property",
        ));
    }
    parse_annotation(first).map(Some)
}

/// Parse `#[from_json_property]`, `#[from_json_property("key")]` or
/// `#[from_json_property(name = "key")]`
fn parse_annotation(attr: &Attribute) -> syn::Result<Option<String>> {
    let key = match &attr.meta {
        Meta::Path(_) => return Ok(None),
        Meta::List(_) => attr.parse_args_with(|input: ParseStream| {
            if input.peek(LitStr) {
                return input.parse::<LitStr>();
            }
            let name: Ident = input.parse()?;
            if name != "name" {
                return Err(syn::Error::new(name.span(), "expected `name = \"...\"`"));
            }
            input.parse::<syn::Token![=]>()?;
            input.parse::<LitStr>()
        })?,
        Meta::NameValue(meta) => {
            return Err(syn::Error::new_spanned(
                meta,
                "use #[from_json_property(\"key\")] or #[from_json_property(name = \"key\")]",
            ))
        }
    };

    if key.value().is_empty() {
        return Err(syn::Error::new_spanned(key, "property name must not be empty"));
    }
    Ok(Some(key.value()))
}

/// Identifier text without a raw `r#` prefix
fn parameter_name(ident: &Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_string).unwrap_or(name)
}

/// Check if the type is `Option<..>`
fn is_option_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident == "Option")
            .unwrap_or(false),
        _ => false,
    }
}

/// Check if the type is `Request` or `jsonprop::Request`
fn is_request_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => {
            let segments = &type_path.path.segments;
            if segments.len() == 1 {
                return segments[0].ident == "Request";
            }
            if segments.len() == 2 {
                return segments[0].ident == "jsonprop" && segments[1].ident == "Request";
            }
            false
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn first_param_attrs(item: &ItemFn) -> &[Attribute] {
        match item.sig.inputs.first() {
            Some(FnArg::Typed(pat_type)) => &pat_type.attrs,
            _ => panic!("expected a typed parameter"),
        }
    }

    #[test]
    fn test_annotation_forms() {
        let item: ItemFn = parse_quote! { async fn f(#[from_json_property] count: i32) {} };
        assert_eq!(property_key(first_param_attrs(&item)).unwrap(), Some(None));

        let item: ItemFn = parse_quote! { async fn f(#[from_json_property("user")] owner: User) {} };
        assert_eq!(
            property_key(first_param_attrs(&item)).unwrap(),
            Some(Some("user".to_string()))
        );

        let item: ItemFn = parse_quote! { async fn f(#[from_json_property(name = "a.b")] v: i32) {} };
        assert_eq!(
            property_key(first_param_attrs(&item)).unwrap(),
            Some(Some("a.b".to_string()))
        );

        let item: ItemFn = parse_quote! { async fn f(req: Request) {} };
        assert_eq!(property_key(first_param_attrs(&item)).unwrap(), None);
    }

    #[test]
    fn test_rejects_bad_annotations() {
        let item: ItemFn = parse_quote! {
            async fn f(#[from_json_property] #[from_json_property("total")] count: i32) {}
        };
        assert!(property_key(first_param_attrs(&item)).is_err());

        let item: ItemFn = parse_quote! { async fn f(#[from_json_property(key = "x")] v: i32) {} };
        assert!(property_key(first_param_attrs(&item)).is_err());

        let item: ItemFn = parse_quote! { async fn f(#[from_json_property("")] v: i32) {} };
        assert!(property_key(first_param_attrs(&item)).is_err());
    }

    #[test]
    fn test_expand_handler() {
        let item: ItemFn = parse_quote! {
            pub async fn store(
                #[from_json_property] count: i32,
                #[from_json_property("user")] owner: Option<User>,
                req: Request,
            ) -> Response {
                todo!()
            }
        };
        let output = expand(item).unwrap().to_string();

        assert!(output.contains("__jsonprop_param_store_0"));
        assert!(output.contains("__jsonprop_param_store_1"));
        assert!(output.contains("HandlerParameterEntry"));
        assert!(output.contains("optional"));
    }

    #[test]
    fn test_builder_names_do_not_collide() {
        let first: ItemFn = parse_quote! {
            async fn a_b(#[from_json_property] c: i32) -> Response { todo!() }
        };
        let second: ItemFn = parse_quote! {
            async fn a(#[from_json_property] b_c: i32) -> Response { todo!() }
        };
        let first = expand(first).unwrap().to_string();
        let second = expand(second).unwrap().to_string();

        assert!(first.contains("__jsonprop_param_a_b_0"));
        assert!(second.contains("__jsonprop_param_a_0"));
        assert!(!second.contains("__jsonprop_param_a_b_"));
    }

    #[test]
    fn test_expand_keeps_where_clause() {
        let item: ItemFn = parse_quote! {
            async fn store<T>(#[from_json_property] count: i32) -> Response
            where
                T: Default,
            {
                todo!()
            }
        };
        let output = expand(item).unwrap().to_string();
        assert!(output.contains("where T : Default"));
    }

    #[test]
    fn test_expand_rejects_two_extracted_params() {
        let item: ItemFn = parse_quote! {
            async fn store(req: Request, other: Json<Order>) -> Response { todo!() }
        };
        assert!(expand(item).is_err());
    }

    #[test]
    fn test_expand_rejects_sync_binding() {
        let item: ItemFn = parse_quote! {
            fn store(#[from_json_property] count: i32) -> Response { todo!() }
        };
        assert!(expand(item).is_err());
    }

    #[test]
    fn test_type_checks() {
        assert!(is_option_type(&parse_quote!(Option<i32>)));
        assert!(is_option_type(&parse_quote!(std::option::Option<i32>)));
        assert!(!is_option_type(&parse_quote!(i32)));
        assert!(is_request_type(&parse_quote!(Request)));
        assert!(is_request_type(&parse_quote!(jsonprop::Request)));
        assert!(!is_request_type(&parse_quote!(Json<Order>)));
    }
}
