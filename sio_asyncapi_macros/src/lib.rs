//! Macros producing `sio_asyncapi` descriptors at compile time.
//!
//! - `#[derive(Reflect)]` on a struct with named fields describes it as a
//!   record type.
//! - `#[event_handler]` on a free function keeps the function and adds
//!   `<fn>_signature() -> HandlerSignature`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Fields, FnArg, ItemFn, Lit,
    Meta, Pat, ReturnType, Type,
};

/// Strip `&`/`&mut` so lifetimes from the function signature do not leak
/// into the generated code
fn referent(ty: &Type) -> &Type {
    match ty {
        Type::Reference(r) => referent(&r.elem),
        Type::Paren(p) => referent(&p.elem),
        other => other,
    }
}

fn type_desc(ty: &Type) -> TokenStream2 {
    let ty = referent(ty);
    quote! { <#ty as ::sio_asyncapi::Reflect>::type_desc() }
}

fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn unraw(ident: &syn::Ident) -> String {
    let s = ident.to_string();
    s.strip_prefix("r#").map(str::to_string).unwrap_or(s)
}

#[proc_macro_derive(Reflect)]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_reflect(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_reflect(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reflect cannot be derived for generic types",
        ));
    }
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "Reflect can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "Reflect can only be derived for structs",
            ))
        }
    };

    let name = unraw(ident);
    let field_descs = fields.iter().filter_map(|f| {
        let field_name = unraw(f.ident.as_ref()?);
        let desc = type_desc(&f.ty);
        Some(quote! { ::sio_asyncapi::FieldDesc::new(#field_name, #desc) })
    });

    Ok(quote! {
        impl ::sio_asyncapi::Reflect for #ident {
            fn type_desc() -> ::sio_asyncapi::TypeDesc {
                ::sio_asyncapi::TypeDesc::record(::sio_asyncapi::RecordType::deferred(
                    #name,
                    ::core::concat!(::core::module_path!(), "::", #name),
                    || ::std::vec![#(#field_descs),*],
                ))
            }
        }
    })
}

#[proc_macro_attribute]
pub fn event_handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "event_handler takes no arguments",
        )
        .into_compile_error()
        .into();
    }
    let input = parse_macro_input!(item as ItemFn);
    expand_event_handler(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_event_handler(input: &ItemFn) -> syn::Result<TokenStream2> {
    let sig = &input.sig;
    let vis = &input.vis;
    let fn_name = unraw(&sig.ident);
    let signature_fn = format_ident!("{}_signature", fn_name);

    let mut params = Vec::new();
    for arg in &sig.inputs {
        let FnArg::Typed(pat_ty) = arg else {
            return Err(syn::Error::new_spanned(
                arg,
                "event_handler cannot be used on methods",
            ));
        };
        let Pat::Ident(pat) = pat_ty.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &pat_ty.pat,
                "event_handler parameters must be plain identifiers",
            ));
        };
        let name = unraw(&pat.ident);
        let desc = type_desc(&pat_ty.ty);
        params.push(quote! { .param(#name, #desc) });
    }

    let returns = match &sig.output {
        ReturnType::Default => quote! {},
        ReturnType::Type(_, ty) => {
            let desc = type_desc(ty);
            quote! { .returns(#desc) }
        }
    };

    let lines = doc_lines(&input.attrs);
    let doc = if lines.is_empty() {
        quote! {}
    } else {
        let doc = lines.join("\n");
        quote! { .doc(#doc) }
    };

    let signature_doc = format!("Handler descriptor of `{fn_name}`");

    Ok(quote! {
        #input

        #[doc = #signature_doc]
        #vis fn #signature_fn() -> ::sio_asyncapi::HandlerSignature {
            ::sio_asyncapi::HandlerSignature::new(#fn_name)
                #doc
                #(#params)*
                #returns
        }
    })
}
