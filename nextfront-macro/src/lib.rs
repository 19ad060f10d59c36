//! Procedural macros for nextfront render functions.
//!
//! # Example
//!
//! ```ignore
//! use nextfront::prelude::*;
//!
//! #[render_function(source = "pages/index.js")]
//! async fn index_page(
//!     req: EdgeRequest,
//!     mut res: EdgeResponse,
//!     ctx: &RenderContext,
//! ) -> Result<(), RenderError> {
//!     res.set_header("content-type", "text/html");
//!     res.end_with("<h1>Hello</h1>");
//!     Ok(())
//! }
//!
//! registry.register(Box::new(IndexPage::new())).await?;
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, punctuated::Punctuated, Expr, ExprLit, ItemFn, Lit, Meta, Token};

#[derive(Default, Debug)]
struct RenderFunctionAttrs {
    /// Source file the function renders, e.g. `pages/post/[id].js`.
    source: Option<String>,
}

impl RenderFunctionAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut attrs = RenderFunctionAttrs::default();

        for meta in metas {
            let Meta::NameValue(nv) = meta else {
                return Err(syn::Error::new_spanned(meta, "expected name = value"));
            };
            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            match (ident.as_str(), &nv.value) {
                (
                    "source",
                    Expr::Lit(ExprLit {
                        lit: Lit::Str(lit), ..
                    }),
                ) => attrs.source = Some(lit.value()),
                ("source", other) => {
                    return Err(syn::Error::new_spanned(other, "expected string literal"));
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ));
                }
            }
        }

        Ok(attrs)
    }
}

/// Turn an async fn into a registrable `RenderFunction`.
///
/// The function must be `async` and take the request, the response and the
/// render context, in that order. A unit struct named after the function in
/// PascalCase is generated; its `SOURCE` constant holds the `source`
/// attribute.
#[proc_macro_attribute]
pub fn render_function(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_render_function(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_render_function(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = RenderFunctionAttrs::parse_meta_list(args)?;
    let source = attrs.source.ok_or_else(|| {
        syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing required attribute: source",
        )
    })?;

    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "render_function must be async",
        ));
    }
    if input_fn.sig.inputs.len() != 3 {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "render_function takes (EdgeRequest, EdgeResponse, &RenderContext)",
        ));
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = format_ident!("{}", to_pascal_case(&fn_name.to_string()));

    let expanded = quote! {
        #input_fn

        /// Generated render function.
        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// Source file this function renders.
            pub const SOURCE: &'static str = #source;

            pub fn new() -> Self {
                Self
            }
        }

        #[::nextfront::prelude::async_trait]
        impl ::nextfront::function::RenderFunction for #struct_name {
            async fn render(
                &self,
                request: ::nextfront::edge::EdgeRequest,
                response: ::nextfront::edge::EdgeResponse,
                ctx: &::nextfront::function::RenderContext,
            ) -> ::core::result::Result<(), ::nextfront::function::RenderError> {
                #fn_name(request, response, ctx).await
            }

            fn source(&self) -> &str {
                Self::SOURCE
            }
        }
    };

    Ok(expanded)
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
