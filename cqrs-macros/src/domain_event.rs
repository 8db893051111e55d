use crate::utils::{apply_derives, ensure_field};
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Expr, Ident, Item, Result, Token, Type, parse::Parse, parse::ParseStream};

/// #[domain_event] 宏实现
/// - 仅支持具名字段结构体
/// - 确保具备字段：`event_date_time: DateTime<Utc>`（缺失时追加到最前）
/// - 追加默认派生：Debug, Clone
/// - 生成 `::cqrs_domain::domain_event::DomainEvent` 实现
/// - 支持：`#[domain_event(event_type = "...")]`，默认使用结构体名
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = match syn::parse::<EventAttrConfig>(attr) {
        Ok(cfg) => cfg,
        Err(err) => return err.to_compile_error().into(),
    };
    let input = match syn::parse::<Item>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error().into(),
    };

    let mut st = match input {
        Item::Struct(s) => s,
        other => {
            return syn::Error::new(
                other.span(),
                "#[domain_event] can only be used on struct types",
            )
            .to_compile_error()
            .into();
        }
    };

    let fields_named = match &mut st.fields {
        syn::Fields::Named(f) => f,
        _ => {
            return syn::Error::new(
                st.span(),
                "#[domain_event] supports only named-field structs, e.g., struct E { x: T }",
            )
            .to_compile_error()
            .into();
        }
    };

    let field: Ident = syn::parse_quote! { event_date_time };
    let field_ty: Type = syn::parse_quote! {
        ::cqrs_domain::chrono::DateTime<::cqrs_domain::chrono::Utc>
    };
    ensure_field(fields_named, &field, &field_ty);

    apply_derives(
        &mut st.attrs,
        vec![syn::parse_quote!(Debug), syn::parse_quote!(Clone)],
    );

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();
    let event_type = cfg
        .event_type
        .unwrap_or_else(|| syn::LitStr::new(&ident.to_string(), ident.span()));

    let out = quote! {
        #st

        impl #impl_generics ::cqrs_domain::domain_event::DomainEvent for #ident #ty_generics #where_clause {
            const EVENT_TYPE: &'static str = #event_type;

            fn event_date_time(&self) -> ::cqrs_domain::chrono::DateTime<::cqrs_domain::chrono::Utc> {
                self.#field
            }
        }
    };

    TokenStream::from(out)
}

// 解析事件宏参数：event_type = "<str>"
struct EventAttrConfig {
    event_type: Option<syn::LitStr>,
}

impl Parse for EventAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut event_type: Option<syn::LitStr> = None;

        if input.is_empty() {
            return Ok(Self { event_type });
        }

        let pairs: Punctuated<syn::ExprAssign, Token![,]> =
            Punctuated::<syn::ExprAssign, Token![,]>::parse_terminated(input)?;

        for assign in pairs.into_iter() {
            let key_ident = match *assign.left {
                Expr::Path(p) if p.path.segments.len() == 1 => p.path.segments[0].ident.clone(),
                other => return Err(syn::Error::new(other.span(), "invalid attribute key")),
            };
            match key_ident.to_string().as_str() {
                "event_type" => {
                    if event_type.is_some() {
                        return Err(syn::Error::new(
                            key_ident.span(),
                            "duplicate key 'event_type' in attribute",
                        ));
                    }
                    let lit = match *assign.right {
                        Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Str(lit),
                            ..
                        }) => lit,
                        other => {
                            return Err(syn::Error::new(
                                other.span(),
                                "expected string literal for 'event_type'",
                            ));
                        }
                    };
                    event_type = Some(lit);
                }
                _ => {
                    return Err(syn::Error::new(
                        key_ident.span(),
                        "unknown key; expected 'event_type'",
                    ));
                }
            }
        }

        Ok(Self { event_type })
    }
}
