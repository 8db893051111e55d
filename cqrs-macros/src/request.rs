use crate::utils::apply_derives;
use proc_macro::TokenStream;
use quote::quote;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Ident, Item, LitStr, Result, Token, Type, parse::Parse, parse::ParseStream};

#[derive(Clone, Copy)]
pub(crate) enum RequestKind {
    Command,
    Query,
}

impl RequestKind {
    fn attr_name(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Query => "query",
        }
    }
}

/// #[command] / #[query] 宏实现
/// - 仅支持结构体（具名、元组或单元结构体）
/// - 追加默认派生：Debug
/// - 生成 `Command`/`Query` 实现：`NAME`（默认结构体名）与 `Output`（默认 `()`）
/// - `cacheable`：以 Debug 输出生成 `cache_key`
pub(crate) fn expand(kind: RequestKind, attr: TokenStream, item: TokenStream) -> TokenStream {
    let cfg = match syn::parse::<RequestAttrConfig>(attr) {
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
            let msg = format!("#[{}] can only be used on struct types", kind.attr_name());
            return syn::Error::new(other.span(), msg).to_compile_error().into();
        }
    };

    apply_derives(&mut st.attrs, vec![syn::parse_quote!(Debug)]);

    let ident = &st.ident;
    let (impl_generics, ty_generics, where_clause) = st.generics.split_for_impl();
    let name = cfg
        .name
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
    let output = cfg.output.unwrap_or_else(|| syn::parse_quote! { () });

    let cache_key = cfg.cacheable.then(|| {
        quote! {
            fn cache_key(&self) -> ::core::option::Option<::std::string::String> {
                ::core::option::Option::Some(::std::format!("{:?}", self))
            }
        }
    });

    let trait_path = match kind {
        RequestKind::Command => quote! { ::cqrs_application::command::Command },
        RequestKind::Query => quote! { ::cqrs_application::query::Query },
    };

    let out = quote! {
        #st

        impl #impl_generics #trait_path for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            type Output = #output;

            #cache_key
        }
    };

    TokenStream::from(out)
}

// 解析请求宏参数：output = <Type>、name = "<str>"、cacheable
#[derive(Default)]
struct RequestAttrConfig {
    output: Option<Type>,
    name: Option<LitStr>,
    cacheable: bool,
}

impl Parse for RequestAttrConfig {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut cfg = Self::default();
        if input.is_empty() {
            return Ok(cfg);
        }

        let entries: Punctuated<RequestAttrEntry, Token![,]> =
            Punctuated::<RequestAttrEntry, Token![,]>::parse_terminated(input)?;

        for entry in entries {
            match entry {
                RequestAttrEntry::Output(key, ty) => {
                    if cfg.output.replace(ty).is_some() {
                        return Err(syn::Error::new(key.span(), "duplicate key 'output'"));
                    }
                }
                RequestAttrEntry::Name(key, lit) => {
                    if cfg.name.replace(lit).is_some() {
                        return Err(syn::Error::new(key.span(), "duplicate key 'name'"));
                    }
                }
                RequestAttrEntry::Cacheable(key) => {
                    if cfg.cacheable {
                        return Err(syn::Error::new(key.span(), "duplicate key 'cacheable'"));
                    }
                    cfg.cacheable = true;
                }
            }
        }

        Ok(cfg)
    }
}

enum RequestAttrEntry {
    Output(Ident, Type),
    Name(Ident, LitStr),
    Cacheable(Ident),
}

impl Parse for RequestAttrEntry {
    fn parse(input: ParseStream) -> Result<Self> {
        let key: Ident = input.parse()?;
        match key.to_string().as_str() {
            "output" => {
                input.parse::<Token![=]>()?;
                Ok(Self::Output(key, input.parse()?))
            }
            "name" => {
                input.parse::<Token![=]>()?;
                Ok(Self::Name(key, input.parse()?))
            }
            "cacheable" => Ok(Self::Cacheable(key)),
            _ => Err(syn::Error::new(
                key.span(),
                "unknown key; expected 'output' | 'name' | 'cacheable'",
            )),
        }
    }
}
