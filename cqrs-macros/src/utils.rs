use syn::{Attribute, Field, FieldsNamed, Token, Type, punctuated::Punctuated};

// 合并默认派生与已有派生：同名派生只保留一份，默认派生排在前面
pub(crate) fn apply_derives(attrs: &mut Vec<Attribute>, required: Vec<syn::Path>) {
    let mut retained = Vec::new();
    let mut existing: Vec<syn::Path> = Vec::new();
    for attr in attrs.iter() {
        if !attr.path().is_ident("derive") {
            retained.push(attr.clone());
            continue;
        }
        if let Ok(list) = attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated)
        {
            existing.extend(list);
        }
    }

    let mut merged: Vec<syn::Path> = Vec::new();
    for path in required.into_iter().chain(existing) {
        let key = last_segment(&path);
        if !merged.iter().any(|p| last_segment(p) == key) {
            merged.push(path);
        }
    }

    let derive: Attribute = syn::parse_quote!(#[derive(#(#merged),*)]);
    *attrs = std::iter::once(derive).chain(retained).collect();
}

fn last_segment(path: &syn::Path) -> String {
    path.segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default()
}

/// 若缺少具名字段 `name` 则在最前追加；已存在时保留原定义与顺序
pub(crate) fn ensure_field(fields_named: &mut FieldsNamed, name: &syn::Ident, ty: &Type) {
    let exists = fields_named
        .named
        .iter()
        .any(|f| f.ident.as_ref().is_some_and(|i| i == name));
    if exists {
        return;
    }

    let mut named: Punctuated<Field, Token![,]> = Punctuated::new();
    named.push(syn::parse_quote! { pub #name: #ty });
    named.extend(fields_named.named.clone());
    fields_named.named = named;
}
