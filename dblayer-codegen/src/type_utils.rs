use dblayer::schema::{ColumnSpec, ColumnType};
use heck::{ToShoutySnakeCase, ToSnakeCase};
use proc_macro2::{Literal, TokenStream};
use quote::{format_ident, quote};

/// Name of the static holding a table's definition.
/// e.g. "post" -> "POST", "post_meta" -> "POST_META"
pub fn table_static_name(table_name: &str) -> String {
    table_name.to_shouty_snake_case()
}

/// Name of the column-constant module for a table.
/// e.g. "PostMeta" -> "post_meta"
pub fn table_module_name(table_name: &str) -> String {
    table_name.to_snake_case()
}

/// e.g. "post_dt" -> "POST_DT"
pub fn column_const_name(column_name: &str) -> String {
    column_name.to_shouty_snake_case()
}

/// Path to the `ColumnType` variant for a column type.
pub fn column_type_tokens(kind: ColumnType) -> TokenStream {
    let variant = match kind {
        ColumnType::Smallint => quote! { Smallint },
        ColumnType::Integer => quote! { Integer },
        ColumnType::Bigint => quote! { Bigint },
        ColumnType::Real => quote! { Real },
        ColumnType::Float => quote! { Float },
        ColumnType::Numeric => quote! { Numeric },
        ColumnType::Date => quote! { Date },
        ColumnType::Time => quote! { Time },
        ColumnType::Timestamp => quote! { Timestamp },
        ColumnType::Char => quote! { Char },
        ColumnType::Varchar => quote! { Varchar },
        ColumnType::Text => quote! { Text },
        ColumnType::Boolean => quote! { Boolean },
    };
    quote! { dblayer::schema::ColumnType::#variant }
}

/// A const `ColumnDef` constructor chain for a column read from a table file.
pub fn column_def_tokens(column: &ColumnSpec) -> TokenStream {
    let name = &column.name;
    let kind = column_type_tokens(column.kind);
    let mut tokens = quote! { dblayer::schema::ColumnDef::new(#name, #kind) };
    if column.len > 0 {
        let len = Literal::u32_unsuffixed(column.len);
        tokens = quote! { #tokens.with_len(#len) };
    }
    if column.nullable {
        tokens = quote! { #tokens.null() };
    }
    if let Some(default) = &column.default {
        tokens = quote! { #tokens.with_default(#default) };
    }
    tokens
}

/// Keywords usable as raw identifiers (`r#type`).
const RAW_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be raw; they get a trailing underscore.
const RESERVED_PATH_KEYWORDS: &[&str] = &["crate", "self", "super", "Self"];

/// Turn a case-converted name into a valid identifier.
///
/// heck drops leading underscores, so `_` becomes empty and `_1st` becomes
/// `1st`; both get an underscore prefix back.
pub fn safe_ident(name: &str) -> proc_macro2::Ident {
    if name.is_empty() {
        return format_ident!("__");
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return format_ident!("_{}", name);
    }
    if RESERVED_PATH_KEYWORDS.contains(&name) {
        return format_ident!("{}_", name);
    }
    if RAW_KEYWORDS.contains(&name) {
        return format_ident!("r#{}", name);
    }
    format_ident!("{}", name)
}

/// Module identifier for a table's column constants.
pub fn safe_module_ident(name: &str) -> proc_macro2::Ident {
    safe_ident(&table_module_name(name))
}
