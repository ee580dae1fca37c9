use dblayer::schema::{TableFile, TableSpec};
use proc_macro2::TokenStream;
use quote::quote;

use crate::type_utils::{
    column_const_name, column_def_tokens, safe_ident, safe_module_ident, table_static_name,
};

/// Generate a `TableDef` static and a column-constant module for every table.
pub fn generate_tables(file: &TableFile) -> TokenStream {
    let mut tokens = TokenStream::new();
    for (table_name, table) in &file.tables {
        tokens.extend(generate_table_static(table_name, table));
        tokens.extend(generate_column_module(table_name, table));
    }
    tokens
}

fn generate_table_static(table_name: &str, table: &TableSpec) -> TokenStream {
    let ident = safe_ident(&table_static_name(table_name));
    let doc = format!(" The `{table_name}` table.");
    let columns = table.columns.iter().map(column_def_tokens);
    let primary = &table.primary;

    quote! {
        #[doc = #doc]
        pub static #ident: dblayer::schema::TableDef = dblayer::schema::TableDef {
            name: #table_name,
            columns: &[#(#columns),*],
            primary: &[#(#primary),*],
        };
    }
}

fn generate_column_module(table_name: &str, table: &TableSpec) -> TokenStream {
    let module = safe_module_ident(table_name);
    let doc = format!(" Column names of `{table_name}`.");
    let constants = table.columns.iter().map(|column| {
        let ident = safe_ident(&column_const_name(&column.name));
        let name = &column.name;
        quote! { pub const #ident: &str = #name; }
    });

    quote! {
        #[doc = #doc]
        pub mod #module {
            #(#constants)*
        }
    }
}

/// `ALL_TABLES`, sorted by table name.
pub fn generate_registry(file: &TableFile) -> TokenStream {
    let statics = file
        .tables
        .keys()
        .map(|name| safe_ident(&table_static_name(name)));

    quote! {
        /// Every table declared in the table file.
        pub static ALL_TABLES: &[&dblayer::schema::TableDef] = &[#(&#statics),*];
    }
}
