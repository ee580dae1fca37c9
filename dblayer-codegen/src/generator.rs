use dblayer::schema::TableFile;
use proc_macro2::TokenStream;
use quote::quote;

use crate::table_gen::{generate_registry, generate_tables};

/// Generate the complete registry source for a table file.
pub fn generate_all(file: &TableFile) -> TokenStream {
    let tables = generate_tables(file);
    let registry = generate_registry(file);

    quote! {
        #tables
        #registry
    }
}

/// Pretty-print generated tokens; falls back to the raw token text if they do not parse.
pub fn format_token_stream(tokens: &TokenStream) -> String {
    match syn::parse2::<syn::File>(tokens.clone()) {
        Ok(file) => prettyplease::unparse(&file),
        Err(_) => tokens.to_string(),
    }
}
