//! Derive macros for SQL table definitions.
//!
//! `#[derive(Table)]` turns a row struct into table metadata plus one shared
//! table clause element from `oxide-sql-clause`, so queries can be written
//! against `User::id()` instead of string column names.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Data, DeriveInput, Field, Fields, Ident, LitStr, Meta, Type};

/// Derives `oxide_sql_clause::schema::Table` for a struct with named fields.
///
/// Struct attribute `#[table(...)]`:
///
/// - `name = "..."`: SQL table name, the snake_cased struct name otherwise
/// - `schema = "..."`: schema qualifying the table
///
/// Field attribute `#[column(...)]`:
///
/// - `primary_key`
/// - `name = "..."`: SQL column name, the field name otherwise
/// - `nullable`: `Option<T>` fields are nullable without it
/// - `unique`
/// - `references = "table.column"`: foreign key used to infer join conditions
///
/// For `struct User` the expansion contains `UserTable`, a `UserColumns`
/// module with one marker type per field, and column accessors on both
/// `UserTable` and `User`. `UserTable::table()` hands out the same clause
/// element on every call, so columns taken from it are identical elements.
#[proc_macro_derive(Table, attributes(table, column))]
pub fn derive_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Path prefix of the runtime crate in generated code.
fn krate() -> TokenStream2 {
    quote!(::oxide_sql_clause)
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let row = &input.ident;
    let target = TableTarget::parse(input)?;

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(input, "Table can only be derived for structs"));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            input,
            "Table can only be derived for structs with named fields",
        ));
    };
    let columns = named
        .named
        .iter()
        .map(ColumnField::parse)
        .collect::<syn::Result<Vec<_>>>()?;

    let mut keys = columns.iter().filter(|c| c.primary_key);
    let pk = keys.next();
    if let Some(extra) = keys.next() {
        return Err(syn::Error::new_spanned(
            &extra.ident,
            "only one field may be marked #[column(primary_key)]",
        ));
    }

    let krate = krate();
    let table_type = format_ident!("{}Table", row);
    let columns_mod = format_ident!("{}Columns", row);

    let markers = columns
        .iter()
        .enumerate()
        .map(|(index, c)| c.marker(index, &table_type));
    let accessors: Vec<TokenStream2> = columns.iter().map(|c| c.accessor(&columns_mod)).collect();
    let defs = columns.iter().map(ColumnField::def);
    let sql_names = columns.iter().map(|c| c.sql_name.as_str());
    let pk = match pk {
        Some(c) => {
            let name = &c.sql_name;
            quote!(Some(#name))
        }
        None => quote!(None),
    };

    let table_name = &target.name;
    let build_table = match &target.schema {
        Some(schema) => quote! {
            #krate::selectable::table_in_schema(#schema, #table_name, Self::column_defs())
        },
        None => quote! {
            #krate::selectable::table(#table_name, Self::column_defs())
        },
    };

    let mod_doc = format!("Column marker types of the `{row}` table.");
    let table_doc = format!("Table metadata and clause element for `{row}`.");

    Ok(quote! {
        #[doc = #mod_doc]
        #[allow(non_snake_case)]
        pub mod #columns_mod {
            #(#markers)*
        }

        #[doc = #table_doc]
        #[derive(Debug, Clone, Copy)]
        pub struct #table_type;

        impl #krate::schema::Table for #table_type {
            type Row = #row;

            const NAME: &'static str = #table_name;
            const COLUMNS: &'static [&'static str] = &[#(#sql_names),*];
            const PRIMARY_KEY: Option<&'static str> = #pk;

            fn column_defs() -> ::std::vec::Vec<#krate::schema::ColumnDef> {
                ::std::vec![#(#defs),*]
            }

            fn table() -> #krate::elements::ClauseElement {
                static TABLE: ::std::sync::OnceLock<#krate::elements::ClauseElement> =
                    ::std::sync::OnceLock::new();
                TABLE.get_or_init(|| #build_table).clone()
            }
        }

        impl #table_type {
            /// SQL name of the table.
            #[inline]
            pub const fn table_name() -> &'static str {
                #table_name
            }

            #(#accessors)*
        }

        impl #row {
            /// The shared table clause element.
            pub fn table() -> #krate::elements::ClauseElement {
                <#table_type as #krate::schema::Table>::table()
            }

            #(#accessors)*
        }
    })
}

/// Where the table lives, from `#[table(...)]`.
struct TableTarget {
    name: String,
    schema: Option<String>,
}

impl TableTarget {
    fn parse(input: &DeriveInput) -> syn::Result<Self> {
        let mut name = None;
        let mut schema = None;
        for attr in input.attrs.iter().filter(|a| a.path().is_ident("table")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    name = Some(string_arg(&meta)?);
                } else if meta.path.is_ident("schema") {
                    schema = Some(string_arg(&meta)?);
                } else {
                    return Err(meta.error("expected `name` or `schema`"));
                }
                Ok(())
            })?;
        }
        Ok(Self {
            name: name.unwrap_or_else(|| snake_case(&input.ident.to_string())),
            schema,
        })
    }
}

/// One struct field and the column it maps to.
struct ColumnField {
    ident: Ident,
    ty: Type,
    marker: Ident,
    sql_name: String,
    primary_key: bool,
    nullable: bool,
    unique: bool,
    references: Option<String>,
}

impl ColumnField {
    fn parse(field: &Field) -> syn::Result<Self> {
        let Some(ident) = field.ident.clone() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let mut column = Self {
            marker: format_ident!("{}", pascal_case(&ident.to_string())),
            sql_name: ident.to_string(),
            ident,
            ty: field.ty.clone(),
            primary_key: false,
            nullable: false,
            unique: false,
            references: None,
        };

        for attr in field.attrs.iter().filter(|a| a.path().is_ident("column")) {
            // bare #[column]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }
            attr.parse_nested_meta(|meta| column.apply(&meta))?;
        }
        Ok(column)
    }

    fn apply(&mut self, meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
        let Some(key) = meta.path.get_ident() else {
            return Err(meta.error("expected a column option"));
        };
        match key.to_string().as_str() {
            "primary_key" => self.primary_key = true,
            "nullable" => self.nullable = true,
            "unique" => self.unique = true,
            "name" => self.sql_name = string_arg(meta)?,
            "references" => {
                let target = string_arg(meta)?;
                match target.split_once('.') {
                    Some((t, c)) if !t.is_empty() && !c.is_empty() => {
                        self.references = Some(target);
                    }
                    _ => return Err(meta.error("references must look like \"table.column\"")),
                }
            }
            other => return Err(meta.error(format!("unknown column option `{other}`"))),
        }
        Ok(())
    }

    /// The marker type implementing `Column`.
    fn marker(&self, index: usize, table_type: &Ident) -> TokenStream2 {
        let krate = krate();
        let Self {
            marker,
            ty,
            sql_name,
            nullable,
            primary_key,
            ..
        } = self;
        let doc = format!("The `{sql_name}` column.");
        quote! {
            #[doc = #doc]
            #[derive(Debug, Clone, Copy)]
            pub struct #marker;

            impl #krate::schema::Column for #marker {
                type Table = super::#table_type;
                type Type = #ty;

                const NAME: &'static str = #sql_name;
                const INDEX: usize = #index;
                const NULLABLE: bool = #nullable || <#ty as #krate::types::SqlType>::NULLABLE;
                const PRIMARY_KEY: bool = #primary_key;
            }
        }
    }

    fn accessor(&self, columns_mod: &Ident) -> TokenStream2 {
        let krate = krate();
        let (ident, marker) = (&self.ident, &self.marker);
        quote! {
            #[inline]
            pub fn #ident() -> #krate::elements::ClauseElement {
                <#columns_mod::#marker as #krate::schema::Column>::element()
            }
        }
    }

    /// A `ColumnDef` expression for `Table::column_defs`.
    fn def(&self) -> TokenStream2 {
        let krate = krate();
        let (ty, name) = (&self.ty, &self.sql_name);
        let sql_type = quote!(<#ty as #krate::types::SqlType>);

        let mut def = quote!(#krate::schema::ColumnDef::new(#name, #sql_type::data_type()));
        if self.primary_key {
            def = quote!(#def.primary_key());
        }
        def = if self.nullable {
            quote!(#def.nullable())
        } else {
            quote! {
                {
                    let def = #def;
                    if #sql_type::NULLABLE { def.nullable() } else { def }
                }
            }
        };
        if self.unique {
            def = quote!((#def).unique());
        }
        if let Some(target) = &self.references {
            def = quote!((#def).references(#target));
        }
        def
    }
}

fn string_arg(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

fn snake_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, ch) in ident.char_indices() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

fn pascal_case(ident: &str) -> String {
    ident
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            })
        })
        .collect()
}
