use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitInt, LitStr, Result, Type};

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    expand(&input).unwrap_or_else(Error::into_compile_error)
}

/// Parsed `#[column]` / `#[primary_key]` settings of one field.
struct ColumnSpec {
    ident: Ident,
    column: String,
    field_type: TokenStream,
    nullable: bool,
    primary_key: bool,
    max_length: Option<usize>,
    skip: bool,
}

fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let ident = &input.ident;
    let vis = &input.vis;

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Entity can't be derived for generic structs",
        ));
    }

    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            ident,
            "Entity can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "Entity can only be derived for structs with named fields",
        ));
    };

    let table = table_name(&input.attrs)?.unwrap_or_else(|| ident.to_string().to_case(Case::Snake));

    let specs = named
        .named
        .iter()
        .map(|field| {
            let ident = field
                .ident
                .clone()
                .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
            column_spec(ident, &field.ty, &field.attrs)
        })
        .collect::<Result<Vec<_>>>()?;

    let mapped: Vec<&ColumnSpec> = specs.iter().filter(|s| !s.skip).collect();

    let mut keys = mapped.iter().filter(|s| s.primary_key);
    let primary_key = match (keys.next(), keys.next()) {
        (None, _) => quote!(None),
        (Some(key), None) => {
            let column = &key.column;
            quote!(Some(#column))
        }
        (Some(_), Some(second)) => {
            return Err(Error::new_spanned(
                &second.ident,
                "only one field can be marked #[primary_key]",
            ));
        }
    };

    let column_defs = mapped.iter().map(|s| {
        let field = s.ident.to_string();
        let name = &s.column;
        let field_type = &s.field_type;
        let nullable = s.nullable;
        let is_primary_key = s.primary_key;
        let max_length = match s.max_length {
            Some(max) => quote!(Some(#max)),
            None => quote!(None),
        };

        quote! {
            ::dorm::ColumnDef {
                field: #field,
                name: #name,
                field_type: #field_type,
                nullable: #nullable,
                is_primary_key: #is_primary_key,
                max_length: #max_length,
            }
        }
    });

    let values = mapped.iter().map(|s| {
        let field = &s.ident;
        quote!(::dorm::SqlValue::from(::core::clone::Clone::clone(&self.#field)))
    });

    let from_row_fields = specs.iter().map(|s| {
        let field = &s.ident;
        if s.skip {
            quote!(#field: ::core::default::Default::default())
        } else {
            let column = &s.column;
            quote!(#field: row.try_get(#column)?)
        }
    });

    let fields_ident = format_ident!("{}Fields", ident);
    let handle_decls = mapped.iter().map(|s| {
        let field = &s.ident;
        quote!(pub #field: ::dorm::Field<#ident>)
    });
    let handle_inits = mapped.iter().map(|s| {
        let field = &s.ident;
        let name = s.ident.to_string();
        let field_type = &s.field_type;
        quote!(#field: ::dorm::Field::new(#name, #field_type))
    });

    let fields_doc = format!("Typed field handles of [`{ident}`] for building predicates.");

    Ok(quote! {
        impl ::dorm::DatabaseEntity for #ident {
            const TABLE_NAME: &'static str = #table;
            const PRIMARY_KEY: ::core::option::Option<&'static str> = #primary_key;

            fn columns() -> &'static [::dorm::ColumnDef] {
                const COLUMNS: &[::dorm::ColumnDef] = &[#(#column_defs),*];
                COLUMNS
            }

            fn to_values(&self) -> ::std::vec::Vec<::dorm::SqlValue> {
                ::std::vec![#(#values),*]
            }

            fn from_row(row: &::dorm::Row) -> ::dorm::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#from_row_fields),*
                })
            }
        }

        #[doc = #fields_doc]
        #[derive(Debug, Clone, Copy)]
        #[allow(dead_code)]
        #vis struct #fields_ident {
            #(#handle_decls),*
        }

        impl #ident {
            #vis const FIELDS: #fields_ident = #fields_ident {
                #(#handle_inits),*
            };
        }
    })
}

fn table_name(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut table = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                table = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported entity attribute, expected `table`"))
            }
        })?;
    }

    Ok(table)
}

fn column_spec(ident: Ident, ty: &Type, attrs: &[Attribute]) -> Result<ColumnSpec> {
    let (nullable, inner) = match option_inner(ty) {
        Some(inner) => (true, inner),
        None => (false, ty),
    };

    let mut spec = ColumnSpec {
        column: ident.to_string(),
        ident,
        field_type: field_type(inner),
        nullable,
        primary_key: false,
        max_length: None,
        skip: false,
    };

    for attr in attrs {
        if attr.path().is_ident("primary_key") {
            attr.meta.require_path_only()?;
            spec.primary_key = true;
        } else if attr.path().is_ident("column") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let lit: LitStr = meta.value()?.parse()?;
                    spec.column = lit.value();
                } else if meta.path.is_ident("max_length") {
                    let lit: LitInt = meta.value()?.parse()?;
                    spec.max_length = Some(lit.base10_parse()?);
                } else if meta.path.is_ident("skip") {
                    spec.skip = true;
                } else {
                    return Err(meta.error(
                        "unsupported column attribute, expected `name`, `max_length` or `skip`",
                    ));
                }
                Ok(())
            })?;
        }
    }

    if spec.skip && spec.primary_key {
        return Err(Error::new_spanned(
            &spec.ident,
            "a #[primary_key] field can't be skipped",
        ));
    }

    Ok(spec)
}

/// `T` for `Option<T>`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn field_type(ty: &Type) -> TokenStream {
    let name = match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_default(),
        Type::Reference(reference) => return field_type(&reference.elem),
        _ => String::new(),
    };

    let variant = match name.as_str() {
        "bool" => "Boolean",
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" => "Integer",
        "f32" | "f64" => "Float",
        "Decimal" => "Decimal",
        "String" | "str" | "char" => "Text",
        _ => "Other",
    };

    let variant = format_ident!("{}", variant);
    quote!(::dorm::FieldType::#variant)
}
