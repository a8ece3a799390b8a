//! `#[derive(Params)]` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Fields, Type, parse2};

/// Case conventions accepted by `rename_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Camel,
    Pascal,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

const RENAME_RULES: &str = "lowercase, UPPERCASE, camelCase, PascalCase, snake_case, \
                            SCREAMING_SNAKE_CASE, kebab-case, SCREAMING-KEBAB-CASE";

impl RenameRule {
    fn parse(s: &str) -> Option<Self> {
        let rule = match s {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "camelCase" => Self::Camel,
            "PascalCase" => Self::Pascal,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        };
        Some(rule)
    }

    /// Rename a Rust field identifier (assumed `snake_case`).
    fn apply(self, field: &str) -> String {
        let words: Vec<&str> = field.split('_').filter(|w| !w.is_empty()).collect();
        match self {
            Self::Lower => field.to_lowercase(),
            Self::Upper => field.to_uppercase(),
            Self::Snake => words.join("_"),
            Self::ScreamingSnake => words.join("_").to_uppercase(),
            Self::Kebab => words.join("-"),
            Self::ScreamingKebab => words.join("-").to_uppercase(),
            Self::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            Self::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { (*w).to_string() } else { capitalize(w) })
                .collect(),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[derive(Debug, Default)]
struct ContainerOptions {
    rename_all: Option<RenameRule>,
}

#[derive(Debug, Default)]
struct FieldOptions {
    rename: Option<String>,
    skip: bool,
    /// Emit `None` as a bare key instead of omitting the field.
    keep_none: bool,
}

/// Expand `#[derive(Params)]` into a `ToParameters` implementation.
pub fn expand_params_derive(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let container = parse_container_options(&input.attrs)?;

    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "Params can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "Params requires a struct with named fields",
        ));
    };

    let mut inserts = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let options = parse_field_options(&field.attrs)?;
        if options.skip {
            continue;
        }

        let field_name = ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);
        let key = match (&options.rename, container.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply(field_name),
            (None, None) => field_name.to_string(),
        };

        inserts.push(field_insert(ident, &field.ty, &key, &options));
    }

    Ok(quote! {
        impl #impl_generics ::formwire::ToParameters for #name #ty_generics #where_clause {
            fn to_parameters(&self) -> ::formwire::ParameterValue {
                let mut map = ::formwire::ParameterMap::new();
                #(#inserts)*
                ::formwire::ParameterValue::Map(map)
            }
        }
    })
}

fn parse_container_options(attrs: &[syn::Attribute]) -> syn::Result<ContainerOptions> {
    let mut options = ContainerOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("params")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: syn::LitStr = meta.value()?.parse()?;
                let rule = RenameRule::parse(&value.value()).ok_or_else(|| {
                    syn::Error::new_spanned(
                        &value,
                        format!(
                            "unknown rename_all rule \"{}\", expected one of: {RENAME_RULES}",
                            value.value()
                        ),
                    )
                })?;
                options.rename_all = Some(rule);
                Ok(())
            } else {
                Err(meta.error("unsupported params attribute on struct"))
            }
        })?;
    }
    Ok(options)
}

fn parse_field_options(attrs: &[syn::Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("params")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.rename = Some(value.value());
            } else if meta.path.is_ident("skip") {
                options.skip = true;
            } else if meta.path.is_ident("keep_none") {
                options.keep_none = true;
            } else {
                return Err(meta.error("unsupported params attribute on field"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

fn field_insert(ident: &syn::Ident, ty: &Type, key: &str, options: &FieldOptions) -> TokenStream {
    if is_option_type(ty) && !options.keep_none {
        quote! {
            if let ::std::option::Option::Some(value) = &self.#ident {
                map.insert(#key, ::formwire::ToParameters::to_parameters(value));
            }
        }
    } else {
        quote! {
            map.insert(#key, ::formwire::ToParameters::to_parameters(&self.#ident));
        }
    }
}

fn is_option_type(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.qself.is_none()
        && path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option")
}
