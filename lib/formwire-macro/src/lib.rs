//! Derive macro for formwire parameter trees.
//!
//! `#[derive(Params)]` implements `formwire::ToParameters` for a struct with
//! named fields, producing a `ParameterValue::Map` whose keys follow the
//! field declaration order.

mod params_derive;

use proc_macro::TokenStream;

/// Derive the `ToParameters` trait for a struct.
///
/// Every field type must implement `ToParameters`. Nested structs deriving
/// `Params` become nested maps, `Vec<T>` fields become lists.
///
/// # Struct Attributes
///
/// - `#[params(rename_all = "camelCase")]` - Rename all fields using a case convention
///
/// Supported case conventions:
/// - `lowercase`, `UPPERCASE`
/// - `camelCase`, `PascalCase`
/// - `snake_case`, `SCREAMING_SNAKE_CASE`
/// - `kebab-case`, `SCREAMING-KEBAB-CASE`
///
/// # Field Attributes
///
/// - `#[params(rename = "name")]` - Use a different key (overrides `rename_all`)
/// - `#[params(skip)]` - Leave the field out
/// - `#[params(keep_none)]` - Emit `None` as a bare key instead of omitting it
///
/// # Example
///
/// ```ignore
/// use formwire::Params;
///
/// #[derive(Params)]
/// #[params(rename_all = "camelCase")]
/// struct Profile {
///     display_name: String,          // "displayName"
///     nick_name: Option<String>,     // omitted when None
///     #[params(rename = "tag")]
///     tags: Vec<String>,             // "tag[]=..."
///     #[params(skip)]
///     session: String,
/// }
/// ```
#[proc_macro_derive(Params, attributes(params))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    params_derive::expand_params_derive(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
