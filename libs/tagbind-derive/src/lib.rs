use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields, GenericParam, LitStr};

/// Derive macro for tag-driven decoding.
///
/// Generates `tagbind::Decode` (the ordered field list) and
/// `tagbind::Bindable` (so the struct can be nested in other structs or
/// wrapped in `Option`/`Box`).
///
/// # Field attributes
///
/// - `#[bind(<tag> = "KEY")]`: key for decoders reading `<tag>`. Any number
///   of tags may be given, in one or several `#[bind(...)]` attributes.
///   `"-"` excludes the field for that tag, `""` derives the key from the
///   field name, and `",secret"` keeps the value out of logs.
/// - `#[bind(skip)]`: the field is not described at all. Use it for types
///   that do not implement `Bindable`.
///
/// # Container attributes
///
/// - `#[bind(text)]`: the type decodes through its `tagbind::ParseText`
///   implementation instead of field by field. Works on any type, including
///   enums; only `Bindable` is generated.
///
/// # Example
///
/// ```ignore
/// #[derive(tagbind::Decode, Default)]
/// pub struct Server {
///     #[bind(env = "HOST", query = "host")]
///     pub host: String,
///
///     #[bind(env = "PORT")]
///     pub port: u16,
///
///     pub tls: Option<Tls>,
/// }
/// ```
#[proc_macro_derive(Decode, attributes(bind))]
pub fn derive_decode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(mut input: DeriveInput) -> Result<TokenStream2, syn::Error> {
    let text = container_is_text(&input)?;

    // Every type parameter must itself be bindable.
    let type_params: Vec<_> = input
        .generics
        .params
        .iter()
        .filter_map(|param| match param {
            GenericParam::Type(ty) => Some(ty.ident.clone()),
            _ => None,
        })
        .collect();
    if !type_params.is_empty() {
        let where_clause = input.generics.make_where_clause();
        for ident in type_params {
            where_clause
                .predicates
                .push(parse_quote!(#ident: ::tagbind::Bindable));
        }
    }

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    if text {
        return Ok(quote! {
            impl #impl_generics ::tagbind::Bindable for #name #ty_generics #where_clause {
                fn shape() -> ::tagbind::Shape<Self> {
                    ::tagbind::Shape::text()
                }
            }
        });
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Decode only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Decode only supports structs (use #[bind(text)] for other types)",
            ))
        }
    };

    let mut field_defs = Vec::new();

    for field in fields {
        let field_ident = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let field_name_str = field_ident.unraw().to_string();
        let field_ty = &field.ty;

        let mut skip = false;
        let mut tags: Vec<(String, LitStr)> = Vec::new();

        for attr in &field.attrs {
            if !attr.path().is_ident("bind") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    skip = true;
                    return Ok(());
                }
                let tag = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected a tag name"))?
                    .unraw()
                    .to_string();
                if tags.iter().any(|(existing, _)| *existing == tag) {
                    return Err(meta.error(format!("duplicate key for tag '{tag}'")));
                }
                let value: LitStr = meta.value()?.parse()?;
                tags.push((tag, value));
                Ok(())
            })?;
        }

        if skip {
            if let Some((tag, _)) = tags.first() {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    format!("#[bind(skip)] cannot be combined with a key for tag '{tag}'"),
                ));
            }
            continue;
        }

        let tag_entries = tags.iter().map(|(tag, value)| quote! { (#tag, #value) });

        field_defs.push(quote! {
            ::tagbind::FieldDef::new::<#field_ty>(
                #field_name_str,
                &[#(#tag_entries),*],
                |__target| &mut __target.#field_ident,
            )
        });
    }

    Ok(quote! {
        impl #impl_generics ::tagbind::Decode for #name #ty_generics #where_clause {
            fn fields() -> ::std::vec::Vec<::tagbind::FieldDef<Self>> {
                ::std::vec![
                    #(#field_defs),*
                ]
            }
        }

        impl #impl_generics ::tagbind::Bindable for #name #ty_generics #where_clause {
            fn shape() -> ::tagbind::Shape<Self> {
                ::tagbind::Shape::structure()
            }
        }
    })
}

/// Reads `#[bind(text)]` on the type itself.
fn container_is_text(input: &DeriveInput) -> Result<bool, syn::Error> {
    let mut text = false;
    for attr in &input.attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("text") {
                text = true;
                Ok(())
            } else {
                Err(meta.error("unknown container attribute (expected `text`)"))
            }
        })?;
    }
    Ok(text)
}
