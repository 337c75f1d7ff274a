use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Error, LitBool, LitStr, Token, meta::ParseNestedMeta};

struct IndexSpec {
    kind: String,
    fields: Vec<String>,
    options: Vec<(String, bool)>,
}

#[derive(Default)]
struct CollectionSpec {
    name: Option<String>,
    edge: bool,
    indexes: Vec<IndexSpec>,
}

// derive_collection
pub fn derive_collection(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let spec = match parse_spec(&input) {
        Ok(spec) => spec,
        Err(err) => return err.to_compile_error(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let name = spec
        .name
        .unwrap_or_else(|| snake_case(&ident.to_string()));

    let kind = if spec.edge {
        quote!(::docmapper::document::CollectionKind::Edge)
    } else {
        quote!(::docmapper::document::CollectionKind::Document)
    };

    let indexes = spec.indexes.iter().map(|index| {
        let kind = &index.kind;
        let fields = &index.fields;
        let options = index.options.iter().map(|(name, value)| {
            quote!(.with_option(#name, #value))
        });

        quote! {
            ::docmapper::index::IndexDescriptor::new(#kind, [#(#fields),*]) #(#options)*
        }
    });

    quote! {
        impl #impl_generics ::docmapper::document::Collection for #ident #ty_generics #where_clause {
            fn collection_name() -> &'static str {
                #name
            }

            fn kind() -> ::docmapper::document::CollectionKind {
                #kind
            }

            fn indexes() -> ::std::vec::Vec<::docmapper::index::IndexDescriptor> {
                ::std::vec![#(#indexes),*]
            }
        }
    }
}

fn parse_spec(input: &DeriveInput) -> syn::Result<CollectionSpec> {
    let mut spec = CollectionSpec::default();

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("collection")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let name: LitStr = meta.value()?.parse()?;
                if name.value().is_empty() {
                    return Err(Error::new_spanned(name, "collection name must not be empty"));
                }
                spec.name = Some(name.value());
                Ok(())
            } else if meta.path.is_ident("edge") {
                spec.edge = true;
                Ok(())
            } else if meta.path.is_ident("index") {
                spec.indexes.push(parse_index(&meta)?);
                Ok(())
            } else {
                Err(meta.error("expected `name`, `edge` or `index`"))
            }
        })?;
    }

    Ok(spec)
}

fn parse_index(meta: &ParseNestedMeta<'_>) -> syn::Result<IndexSpec> {
    let mut kind = None;
    let mut fields = None;
    let mut options = Vec::new();

    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("kind") {
            let value: LitStr = inner.value()?.parse()?;
            kind = Some(value.value());
        } else if inner.path.is_ident("fields") {
            let value: LitStr = inner.value()?.parse()?;
            let names = value
                .value()
                .split(',')
                .map(|field| field.trim().to_string())
                .collect::<Vec<_>>();

            if names.iter().any(String::is_empty) {
                return Err(Error::new_spanned(
                    value,
                    "index fields must be a comma separated list of names",
                ));
            }
            fields = Some(names);
        } else if inner.path.is_ident("unique") || inner.path.is_ident("sparse") {
            let name = inner
                .path
                .get_ident()
                .map(ToString::to_string)
                .unwrap_or_default();

            let enabled = if inner.input.peek(Token![=]) {
                inner.value()?.parse::<LitBool>()?.value()
            } else {
                true
            };
            options.push((name, enabled));
        } else {
            return Err(inner.error("expected `kind`, `fields`, `unique` or `sparse`"));
        }

        Ok(())
    })?;

    let fields = fields.ok_or_else(|| meta.error("index requires `fields = \"...\"`"))?;

    Ok(IndexSpec {
        kind: kind.unwrap_or_else(|| "persistent".to_string()),
        fields,
        options,
    })
}

fn snake_case(ident: &str) -> String {
    let mut name = String::with_capacity(ident.len() + 4);

    for (position, c) in ident.chars().enumerate() {
        if c.is_uppercase() {
            if position > 0 {
                name.push('_');
            }
            name.extend(c.to_lowercase());
        } else {
            name.push(c);
        }
    }

    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_are_snake_case() {
        assert_eq!(snake_case("Items"), "items");
        assert_eq!(snake_case("UserFollows"), "user_follows");
    }

    #[test]
    fn expands_attributes() {
        let output = derive_collection(quote! {
            #[collection(name = "items", edge, index(fields = "name, price", unique))]
            struct Items;
        })
        .to_string();

        assert!(output.contains("\"items\""), "{output}");
        assert!(output.contains("CollectionKind :: Edge"), "{output}");
        assert!(output.contains("\"persistent\""), "{output}");
        assert!(output.contains("\"price\""), "{output}");
        assert!(output.contains("with_option (\"unique\" , true)"), "{output}");
    }

    #[test]
    fn rejects_unknown_attributes() {
        let output = derive_collection(quote! {
            #[collection(table = "items")]
            struct Items;
        })
        .to_string();

        assert!(output.contains("compile_error"), "{output}");
    }

    #[test]
    fn index_requires_fields() {
        let output = derive_collection(quote! {
            #[collection(index(kind = "persistent"))]
            struct Items;
        })
        .to_string();

        assert!(output.contains("compile_error"), "{output}");
    }
}
