//! Procedural macros for the docmapper project.
//!
//! - `#[derive(Collection)]` binds a type to a store collection.
//!
//! ```ignore
//! use docmapper::Collection;
//!
//! #[derive(Collection)]
//! #[collection(name = "items", index(kind = "persistent", fields = "name,price", unique))]
//! pub struct Items;
//!
//! #[derive(Collection)]
//! #[collection(name = "owns", edge)]
//! pub struct Owns;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_macros;

use proc_macro::TokenStream;

mod collection;

/// Implements `docmapper::document::Collection`.
///
/// Attributes, all optional, under `#[collection(...)]`:
///
/// - `name = "..."`: collection name, defaults to the type name in snake case
/// - `edge`: the collection holds edges
/// - `index(kind = "...", fields = "a,b", unique, sparse)`: a declared index,
///   repeatable; `kind` defaults to `persistent`
#[proc_macro_derive(Collection, attributes(collection))]
pub fn derive_collection(input: TokenStream) -> TokenStream {
    collection::derive_collection(input.into()).into()
}
