//! Derive macro for object-factory
//!
//! `#[derive(Component)]` generates the `InjectionTarget` and `Component`
//! implementations the container needs to construct a type itself.
//!
//! # Example
//!
//! ```rust,ignore
//! use object_factory::{Component, Container, Registration, Selection};
//! use std::sync::Arc;
//!
//! struct Database { url: String }
//! struct Plugin;
//!
//! #[derive(Component)]
//! #[component(scope = "prototype", qualifier = "users", post_construct = "warm_up")]
//! struct UserService {
//!     #[inject(qualifier = "primary")]
//!     db: Arc<Database>,
//!     #[inject]
//!     plugins: Selection<Plugin>,
//!     // Fields without #[inject] use Default
//!     request_count: u64,
//! }
//!
//! impl UserService {
//!     fn warm_up(&self) -> Result<(), std::io::Error> {
//!         Ok(())
//!     }
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Type, parse_macro_input};

/// Derive `InjectionTarget` and `Component`.
///
/// # Struct attributes
///
/// `#[component(...)]`, every key optional and `qualifier`, `post_construct`
/// and `pre_destroy` repeatable:
///
/// - `scope = "singleton" | "prototype"`
/// - `qualifier = "name"` - declared qualifier
/// - `post_construct = "method"` - `fn method(&self) -> Result<(), E>` run after construction
/// - `pre_destroy = "method"` - `fn method(&self) -> Result<(), E>` run on teardown
///
/// # Field attributes
///
/// - `#[inject]` - constructor dependency; the field must be `Arc<T>`,
///   `Container` or `Selection<T>`
/// - `#[inject(qualifier = "name")]` - require a qualifier (repeatable)
///
/// Fields without `#[inject]` are initialized with `Default::default()`.
#[proc_macro_derive(Component, attributes(component, inject))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_component(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_component(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Component can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Component can only be derived for structs",
            ));
        }
    };

    let options = ComponentOptions::parse(&input.attrs)?;

    let mut dependencies = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        let Some(qualifiers) = find_inject_attr(&field.attrs)? else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
            continue;
        };

        let qualified = qualifiers.iter().map(|q| {
            quote! { .qualified(::object_factory::Qualifier::named(#q)) }
        });

        match classify(&field.ty) {
            Some(InjectKind::Object(inner)) => {
                dependencies.push(quote! {
                    ::object_factory::Dependency::object::<#inner>() #(#qualified)*
                });
                field_inits.push(quote! { #field_name: args.next_object::<#inner>()? });
            }
            Some(InjectKind::Selection(inner)) => {
                dependencies.push(quote! {
                    ::object_factory::Dependency::selection::<#inner>() #(#qualified)*
                });
                field_inits.push(quote! { #field_name: args.next_selection::<#inner>()? });
            }
            Some(InjectKind::Container) => {
                dependencies.push(quote! { ::object_factory::Dependency::container() });
                field_inits.push(quote! { #field_name: args.next_container()? });
            }
            None => {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    "Fields marked with #[inject] must have type Arc<T>, Container or Selection<T>",
                ));
            }
        }
    }

    let scope = options.scope.as_ref().map(|scope| {
        quote! { .scope(#scope) }
    });
    let qualifiers = options.qualifiers.iter().map(|q| {
        quote! { .qualifier(::object_factory::Qualifier::named(#q)) }
    });
    let post_construct = options.post_construct.iter().map(|method| {
        let ident = method.parse::<syn::Ident>()?;
        let label = method.value();
        Ok::<_, syn::Error>(quote! {
            .post_construct(#label, |this: &Self| Self::#ident(this).map_err(::std::convert::Into::into))
        })
    });
    let post_construct: Vec<_> = post_construct.collect::<syn::Result<_>>()?;
    let pre_destroy = options.pre_destroy.iter().map(|method| {
        let ident = method.parse::<syn::Ident>()?;
        let label = method.value();
        Ok::<_, syn::Error>(quote! {
            .pre_destroy(#label, |this: &Self| Self::#ident(this).map_err(::std::convert::Into::into))
        })
    });
    let pre_destroy: Vec<_> = pre_destroy.collect::<syn::Result<_>>()?;

    let constructor = if dependencies.is_empty() {
        quote! { ::object_factory::Constructor::NoArgs }
    } else {
        quote! { ::object_factory::Constructor::inject(::std::vec![#(#dependencies),*]) }
    };

    Ok(quote! {
        impl #impl_generics ::object_factory::InjectionTarget for #name #ty_generics #where_clause {
            fn lifecycle() -> ::object_factory::Lifecycle<Self> {
                ::object_factory::Lifecycle::new()
                    #(#post_construct)*
                    #(#pre_destroy)*
            }
        }

        impl #impl_generics ::object_factory::Component for #name #ty_generics #where_clause {
            fn markers() -> ::object_factory::Markers {
                ::object_factory::Markers::new()
                    #scope
                    #(#qualifiers)*
            }

            fn constructor() -> ::object_factory::Constructor {
                #constructor
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(
                mut args: ::object_factory::Arguments,
            ) -> ::std::result::Result<Self, ::object_factory::BoxError> {
                ::std::result::Result::Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    })
}

/// Parsed `#[component(...)]` attributes
#[derive(Default)]
struct ComponentOptions {
    scope: Option<proc_macro2::TokenStream>,
    qualifiers: Vec<LitStr>,
    post_construct: Vec<LitStr>,
    pre_destroy: Vec<LitStr>,
}

impl ComponentOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("component")) {
            attr.parse_nested_meta(|meta| {
                let value: LitStr = meta.value()?.parse()?;
                if meta.path.is_ident("scope") {
                    options.scope = Some(match value.value().as_str() {
                        "singleton" => quote! { ::object_factory::Scope::Singleton },
                        "prototype" => quote! { ::object_factory::Scope::Prototype },
                        _ => return Err(meta.error("scope must be \"singleton\" or \"prototype\"")),
                    });
                } else if meta.path.is_ident("qualifier") {
                    options.qualifiers.push(value);
                } else if meta.path.is_ident("post_construct") {
                    options.post_construct.push(value);
                } else if meta.path.is_ident("pre_destroy") {
                    options.pre_destroy.push(value);
                } else {
                    return Err(meta.error("unknown component attribute"));
                }
                Ok(())
            })?;
        }
        Ok(options)
    }
}

/// Find `#[inject]`, returning its qualifiers
fn find_inject_attr(attrs: &[Attribute]) -> syn::Result<Option<Vec<LitStr>>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut qualifiers = Vec::new();
    if attr.meta.require_path_only().is_ok() {
        return Ok(Some(qualifiers));
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("qualifier") {
            qualifiers.push(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unknown inject attribute"))
        }
    })?;
    Ok(Some(qualifiers))
}

/// What an injected field receives
enum InjectKind<'a> {
    Object(&'a Type),
    Selection(&'a Type),
    Container,
}

fn classify(ty: &Type) -> Option<InjectKind<'_>> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;

    if segment.ident == "Container" && segment.arguments.is_none() {
        return Some(InjectKind::Container);
    }

    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let Some(GenericArgument::Type(inner)) = args.args.first() else {
        return None;
    };

    if segment.ident == "Arc" {
        Some(InjectKind::Object(inner))
    } else if segment.ident == "Selection" {
        Some(InjectKind::Selection(inner))
    } else {
        None
    }
}
