//! The `#[test_class]` attribute macro.
//!
//! Placed on an inherent `impl` block, it reads the lifecycle markers written on the block's items, strips
//! them, and emits an `impl paramtest::TestClass` that registers every marked item with a `ClassDef`:
//!
//! ```ignore
//! #[derive(Default)]
//! struct Numbers {
//!     value: u32,
//! }
//!
//! #[test_class(tag = "fast")]
//! impl Numbers {
//!     #[parameter_source]
//!     const VALUES: &'static [u32] = &[1, 2, 3];
//!
//!     #[parameter_setter]
//!     fn set(&mut self, value: &u32) {
//!         self.value = *value;
//!     }
//!
//!     #[test]
//!     fn positive(&self) {
//!         assert!(self.value > 0);
//!     }
//! }
//! ```
//!
//! Marker spellings come from `paramtest_core::lang::markers`, the same table the engine documents.

use paramtest_core::lang::lifecycle::LifecycleCategory;
use paramtest_core::lang::markers::{self, MarkerId, MarkerTarget};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{
    Attribute, Expr, FnArg, Ident, ImplItem, ImplItemConst, ImplItemFn, ItemImpl, LitStr, Path, Type, parse_macro_input,
};

/// Register an `impl` block as a parameterized test class.
///
/// Class arguments: `name = "..."`, `display_name = "..."`, `disabled`, `base`, `tag = "..."` (repeatable),
/// `extends = Parent, via = field`, and `constructor = path`. Without `constructor`, non-base classes are
/// built with `Default::default`.
#[proc_macro_attribute]
pub fn test_class(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = ClassArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(item as ItemImpl);

    match expand(args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct ClassArgs {
    name: Option<LitStr>,
    display_name: Option<LitStr>,
    disabled: bool,
    base: bool,
    tags: Vec<LitStr>,
    extends: Option<Path>,
    via: Option<Ident>,
    constructor: Option<Path>,
}

impl ClassArgs {
    fn parse(&mut self, meta: syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
        let Some(ident) = meta.path.get_ident() else {
            return Err(meta.error("unsupported test_class argument"));
        };
        let key = ident.to_string();

        if let Some(id) = markers::from_str(&key) {
            if markers::target(id) == MarkerTarget::Method {
                return Err(meta.error(format!("`{key}` is only valid on a method")));
            }
            match id {
                MarkerId::DisplayName => self.display_name = Some(meta.value()?.parse()?),
                MarkerId::Disabled => self.disabled = true,
                MarkerId::BaseClass => self.base = true,
                MarkerId::Tag => self.tags.push(meta.value()?.parse()?),
                _ => return Err(meta.error(format!("unsupported test_class argument `{key}`"))),
            }
            return Ok(());
        }

        match key.as_str() {
            markers::NAME_ARG => self.name = Some(meta.value()?.parse()?),
            markers::EXTENDS_ARG => self.extends = Some(meta.value()?.parse()?),
            markers::VIA_ARG => self.via = Some(meta.value()?.parse()?),
            markers::CONSTRUCTOR_ARG => self.constructor = Some(meta.value()?.parse()?),
            _ => return Err(meta.error(format!("unsupported test_class argument `{key}`"))),
        }
        Ok(())
    }
}

/// Markers and modifiers collected from one item.
#[derive(Default)]
struct ItemMarkers {
    categories: Vec<LifecycleCategory>,
    source: bool,
    setter: bool,
    order: Option<Expr>,
    display_name: Option<LitStr>,
    disabled: bool,
}

impl ItemMarkers {
    fn is_empty(&self) -> bool {
        self.categories.is_empty() && !self.source && !self.setter
    }

    fn has_modifiers(&self) -> bool {
        self.order.is_some() || self.display_name.is_some() || self.disabled
    }
}

/// Split `attrs` into recognized markers (removed) and everything else (kept).
fn take_markers(attrs: &mut Vec<Attribute>) -> syn::Result<ItemMarkers> {
    let mut found = ItemMarkers::default();
    let mut kept = Vec::with_capacity(attrs.len());

    for attr in attrs.drain(..) {
        let id = attr
            .path()
            .get_ident()
            .and_then(|ident| markers::from_str(&ident.to_string()));
        let Some(id) = id else {
            kept.push(attr);
            continue;
        };
        if markers::target(id) == MarkerTarget::Class {
            return Err(syn::Error::new(
                attr.span(),
                format!("`{}` belongs in #[test_class(...)]", markers::as_str(id)),
            ));
        }

        if let Some(category) = markers::category(id) {
            found.categories.push(category);
            continue;
        }
        match id {
            MarkerId::ParameterSource => found.source = true,
            MarkerId::ParameterSetter => found.setter = true,
            MarkerId::Order => found.order = Some(attr.parse_args()?),
            MarkerId::DisplayName => found.display_name = Some(attr.parse_args()?),
            MarkerId::Disabled => found.disabled = true,
            _ => kept.push(attr),
        }
    }

    *attrs = kept;
    Ok(found)
}

fn expand(args: ClassArgs, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new(item.generics.span(), "test classes cannot be generic"));
    }
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new(path.span(), "#[test_class] goes on an inherent impl block"));
    }

    let self_ty = item.self_ty.clone();
    let type_name = type_label(&self_ty)?;

    let mut registrations = Vec::new();
    for impl_item in item.items.iter_mut() {
        match impl_item {
            ImplItem::Fn(f) => {
                let found = take_markers(&mut f.attrs)?;
                registrations.extend(register_fn(f, &found)?);
            }
            ImplItem::Const(c) => {
                let found = take_markers(&mut c.attrs)?;
                registrations.extend(register_const(c, &found)?);
            }
            _ => {}
        }
    }

    let name = match &args.name {
        Some(name) => quote!(#name),
        None => quote!(::core::concat!(::core::module_path!(), "::", #type_name)),
    };
    let mut def = quote! { ::paramtest::ClassDef::<Self>::new(#name) };

    match (&args.constructor, args.base) {
        (Some(path), _) => def.extend(quote! { .constructor(#path) }),
        (None, false) => def.extend(quote! { .constructor(<Self as ::core::default::Default>::default) }),
        (None, true) => {}
    }
    if let Some(display_name) = &args.display_name {
        def.extend(quote! { .display_name(#display_name) });
    }
    if args.disabled {
        def.extend(quote! { .disabled() });
    }
    if args.base {
        def.extend(quote! { .base_class() });
    }
    for tag in &args.tags {
        def.extend(quote! { .tag(#tag) });
    }
    match (&args.extends, &args.via) {
        (Some(parent), Some(via)) => def.extend(quote! {
            .extends(
                <#parent as ::paramtest::TestClass>::definition(),
                |subject: &mut Self| &mut subject.#via,
            )
        }),
        (Some(parent), None) => {
            return Err(syn::Error::new(parent.span(), "`extends` needs `via = field` naming the embedded parent"));
        }
        (None, Some(via)) => return Err(syn::Error::new(via.span(), "`via` without `extends`")),
        (None, None) => {}
    }

    Ok(quote! {
        #item

        impl ::paramtest::TestClass for #self_ty {
            fn definition() -> ::paramtest::ClassDef<Self> {
                #def
                #(#registrations)*
            }
        }
    })
}

fn type_label(ty: &Type) -> syn::Result<String> {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .ok_or_else(|| syn::Error::new(ty.span(), "expected a type name")),
        _ => Err(syn::Error::new(ty.span(), "#[test_class] needs a named type")),
    }
}

fn register_fn(f: &ImplItemFn, found: &ItemMarkers) -> syn::Result<Vec<TokenStream2>> {
    if found.is_empty() {
        if found.has_modifiers() {
            return Err(syn::Error::new(f.sig.ident.span(), "modifier on a method without a lifecycle marker"));
        }
        return Ok(Vec::new());
    }

    let ident = &f.sig.ident;
    let name = ident.to_string();
    let has_receiver = matches!(f.sig.inputs.first(), Some(FnArg::Receiver(_)));
    let args: Vec<&Type> = f
        .sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(typed) => Some(typed.ty.as_ref()),
            FnArg::Receiver(_) => None,
        })
        .collect();

    let mut out = Vec::new();
    for category in &found.categories {
        if !args.is_empty() {
            return Err(syn::Error::new(
                f.sig.inputs.span(),
                "lifecycle methods take no arguments besides the receiver",
            ));
        }
        let variant = category_ident(*category);
        out.push(if has_receiver {
            quote! {
                .declare_instance(#name, ::paramtest::LifecycleCategory::#variant, |subject: &mut Self| Self::#ident(subject))
            }
        } else {
            quote! {
                .declare_static(#name, ::paramtest::LifecycleCategory::#variant, || Self::#ident())
            }
        });
    }

    if found.source {
        if has_receiver || !args.is_empty() {
            return Err(syn::Error::new(
                f.sig.inputs.span(),
                "a parameter source is an associated function without arguments",
            ));
        }
        out.push(quote! { .parameter_source(#name, || Self::#ident()) });
    }

    if found.setter {
        if !has_receiver || args.len() != 1 {
            return Err(syn::Error::new(
                f.sig.inputs.span(),
                "a parameter setter takes the receiver and exactly one value",
            ));
        }
        out.push(match args[0] {
            Type::Reference(reference) => {
                let payload = &reference.elem;
                quote! {
                    .parameter_setter(#name, |subject: &mut Self, value: &#payload| Self::#ident(subject, value))
                }
            }
            payload => quote! {
                .parameter_setter(#name, |subject: &mut Self, value: &#payload| {
                    Self::#ident(subject, ::core::clone::Clone::clone(value))
                })
            },
        });
    }

    out.extend(modifiers(&name, found));
    Ok(out)
}

fn register_const(c: &ImplItemConst, found: &ItemMarkers) -> syn::Result<Vec<TokenStream2>> {
    if found.is_empty() && !found.has_modifiers() {
        return Ok(Vec::new());
    }
    if !found.source || !found.categories.is_empty() || found.setter || found.has_modifiers() {
        return Err(syn::Error::new(
            c.ident.span(),
            "only #[parameter_source] may be written on an associated const",
        ));
    }
    let ident = &c.ident;
    let name = ident.to_string();
    Ok(vec![quote! { .parameter_field(#name, Self::#ident) }])
}

fn modifiers(name: &str, found: &ItemMarkers) -> Vec<TokenStream2> {
    let mut out = Vec::new();
    if let Some(order) = &found.order {
        out.push(quote! { .with_order(#name, #order) });
    }
    if let Some(display_name) = &found.display_name {
        out.push(quote! { .method_display_name(#name, #display_name) });
    }
    if found.disabled {
        out.push(quote! { .disable(#name) });
    }
    out
}

fn category_ident(category: LifecycleCategory) -> Ident {
    let variant = match category {
        LifecycleCategory::ClassSetup => "ClassSetup",
        LifecycleCategory::ClassTeardown => "ClassTeardown",
        LifecycleCategory::ParameterSetup => "ParameterSetup",
        LifecycleCategory::ParameterTeardown => "ParameterTeardown",
        LifecycleCategory::MethodSetup => "MethodSetup",
        LifecycleCategory::Test => "Test",
        LifecycleCategory::MethodTeardown => "MethodTeardown",
    };
    format_ident!("{}", variant, span = Span::call_site())
}
