use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{format_ident, quote};
use syn::{
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitBool, LitStr, Token,
};

/// One argument inside `#[tag(...)]`.
enum TagArg {
    Selector(LitStr),
    Flag { name: Ident, value: bool },
}
impl Parse for TagArg {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            return Ok(TagArg::Selector(input.parse()?));
        }
        let name: Ident = input.parse()?;
        if name == "selector" {
            input.parse::<Token![=]>()?;
            return Ok(TagArg::Selector(input.parse()?));
        }
        let value = if input.peek(Token![=]) {
            input.parse::<Token![=]>()?;
            input.parse::<LitBool>()?.value
        } else {
            true
        };
        Ok(TagArg::Flag { name, value })
    }
}

/// Everything declared by one `#[tag]` method.
#[derive(Default)]
struct TagSpec {
    selector: Option<LitStr>,
    extract: bool,
    clear: bool,
    root: bool,
    optional: bool,
}
impl TagSpec {
    fn from_args(args: Punctuated<TagArg, Token![,]>) -> syn::Result<Self> {
        let mut spec = TagSpec::default();
        for arg in args {
            match arg {
                TagArg::Selector(lit) => {
                    if spec.selector.is_some() {
                        return Err(syn::Error::new(lit.span(), "selector given twice"));
                    }
                    spec.selector = Some(lit);
                }
                TagArg::Flag { name, value } => {
                    let slot = match name.to_string().as_str() {
                        "extract" => &mut spec.extract,
                        "clear" => &mut spec.clear,
                        "root" => &mut spec.root,
                        "optional" => &mut spec.optional,
                        other => {
                            return Err(syn::Error::new(
                                name.span(),
                                format!(
                                    "unknown tag option `{other}`; expected a selector string, \
                                     `extract`, `clear`, `root` or `optional`"
                                ),
                            ))
                        }
                    };
                    *slot = value;
                }
            }
        }
        Ok(spec)
    }
}

/// A `#[tag]` method lifted out of the trait impl.
struct TagMethod {
    name: Ident,
    spec: TagSpec,
    takes_tag: bool,
    method: ImplItemFn,
}

fn is_tag_attr(attr: &syn::Attribute) -> bool {
    attr.path().is_ident("tag")
}

fn take_tag_method(mut method: ImplItemFn) -> syn::Result<TagMethod> {
    let index = method
        .attrs
        .iter()
        .position(is_tag_attr)
        .ok_or_else(|| syn::Error::new(method.span(), "missing #[tag]"))?;
    let attr = method.attrs.remove(index);
    let spec = match &attr.meta {
        syn::Meta::Path(_) => TagSpec::default(),
        syn::Meta::List(_) => {
            TagSpec::from_args(attr.parse_args_with(Punctuated::parse_terminated)?)?
        }
        syn::Meta::NameValue(nv) => {
            return Err(syn::Error::new(
                nv.span(),
                "use #[tag(\"selector\")] rather than #[tag = ...]",
            ))
        }
    };

    let sig = &method.sig;
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {
            if receiver.mutability.is_some() {
                return Err(syn::Error::new(
                    receiver.span(),
                    "#[tag] methods take `&self`; bindings cannot mutate the component",
                ));
            }
        }
        _ => {
            return Err(syn::Error::new(
                sig.span(),
                "#[tag] methods take `&self` and optionally the matched `&Tag`",
            ))
        }
    }
    if sig.inputs.len() > 2 {
        return Err(syn::Error::new(
            sig.inputs.span(),
            "#[tag] methods take at most one argument besides `&self`",
        ));
    }
    if sig.asyncness.is_some() {
        return Err(syn::Error::new(
            sig.asyncness.span(),
            "#[tag] methods cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.span(),
            "#[tag] methods cannot be generic",
        ));
    }

    let name = sig.ident.clone();
    let takes_tag = sig.inputs.len() == 2;
    method.sig.ident = format_ident!("__weba_bind_{}", name);
    method.vis = syn::Visibility::Inherited;
    method.attrs.push(syn::parse_quote!(#[doc(hidden)]));
    Ok(TagMethod {
        name,
        spec,
        takes_tag,
        method,
    })
}

fn binding_tokens(tag: &TagMethod) -> TokenStream2 {
    let name = tag.name.to_string();
    let bind_ident = tag.method.sig.ident.clone();
    let mut binding = quote! { ::weba::Binding::new(#name) };
    if let Some(selector) = &tag.spec.selector {
        binding.extend(quote! { .selector(#selector) });
    }
    for (enabled, method) in [
        (tag.spec.extract, "extract"),
        (tag.spec.clear, "clear"),
        (tag.spec.root, "root"),
        (tag.spec.optional, "optional"),
    ] {
        if enabled {
            let method = Ident::new(method, Span::call_site());
            binding.extend(quote! { .#method() });
        }
    }
    let call = if tag.takes_tag {
        quote! { component.#bind_ident(tag) }
    } else {
        quote! { { let _ = tag; component.#bind_ident() } }
    };
    binding.extend(quote! {
        .on_resolve(|component: &Self, tag: &::weba::Tag| {
            ::weba::BindingOutput::into_binding_output(#call)
        })
    });
    binding
}

fn accessor_tokens(tag: &TagMethod) -> TokenStream2 {
    let name = &tag.name;
    let key = name.to_string();
    let setter = format_ident!("set_{}", name);
    let getter_doc = format!("The node bound as `{key}`, resolved on first use.");
    let setter_doc = format!("Replace the node bound as `{key}` with `tag`.");
    let getter = if tag.spec.optional {
        quote! {
            #[doc = #getter_doc]
            pub fn #name(&self) -> ::weba::Result<::std::option::Option<::weba::Tag>> {
                <Self as ::weba::Component>::try_tag(self, #key)
            }
        }
    } else {
        quote! {
            #[doc = #getter_doc]
            pub fn #name(&self) -> ::weba::Result<::weba::Tag> {
                <Self as ::weba::Component>::tag(self, #key)
            }
        }
    };
    quote! {
        #getter

        #[doc = #setter_doc]
        pub fn #setter(&self, tag: ::weba::Tag) -> ::weba::Result<()> {
            <Self as ::weba::Component>::set_tag(self, #key, tag)
        }
    }
}

fn expand(mut item: ItemImpl) -> syn::Result<TokenStream2> {
    let is_component = item
        .trait_
        .as_ref()
        .and_then(|(_, path, _)| path.segments.last())
        .is_some_and(|segment| segment.ident == "Component");
    if !is_component {
        return Err(syn::Error::new(
            item.span(),
            "#[component] goes on an `impl Component for ...` block",
        ));
    }

    let mut tags = Vec::new();
    let mut kept = Vec::new();
    let mut has_bindings = false;
    for impl_item in std::mem::take(&mut item.items) {
        match impl_item {
            ImplItem::Fn(method) if method.attrs.iter().any(is_tag_attr) => {
                tags.push(take_tag_method(method)?);
            }
            ImplItem::Fn(method) => {
                has_bindings |= method.sig.ident == "bindings";
                kept.push(ImplItem::Fn(method));
            }
            other => kept.push(other),
        }
    }
    if has_bindings && !tags.is_empty() {
        return Err(syn::Error::new(
            item.span(),
            "`bindings()` is generated from #[tag] methods; remove one or the other",
        ));
    }
    for (index, tag) in tags.iter().enumerate() {
        if tags[..index].iter().any(|other| other.name == tag.name) {
            return Err(syn::Error::new(tag.name.span(), "duplicate #[tag] name"));
        }
        if tag.spec.root && tags[..index].iter().any(|other| other.spec.root) {
            return Err(syn::Error::new(
                tag.name.span(),
                "only one #[tag] may be marked `root`",
            ));
        }
    }

    item.items = kept;
    if !has_bindings {
        let bindings = tags.iter().map(binding_tokens);
        item.items.push(syn::parse_quote! {
            fn bindings() -> ::std::vec::Vec<::weba::Binding<Self>> {
                ::std::vec![#(#bindings),*]
            }
        });
    }

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    let methods = tags.iter().map(|tag| &tag.method);
    let accessors = tags.iter().map(accessor_tokens);

    Ok(quote! {
        #item

        impl #impl_generics #self_ty #where_clause {
            #(#methods)*
            #(#accessors)*
        }

        impl #impl_generics ::std::fmt::Display for #self_ty #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Display::fmt(&<Self as ::weba::Component>::root(self), f)
            }
        }
    })
}

#[proc_macro_attribute]
/// Generates bindings, accessors and a `Display` impl for a component.
///
/// Put it on an `impl Component for T` block. Each method marked with
/// `#[tag]` or `#[tag("selector", extract, clear, root, optional)]` becomes a
/// binding: the method body runs once when the binding resolves, receiving the
/// matched tag if it takes one, and may return `()`, a `Tag`, an `Option<Tag>`
/// or a `weba::Result` of those. For a method named `heading` the macro adds
/// `heading(&self) -> weba::Result<Tag>` and `set_heading(&self, Tag)`.
///
/// A selector starting with `<!--` matches the element after that comment;
/// any other selector is CSS. Without a selector the binding refers to the
/// component root.
///
/// # Example
///
/// ```ignore
/// #[weba::component]
/// impl Component for Button {
///     fn source() -> Source {
///         Source::html("<button></button>")
///     }
///
///     fn base(&self) -> &ComponentBase {
///         &self.base
///     }
///
///     #[tag]
///     fn button(&self, tag: &Tag) {
///         tag.set_string(self.label);
///     }
/// }
/// ```
pub fn component(args: TokenStream, input: TokenStream) -> TokenStream {
    if !args.is_empty() {
        let args = TokenStream2::from(args);
        return syn::Error::new(args.span(), "#[component] takes no arguments")
            .to_compile_error()
            .into();
    }
    let item = syn::parse_macro_input!(input as ItemImpl);
    expand(item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
