use crate::{Component, Error, Result, Tag};

/// Called with the matched tag once a binding resolves. A returned tag is
/// cached in place of the match.
pub type ResolveFn<C> = fn(&C, &Tag) -> Result<Option<Tag>>;

/// A named reference from a component to one node of its tree.
///
/// Usually generated by [`component`](crate::component) from `#[tag]` methods,
/// but can be written by hand:
///
/// ```
/// use weba::{Binding, Component, ComponentBase, Source};
///
/// struct Card {
///     base: ComponentBase,
/// }
///
/// impl Component for Card {
///     fn source() -> Source {
///         Source::html("<div><h2>Title</h2><p>Body</p></div>")
///     }
///
///     fn base(&self) -> &ComponentBase {
///         &self.base
///     }
///
///     fn bindings() -> Vec<Binding<Self>> {
///         vec![Binding::new("title").selector("h2"), Binding::new("body").selector("p")]
///     }
/// }
///
/// let ui = weba::Ui::new();
/// let card = ui.mount(Card { base: ComponentBase::new(&ui) }).now().unwrap();
/// card.tag("title").unwrap().set_string("Hello");
/// assert_eq!(card.to_html(), "<div><h2>Hello</h2><p>Body</p></div>");
/// ```
pub struct Binding<C> {
    name: &'static str,
    selector: Option<String>,
    extract: bool,
    clear: bool,
    root: bool,
    optional: bool,
    callback: Option<ResolveFn<C>>,
}

impl<C> Clone for Binding<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            selector: self.selector.clone(),
            extract: self.extract,
            clear: self.clear,
            root: self.root,
            optional: self.optional,
            callback: self.callback,
        }
    }
}

impl<C> std::fmt::Debug for Binding<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("extract", &self.extract)
            .field("clear", &self.clear)
            .field("root", &self.root)
            .field("optional", &self.optional)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl<C> Binding<C> {
    /// A binding to the component root, named `name`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            selector: None,
            extract: false,
            clear: false,
            root: false,
            optional: false,
            callback: None,
        }
    }

    /// Match with a CSS selector, or with a comment marker when it starts with `<!--`.
    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Detach the match from the tree.
    pub fn extract(mut self) -> Self {
        self.extract = true;
        self
    }

    /// Remove the match's children.
    pub fn clear(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Make the match the component root, dropping whatever enclosed it.
    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    /// Resolve to nothing instead of failing when nothing matches.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Run `callback` on the match once, when the binding resolves.
    pub fn on_resolve(mut self, callback: ResolveFn<C>) -> Self {
        self.callback = Some(callback);
        self
    }

    /// The accessor name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The selector, `None` for the root.
    pub fn selector_str(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    /// Whether the match is detached.
    pub fn is_extract(&self) -> bool {
        self.extract
    }

    /// Whether the match is emptied.
    pub fn is_clear(&self) -> bool {
        self.clear
    }

    /// Whether the match becomes the root.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// Whether a missing match is allowed.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// What a binding callback may return.
pub trait BindingOutput {
    /// The tag to cache in place of the match, if any.
    fn into_binding_output(self) -> Result<Option<Tag>>;
}

impl BindingOutput for () {
    fn into_binding_output(self) -> Result<Option<Tag>> {
        Ok(None)
    }
}

impl BindingOutput for Tag {
    fn into_binding_output(self) -> Result<Option<Tag>> {
        Ok(Some(self))
    }
}

impl BindingOutput for Option<Tag> {
    fn into_binding_output(self) -> Result<Option<Tag>> {
        Ok(self)
    }
}

impl BindingOutput for Result<()> {
    fn into_binding_output(self) -> Result<Option<Tag>> {
        self.map(|()| None)
    }
}

impl BindingOutput for Result<Tag> {
    fn into_binding_output(self) -> Result<Option<Tag>> {
        self.map(Some)
    }
}

impl BindingOutput for Result<Option<Tag>> {
    fn into_binding_output(self) -> Result<Option<Tag>> {
        self
    }
}

/// The unqualified type name of `C`, without generic arguments.
pub(crate) fn component_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    let path = full.split('<').next().unwrap_or(full);
    path.rsplit("::").next().unwrap_or(path)
}

fn is_comment_selector(selector: &str) -> bool {
    selector.trim_start().starts_with("<!--")
}

/// Check a set of bindings before anything is resolved.
pub(crate) fn validate<C>(bindings: &[Binding<C>]) -> Result<()> {
    let component = component_name::<C>();
    let roots = bindings.iter().filter(|binding| binding.root).count();
    if roots > 1 {
        return Err(Error::Configuration {
            component,
            reason: format!("{roots} bindings are marked as root; at most one is allowed"),
        });
    }
    for (index, binding) in bindings.iter().enumerate() {
        if bindings[..index].iter().any(|other| other.name == binding.name) {
            return Err(Error::Configuration {
                component,
                reason: format!("binding `{}` is declared twice", binding.name),
            });
        }
    }
    Ok(())
}

/// The first element matching `css`. A root binding also considers `root`
/// itself, which it becomes once promoted.
fn locate(root: &Tag, css: &str, include_root: bool) -> Result<Option<Tag>> {
    if include_root && root.is_element() && root.matches(css)? {
        return Ok(Some(root.clone()));
    }
    root.select_one(css)
}

/// Locate, transform and cache the node `binding` refers to.
///
/// Returns `None` only for an optional binding that matched nothing.
pub(crate) fn resolve<C: Component>(component: &C, binding: &Binding<C>) -> Result<Option<Tag>> {
    let base = component.base();
    let root = base.root();
    let found = match binding.selector.as_deref() {
        None => Some(root),
        Some(selector) if is_comment_selector(selector) => root.comment_one(selector)?,
        Some(selector) => locate(&root, selector, binding.root)?,
    };

    let Some(tag) = found else {
        if binding.optional {
            tracing::trace!(
                component = component_name::<C>(),
                binding = binding.name,
                "optional binding matched nothing"
            );
            return Ok(None);
        }
        return Err(Error::TagNotFound {
            selector: binding.selector.clone().unwrap_or_else(|| ":root".to_string()),
            component: component_name::<C>(),
        });
    };

    if binding.extract {
        tag.extract();
    }
    if binding.clear {
        tag.clear();
    }
    let tag = match binding.callback {
        Some(callback) => callback(component, &tag)?.unwrap_or(tag),
        None => tag,
    };
    if binding.root {
        base.promote_root(&tag)?;
    }
    tracing::trace!(
        component = component_name::<C>(),
        binding = binding.name,
        "binding resolved"
    );
    base.cache_binding(binding.name, tag.clone());
    Ok(Some(tag))
}
