use std::cell::{Cell, RefCell};

use indexmap::IndexMap;
use weba_parser::Markup;

use crate::binding::{component_name, resolve};
use crate::{Binding, Error, Hook, Result, Source, Tag, Ui};

/// How far a component has progressed through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Constructed, not mounted yet.
    Created,
    /// The root exists and is attached to the parent context.
    Rooted,
    /// `before_render` has run.
    BeforeRender,
    /// Every declared binding has been resolved.
    Bound,
    /// `render` has run.
    Render,
    /// `after_render` has run; the component is complete.
    AfterRender,
}

/// The state every component carries: its root, its resolved bindings, the
/// [`Ui`] it belongs to and its [`Stage`].
#[derive(Debug)]
pub struct ComponentBase {
    root: RefCell<Tag>,
    bindings: RefCell<IndexMap<&'static str, Tag>>,
    ui: RefCell<Ui>,
    stage: Cell<Stage>,
}

impl ComponentBase {
    /// Fresh state for a component that will be mounted through `ui`.
    pub fn new(ui: &Ui) -> Self {
        Self {
            root: RefCell::new(Tag::fragment()),
            bindings: RefCell::new(IndexMap::new()),
            ui: RefCell::new(ui.clone()),
            stage: Cell::new(Stage::Created),
        }
    }

    /// The current root tag.
    pub fn root(&self) -> Tag {
        self.root.borrow().clone()
    }

    /// The context this component is mounted with.
    pub fn ui(&self) -> Ui {
        self.ui.borrow().clone()
    }

    /// The last completed lifecycle stage.
    pub fn stage(&self) -> Stage {
        self.stage.get()
    }

    pub(crate) fn set_ui(&self, ui: &Ui) {
        *self.ui.borrow_mut() = ui.clone();
    }

    pub(crate) fn set_stage(&self, stage: Stage) {
        self.stage.set(stage);
    }

    pub(crate) fn set_root(&self, root: Tag) {
        *self.root.borrow_mut() = root;
    }

    /// Make `tag` the root. An attached old root is replaced in place.
    pub(crate) fn replace_root(&self, tag: Tag) -> Result<()> {
        let old = self.root();
        if old.same_node(&tag) {
            return Ok(());
        }
        if old.parent().is_some() {
            old.replace_node(&tag)?;
        } else if old.is_inclusive_ancestor_of(&tag) {
            tag.extract();
        }
        self.set_root(tag);
        Ok(())
    }

    /// Make `tag`, usually a descendant, the root and drop the old wrapper.
    pub(crate) fn promote_root(&self, tag: &Tag) -> Result<()> {
        self.replace_root(tag.clone())
    }

    pub(crate) fn cached_binding(&self, name: &str) -> Option<Tag> {
        self.bindings.borrow().get(name).cloned()
    }

    pub(crate) fn cache_binding(&self, name: &'static str, tag: Tag) {
        self.bindings.borrow_mut().insert(name, tag);
    }

    pub(crate) fn clear_bindings(&self) {
        self.bindings.borrow_mut().clear();
    }
}

/// A reusable piece of markup with named bindings and lifecycle hooks.
///
/// Implement it on a struct that embeds a [`ComponentBase`], then build it
/// with [`Ui::mount`] or [`Ui::open`]. The [`component`](crate::component)
/// attribute generates [`Component::bindings`] and typed accessors from
/// `#[tag]` methods.
pub trait Component: Sized {
    /// How [`Component::source`] is parsed.
    const MARKUP: Markup = Markup::Html;

    /// The markup every instance starts from.
    fn source() -> Source;

    /// The embedded state.
    fn base(&self) -> &ComponentBase;

    /// Named references into the tree.
    fn bindings() -> Vec<Binding<Self>> {
        Vec::new()
    }

    /// Runs first, before bindings resolve.
    fn before_render(&mut self) -> Hook<'_> {
        Hook::skip()
    }

    /// Fills in the tree.
    fn render(&mut self) -> Hook<'_> {
        Hook::skip()
    }

    /// Runs last. For an opened component, at [`Scope::close`](crate::Scope::close).
    fn after_render(&mut self) -> Hook<'_> {
        Hook::skip()
    }

    /// The current root tag.
    fn root(&self) -> Tag {
        self.base().root()
    }

    /// The context this component was mounted with.
    fn ui(&self) -> Ui {
        self.base().ui()
    }

    /// The last completed lifecycle stage.
    fn stage(&self) -> Stage {
        self.base().stage()
    }

    /// The node bound as `name`, resolving it on first use.
    fn tag(&self, name: &str) -> Result<Tag> {
        let binding = find_binding::<Self>(name)?;
        self.try_tag(name)?.ok_or_else(|| Error::TagNotFound {
            selector: binding.selector_str().unwrap_or(":root").to_string(),
            component: component_name::<Self>(),
        })
    }

    /// Like [`Component::tag`], with `None` for an optional binding that matched nothing.
    fn try_tag(&self, name: &str) -> Result<Option<Tag>> {
        if let Some(tag) = self.base().cached_binding(name) {
            return Ok(Some(tag));
        }
        let binding = find_binding::<Self>(name)?;
        resolve(self, &binding)
    }

    /// Put `tag` where the node bound as `name` is, and bind `name` to it.
    fn set_tag(&self, name: &str, tag: Tag) -> Result<()> {
        let binding = find_binding::<Self>(name)?;
        let base = self.base();
        let current = self.try_tag(name)?;
        match current {
            Some(current) if current.same_node(&base.root()) => base.replace_root(tag.clone())?,
            Some(current) if current.parent().is_some() => {
                current.replace_node(&tag)?;
            }
            _ => {}
        }
        base.cache_binding(binding.name(), tag);
        Ok(())
    }

    /// Forget every resolved binding of this instance.
    fn clear_cache(&self) {
        self.base().clear_bindings();
    }

    /// The serialized root.
    fn to_html(&self) -> String {
        self.root().to_html()
    }
}

fn find_binding<C: Component>(name: &str) -> Result<Binding<C>> {
    C::bindings()
        .into_iter()
        .find(|binding| binding.name() == name)
        .ok_or_else(|| Error::Configuration {
            component: component_name::<C>(),
            reason: format!("no binding named `{name}`"),
        })
}

/// Resolve each declared binding that has not been resolved yet.
pub(crate) fn resolve_all<C: Component>(component: &C) -> Result<()> {
    for binding in C::bindings() {
        if component.base().cached_binding(binding.name()).is_none() {
            resolve(component, &binding)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::TemplateCache;

    struct Card {
        base: ComponentBase,
    }

    impl Component for Card {
        fn source() -> Source {
            Source::html("<div class=\"card\"><h2>Title</h2><p>Body</p></div>")
        }

        fn base(&self) -> &ComponentBase {
            &self.base
        }

        fn bindings() -> Vec<Binding<Self>> {
            vec![
                Binding::new("title").selector("h2"),
                Binding::new("footer").selector("footer").optional(),
                Binding::new("missing").selector("footer"),
            ]
        }
    }

    fn card() -> Card {
        let ui = Ui::with_cache(Arc::new(TemplateCache::new(0)));
        Card {
            base: ComponentBase::new(&ui),
        }
    }

    fn prepared() -> Card {
        let card = card();
        card.base.set_root(
            crate::Template::parse(&Card::source_text(), Markup::Html)
                .unwrap()
                .instantiate(),
        );
        card
    }

    impl Card {
        fn source_text() -> String {
            match Card::source() {
                Source::Html(markup) => markup.into_owned(),
                Source::File(_) => unreachable!(),
            }
        }
    }

    #[test]
    fn tags_resolve_lazily_and_cache() {
        let card = prepared();
        let title = card.tag("title").unwrap();
        assert!(title.same_node(&card.tag("title").unwrap()));
        card.clear_cache();
        assert!(title.same_node(&card.tag("title").unwrap()));
    }

    #[test]
    fn optional_bindings_may_be_absent() {
        let card = prepared();
        assert!(card.try_tag("footer").unwrap().is_none());
        assert!(matches!(
            card.tag("missing"),
            Err(Error::TagNotFound { component: "Card", .. })
        ));
    }

    #[test]
    fn unknown_names_are_configuration_errors() {
        let card = prepared();
        assert!(matches!(card.tag("nope"), Err(Error::Configuration { .. })));
    }

    #[test]
    fn set_tag_replaces_in_place() {
        let card = prepared();
        card.set_tag("title", Tag::element("h3").attr("id", "new")).unwrap();
        assert_eq!(card.tag("title").unwrap().name(), "h3");
        assert_eq!(
            card.to_html(),
            r#"<div class="card"><h3 id="new"></h3><p>Body</p></div>"#
        );
    }

    #[test]
    fn detached_root_replacement_extracts_descendants() {
        let card = prepared();
        let p = card.root().select_one("p").unwrap().unwrap();
        card.base.replace_root(p.clone()).unwrap();
        assert!(card.root().same_node(&p));
        assert!(p.parent().is_none());
    }

    #[test]
    fn fresh_bases_start_created() {
        assert_eq!(card().stage(), Stage::Created);
        assert_eq!(card().to_html(), "");
    }
}
