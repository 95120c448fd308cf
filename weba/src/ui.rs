//! The per-task factory for building trees with scoped context blocks.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use weba_parser::Markup;

use crate::context::{ContextGuard, ContextStack};
use crate::tag::flatten;
use crate::{Content, Error, NodeKind, Result, Tag, Template, TemplateCache, ToText};

struct UiInner {
    stack: Rc<ContextStack>,
    cache: Arc<TemplateCache>,
    markup: Cell<Markup>,
}

/// Builds tags and appends each one to whatever tag is currently open.
///
/// A `Ui` belongs to one task (one request, say). It is cheap to clone; clones
/// share the same context stack. It is not `Send`, so concurrent tasks each
/// create their own and can never see each other's open tags.
///
/// # Example
///
/// ```
/// use weba::Ui;
///
/// let ui = Ui::new();
/// let list = ui.ul(());
/// ui.within(&list, || {
///     ui.li("one");
///     ui.li("two").attr("class_", "last");
/// })
/// .unwrap();
/// assert_eq!(list.to_html(), r#"<ul><li>one</li><li class="last">two</li></ul>"#);
/// ```
#[derive(Clone)]
pub struct Ui {
    inner: Rc<UiInner>,
}

impl Default for Ui {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ui")
            .field("depth", &self.inner.stack.depth())
            .field("markup", &self.inner.markup.get())
            .finish_non_exhaustive()
    }
}

impl Ui {
    /// A fresh context using the global [`TemplateCache`].
    pub fn new() -> Self {
        Self::with_cache(TemplateCache::global())
    }

    /// A fresh context using `cache` for component templates.
    pub fn with_cache(cache: Arc<TemplateCache>) -> Self {
        Self {
            inner: Rc::new(UiInner {
                stack: Rc::new(ContextStack::new()),
                cache,
                markup: Cell::new(Markup::Html),
            }),
        }
    }

    /// The context stack of this task.
    pub fn stack(&self) -> &ContextStack {
        &self.inner.stack
    }

    /// The template cache components are loaded through.
    pub fn cache(&self) -> &Arc<TemplateCache> {
        &self.inner.cache
    }

    /// The markup [`Ui::raw`] parses with.
    pub fn markup(&self) -> Markup {
        self.inner.markup.get()
    }

    /// Change the markup [`Ui::raw`] parses with.
    pub fn set_markup(&self, markup: Markup) {
        self.inner.markup.set(markup);
    }

    /// The tag new nodes are appended to.
    pub fn current(&self) -> Option<Tag> {
        self.inner.stack.current()
    }

    /// Whether `self` and `other` share a context stack.
    pub fn same_context(&self, other: &Ui) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Open `tag` until the returned guard is dropped.
    pub fn enter(&self, tag: &Tag) -> Result<ContextGuard> {
        ContextGuard::open(self.inner.stack.clone(), tag)
    }

    /// Run `f` with `tag` open.
    pub fn within<R>(&self, tag: &Tag, f: impl FnOnce() -> R) -> Result<R> {
        let _guard = self.enter(tag)?;
        Ok(f())
    }

    /// Stop auto-appending until the returned guard is dropped.
    pub fn no_context(&self) -> ContextGuard {
        ContextGuard::suppress(self.inner.stack.clone())
    }

    /// Append `node` to the current tag, if any, and hand it back.
    ///
    /// An attached fragment is spliced into the current tag and its first node
    /// is returned, with the rest following as siblings.
    pub(crate) fn attach(&self, node: Tag) -> Tag {
        let Some(parent) = self.current() else {
            return node;
        };
        if node.kind() != NodeKind::Fragment {
            parent.adopt(node.clone());
            return node;
        }
        let roots = flatten(vec![node.clone()]);
        for root in &roots {
            parent.adopt(root.clone());
        }
        roots.into_iter().next().unwrap_or(node)
    }

    /// An element named `name` holding `content`.
    pub fn tag(&self, name: &str, content: impl Content) -> Tag {
        let tag = Tag::element(name);
        for child in flatten(content.into_nodes()) {
            tag.adopt(child);
        }
        self.attach(tag)
    }

    fn void_tag(&self, name: &str) -> Tag {
        self.attach(Tag::element(name))
    }

    /// Parse `markup` with this context's default markup.
    pub fn raw(&self, markup: &str) -> Result<Tag> {
        self.raw_with(markup, self.markup())
    }

    /// Parse `source` as `markup`.
    ///
    /// Whitespace-only top-level text is dropped. One remaining node is returned
    /// directly. Several come back inside an invisible fragment when nothing is
    /// open; otherwise they are appended to the open tag as siblings and the
    /// first is returned. Input with no nodes at all becomes a text node.
    pub fn raw_with(&self, source: &str, markup: Markup) -> Result<Tag> {
        let template = Template::parse(source, markup).map_err(|err| Error::Parse {
            source_name: "raw markup".to_string(),
            source: err,
        })?;
        let has_nodes = template.nodes().iter().any(|node| !node.is_blank_text());
        let node = if has_nodes {
            template.instantiate()
        } else {
            Tag::new_text(source)
        };
        Ok(self.attach(node))
    }

    /// A text node holding the canonical string form of `value`.
    pub fn text(&self, value: impl ToText) -> Tag {
        self.attach(Tag::new_text(value.to_text()))
    }

    /// A comment node.
    pub fn comment(&self, text: impl Into<String>) -> Tag {
        self.attach(Tag::new_comment(text))
    }

    /// A doctype node, e.g. `ui.doctype("html")`.
    pub fn doctype(&self, text: impl Into<String>) -> Tag {
        self.attach(Tag::doctype(text))
    }
}

macro_rules! non_void_builders {
    ($($tag_ident:ident),*) => {
        impl Ui {
            $(
                #[doc = concat!("Create a `<", stringify!($tag_ident), ">` element holding `content` and append it to the current tag.")]
                pub fn $tag_ident(&self, content: impl Content) -> Tag {
                    self.tag(stringify!($tag_ident), content)
                }
            )*
        }
        /// Every element with a factory method that takes content.
        pub const NON_VOID_TAGS: &[&str] = &[$(stringify!($tag_ident)),*];
    };
}
non_void_builders! {
    html, head, title, style, script, noscript, body, main, header, footer, nav,
    section, article, aside, address, h1, h2, h3, h4, h5, h6, hgroup,
    div, p, pre, blockquote, figure, figcaption, ol, ul, li, dl, dt, dd, menu,
    a, abbr, b, bdi, bdo, cite, code, data, dfn, em, i, kbd, mark, q, s, samp,
    small, span, strong, sub, sup, time, u, var, del, ins,
    table, caption, colgroup, thead, tbody, tfoot, tr, td, th,
    form, fieldset, legend, label, button, select, datalist, optgroup, option,
    textarea, output, progress, meter, details, summary, dialog, template, slot,
    iframe, object, picture, video, audio, canvas, map, svg
}

macro_rules! void_builders {
    ($($tag_ident:ident),*) => {
        impl Ui {
            $(
                #[doc = concat!("Create a void `<", stringify!($tag_ident), ">` element and append it to the current tag.")]
                pub fn $tag_ident(&self) -> Tag {
                    self.void_tag(stringify!($tag_ident))
                }
            )*
        }
        /// Every element with a factory method that takes no content.
        pub const VOID_TAGS: &[&str] = &[$(stringify!($tag_ident)),*];
    };
}
void_builders! {
    area, base, br, col, embed, hr, img, input, link, meta,
    param, source, track, wbr
}
