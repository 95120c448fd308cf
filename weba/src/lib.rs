#![warn(missing_docs)]
//! Server-side HTML built from nested, scoped context blocks.
//!
//! A [`Ui`] belongs to one task. Every element it creates is appended to
//! whatever tag is currently open, so the shape of the Rust code is the shape
//! of the document. [`Component`]s wrap a piece of markup, expose named
//! [`Binding`]s into it and fill it in through lifecycle hooks. Parsed
//! component sources are shared through a bounded [`TemplateCache`] sized by
//! the `WEBA_LRU_CACHE_SIZE` environment variable.
//!
//! # Example
//!
//! ```
//! use weba::{Component, ComponentBase, Hook, Source, Ui};
//!
//! struct Greeting {
//!     base: ComponentBase,
//!     name: &'static str,
//! }
//!
//! #[weba::component]
//! impl Component for Greeting {
//!     fn source() -> Source {
//!         Source::html("<div class=\"greeting\"><h1></h1></div>")
//!     }
//!
//!     fn base(&self) -> &ComponentBase {
//!         &self.base
//!     }
//!
//!     fn render(&mut self) -> Hook<'_> {
//!         Hook::ready(self.heading().map(|h1| h1.set_string(format!("Hello, {}!", self.name))))
//!     }
//!
//!     #[tag("h1")]
//!     fn heading(&self) {}
//! }
//!
//! let ui = Ui::new();
//! let page = ui.main(());
//! ui.within(&page, || ui.mount(Greeting { base: ComponentBase::new(&ui), name: "World" }).now())
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(
//!     page.to_html(),
//!     r#"<main><div class="greeting"><h1>Hello, World!</h1></div></main>"#
//! );
//! ```

mod attribute;
pub use attribute::{attribute_name, AttrValue, ClassList, IntoAttrValue};

mod binding;
pub use binding::{Binding, BindingOutput, ResolveFn};

mod cache;
pub use cache::{Source, TemplateCache};

mod component;
pub use component::{Component, ComponentBase, Stage};

mod config;
pub use config::{Config, CACHE_SIZE_VAR, DEFAULT_CACHE_SIZE};

mod content;
pub use content::{Content, Text, ToText};

mod context;
pub use context::{ContextGuard, ContextStack};

mod error;
pub use error::{Error, Result};

mod hook;
pub use hook::{Hook, HookFuture, IntoReplacement};

mod lifecycle;
pub use lifecycle::{Mount, Opening, Scope};

mod render;

mod tag;
pub use tag::{NodeKind, Tag};

mod template;
pub use template::Template;

mod ui;
pub use ui::{Ui, NON_VOID_TAGS, VOID_TAGS};

#[cfg(feature = "macros")]
pub use weba_macro::component;

pub use weba_parser::{Markup, ParseError, Selector, SelectorError};
