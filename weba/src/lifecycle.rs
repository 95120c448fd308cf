//! Driving components through their lifecycle.
//!
//! Every entry point shares one sequence of phases; `now()` runs it without
//! awaiting and rejects suspending hooks, `.await` runs the same sequence
//! awaiting each hook in turn.

use std::future::{Future, IntoFuture};
use std::ops::{Deref, DerefMut};
use std::pin::Pin;

use crate::binding::{component_name, resolve, validate};
use crate::component::resolve_all;
use crate::{Component, ContextGuard, Error, Hook, NodeKind, Result, Stage, Tag, Ui};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    BeforeRender,
    Bind,
    Render,
    AfterRender,
}

impl Phase {
    fn hook_name(self) -> &'static str {
        match self {
            Phase::BeforeRender => "before_render",
            Phase::Bind => "bindings",
            Phase::Render => "render",
            Phase::AfterRender => "after_render",
        }
    }

    fn stage(self) -> Stage {
        match self {
            Phase::BeforeRender => Stage::BeforeRender,
            Phase::Bind => Stage::Bound,
            Phase::Render => Stage::Render,
            Phase::AfterRender => Stage::AfterRender,
        }
    }
}

const MOUNT_PHASES: &[Phase] = &[
    Phase::BeforeRender,
    Phase::Bind,
    Phase::Render,
    Phase::AfterRender,
];
const OPEN_PHASES: &[Phase] = &[Phase::BeforeRender, Phase::Bind, Phase::Render];
const CLOSE_PHASES: &[Phase] = &[Phase::AfterRender];

/// Build the root from the cached template, settle the root binding and
/// attach the root to whatever was open when mounting began, which is returned.
fn prepare<C: Component>(ui: &Ui, component: &C) -> Result<Option<Tag>> {
    let name = component_name::<C>();
    let parent = ui.current();
    let base = component.base();
    base.set_ui(ui);

    let template = ui.cache().get_or_parse(&C::source(), C::MARKUP, name)?;
    base.clear_bindings();
    base.set_root(template.instantiate());

    let bindings = C::bindings();
    validate(&bindings)?;
    if let Some(root) = bindings.iter().find(|binding| binding.is_root()) {
        resolve(component, root)?;
    }
    base.set_stage(Stage::Rooted);
    tracing::trace!(component = name, "root ready");

    if let Some(parent) = &parent {
        let root = component.root();
        check_embeddable::<C>(&root, parent)?;
        parent.adopt(root);
    }
    Ok(parent)
}

/// Only a single node can be mounted into an open tag; a fragment root would
/// hide its children behind one invisible child of `parent`.
fn check_embeddable<C: Component>(root: &Tag, parent: &Tag) -> Result<()> {
    if root.kind() != NodeKind::Fragment {
        return Ok(());
    }
    Err(Error::Configuration {
        component: component_name::<C>(),
        reason: format!(
            "a source with {} top-level nodes cannot be mounted inside <{}>; \
             wrap it in one element or bind a root",
            root.contents_len(),
            parent.name()
        ),
    })
}

/// Take a failed component's root back out of `parent`.
fn detach<C: Component>(component: &C, parent: Option<&Tag>) {
    let root = component.root();
    let attached = matches!(
        (root.parent(), parent),
        (Some(current), Some(parent)) if current.same_node(parent)
    );
    if attached {
        root.extract();
        tracing::trace!(component = component_name::<C>(), "failed root detached");
    }
}

/// Pass `result` through, detaching the root first when it failed.
fn settle<C: Component, T>(component: &C, parent: Option<&Tag>, result: Result<T>) -> Result<T> {
    if result.is_err() {
        detach(component, parent);
    }
    result
}

fn start<C: Component>(component: &mut C, phase: Phase) -> Hook<'_> {
    match phase {
        Phase::BeforeRender => component.before_render(),
        Phase::Bind => Hook::ready(resolve_all(&*component)),
        Phase::Render => component.render(),
        Phase::AfterRender => component.after_render(),
    }
}

fn finish<C: Component>(component: &C, phase: Phase, outcome: Result<Option<Tag>>) -> Result<()> {
    let base = component.base();
    if let Some(replacement) = outcome? {
        if let Some(parent) = base.root().parent() {
            check_embeddable::<C>(&replacement, &parent)?;
        }
        base.replace_root(replacement)?;
    }
    base.set_stage(phase.stage());
    tracing::trace!(
        component = component_name::<C>(),
        hook = phase.hook_name(),
        "stage complete"
    );
    Ok(())
}

fn run_now<C: Component>(component: &mut C, phases: &[Phase]) -> Result<()> {
    for &phase in phases {
        let outcome = match start(component, phase) {
            Hook::Ready(outcome) => outcome,
            Hook::Pending(_) => {
                return Err(Error::AsyncHook {
                    component: component_name::<C>(),
                    hook: phase.hook_name(),
                })
            }
        };
        finish(component, phase, outcome)?;
    }
    Ok(())
}

async fn run_async<C: Component>(component: &mut C, phases: &[Phase]) -> Result<()> {
    for &phase in phases {
        let outcome = start(component, phase).resolve().await;
        finish(component, phase, outcome)?;
    }
    Ok(())
}

impl Ui {
    /// Build `component` completely. Finish with `.now()` or `.await`.
    pub fn mount<C: Component>(&self, component: C) -> Mount<C> {
        Mount {
            ui: self.clone(),
            component,
        }
    }

    /// Build `component` up to `render` and keep its root open for further
    /// children. Finish with `.now()` or `.await`, then close the [`Scope`].
    pub fn open<C: Component>(&self, component: C) -> Opening<C> {
        Opening {
            ui: self.clone(),
            component,
        }
    }
}

/// A component waiting to be built by [`Ui::mount`].
#[must_use = "nothing is built until `now()` is called or the mount is awaited"]
pub struct Mount<C> {
    ui: Ui,
    component: C,
}

impl<C: Component> Mount<C> {
    /// Build without awaiting.
    ///
    /// Fails with [`Error::AsyncHook`] as soon as a hook suspends; its future
    /// is dropped without being polled.
    pub fn now(self) -> Result<C> {
        let Mount { ui, mut component } = self;
        let parent = prepare(&ui, &component)?;
        let outcome = run_now(&mut component, MOUNT_PHASES);
        settle(&component, parent.as_ref(), outcome)?;
        Ok(component)
    }

    /// Build, awaiting asynchronous hooks.
    pub async fn run(self) -> Result<C> {
        let Mount { ui, mut component } = self;
        let parent = prepare(&ui, &component)?;
        let outcome = run_async(&mut component, MOUNT_PHASES).await;
        settle(&component, parent.as_ref(), outcome)?;
        Ok(component)
    }
}

impl<C: Component + 'static> IntoFuture for Mount<C> {
    type Output = Result<C>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<C>>>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

/// A component waiting to be opened by [`Ui::open`].
#[must_use = "nothing is built until `now()` is called or the opening is awaited"]
pub struct Opening<C> {
    ui: Ui,
    component: C,
}

impl<C: Component> Opening<C> {
    /// Build up to `render` without awaiting, then open the root.
    pub fn now(self) -> Result<Scope<C>> {
        let Opening { ui, mut component } = self;
        let parent = prepare(&ui, &component)?;
        let outcome = run_now(&mut component, OPEN_PHASES);
        settle(&component, parent.as_ref(), outcome)?;
        Scope::enter(&ui, component, parent.as_ref())
    }

    /// Build up to `render`, awaiting asynchronous hooks, then open the root.
    pub async fn run(self) -> Result<Scope<C>> {
        let Opening { ui, mut component } = self;
        let parent = prepare(&ui, &component)?;
        let outcome = run_async(&mut component, OPEN_PHASES).await;
        settle(&component, parent.as_ref(), outcome)?;
        Scope::enter(&ui, component, parent.as_ref())
    }
}

impl<C: Component + 'static> IntoFuture for Opening<C> {
    type Output = Result<Scope<C>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<Scope<C>>>>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}

/// Warns when a scope goes away without `after_render` having run.
struct CloseCheck {
    component: &'static str,
    armed: bool,
}

impl Drop for CloseCheck {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(
                component = self.component,
                "scope dropped without close(); after_render skipped"
            );
        }
    }
}

/// An opened component whose root receives everything built while it lives.
///
/// Derefs to the component. Call [`Scope::close`] or [`Scope::close_async`]
/// to run `after_render` and get the component back; dropping the scope
/// closes the root without it.
pub struct Scope<C: Component> {
    component: C,
    parent: Option<Tag>,
    guard: ContextGuard,
    check: CloseCheck,
}

impl<C: Component> Scope<C> {
    fn enter(ui: &Ui, component: C, parent: Option<&Tag>) -> Result<Self> {
        let guard = settle(&component, parent, ui.enter(&component.root()))?;
        Ok(Self {
            component,
            parent: parent.cloned(),
            guard,
            check: CloseCheck {
                component: component_name::<C>(),
                armed: true,
            },
        })
    }

    /// Run `after_render` with the root still open, then close it.
    ///
    /// A failing `after_render` takes the root back out of the enclosing tag.
    pub fn close(self) -> Result<C> {
        let Scope {
            mut component,
            parent,
            guard,
            mut check,
        } = self;
        check.armed = false;
        let outcome = run_now(&mut component, CLOSE_PHASES);
        drop(guard);
        settle(&component, parent.as_ref(), outcome)?;
        Ok(component)
    }

    /// Like [`Scope::close`], awaiting an asynchronous `after_render`.
    pub async fn close_async(self) -> Result<C> {
        let Scope {
            mut component,
            parent,
            guard,
            mut check,
        } = self;
        check.armed = false;
        let outcome = run_async(&mut component, CLOSE_PHASES).await;
        drop(guard);
        settle(&component, parent.as_ref(), outcome)?;
        Ok(component)
    }
}

impl<C: Component> Deref for Scope<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.component
    }
}

impl<C: Component> DerefMut for Scope<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.component
    }
}

impl<C: Component + std::fmt::Debug> std::fmt::Debug for Scope<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("component", &self.component)
            .field("open", &self.guard.tag())
            .finish()
    }
}
