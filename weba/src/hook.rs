use std::future::Future;
use std::pin::Pin;

use crate::{Result, Tag};

/// A future returned by an asynchronous hook.
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<Option<Tag>>> + 'a>>;

/// The outcome of a lifecycle hook.
///
/// A hook that produces `Some(tag)` replaces the component root with `tag`.
///
/// ```
/// use weba::{Hook, Tag};
///
/// fn sync_hook() -> Hook<'static> {
///     Hook::replace(Tag::element("h1"))
/// }
///
/// fn async_hook<'a>() -> Hook<'a> {
///     Hook::suspend(async { Ok(()) })
/// }
/// # let _ = (sync_hook(), async_hook());
/// ```
pub enum Hook<'a> {
    /// Finished without suspending.
    Ready(Result<Option<Tag>>),
    /// Must be awaited; only the async drivers accept this.
    Pending(HookFuture<'a>),
}

impl<'a> Hook<'a> {
    /// Nothing to do.
    pub fn skip() -> Self {
        Hook::Ready(Ok(None))
    }

    /// Replace the root with `tag`.
    pub fn replace(tag: Tag) -> Self {
        Hook::Ready(Ok(Some(tag)))
    }

    /// Finished with `result`.
    pub fn ready<T: IntoReplacement>(result: Result<T>) -> Self {
        Hook::Ready(result.map(IntoReplacement::into_replacement))
    }

    /// Await `future` before moving on.
    pub fn suspend<F, T>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + 'a,
        T: IntoReplacement,
    {
        Hook::Pending(Box::pin(async move {
            future.await.map(IntoReplacement::into_replacement)
        }))
    }

    /// Whether awaiting is needed.
    pub fn is_pending(&self) -> bool {
        matches!(self, Hook::Pending(_))
    }

    /// Wait for the outcome.
    pub async fn resolve(self) -> Result<Option<Tag>> {
        match self {
            Hook::Ready(outcome) => outcome,
            Hook::Pending(future) => future.await,
        }
    }
}

impl std::fmt::Debug for Hook<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Hook::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            Hook::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

/// What a hook may finish with: nothing, or a new root.
pub trait IntoReplacement {
    /// The replacement root, if any.
    fn into_replacement(self) -> Option<Tag>;
}

impl IntoReplacement for () {
    fn into_replacement(self) -> Option<Tag> {
        None
    }
}

impl IntoReplacement for Tag {
    fn into_replacement(self) -> Option<Tag> {
        Some(self)
    }
}

impl IntoReplacement for Option<Tag> {
    fn into_replacement(self) -> Option<Tag> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_hooks_are_not_pending() {
        assert!(!Hook::skip().is_pending());
        assert!(!Hook::ready(Ok(())).is_pending());
        assert!(Hook::suspend(async { Ok(()) }).is_pending());
    }

    #[tokio::test]
    async fn resolve_awaits_suspended_work() {
        let outcome = Hook::suspend(async {
            tokio::task::yield_now().await;
            Ok(Tag::element("p"))
        })
        .resolve()
        .await
        .unwrap();
        assert_eq!(outcome.unwrap().name(), "p");
    }
}
