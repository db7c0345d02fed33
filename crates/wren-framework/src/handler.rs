//! Handler system for the Wren framework.
//!
//! A handler is any async function taking a [`Context`] and returning either
//! `()` or `Result<(), E>` where `E` converts into a [`BoxError`]:
//!
//! ```rust,ignore
//! async fn ping(ctx: Context) -> Result<(), BotError> {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! }
//!
//! let ping = handler("ping", ping).doc("answer with pong\n\nUsage: ping");
//! bot.add_command("ping", false, ping)?;
//! ```
//!
//! Registration calls take a [`HandlerRef`] and hand it back, so the same
//! handler can be chained through `add_command`, `learn` and `add_help`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use wren_core::BoxError;

use crate::context::Context;

// ============================================================================
// HandlerResponse - Normalize handler return values
// ============================================================================

/// Return types a handler may produce.
pub trait HandlerResponse: Send {
    fn into_result(self) -> Result<(), BoxError>;
}

impl HandlerResponse for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> HandlerResponse for Result<(), E>
where
    E: Into<BoxError> + Send,
{
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

// ============================================================================
// Handler Trait
// ============================================================================

/// The core trait for bot handlers.
///
/// Implemented for every `Fn(Context) -> impl Future<Output = R>` where `R`
/// implements [`HandlerResponse`].
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<(), BoxError>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: HandlerResponse + 'static,
{
    fn call(&self, ctx: Context) -> BoxFuture<'static, Result<(), BoxError>> {
        let fut = (self)(ctx);
        Box::pin(async move { fut.await.into_result() })
    }
}

// ============================================================================
// HandlerRef - Shared handler identity
// ============================================================================

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a handler, used to key help records and learned
/// phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

struct HandlerInner {
    id: HandlerId,
    name: String,
    doc: String,
    func: Box<dyn Handler>,
}

/// A named, shareable handler.
///
/// Cloning is cheap; clones share the same [`HandlerId`].
#[derive(Clone)]
pub struct HandlerRef(Arc<HandlerInner>);

impl HandlerRef {
    pub fn id(&self) -> HandlerId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The handler's documentation text (empty when none was given).
    pub fn doc(&self) -> &str {
        &self.0.doc
    }

    /// Calls the handler.
    pub fn call(&self, ctx: Context) -> BoxFuture<'static, Result<(), BoxError>> {
        self.0.func.call(ctx)
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRef")
            .field("id", &self.0.id)
            .field("name", &self.0.name)
            .finish()
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for HandlerRef {}

impl Hash for HandlerRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

/// Builder returned by [`handler`].
pub struct HandlerBuilder {
    name: String,
    doc: String,
    func: Box<dyn Handler>,
}

impl HandlerBuilder {
    /// Sets the documentation text. A line starting with `Usage: ` is used
    /// as the help usage string.
    pub fn doc(mut self, doc: impl Into<String>) -> HandlerRef {
        self.doc = doc.into();
        self.build()
    }

    pub fn build(self) -> HandlerRef {
        HandlerRef(Arc::new(HandlerInner {
            id: HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            doc: self.doc,
            func: self.func,
        }))
    }
}

impl From<HandlerBuilder> for HandlerRef {
    fn from(builder: HandlerBuilder) -> Self {
        builder.build()
    }
}

/// Wraps `f` into a named handler.
pub fn handler<H: Handler>(name: impl Into<String>, f: H) -> HandlerBuilder {
    HandlerBuilder {
        name: name.into(),
        doc: String::new(),
        func: Box::new(f),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn unit(_: Context) {}

    async fn fallible(_: Context) -> Result<(), std::io::Error> {
        Err(std::io::Error::other("boom"))
    }

    #[test]
    fn test_ids_are_unique_and_shared_by_clones() {
        let a = handler("a", unit).build();
        let b = handler("b", unit).doc("second");
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone(), a);
        assert_eq!(b.doc(), "second");
        assert_eq!(a.doc(), "");
    }

    #[tokio::test]
    async fn test_results_are_normalized() {
        let ok = handler("unit", unit).build();
        let err = handler("fallible", fallible).build();
        let ctx = Context::detached(crate::testing::MockEngine::bot());

        assert!(ok.call(ctx.clone()).await.is_ok());
        let e = err.call(ctx).await.unwrap_err();
        assert_eq!(e.to_string(), "boom");
    }
}
