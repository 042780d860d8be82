//! Resolving display math through an external renderer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use smol_str::SmolStr;

use crate::RenderContext;
use crate::cache::{Artifact, RenderCache};
use crate::error::DelegateError;
use crate::request::{DelegateRequest, PendingResolution, RenderRequest};
use crate::substitute::substitute;
use crate::tracker::Ticket;
use crate::view::HostView;

/// Something that turns TeX into an artifact out of process.
///
/// The call is made when a resolution is dispatched, so implementations
/// should start their work eagerly and return a future that owns everything
/// it needs.
pub trait DelegatedRenderer: Send + Sync + 'static {
    fn render(
        &self,
        request: DelegateRequest,
    ) -> impl Future<Output = Result<String, DelegateError>> + Send + 'static;
}

#[derive(Debug)]
pub enum Outcome {
    Cached(Artifact),
    Rendered(Artifact),
    Failed(DelegateError),
}

/// A finished resolution, waiting to be applied on the session task.
#[derive(Debug)]
pub struct Resolution {
    pub id: SmolStr,
    pub request: RenderRequest,
    pub ticket: Ticket,
    /// Cache epoch at dispatch time.
    pub epoch: u64,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub struct DelegatedClient<D> {
    delegate: Arc<D>,
    timeout: Option<Duration>,
}

impl<D> Clone for DelegatedClient<D> {
    fn clone(&self) -> Self {
        Self {
            delegate: self.delegate.clone(),
            timeout: self.timeout,
        }
    }
}

impl<D: DelegatedRenderer> DelegatedClient<D> {
    pub fn new(delegate: Arc<D>) -> Self {
        Self {
            delegate,
            timeout: None,
        }
    }

    /// Give up on a delegated call after `timeout`; the region then counts
    /// as failed. `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start resolving one region. Cache hits still come back through the
    /// returned future, so the placeholder is always attached before it
    /// is substituted.
    pub fn dispatch(
        &self,
        pending: PendingResolution,
        cache: &RenderCache,
    ) -> BoxFuture<'static, Resolution> {
        let PendingResolution {
            id,
            request,
            ticket,
        } = pending;
        let epoch = cache.epoch();

        if let Some(artifact) = cache.get(&request.fingerprint()) {
            tracing::trace!(target: "glimpse::resolve", id = %id, "cache hit");
            return async move {
                Resolution {
                    id,
                    request,
                    ticket,
                    epoch,
                    outcome: Outcome::Cached(artifact),
                }
            }
            .boxed();
        }

        tracing::debug!(
            target: "glimpse::resolve",
            id = %id,
            tex = %request.expression_text,
            "dispatching to delegate"
        );
        let call = self
            .delegate
            .render(DelegateRequest::new(id.clone(), &request));
        let timeout = self.timeout;
        async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or_else(|_| Err(DelegateError::TimedOut(limit))),
                None => call.await,
            };
            let outcome = match result {
                Ok(markup) => Outcome::Rendered(Arc::from(markup)),
                Err(error) => Outcome::Failed(error),
            };
            Resolution {
                id,
                request,
                ticket,
                epoch,
                outcome,
            }
        }
        .boxed()
    }
}

/// Apply a finished resolution: substitute, then cache, then end its ticket.
///
/// The ticket is ended however this returns. Returns whether an artifact
/// made it into the view.
pub fn complete<V: HostView + ?Sized>(
    resolution: Resolution,
    ctx: &mut RenderContext,
    view: &mut V,
) -> bool {
    let Resolution {
        id,
        request,
        ticket,
        epoch,
        outcome,
    } = resolution;
    let RenderContext { cache, tracker, .. } = ctx;
    let _end = tracker.end_on_drop(ticket);

    match outcome {
        Outcome::Cached(artifact) => substitute(view, &id, artifact, request.display_mode),
        Outcome::Rendered(artifact) => {
            let substituted = substitute(view, &id, artifact.clone(), request.display_mode);
            if cache.epoch() == epoch {
                cache.set(request.fingerprint(), artifact);
            } else {
                tracing::debug!(
                    target: "glimpse::resolve",
                    id = %id,
                    "cache cleared since dispatch, not storing"
                );
            }
            substituted
        }
        Outcome::Failed(error) => {
            tracing::error!(
                target: "glimpse::resolve",
                id = %id,
                tex = %request.expression_text,
                %error,
                "delegated render failed"
            );
            false
        }
    }
}
