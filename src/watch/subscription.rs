// src/watch/subscription.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;
use crate::pipeline::{CompilationPipeline, PathSpec};

/// Boxed future returned by a subscription's invocation callback.
pub type InvocationFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type Invoke = Arc<dyn Fn() -> InvocationFuture + Send + Sync>;

/// A [`PathSpec`] bound to the work to redo when a matching file changes.
#[derive(Clone)]
pub struct WatchSubscription {
    name: String,
    spec: PathSpec,
    invoke: Invoke,
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl WatchSubscription {
    pub fn new<F, Fut>(name: impl Into<String>, spec: PathSpec, invoke: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            spec,
            invoke: Arc::new(move || Box::pin(invoke()) as InvocationFuture),
        }
    }

    /// Re-run `pipeline` whenever a file matched by `spec` changes.
    ///
    /// `spec` may be wider than the pipeline's own inputs (stylesheet
    /// partials trigger a rebuild without being compiled themselves).
    pub fn for_pipeline(spec: PathSpec, pipeline: CompilationPipeline) -> Self {
        let name = pipeline.name().to_string();
        let pipeline = Arc::new(pipeline);
        Self::new(name, spec, move || {
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.compile().await.map(|_report| ()) }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.spec.matches(rel_path)
    }

    pub(crate) fn invoke(&self) -> InvocationFuture {
        (self.invoke)()
    }
}
