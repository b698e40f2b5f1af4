//! `noop` builder.

use async_trait::async_trait;
use devkit_architect::{
    BuildEvent, Builder, BuilderContext, CancellationToken, EventSink, ResolvedTarget, Result,
};

/// Builder id.
pub const BUILDER: &str = "@devkit/builders:noop";

/// Emits a single successful event.
#[derive(Debug)]
pub struct NoopBuilder {
    context: BuilderContext,
}

impl NoopBuilder {
    /// Create a builder bound to `context`.
    #[must_use]
    pub fn new(context: BuilderContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Builder for NoopBuilder {
    async fn run(&self, target: ResolvedTarget, sink: EventSink, _: CancellationToken) -> Result<()> {
        self.context
            .logger
            .debug(&format!("noop for {}", target.root.display()));
        sink.emit(BuildEvent::success());
        Ok(())
    }
}
