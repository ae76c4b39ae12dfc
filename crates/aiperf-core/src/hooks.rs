//! The lifecycle hook registry every service is built on.
//!
//! Grounded on `BaseService`'s `_hooks` dict and `@background_hook` /
//! `@on_start` / `@on_stop` decorators in the reference implementation:
//! a service registers zero or more async callbacks against each
//! [`HookKind`], and the service runtime runs all hooks of a kind, in
//! registration order, at the matching lifecycle transition.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::AIPerfResult;

/// The lifecycle point a hook is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Run once, before the service announces `Ready`.
    Init,
    /// Run once, on transition into `Running`.
    Start,
    /// Run once, on transition into `Stopping`, before the bus is torn down.
    Stop,
    /// Spawned as a background task for the lifetime of `Running`; the
    /// service cancels it on `Stop`.
    Background,
}

type HookFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = AIPerfResult<()>> + Send>> + Send + Sync>;

/// Ordered, per-kind collection of hook callbacks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<HookKind, Vec<HookFn>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `f` to run at `kind`. Hooks of the same kind run in the
    /// order they were registered.
    pub fn register<F, Fut>(&mut self, kind: HookKind, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AIPerfResult<()>> + Send + 'static,
    {
        self.hooks
            .entry(kind)
            .or_default()
            .push(Arc::new(move || Box::pin(f())));
    }

    /// Runs every hook registered for `kind`, in order, stopping at and
    /// propagating the first error.
    pub async fn run(&self, kind: HookKind) -> AIPerfResult<()> {
        if let Some(fns) = self.hooks.get(&kind) {
            for f in fns {
                f().await?;
            }
        }
        Ok(())
    }

    pub fn count(&self, kind: HookKind) -> usize {
        self.hooks.get(&kind).map(|v| v.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn hooks_run_in_registration_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = HookRegistry::new();

        let o1 = order.clone();
        registry.register(HookKind::Init, move || {
            let o1 = o1.clone();
            async move {
                o1.lock().unwrap().push(1);
                Ok(())
            }
        });
        let o2 = order.clone();
        registry.register(HookKind::Init, move || {
            let o2 = o2.clone();
            async move {
                o2.lock().unwrap().push(2);
                Ok(())
            }
        });

        registry.run(HookKind::Init).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn unused_kind_runs_as_noop() {
        let registry = HookRegistry::new();
        registry.run(HookKind::Stop).await.unwrap();
    }

    #[test]
    fn count_reflects_registrations() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = HookRegistry::new();
        let c = counter.clone();
        registry.register(HookKind::Background, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        assert_eq!(registry.count(HookKind::Background), 1);
        assert_eq!(registry.count(HookKind::Start), 0);
    }
}
