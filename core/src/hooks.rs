//! Ordered before-request and after-response hooks.
//!
//! # Design
//! Hooks are a tagged variant registered once at construction. Before-hooks
//! observe the descriptor and their outcome is discarded. After-hooks fold
//! over the envelope, each receiving the previous hook's output.
//!
//! A hook must never fail a request. Every invocation runs under
//! `catch_unwind`; a panicking before-hook is skipped and a panicking
//! after-hook leaves the envelope as it was before that hook ran.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::http::{RequestDescriptor, ResponseEnvelope};

pub type BeforeRequestFn = Arc<dyn Fn(&RequestDescriptor) + Send + Sync>;
pub type AfterResponseFn = Arc<dyn Fn(ResponseEnvelope) -> ResponseEnvelope + Send + Sync>;

/// A function invoked at a fixed pipeline stage.
#[derive(Clone)]
pub enum Hook {
    BeforeRequest(BeforeRequestFn),
    AfterResponse(AfterResponseFn),
}

impl Hook {
    pub fn before_request(f: impl Fn(&RequestDescriptor) + Send + Sync + 'static) -> Self {
        Hook::BeforeRequest(Arc::new(f))
    }

    pub fn after_response(
        f: impl Fn(ResponseEnvelope) -> ResponseEnvelope + Send + Sync + 'static,
    ) -> Self {
        Hook::AfterResponse(Arc::new(f))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::BeforeRequest(_) => f.write_str("Hook::BeforeRequest"),
            Hook::AfterResponse(_) => f.write_str("Hook::AfterResponse"),
        }
    }
}

/// The two hook sequences, in insertion order.
#[derive(Clone, Default)]
pub struct HookPipeline {
    before: Vec<BeforeRequestFn>,
    after: Vec<AfterResponseFn>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Hook) {
        match hook {
            Hook::BeforeRequest(f) => self.before.push(f),
            Hook::AfterResponse(f) => self.after.push(f),
        }
    }

    pub fn before_len(&self) -> usize {
        self.before.len()
    }

    pub fn after_len(&self) -> usize {
        self.after.len()
    }

    /// Run every before-hook in order.
    pub fn run_before(&self, request: &RequestDescriptor) {
        for (index, hook) in self.before.iter().enumerate() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| hook(request))) {
                tracing::warn!(
                    stage = "before_request",
                    index,
                    reason = %panic_message(panic.as_ref()),
                    "hook failed; continuing"
                );
            }
        }
    }

    /// Fold the envelope through every after-hook in order.
    pub fn run_after(&self, mut envelope: ResponseEnvelope) -> ResponseEnvelope {
        for (index, hook) in self.after.iter().enumerate() {
            let input = envelope.clone();
            match catch_unwind(AssertUnwindSafe(|| hook(input))) {
                Ok(next) => envelope = next,
                Err(panic) => {
                    tracing::warn!(
                        stage = "after_response",
                        index,
                        reason = %panic_message(panic.as_ref()),
                        "hook failed; continuing"
                    );
                }
            }
        }
        envelope
    }
}

impl fmt::Debug for HookPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookPipeline")
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .finish()
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
