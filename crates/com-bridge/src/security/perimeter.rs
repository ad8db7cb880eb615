//! Per-context security perimeter flags

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// Identifier of a calling context (apartment or process-side context)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ContextId(pub u64);

impl ContextId {
    /// Allocate a new context id, unique within this process
    pub fn generate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CTX({})", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accessor pair for a context's perimeter flag
///
/// The flag only records whether cross-context calls are permitted; callers
/// enforce the policy.
pub trait SecurityPerimeter: Send + Sync {
    fn get_perimeter_flag(&self) -> bool;
    fn set_perimeter_flag(&self, flag: bool);
}

/// Perimeter flag of one context
#[derive(Debug)]
pub struct ContextSecurityPerimeter {
    context: ContextId,
    flag: AtomicBool,
}

impl ContextSecurityPerimeter {
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            flag: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }
}

impl SecurityPerimeter for ContextSecurityPerimeter {
    fn get_perimeter_flag(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set_perimeter_flag(&self, flag: bool) {
        let previous = self.flag.swap(flag, Ordering::SeqCst);
        if previous != flag {
            debug!(context = %self.context, flag, "perimeter flag changed");
        }
    }
}

/// Registry handing out one perimeter per context
#[derive(Default)]
pub struct PerimeterRegistry {
    contexts: RwLock<HashMap<ContextId, Arc<ContextSecurityPerimeter>>>,
}

impl PerimeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perimeter for a context, created with the flag cleared on first use
    pub fn perimeter(&self, context: ContextId) -> Arc<ContextSecurityPerimeter> {
        if let Some(perimeter) = self.contexts.read().get(&context) {
            return perimeter.clone();
        }
        self.contexts
            .write()
            .entry(context)
            .or_insert_with(|| Arc::new(ContextSecurityPerimeter::new(context)))
            .clone()
    }

    /// Current flag of a context; unknown contexts are outside the perimeter
    pub fn is_permitted(&self, context: ContextId) -> bool {
        self.contexts
            .read()
            .get(&context)
            .map(|p| p.get_perimeter_flag())
            .unwrap_or(false)
    }

    /// Forget a context
    pub fn remove(&self, context: ContextId) -> bool {
        self.contexts.write().remove(&context).is_some()
    }

    pub fn len(&self) -> usize {
        self.contexts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
