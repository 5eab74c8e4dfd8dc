//! # Context locals
//!
//! Values provided to a subtree of the component tree, looked up by type.
//! Locals are threaded explicitly through the tree: a [`Node::provide`]
//! node attaches a frame to every component instance rendered beneath it,
//! and [`RenderCx::context`] walks up the instance chain, ending at the
//! root's frame.
//!
//! The ambient [`Scope`] travels this way:
//!
//! ```ignore
//! use reflect_core::*;
//!
//! let scope = fork();
//! let tree = Node::with_scope(scope, app.call(Props::new()).into());
//! ```
//!
//! [`Node::provide`]: crate::Node::provide
//! [`RenderCx::context`]: crate::RenderCx::context
//! [`Scope`]: crate::Scope

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

/// One frame of provided values, keyed by type.
#[derive(Clone, Default)]
pub struct Locals {
    values: HashMap<TypeId, Rc<dyn Any>>,
}

impl Locals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: 'static>(&mut self, value: T) {
        self.values.insert(TypeId::of::<T>(), Rc::new(value));
    }

    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Overlays `other` on top of this frame; `other` wins.
    pub fn merge(&mut self, other: &Locals) {
        for (ty, value) in &other.values {
            self.values.insert(*ty, value.clone());
        }
    }
}

impl std::fmt::Debug for Locals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Locals({})", self.values.len())
    }
}
