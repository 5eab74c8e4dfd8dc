//! # Declarative prop binding
//!
//! `reflect` wraps a view component so its props come from reactive units
//! instead of the call site:
//!
//! - [`reflect`] / [`create_reflect`]: bind props to stores, events,
//!   callbacks, or static values.
//! - [`list`]: one bound view per element of a `Store<Vec<T>>`.
//! - [`variant`]: one of several bound views, chosen by a store.
//! - [`from_tag`]: a primitive element usable as a view.
//!
//! ## Binding a view
//!
//! ```ignore
//! use reflect::*;
//! use reflect_core::*;
//!
//! let changed = Event::<String>::new();
//! let name = Store::new(String::new()).on(&changed, |_, v| v.clone());
//!
//! let name_input = reflect(ReflectConfig::new(
//!     from_tag("input"),
//!     Bind::new()
//!         .with("value", name.clone())
//!         .with("placeholder", "Name")
//!         .with("on_change", changed.clone()),
//! ));
//! ```
//!
//! Entries are classified once, when the component is built: events and
//! effects become trigger handlers, stores are subscribed and read on every
//! render, plain callbacks are rebound to the ambient [`Scope`], and
//! anything else is passed through as is. Props given at the call site
//! override all of them.
//!
//! ## Scopes
//!
//! The ambient scope is provided through the tree with
//! [`Node::with_scope`] or [`Root::with_scope`]. Store reads, event
//! triggers, and bound callbacks all route to it, so two trees forked from
//! the same units never see each other's state. Without a scope everything
//! runs against the units' global state.
//!
//! ## Lifecycle hooks
//!
//! [`Hooks`] fire `mounted` once after an instance's first commit and
//! `unmounted` once when it is torn down. A unit hook is triggered in the
//! ambient scope like any bound event.
//!
//! [`Scope`]: reflect_core::Scope
//! [`Node::with_scope`]: reflect_core::Node::with_scope
//! [`Root::with_scope`]: reflect_core::Root::with_scope

pub mod bind;
pub mod functions;
pub mod hooks;
pub mod list;
pub mod reflect;
pub mod tag;
pub mod variant;

#[cfg(test)]
mod tests;

pub use bind::{Bind, Bindable, Classified, Func, classify, func};
pub use functions::bind_functions;
pub use hooks::{Hook, Hooks};
pub use list::{ListConfig, list};
pub use reflect::{Features, ReflectConfig, create_reflect, reflect};
pub use tag::from_tag;
pub use variant::{VariantConfig, variant};
