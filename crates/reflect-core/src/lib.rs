//! # Units, scopes, and the component tree
//!
//! `reflect-core` holds everything the binding layer in `reflect` talks to:
//!
//! - `Store<T>` / `Event<T>` / `Effect<T>`: reactive units.
//! - `Scope`: an isolated copy of the unit graph (`fork()`), plus
//!   `scope_bind` for running callbacks inside one.
//! - `Root` / `RenderCx` / `Component`: a retained component tree with
//!   remembered slots, keyed reconciliation, and mount/unmount effects.
//!
//! ## Units
//!
//! ```rust
//! use reflect_core::*;
//!
//! let renamed = Event::<String>::new();
//! let name = Store::new(String::new()).on(&renamed, |_, next| next.clone());
//!
//! renamed.emit("Ada".to_string());
//! assert_eq!(name.get(), "Ada");
//!
//! let scope = fork();
//! scope.emit(&renamed, "Grace".to_string());
//! assert_eq!(scope.get(&name), "Grace");
//! assert_eq!(name.get(), "Ada");
//! ```
//!
//! ## Components
//!
//! Components return a `Node`. Nested `Call`s become child instances that
//! keep their state between passes:
//!
//! ```rust
//! use reflect_core::*;
//!
//! let count = Store::new(0i64);
//! let counter = Component::from_fn("Counter", {
//!     let count = count.clone();
//!     move |cx, _props| {
//!         let value = cx.use_store(&count, &UnitConfig::default())?;
//!         Ok(Node::element("span", Props::new().with("value", value), vec![]))
//!     }
//! });
//!
//! let mut root = Root::new(counter);
//! root.render().unwrap();
//! count.set(3);
//! assert!(root.flush().unwrap());
//! assert_eq!(root.output().to_string(), "<span value=3/>");
//! ```
//!
//! Store watchers only mark the tree dirty; the host decides when to
//! `flush`.

pub mod effects;
pub mod error;
pub mod locals;
pub mod node;
pub mod owner;
pub mod props;
pub mod runtime;
pub mod scope;
pub mod unit;


pub use effects::*;
pub use error::{CoreError, Result};
pub use locals::*;
pub use node::*;
pub use owner::*;
pub use props::*;
pub use runtime::*;
pub use scope::*;
pub use unit::*;

pub use serde_json::{Value, json};
