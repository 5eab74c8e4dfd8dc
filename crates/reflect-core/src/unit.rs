//! Reactive units: stores hold a value, events carry a payload, effects run
//! a handler and report through their `done` event.
//!
//! Every unit can be used outside any scope or inside a forked [`Scope`].
//! Store state and store watchers are isolated per scope; reactions attached
//! with [`Store::on`] run in whichever scope the event was emitted in.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::effects::Dispose;
use crate::error::{CoreError, Result};
use crate::scope::{Scope, current_scope};

pub type UnitId = u64;

thread_local! {
    static NEXT_UNIT: Cell<UnitId> = const { Cell::new(1) };
}

fn next_unit_id() -> UnitId {
    NEXT_UNIT.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

new_key_type! {
    pub(crate) struct WatchKey;
}

/// Callback registry with removable entries.
pub(crate) struct Registry<F: ?Sized>(Rc<RefCell<SlotMap<WatchKey, Rc<F>>>>);

pub(crate) type Watchers = Registry<dyn Fn()>;
type Reactions<T> = Registry<dyn Fn(Option<&Scope>, &T)>;

impl<F: ?Sized> Clone for Registry<F> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<F: ?Sized> Default for Registry<F> {
    fn default() -> Self {
        Self(Rc::new(RefCell::new(SlotMap::with_key())))
    }
}

impl<F: ?Sized + 'static> Registry<F> {
    pub(crate) fn add(&self, f: Rc<F>) -> Subscription {
        let key = self.0.borrow_mut().insert(f);
        let registry = Rc::downgrade(&self.0);
        Subscription(Dispose::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().remove(key);
            }
        }))
    }

    /// Visits every entry. Entries removed by an earlier callback are skipped.
    pub(crate) fn for_each(&self, mut f: impl FnMut(&F)) {
        let snapshot: SmallVec<[(WatchKey, Rc<F>); 4]> = self
            .0
            .borrow()
            .iter()
            .map(|(key, entry)| (key, entry.clone()))
            .collect();
        for (key, entry) in snapshot {
            if self.0.borrow().contains_key(key) {
                f(&entry);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

/// Handle to a registered watcher. Unsubscribing is idempotent.
#[derive(Clone, Debug)]
pub struct Subscription(Dispose);

impl Subscription {
    pub fn unsubscribe(&self) {
        self.0.run()
    }

    pub fn is_active(&self) -> bool {
        !self.0.is_spent()
    }
}

impl From<Subscription> for Dispose {
    fn from(sub: Subscription) -> Self {
        sub.0
    }
}

// Store

pub struct Store<T: 'static> {
    inner: Rc<StoreInner<T>>,
}

struct StoreInner<T> {
    id: UnitId,
    name: String,
    default: T,
    state: RefCell<T>,
    watchers: Watchers,
}

impl<T> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Store({}#{})", self.inner.name, self.inner.id)
    }
}

impl<T: Clone + PartialEq + 'static> Store<T> {
    pub fn new(value: T) -> Self {
        let id = next_unit_id();
        Self::build(id, format!("store#{id}"), value)
    }

    pub fn named(name: impl Into<String>, value: T) -> Self {
        Self::build(next_unit_id(), name.into(), value)
    }

    fn build(id: UnitId, name: String, value: T) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                id,
                name,
                default: value.clone(),
                state: RefCell::new(value),
                watchers: Watchers::default(),
            }),
        }
    }

    pub fn id(&self) -> UnitId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Reads the value in the running scope, if any.
    pub fn get(&self) -> T {
        self.get_in(current_scope().as_ref())
    }

    /// A scope that never wrote this store reads its default.
    pub fn get_in(&self, scope: Option<&Scope>) -> T {
        match scope {
            Some(scope) => scope
                .read::<T>(self.inner.id)
                .unwrap_or_else(|| self.inner.default.clone()),
            None => self.inner.state.borrow().clone(),
        }
    }

    pub fn set(&self, value: T) {
        self.set_in(current_scope().as_ref(), value)
    }

    /// Writes and notifies watchers of that scope. Equal writes are dropped.
    pub fn set_in(&self, scope: Option<&Scope>, value: T) {
        if self.get_in(scope) == value {
            return;
        }
        match scope {
            Some(scope) => {
                scope.write(self.inner.id, value);
                scope.watchers(self.inner.id).for_each(|f| f());
            }
            None => {
                *self.inner.state.borrow_mut() = value;
                self.inner.watchers.for_each(|f| f());
            }
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    pub fn watch_in(&self, scope: Option<&Scope>, f: impl Fn() + 'static) -> Subscription {
        let watchers = match scope {
            Some(scope) => scope.watchers(self.inner.id),
            None => self.inner.watchers.clone(),
        };
        watchers.add(Rc::new(f))
    }

    /// Number of watchers outside any scope.
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.len()
    }

    /// Recomputes this store whenever `event` fires, in the event's scope.
    pub fn on<P: 'static>(
        self,
        event: &Event<P>,
        reducer: impl Fn(&T, &P) -> T + 'static,
    ) -> Self {
        let store = self.clone();
        let _ = event.react(move |scope, payload| {
            let next = reducer(&store.get_in(scope), payload);
            store.set_in(scope, next);
        });
        self
    }
}

// Event

pub struct Event<T: 'static> {
    inner: Rc<EventInner<T>>,
}

struct EventInner<T: 'static> {
    id: UnitId,
    name: String,
    reactions: Reactions<T>,
}

impl<T> Clone for Event<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event({}#{})", self.inner.name, self.inner.id)
    }
}

impl<T: 'static> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Event<T> {
    pub fn new() -> Self {
        let id = next_unit_id();
        Self::build(id, format!("event#{id}"))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::build(next_unit_id(), name.into())
    }

    fn build(id: UnitId, name: String) -> Self {
        Self {
            inner: Rc::new(EventInner {
                id,
                name,
                reactions: Reactions::default(),
            }),
        }
    }

    pub fn id(&self) -> UnitId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Emits in the running scope, if any.
    pub fn emit(&self, payload: T) {
        self.emit_in(current_scope().as_ref(), payload)
    }

    pub fn emit_in(&self, scope: Option<&Scope>, payload: T) {
        log::trace!("emit `{}`", self.inner.name);
        let run = || self.inner.reactions.for_each(|react| react(scope, &payload));
        match scope {
            Some(scope) => scope.run(run),
            None => run(),
        }
    }

    pub fn watch(&self, f: impl Fn(&T) + 'static) -> Subscription {
        self.react(move |_, payload| f(payload))
    }

    pub fn react(&self, f: impl Fn(Option<&Scope>, &T) + 'static) -> Subscription {
        self.inner.reactions.add(Rc::new(f))
    }
}

// Effect

/// A trigger with a handler. Calling it runs the handler, then emits `done`.
pub struct Effect<T: 'static> {
    inner: Rc<EffectInner<T>>,
}

struct EffectInner<T: 'static> {
    id: UnitId,
    name: String,
    handler: Rc<dyn Fn(&T)>,
    done: Event<T>,
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({}#{})", self.inner.name, self.inner.id)
    }
}

impl<T: 'static> Effect<T> {
    pub fn new(handler: impl Fn(&T) + 'static) -> Self {
        let id = next_unit_id();
        Self::build(id, format!("effect#{id}"), Rc::new(handler))
    }

    pub fn named(name: impl Into<String>, handler: impl Fn(&T) + 'static) -> Self {
        Self::build(next_unit_id(), name.into(), Rc::new(handler))
    }

    fn build(id: UnitId, name: String, handler: Rc<dyn Fn(&T)>) -> Self {
        let done = Event::named(format!("{name}.done"));
        Self {
            inner: Rc::new(EffectInner {
                id,
                name,
                handler,
                done,
            }),
        }
    }

    pub fn id(&self) -> UnitId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn done(&self) -> Event<T> {
        self.inner.done.clone()
    }

    pub fn call(&self, payload: T) {
        self.call_in(current_scope().as_ref(), payload)
    }

    pub fn call_in(&self, scope: Option<&Scope>, payload: T) {
        match scope {
            Some(scope) => scope.run(|| (self.inner.handler)(&payload)),
            None => (self.inner.handler)(&payload),
        }
        self.inner.done.emit_in(scope, payload);
    }
}

// Type-erased seams

/// A readable, watchable unit with its value exposed as JSON.
pub trait Source {
    fn unit_id(&self) -> UnitId;
    fn unit_name(&self) -> &str;
    fn read(&self, scope: Option<&Scope>) -> Result<Value>;
    fn subscribe(&self, scope: Option<&Scope>, notify: Rc<dyn Fn()>) -> Subscription;
}

/// A unit that can be triggered with a JSON payload.
pub trait Trigger {
    fn unit_id(&self) -> UnitId;
    fn unit_name(&self) -> &str;
    fn trigger(&self, scope: Option<&Scope>, payload: Value) -> Result<()>;
}

impl<T> Source for Store<T>
where
    T: Clone + PartialEq + Serialize + 'static,
{
    fn unit_id(&self) -> UnitId {
        self.id()
    }

    fn unit_name(&self) -> &str {
        self.name()
    }

    fn read(&self, scope: Option<&Scope>) -> Result<Value> {
        Ok(serde_json::to_value(self.get_in(scope))?)
    }

    fn subscribe(&self, scope: Option<&Scope>, notify: Rc<dyn Fn()>) -> Subscription {
        self.watch_in(scope, move || notify())
    }
}

fn decode<T: DeserializeOwned>(unit: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload).map_err(|source| CoreError::Payload {
        unit: unit.to_string(),
        source,
    })
}

impl<T: DeserializeOwned + 'static> Trigger for Event<T> {
    fn unit_id(&self) -> UnitId {
        self.id()
    }

    fn unit_name(&self) -> &str {
        self.name()
    }

    fn trigger(&self, scope: Option<&Scope>, payload: Value) -> Result<()> {
        let payload = decode(self.name(), payload)?;
        self.emit_in(scope, payload);
        Ok(())
    }
}

impl<T: DeserializeOwned + 'static> Trigger for Effect<T> {
    fn unit_id(&self) -> UnitId {
        self.id()
    }

    fn unit_name(&self) -> &str {
        self.name()
    }

    fn trigger(&self, scope: Option<&Scope>, payload: Value) -> Result<()> {
        let payload = decode(self.name(), payload)?;
        self.call_in(scope, payload);
        Ok(())
    }
}
