use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::error::{CoreError, Result};
use crate::unit::{Event, Store, UnitId, Watchers};

pub type ScopeId = u64;

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<Weak<ScopeInner>>> = const { RefCell::new(None) };
    static NEXT_SCOPE: Cell<ScopeId> = const { Cell::new(1) };
}

/// An isolated instance of the unit graph. Store values written inside a
/// scope are invisible outside it and to every other scope.
#[derive(Clone)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    id: ScopeId,
    values: RefCell<HashMap<UnitId, Box<dyn Any>>>,
    watchers: RefCell<HashMap<UnitId, Watchers>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        let id = NEXT_SCOPE.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            inner: Rc::new(ScopeInner {
                id,
                values: RefCell::new(HashMap::new()),
                watchers: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    /// Runs `f` with this scope as the running scope.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        // Restores the previous scope even if `f` unwinds.
        struct Guard(Option<Weak<ScopeInner>>);
        impl Drop for Guard {
            fn drop(&mut self) {
                let prev = self.0.take();
                CURRENT_SCOPE.with(|current| *current.borrow_mut() = prev);
            }
        }
        let prev = CURRENT_SCOPE.with(|current| {
            current
                .borrow_mut()
                .replace(Rc::downgrade(&self.inner))
        });
        let _guard = Guard(prev);
        f()
    }

    pub fn get<T: Clone + PartialEq + 'static>(&self, store: &Store<T>) -> T {
        store.get_in(Some(self))
    }

    pub fn emit<T: 'static>(&self, event: &Event<T>, payload: T) {
        event.emit_in(Some(self), payload)
    }

    pub(crate) fn read<T: Clone + 'static>(&self, unit: UnitId) -> Option<T> {
        self.inner
            .values
            .borrow()
            .get(&unit)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub(crate) fn write<T: 'static>(&self, unit: UnitId, value: T) {
        self.inner
            .values
            .borrow_mut()
            .insert(unit, Box::new(value));
    }

    pub(crate) fn watchers(&self, unit: UnitId) -> Watchers {
        self.inner
            .watchers
            .borrow_mut()
            .entry(unit)
            .or_default()
            .clone()
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Scope {}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scope(#{})", self.inner.id)
    }
}

/// Creates a fresh isolated scope.
pub fn fork() -> Scope {
    Scope::new()
}

/// The scope currently running via [`Scope::run`], if any.
pub fn current_scope() -> Option<Scope> {
    CURRENT_SCOPE.with(|current| {
        current
            .borrow()
            .as_ref()
            .and_then(|weak| weak.upgrade().map(|inner| Scope { inner }))
    })
}

/// Rebinds `f` so every call runs under `scope` (or the running scope when
/// `None`). Without any scope, `safe` decides between an unscoped function
/// and [`CoreError::NoScope`].
pub fn scope_bind<A: 'static>(
    f: impl Fn(A) + 'static,
    scope: Option<Scope>,
    safe: bool,
) -> Result<Rc<dyn Fn(A)>> {
    let scope = scope.or_else(current_scope);
    if scope.is_none() && !safe {
        return Err(CoreError::NoScope);
    }
    Ok(bound(f, scope))
}

/// [`scope_bind`] in safe mode; never fails.
pub fn scope_bind_safe<A: 'static>(f: impl Fn(A) + 'static, scope: Option<Scope>) -> Rc<dyn Fn(A)> {
    bound(f, scope.or_else(current_scope))
}

fn bound<A: 'static>(f: impl Fn(A) + 'static, scope: Option<Scope>) -> Rc<dyn Fn(A)> {
    match scope {
        Some(scope) => Rc::new(move |arg| scope.run(|| f(arg))),
        None => Rc::new(f),
    }
}
