use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Lifetime of one component instance: collects cleanups and runs them on
/// teardown.
#[derive(Clone, Default)]
pub struct Owner {
    inner: Rc<OwnerInner>,
}

#[derive(Default)]
struct OwnerInner {
    disposers: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

impl Owner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a cleanup. An owner that is already disposed runs it now.
    pub fn add_disposer(&self, disposer: impl FnOnce() + 'static) {
        if self.inner.disposed.get() {
            log::trace!("owner already disposed; running cleanup immediately");
            disposer();
            return;
        }
        self.inner.disposers.borrow_mut().push(Box::new(disposer));
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let disposers = std::mem::take(&mut *self.inner.disposers.borrow_mut());
        for disposer in disposers {
            disposer();
        }
    }
}
