//! Bind specifications and their classification.

use std::rc::Rc;

use reflect_core::{
    Effect, Event, Handler, Prop, Props, Source, Store, Trigger, Value, current_scope,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Anything that can sit on the right-hand side of a bind entry.
///
/// Classification asks, in order: is it an event, a store, a callable? A
/// value answering none of these is bound statically via [`Bindable::to_static`].
pub trait Bindable: 'static {
    fn as_event(&self) -> Option<Rc<dyn Trigger>> {
        None
    }

    fn as_store(&self) -> Option<Rc<dyn Source>> {
        None
    }

    fn as_callable(&self) -> Option<Handler> {
        None
    }

    fn to_static(&self) -> Prop;
}

impl<T> Bindable for Store<T>
where
    T: Clone + PartialEq + Serialize + 'static,
{
    fn as_store(&self) -> Option<Rc<dyn Source>> {
        Some(Rc::new(self.clone()))
    }

    fn to_static(&self) -> Prop {
        Prop::Value(serde_json::to_value(self.get()).unwrap_or(Value::Null))
    }
}

fn trigger_handler(trigger: Rc<dyn Trigger>) -> Handler {
    Rc::new(move |payload| {
        if let Err(err) = trigger.trigger(current_scope().as_ref(), payload) {
            log::warn!("{err}");
        }
    })
}

// Events and effects are also callable; being checked first keeps them in
// the events group.
impl<T: DeserializeOwned + 'static> Bindable for Event<T> {
    fn as_event(&self) -> Option<Rc<dyn Trigger>> {
        Some(Rc::new(self.clone()))
    }

    fn as_callable(&self) -> Option<Handler> {
        Some(trigger_handler(Rc::new(self.clone())))
    }

    fn to_static(&self) -> Prop {
        Prop::Handler(trigger_handler(Rc::new(self.clone())))
    }
}

impl<T: DeserializeOwned + 'static> Bindable for Effect<T> {
    fn as_event(&self) -> Option<Rc<dyn Trigger>> {
        Some(Rc::new(self.clone()))
    }

    fn as_callable(&self) -> Option<Handler> {
        Some(trigger_handler(Rc::new(self.clone())))
    }

    fn to_static(&self) -> Prop {
        Prop::Handler(trigger_handler(Rc::new(self.clone())))
    }
}

/// A plain callback with no tie to the reactive graph.
#[derive(Clone)]
pub struct Func(Handler);

/// Wraps a closure for binding. The payload may be ignored.
pub fn func(f: impl Fn(Value) + 'static) -> Func {
    Func(Rc::new(f))
}

impl Bindable for Func {
    fn as_callable(&self) -> Option<Handler> {
        Some(self.0.clone())
    }

    fn to_static(&self) -> Prop {
        Prop::Handler(self.0.clone())
    }
}

impl Bindable for Handler {
    fn as_callable(&self) -> Option<Handler> {
        Some(self.clone())
    }

    fn to_static(&self) -> Prop {
        Prop::Handler(self.clone())
    }
}

impl Bindable for Value {
    fn to_static(&self) -> Prop {
        Prop::Value(self.clone())
    }
}

macro_rules! bind_static {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Bindable for $ty {
                fn to_static(&self) -> Prop {
                    Prop::Value(Value::from(self.clone()))
                }
            }
        )*
    };
}

bind_static!(&'static str, String, bool, i32, i64, u32, u64, usize, f64);

/// Property name to source mapping for one view.
#[derive(Clone, Default)]
pub struct Bind {
    entries: Vec<(String, Rc<dyn Bindable>)>,
}

impl Bind {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Bindable) -> Self {
        self.set(key, value);
        self
    }

    /// Binds `key`, replacing an earlier entry for the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Bindable) {
        let key = key.into();
        let value: Rc<dyn Bindable> = Rc::new(value);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn classify(&self) -> Classified {
        classify(self)
    }
}

/// A bind split into disjoint groups.
#[derive(Clone, Default)]
pub struct Classified {
    pub events: Vec<(String, Rc<dyn Trigger>)>,
    pub stores: Vec<(String, Rc<dyn Source>)>,
    pub data: Props,
    pub functions: Vec<(String, Handler)>,
}

impl Classified {
    pub fn len(&self) -> usize {
        self.events.len() + self.stores.len() + self.data.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn classify(bind: &Bind) -> Classified {
    let mut out = Classified::default();
    for (key, value) in &bind.entries {
        if let Some(event) = value.as_event() {
            out.events.push((key.clone(), event));
        } else if let Some(store) = value.as_store() {
            out.stores.push((key.clone(), store));
        } else if let Some(f) = value.as_callable() {
            out.functions.push((key.clone(), f));
        } else {
            out.data.insert(key.clone(), value.to_static());
        }
    }
    out
}
