use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::node::Element;

/// Callback prop. Every handler takes one payload; handlers that need none
/// ignore it.
pub type Handler = Rc<dyn Fn(Value)>;

/// Prop carrying the forwarded [`NodeRef`].
pub const REF: &str = "ref";
/// Prop that primitive elements render as their text content.
pub const CHILDREN: &str = "children";

pub fn handler(f: impl Fn(Value) + 'static) -> Handler {
    Rc::new(f)
}

#[derive(Clone)]
pub enum Prop {
    Value(Value),
    Handler(Handler),
    Ref(NodeRef),
}

impl Prop {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Prop::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            Prop::Handler(h) => Some(h),
            _ => None,
        }
    }
}

impl fmt::Debug for Prop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prop::Value(v) => write!(f, "{v}"),
            Prop::Handler(_) => f.write_str("<handler>"),
            Prop::Ref(r) => write!(f, "{r:?}"),
        }
    }
}

impl From<Value> for Prop {
    fn from(v: Value) -> Self {
        Prop::Value(v)
    }
}

impl From<Handler> for Prop {
    fn from(h: Handler) -> Self {
        Prop::Handler(h)
    }
}

impl From<NodeRef> for Prop {
    fn from(r: NodeRef) -> Self {
        Prop::Ref(r)
    }
}

macro_rules! prop_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Prop {
                fn from(v: $ty) -> Self {
                    Prop::Value(Value::from(v))
                }
            }
        )*
    };
}

prop_from_value!(&str, String, bool, i32, i64, u32, u64, usize, f64);

/// Property bag handed to a component. Keys are kept sorted so rendering is
/// deterministic.
#[derive(Clone, Default)]
pub struct Props(BTreeMap<String, Prop>);

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, prop: impl Into<Prop>) -> Self {
        self.insert(key, prop);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, prop: impl Into<Prop>) -> Option<Prop> {
        self.0.insert(key.into(), prop.into())
    }

    pub fn get(&self, key: &str) -> Option<&Prop> {
        self.0.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.get(key).and_then(Prop::as_value)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(Value::as_str)
    }

    pub fn handler(&self, key: &str) -> Option<Handler> {
        self.get(key).and_then(Prop::as_handler).cloned()
    }

    /// Invokes the handler under `key`. Returns false when there is none.
    pub fn call(&self, key: &str, payload: Value) -> bool {
        match self.handler(key) {
            Some(h) => {
                h(payload);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Prop> {
        self.0.remove(key)
    }

    pub fn take_ref(&mut self) -> Option<NodeRef> {
        match self.0.remove(REF)? {
            Prop::Ref(r) => Some(r),
            other => {
                self.0.insert(REF.to_string(), other);
                None
            }
        }
    }

    /// Applies `other` on top of these props; `other` wins per key.
    pub fn extend(&mut self, other: Props) {
        self.0.extend(other.0);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Spreads a JSON object into props. Anything else yields `None`.
    pub fn from_record(value: Value) -> Option<Props> {
        match value {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(k, v)| (k, Prop::Value(v)))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl FromIterator<(String, Prop)> for Props {
    fn from_iter<I: IntoIterator<Item = (String, Prop)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Handle that a primitive element fills with its rendered snapshot.
#[derive(Clone, Default)]
pub struct NodeRef(Rc<RefCell<Option<Element>>>);

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, element: Element) {
        *self.0.borrow_mut() = Some(element);
    }

    pub fn current(&self) -> Option<Element> {
        self.0.borrow().clone()
    }

    pub fn is_attached(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.borrow().as_ref() {
            Some(el) => write!(f, "NodeRef(<{}>)", el.tag),
            None => f.write_str("NodeRef(detached)"),
        }
    }
}
