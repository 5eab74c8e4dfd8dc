use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::locals::Locals;
use crate::props::{NodeRef, Prop, Props};
use crate::runtime::RenderCx;
use crate::scope::Scope;

pub type ComponentId = u64;

thread_local! {
    static NEXT_COMPONENT: Cell<ComponentId> = const { Cell::new(1) };
}

/// Identity of a child among its siblings. Unkeyed calls get `Position`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Position(usize),
    Int(i64),
    Str(String),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Int(v.into())
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Key::Int(v.into())
    }
}

/// A component body. Called on every render pass of each of its instances.
pub trait Render: 'static {
    fn render(&self, cx: &mut RenderCx<'_>, props: Props) -> Result<Node>;
}

struct FnRender<F>(F);

impl<F> Render for FnRender<F>
where
    F: Fn(&mut RenderCx<'_>, Props) -> Result<Node> + 'static,
{
    fn render(&self, cx: &mut RenderCx<'_>, props: Props) -> Result<Node> {
        (self.0)(cx, props)
    }
}

/// Cloneable component handle. Clones share identity; two separately built
/// components never do, even with the same body.
#[derive(Clone)]
pub struct Component {
    id: ComponentId,
    name: Rc<str>,
    body: Rc<dyn Render>,
}

impl Component {
    pub fn new(name: impl Into<String>, body: impl Render) -> Self {
        let id = NEXT_COMPONENT.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            id,
            name: name.into().into(),
            body: Rc::new(body),
        }
    }

    pub fn from_fn(
        name: impl Into<String>,
        f: impl Fn(&mut RenderCx<'_>, Props) -> Result<Node> + 'static,
    ) -> Self {
        Self::new(name, FnRender(f))
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, cx: &mut RenderCx<'_>, props: Props) -> Result<Node> {
        self.body.render(cx, props)
    }

    pub fn call(&self, props: Props) -> Call {
        Call::new(self.clone(), props)
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({}#{})", self.name, self.id)
    }
}

/// An unrendered use of a component.
#[derive(Clone, Debug)]
pub struct Call {
    pub component: Component,
    pub props: Props,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
}

impl Call {
    pub fn new(component: Component, props: Props) -> Self {
        Self {
            component,
            props,
            key: None,
            node_ref: None,
        }
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn node_ref(mut self, node_ref: Option<NodeRef>) -> Self {
        self.node_ref = node_ref;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Element {
    pub tag: String,
    pub props: Props,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>, props: Props) -> Self {
        Self {
            tag: tag.into(),
            props,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(String),
    Element(Element),
    Fragment(Vec<Node>),
    Component(Call),
    Provide(Locals, Box<Node>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn element(tag: impl Into<String>, props: Props, children: Vec<Node>) -> Self {
        Node::Element(Element::new(tag, props).with_children(children))
    }

    /// Makes `value` visible to every component rendered inside `child`.
    pub fn provide<T: 'static>(value: T, child: Node) -> Self {
        let mut locals = Locals::new();
        locals.insert(value);
        Node::Provide(locals, Box::new(child))
    }

    pub fn with_scope(scope: Scope, child: Node) -> Self {
        Node::provide(scope, child)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Fragment(children) => children.iter().all(Node::is_empty),
            Node::Provide(_, child) => child.is_empty(),
            _ => false,
        }
    }

    /// Elements in document order.
    pub fn elements(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_elements(&mut out);
        out
    }

    pub fn first_element(&self) -> Option<&Element> {
        self.elements().into_iter().next()
    }

    fn collect_elements<'a>(&'a self, out: &mut Vec<&'a Element>) {
        match self {
            Node::Element(el) => {
                out.push(el);
                for child in &el.children {
                    child.collect_elements(out);
                }
            }
            Node::Fragment(children) => {
                for child in children {
                    child.collect_elements(out);
                }
            }
            Node::Provide(_, child) => child.collect_elements(out),
            Node::Empty | Node::Text(_) | Node::Component(_) => {}
        }
    }
}

impl From<Call> for Node {
    fn from(call: Call) -> Self {
        Node::Component(call)
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Empty => Ok(()),
            Node::Text(text) => f.write_str(text),
            Node::Element(el) => write!(f, "{el}"),
            Node::Fragment(children) => {
                for child in children {
                    write!(f, "{child}")?;
                }
                Ok(())
            }
            Node::Component(call) => write!(f, "<{}/>", call.component.name()),
            Node::Provide(_, child) => write!(f, "{child}"),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (key, prop) in self.props.iter() {
            match prop {
                Prop::Value(v) => write!(f, " {key}={v}")?,
                Prop::Handler(_) => write!(f, " {key}=fn")?,
                Prop::Ref(_) => {}
            }
        }
        if self.children.is_empty() {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.tag)
    }
}
