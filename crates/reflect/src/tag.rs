use reflect_core::{CHILDREN, Component, Element, Node, Prop, Value};

/// Adapts a primitive element into a view. A `children` value renders as
/// text; the forwarded ref receives the rendered element.
pub fn from_tag(tag: impl Into<String>) -> Component {
    let tag = tag.into();
    Component::from_fn(tag.clone(), move |cx, mut props| {
        let children = match props.remove(CHILDREN) {
            None | Some(Prop::Value(Value::Null)) => Vec::new(),
            Some(Prop::Value(Value::String(text))) => vec![Node::Text(text)],
            Some(Prop::Value(other)) => vec![Node::Text(other.to_string())],
            Some(other) => {
                props.insert(CHILDREN, other);
                Vec::new()
            }
        };
        let element = Element::new(tag.clone(), props).with_children(children);
        if let Some(node_ref) = cx.node_ref() {
            node_ref.attach(element.clone());
        }
        Ok(element.into())
    })
}
