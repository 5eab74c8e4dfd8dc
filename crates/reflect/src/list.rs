use std::rc::Rc;

use reflect_core::{
    Call, Component, CoreError, Key, Node, Prop, Props, Render, RenderCx, Result, Store,
    UnitConfig,
};
use serde::Serialize;

use crate::bind::Bind;
use crate::hooks::Hooks;
use crate::reflect::{ReflectConfig, reflect};

type MapItem<T> = Rc<dyn Fn(&T, usize) -> Prop>;
type GetKey<T> = Rc<dyn Fn(&T) -> Key>;

pub struct ListConfig<T: 'static> {
    pub source: Store<Vec<T>>,
    pub view: Component,
    pub bind: Bind,
    map_item: Vec<(String, MapItem<T>)>,
    get_key: Option<GetKey<T>>,
    pub hooks: Hooks,
    pub unit_config: UnitConfig,
}

impl<T: 'static> ListConfig<T> {
    pub fn new(source: Store<Vec<T>>, view: Component) -> Self {
        Self {
            source,
            view,
            bind: Bind::default(),
            map_item: Vec::new(),
            get_key: None,
            hooks: Hooks::default(),
            unit_config: UnitConfig::default(),
        }
    }

    /// Props shared by every item.
    pub fn bind(mut self, bind: Bind) -> Self {
        self.bind = bind;
        self
    }

    /// Derives `key` from each item. Wins over a shared bind of the same key.
    pub fn map_item<P: Into<Prop>>(
        mut self,
        key: impl Into<String>,
        f: impl Fn(&T, usize) -> P + 'static,
    ) -> Self {
        let map: MapItem<T> = Rc::new(move |item: &T, index: usize| f(item, index).into());
        self.map_item.push((key.into(), map));
        self
    }

    /// Identity of an item across renders. Defaults to its position.
    pub fn get_key<K: Into<Key>>(mut self, f: impl Fn(&T) -> K + 'static) -> Self {
        self.get_key = Some(Rc::new(move |item: &T| f(item).into()));
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn unit_config(mut self, config: UnitConfig) -> Self {
        self.unit_config = config;
        self
    }
}

/// Renders one reflected `view` per element of `source`.
///
/// Without `map_item`, each item's serialized fields are spread as props.
pub fn list<T>(config: ListConfig<T>) -> Component
where
    T: Clone + PartialEq + Serialize + 'static,
{
    let ListConfig {
        source,
        view,
        bind,
        map_item,
        get_key,
        hooks,
        unit_config,
    } = config;
    let name = format!("List({})", view.name());
    let item_view = reflect(
        ReflectConfig::new(view, bind)
            .hooks(hooks)
            .unit_config(unit_config),
    );
    Component::new(
        name,
        ListView {
            source,
            item_view,
            map_item,
            get_key,
            unit_config,
        },
    )
}

struct ListView<T: 'static> {
    source: Store<Vec<T>>,
    item_view: Component,
    map_item: Vec<(String, MapItem<T>)>,
    get_key: Option<GetKey<T>>,
    unit_config: UnitConfig,
}

impl<T: Serialize + 'static> ListView<T> {
    fn item_props(&self, item: &T, index: usize) -> Result<Props> {
        if self.map_item.is_empty() {
            let record = serde_json::to_value(item)?;
            return Props::from_record(record).ok_or(CoreError::NotARecord { index });
        }
        Ok(self
            .map_item
            .iter()
            .map(|(key, f)| (key.clone(), f(item, index)))
            .collect())
    }
}

impl<T> Render for ListView<T>
where
    T: Clone + PartialEq + Serialize + 'static,
{
    fn render(&self, cx: &mut RenderCx<'_>, _props: Props) -> Result<Node> {
        let items = cx.use_store(&self.source, &self.unit_config)?;
        let nodes = items
            .iter()
            .enumerate()
            .map(|(index, item)| -> Result<Node> {
                let mut call = Call::new(self.item_view.clone(), self.item_props(item, index)?);
                if let Some(get_key) = &self.get_key {
                    call = call.key(get_key(item));
                }
                Ok(call.into())
            })
            .collect::<Result<Vec<Node>>>()?;
        Ok(Node::Fragment(nodes))
    }
}
