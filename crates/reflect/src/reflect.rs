use std::rc::Rc;

use reflect_core::{
    Call, Component, Node, Props, REF, Render, RenderCx, Result, Source, Trigger, UnitConfig,
};

use crate::bind::Bind;
use crate::functions::{Functions, use_bound_functions};
use crate::hooks::Hooks;

#[derive(Clone)]
pub struct ReflectConfig {
    pub view: Component,
    pub bind: Bind,
    pub hooks: Hooks,
    /// Handed to every store/event subscription unchanged.
    pub unit_config: UnitConfig,
}

impl ReflectConfig {
    pub fn new(view: Component, bind: Bind) -> Self {
        Self {
            view,
            bind,
            hooks: Hooks::default(),
            unit_config: UnitConfig::default(),
        }
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

/// Optional extras accepted by the binder from [`create_reflect`].
#[derive(Clone, Default)]
pub struct Features {
    pub hooks: Hooks,
    pub unit_config: UnitConfig,
}

/// Builds a component that renders `config.view` with props drawn from the
/// bind. Props are merged lowest to highest: forwarded ref, store values,
/// event triggers, static values, scope-bound functions, then the props
/// given at the call site.
pub fn reflect(config: ReflectConfig) -> Component {
    let ReflectConfig {
        view,
        bind,
        hooks,
        unit_config,
    } = config;
    let classified = bind.classify();
    let name = format!("Reflect({})", view.name());
    Component::new(
        name,
        Reflected {
            view,
            stores: classified.stores,
            events: classified.events,
            data: classified.data,
            functions: Rc::new(classified.functions),
            hooks,
            unit_config,
        },
    )
}

/// Fixes the view so call sites only pass the bind.
pub fn create_reflect(view: Component) -> impl Fn(Bind, Features) -> Component {
    move |bind, features| {
        reflect(ReflectConfig {
            view: view.clone(),
            bind,
            hooks: features.hooks,
            unit_config: features.unit_config,
        })
    }
}

struct Reflected {
    view: Component,
    stores: Vec<(String, Rc<dyn Source>)>,
    events: Vec<(String, Rc<dyn Trigger>)>,
    data: Props,
    functions: Rc<Functions>,
    hooks: Hooks,
    unit_config: UnitConfig,
}

impl Render for Reflected {
    fn render(&self, cx: &mut RenderCx<'_>, props: Props) -> Result<Node> {
        let mut merged = Props::new();
        if let Some(node_ref) = cx.node_ref() {
            merged.insert(REF, node_ref);
        }
        for (key, store) in &self.stores {
            let value = cx.use_source(store.as_ref(), &self.unit_config)?;
            merged.insert(key.clone(), value);
        }
        for (key, event) in &self.events {
            let trigger = cx.use_trigger(event.clone(), &self.unit_config)?;
            merged.insert(key.clone(), trigger);
        }
        merged.extend(self.data.clone());
        merged.extend(use_bound_functions(cx, &self.functions));
        merged.extend(props);

        self.hooks.install(cx, &self.unit_config)?;

        let node_ref = merged.take_ref();
        Ok(Call::new(self.view.clone(), merged)
            .node_ref(node_ref)
            .into())
    }
}
