//! Retained component tree.
//!
//! [`Root`] owns every component instance in a slotmap arena. A render pass
//! re-runs components top-down; each returned [`Node`] is expanded in place,
//! and every nested [`Call`] is matched against the parent's previous
//! children by `(key, component)`. Matched instances keep their remembered
//! slots and subscriptions, unmatched ones are torn down, and fresh ones
//! commit their mount effects once the whole pass has finished.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use slotmap::{SlotMap, new_key_type};

use crate::effects::Dispose;
use crate::error::{CoreError, Result};
use crate::locals::Locals;
use crate::node::{Call, Component, ComponentId, Key, Node};
use crate::owner::Owner;
use crate::props::{Handler, NodeRef, Props};
use crate::scope::{Scope, ScopeId};
use crate::unit::{Source, Store, Subscription, Trigger, UnitId};

new_key_type! {
    pub struct InstanceId;
}

/// Options for subscribing to units. Passed through untouched by binding
/// layers built on top of this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitConfig {
    /// Fail instead of falling back to unscoped units when no scope is
    /// provided.
    pub force_scope: bool,
}

impl UnitConfig {
    pub fn force_scope(mut self, force: bool) -> Self {
        self.force_scope = force;
        self
    }
}

type MountEffect = Box<dyn FnOnce() -> Dispose>;

struct Instance {
    component: ComponentId,
    name: String,
    key: Key,
    parent: Option<InstanceId>,
    children: Vec<InstanceId>,
    slots: Vec<Box<dyn Any>>,
    cursor: usize,
    inherited: Locals,
    subscriptions: HashMap<UnitId, (Option<ScopeId>, Subscription)>,
    triggers: HashMap<UnitId, (Option<ScopeId>, Handler)>,
    pending: Vec<MountEffect>,
    owner: Owner,
    mounted: bool,
}

#[derive(Default)]
struct Tree {
    instances: SlotMap<InstanceId, Instance>,
    root_locals: Locals,
    dirty: Rc<Cell<bool>>,
    commit_queue: Vec<InstanceId>,
}

/// Bookkeeping for expanding one instance's output.
#[derive(Default)]
struct ChildPass {
    position: usize,
    visited: Vec<InstanceId>,
    overlay: Locals,
}

impl Tree {
    fn create(&mut self, parent: Option<InstanceId>, key: Key, component: &Component) -> InstanceId {
        log::trace!("create `{}` at {key:?}", component.name());
        self.instances.insert(Instance {
            component: component.id(),
            name: component.name().to_string(),
            key,
            parent,
            children: Vec::new(),
            slots: Vec::new(),
            cursor: 0,
            inherited: Locals::new(),
            subscriptions: HashMap::new(),
            triggers: HashMap::new(),
            pending: Vec::new(),
            owner: Owner::new(),
            mounted: false,
        })
    }

    fn render_instance(&mut self, id: InstanceId, call: Call) -> Result<Node> {
        let Call {
            component,
            props,
            node_ref,
            ..
        } = call;
        self.instances[id].cursor = 0;
        let output = {
            let mut cx = RenderCx {
                tree: self,
                id,
                node_ref,
            };
            component.render(&mut cx, props)?
        };

        let mut pass = ChildPass::default();
        let node = match self.expand(id, output, &mut pass) {
            Ok(node) => node,
            Err(err) => {
                // Children created by the aborted pass stay linked so a later
                // pass can reuse them and teardown still reaches them.
                let instance = &mut self.instances[id];
                for child in pass.visited {
                    if !instance.children.contains(&child) {
                        instance.children.push(child);
                    }
                }
                return Err(err);
            }
        };

        let stale: Vec<InstanceId> = self.instances[id]
            .children
            .iter()
            .copied()
            .filter(|child| !pass.visited.contains(child))
            .collect();
        for child in stale {
            self.teardown(child);
        }

        let instance = &mut self.instances[id];
        instance.children = pass.visited;
        if !instance.mounted {
            self.commit_queue.push(id);
        }
        Ok(node)
    }

    fn expand(&mut self, parent: InstanceId, node: Node, pass: &mut ChildPass) -> Result<Node> {
        match node {
            Node::Component(call) => {
                let position = pass.position;
                pass.position += 1;
                let key = call.key.clone().unwrap_or(Key::Position(position));
                let child = self.reconcile(parent, key, &call.component, pass);
                pass.visited.push(child);
                self.instances[child].inherited = pass.overlay.clone();
                self.render_instance(child, call)
            }
            Node::Element(mut element) => {
                let children = std::mem::take(&mut element.children);
                element.children = children
                    .into_iter()
                    .map(|child| self.expand(parent, child, pass))
                    .collect::<Result<_>>()?;
                Ok(Node::Element(element))
            }
            Node::Fragment(children) => Ok(Node::Fragment(
                children
                    .into_iter()
                    .map(|child| self.expand(parent, child, pass))
                    .collect::<Result<_>>()?,
            )),
            Node::Provide(locals, child) => {
                let saved = pass.overlay.clone();
                pass.overlay.merge(&locals);
                let out = self.expand(parent, *child, pass);
                pass.overlay = saved;
                out
            }
            leaf => Ok(leaf),
        }
    }

    fn reconcile(
        &mut self,
        parent: InstanceId,
        key: Key,
        component: &Component,
        pass: &ChildPass,
    ) -> InstanceId {
        let existing = self.instances[parent].children.iter().copied().find(|child| {
            let instance = &self.instances[*child];
            instance.key == key && instance.component == component.id()
        });
        match existing {
            Some(id) if !pass.visited.contains(&id) => id,
            Some(_) => {
                log::warn!(
                    "duplicate key {key:?} for `{}` under `{}`; mounting a fresh instance",
                    component.name(),
                    self.instances[parent].name
                );
                self.create(Some(parent), key, component)
            }
            None => self.create(Some(parent), key, component),
        }
    }

    fn teardown(&mut self, id: InstanceId) {
        let Some(mut instance) = self.instances.remove(id) else {
            return;
        };
        for child in std::mem::take(&mut instance.children) {
            self.teardown(child);
        }
        for (_, (_, sub)) in instance.subscriptions.drain() {
            sub.unsubscribe();
        }
        log::debug!("unmount `{}`", instance.name);
        instance.owner.dispose();
    }

    fn commit(&mut self) {
        for id in std::mem::take(&mut self.commit_queue) {
            let Some(instance) = self.instances.get_mut(id) else {
                continue;
            };
            if instance.mounted {
                continue;
            }
            instance.mounted = true;
            let effects = std::mem::take(&mut instance.pending);
            let owner = instance.owner.clone();
            log::debug!("mount `{}`", instance.name);
            for effect in effects {
                let dispose = effect();
                owner.add_disposer(move || dispose.run());
            }
        }
    }
}

/// Render-time handle for one component instance.
pub struct RenderCx<'a> {
    tree: &'a mut Tree,
    id: InstanceId,
    node_ref: Option<NodeRef>,
}

impl RenderCx<'_> {
    pub fn instance_id(&self) -> InstanceId {
        self.id
    }

    /// The ref passed at the call site, if any.
    pub fn node_ref(&self) -> Option<NodeRef> {
        self.node_ref.clone()
    }

    fn instance(&mut self) -> &mut Instance {
        &mut self.tree.instances[self.id]
    }

    /// Slot-based remember: the Nth call in an instance's render always
    /// refers to the Nth stored value.
    pub fn remember<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Rc<T> {
        let instance = self.instance();
        let cursor = instance.cursor;
        instance.cursor += 1;

        if cursor >= instance.slots.len() {
            let rc: Rc<T> = Rc::new(init());
            instance.slots.push(Box::new(rc.clone()));
            return rc;
        }

        if let Some(rc) = instance.slots[cursor].downcast_ref::<Rc<T>>() {
            rc.clone()
        } else {
            log::warn!(
                "remember: slot {} of `{}` changed type; replacing. \
                 Keep the order of remember calls stable across renders.",
                cursor,
                instance.name
            );
            let rc: Rc<T> = Rc::new(init());
            instance.slots[cursor] = Box::new(rc.clone());
            rc
        }
    }

    /// Returns the cached value while `key` is unchanged, recomputing otherwise.
    pub fn memo<K, T>(&mut self, key: K, compute: impl FnOnce() -> T) -> T
    where
        K: PartialEq + 'static,
        T: Clone + 'static,
    {
        let slot = self.remember(|| RefCell::new(None::<(K, T)>));
        let mut slot = slot.borrow_mut();
        if let Some((cached, value)) = slot.as_ref()
            && *cached == key
        {
            return value.clone();
        }
        let value = compute();
        *slot = Some((key, value.clone()));
        value
    }

    /// Nearest provided value of type `T`, searching outward to the root.
    pub fn context<T: Clone + 'static>(&self) -> Option<T> {
        let mut cursor = Some(self.id);
        while let Some(id) = cursor {
            let instance = self.tree.instances.get(id)?;
            if let Some(value) = instance.inherited.get::<T>() {
                return Some(value);
            }
            cursor = instance.parent;
        }
        self.tree.root_locals.get::<T>()
    }

    /// The ambient scope, if one was provided.
    pub fn scope(&self) -> Option<Scope> {
        self.context::<Scope>()
    }

    fn resolve_scope(&self, unit: &str, config: &UnitConfig) -> Result<Option<Scope>> {
        let scope = self.scope();
        if scope.is_none() && config.force_scope {
            return Err(CoreError::ScopeRequired {
                unit: unit.to_string(),
            });
        }
        Ok(scope)
    }

    fn track(
        &mut self,
        unit: UnitId,
        scope: Option<&Scope>,
        subscribe: impl FnOnce(Option<&Scope>, Rc<dyn Fn()>) -> Subscription,
    ) {
        let scope_id = scope.map(Scope::id);
        if let Some((current, _)) = self.instance().subscriptions.get(&unit)
            && *current == scope_id
        {
            return;
        }
        let dirty = self.tree.dirty.clone();
        let sub = subscribe(scope, Rc::new(move || dirty.set(true)));
        let instance = self.instance();
        log::trace!("`{}` subscribed to unit {unit} in {scope_id:?}", instance.name);
        if let Some((_, stale)) = instance.subscriptions.insert(unit, (scope_id, sub)) {
            stale.unsubscribe();
        }
    }

    /// Reads `store` in the ambient scope and re-renders on change.
    pub fn use_store<T: Clone + PartialEq + 'static>(
        &mut self,
        store: &Store<T>,
        config: &UnitConfig,
    ) -> Result<T> {
        let scope = self.resolve_scope(store.name(), config)?;
        self.track(store.id(), scope.as_ref(), |scope, notify| {
            store.watch_in(scope, move || notify())
        });
        Ok(store.get_in(scope.as_ref()))
    }

    /// Type-erased [`RenderCx::use_store`].
    pub fn use_source(&mut self, source: &dyn Source, config: &UnitConfig) -> Result<Value> {
        let scope = self.resolve_scope(source.unit_name(), config)?;
        self.track(source.unit_id(), scope.as_ref(), |scope, notify| {
            source.subscribe(scope, notify)
        });
        source.read(scope.as_ref())
    }

    /// A handler that triggers `trigger` in the ambient scope. The same
    /// handler is returned across renders while the scope is unchanged.
    pub fn use_trigger(&mut self, trigger: Rc<dyn Trigger>, config: &UnitConfig) -> Result<Handler> {
        let scope = self.resolve_scope(trigger.unit_name(), config)?;
        let scope_id = scope.as_ref().map(Scope::id);
        let unit = trigger.unit_id();
        if let Some((current, handler)) = self.instance().triggers.get(&unit)
            && *current == scope_id
        {
            return Ok(handler.clone());
        }
        let handler: Handler = Rc::new(move |payload| {
            if let Err(err) = trigger.trigger(scope.as_ref(), payload) {
                log::warn!("{err}");
            }
        });
        self.instance()
            .triggers
            .insert(unit, (scope_id, handler.clone()));
        Ok(handler)
    }

    /// Runs `effect` once after this instance's first commit; the returned
    /// [`Dispose`] runs once when the instance is torn down.
    pub fn mount_effect(&mut self, effect: impl FnOnce() -> Dispose + 'static) {
        let installed = self.remember(|| Cell::new(false));
        if installed.replace(true) {
            return;
        }
        self.instance().pending.push(Box::new(effect));
    }
}

/// Host of one component tree.
pub struct Root {
    tree: Tree,
    root: Option<InstanceId>,
    call: Call,
    output: Node,
}

impl Root {
    pub fn new(component: Component) -> Self {
        Self::with_props(component, Props::new())
    }

    pub fn with_props(component: Component, props: Props) -> Self {
        Self {
            tree: Tree::default(),
            root: None,
            call: Call::new(component, props),
            output: Node::Empty,
        }
    }

    /// Provides `value` to the whole tree.
    pub fn provide<T: 'static>(mut self, value: T) -> Self {
        self.tree.root_locals.insert(value);
        self
    }

    pub fn with_scope(self, scope: Scope) -> Self {
        self.provide(scope)
    }

    pub fn set_props(&mut self, props: Props) {
        self.call.props = props;
        self.tree.dirty.set(true);
    }

    pub fn set_node_ref(&mut self, node_ref: Option<NodeRef>) {
        self.call.node_ref = node_ref;
        self.tree.dirty.set(true);
    }

    /// Runs a full render pass and commits mount effects.
    pub fn render(&mut self) -> Result<&Node> {
        self.tree.dirty.set(false);
        let id = match self.root {
            Some(id) if self.tree.instances.contains_key(id) => id,
            _ => {
                let id = self.tree.create(None, Key::Position(0), &self.call.component);
                self.root = Some(id);
                id
            }
        };
        let node = self.tree.render_instance(id, self.call.clone())?;
        self.tree.commit();
        self.output = node;
        Ok(&self.output)
    }

    /// Re-renders only if a subscription fired since the last pass.
    pub fn flush(&mut self) -> Result<bool> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.render()?;
        Ok(true)
    }

    pub fn is_dirty(&self) -> bool {
        self.tree.dirty.get()
    }

    pub fn output(&self) -> &Node {
        &self.output
    }

    pub fn instance_count(&self) -> usize {
        self.tree.instances.len()
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_some()
    }

    /// Tears down every instance: cleanups run and subscriptions are released.
    pub fn unmount(&mut self) {
        if let Some(id) = self.root.take() {
            self.tree.teardown(id);
        }
        self.output = Node::Empty;
        self.tree.dirty.set(false);
    }
}

impl Drop for Root {
    fn drop(&mut self) {
        self.unmount();
    }
}
