use std::collections::HashMap;
use std::hash::Hash;

use reflect_core::{Call, Component, Node, Props, Render, RenderCx, Result, Store, UnitConfig};

use crate::bind::Bind;
use crate::hooks::Hooks;
use crate::reflect::{ReflectConfig, reflect};

/// Picks one view per value of `source`. Build it with [`VariantConfig::new`]
/// for a discriminant store, or [`VariantConfig::when`] for a boolean one.
pub struct VariantConfig<C: 'static> {
    pub source: Store<C>,
    cases: Vec<(C, Component)>,
    default: Option<Component>,
    pub bind: Bind,
    pub hooks: Hooks,
    pub unit_config: UnitConfig,
}

impl<C: Clone + Eq + Hash + 'static> VariantConfig<C> {
    pub fn new(source: Store<C>) -> Self {
        Self {
            source,
            cases: Vec::new(),
            default: None,
            bind: Bind::default(),
            hooks: Hooks::default(),
            unit_config: UnitConfig::default(),
        }
    }

    pub fn case(mut self, value: C, view: Component) -> Self {
        self.cases.push((value, view));
        self
    }

    /// Rendered when no case matches. Without it nothing is rendered.
    pub fn default_view(mut self, view: Component) -> Self {
        self.default = Some(view);
        self
    }

    pub fn bind(mut self, bind: Bind) -> Self {
        self.bind = bind;
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

impl VariantConfig<bool> {
    /// `then` while `condition` holds.
    pub fn when(condition: Store<bool>, then: Component) -> Self {
        Self::new(condition).case(true, then)
    }

    /// Rendered while the condition is false.
    pub fn otherwise(self, view: Component) -> Self {
        self.case(false, view)
    }
}

/// Each branch is reflected with the shared bind. The hooks belong to the
/// variant itself: they fire once for its lifetime, whichever branch is
/// active and even while none is.
pub fn variant<C>(config: VariantConfig<C>) -> Component
where
    C: Clone + Eq + Hash + 'static,
{
    let VariantConfig {
        source,
        cases,
        default,
        bind,
        hooks,
        unit_config,
    } = config;
    let branch = |view: Component| {
        reflect(ReflectConfig::new(view, bind.clone()).unit_config(unit_config))
    };
    let cases: HashMap<C, Component> = cases
        .into_iter()
        .map(|(value, view)| (value, branch(view)))
        .collect();
    let fallback = default.map(branch);
    let selector = Component::new(
        format!("Variant({})", source.name()),
        VariantView {
            source,
            cases,
            fallback,
            unit_config,
        },
    );
    reflect(
        ReflectConfig::new(selector, Bind::new())
            .hooks(hooks)
            .unit_config(unit_config),
    )
}

struct VariantView<C: 'static> {
    source: Store<C>,
    cases: HashMap<C, Component>,
    fallback: Option<Component>,
    unit_config: UnitConfig,
}

impl<C> Render for VariantView<C>
where
    C: Clone + Eq + Hash + 'static,
{
    fn render(&self, cx: &mut RenderCx<'_>, props: Props) -> Result<Node> {
        let current = cx.use_store(&self.source, &self.unit_config)?;
        let selected = self.cases.get(&current).or(self.fallback.as_ref());
        Ok(match selected {
            Some(view) => Call::new(view.clone(), props)
                .node_ref(cx.node_ref())
                .into(),
            None => Node::Empty,
        })
    }
}
