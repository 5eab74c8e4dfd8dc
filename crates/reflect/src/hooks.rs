use std::rc::Rc;

use reflect_core::{Effect, Event, RenderCx, Result, Trigger, UnitConfig, Value};
use serde::de::DeserializeOwned;

/// A lifecycle callback: either a unit, triggered through the ambient scope
/// like any bound event, or a plain closure.
#[derive(Clone)]
pub enum Hook {
    Unit(Rc<dyn Trigger>),
    Callback(Rc<dyn Fn()>),
}

impl Hook {
    pub fn unit(trigger: impl Trigger + 'static) -> Self {
        Hook::Unit(Rc::new(trigger))
    }

    pub fn callback(f: impl Fn() + 'static) -> Self {
        Hook::Callback(Rc::new(f))
    }

    fn resolve(&self, cx: &mut RenderCx<'_>, config: &UnitConfig) -> Result<Rc<dyn Fn()>> {
        match self {
            Hook::Unit(trigger) => {
                let handler = cx.use_trigger(trigger.clone(), config)?;
                Ok(Rc::new(move || handler(Value::Null)))
            }
            Hook::Callback(f) => Ok(f.clone()),
        }
    }
}

impl<T: DeserializeOwned + 'static> From<Event<T>> for Hook {
    fn from(event: Event<T>) -> Self {
        Hook::unit(event)
    }
}

impl<T: DeserializeOwned + 'static> From<Effect<T>> for Hook {
    fn from(effect: Effect<T>) -> Self {
        Hook::unit(effect)
    }
}

#[derive(Clone, Default)]
pub struct Hooks {
    pub mounted: Option<Hook>,
    pub unmounted: Option<Hook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mounted(mut self, hook: impl Into<Hook>) -> Self {
        self.mounted = Some(hook.into());
        self
    }

    pub fn unmounted(mut self, hook: impl Into<Hook>) -> Self {
        self.unmounted = Some(hook.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_none() && self.unmounted.is_none()
    }

    /// Resolves both hooks for this render and arms them on the instance.
    /// `mounted` fires after the first commit, `unmounted` on teardown.
    pub(crate) fn install(&self, cx: &mut RenderCx<'_>, config: &UnitConfig) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let mounted = self.mounted.as_ref().map(|h| h.resolve(cx, config)).transpose()?;
        let unmounted = self.unmounted.as_ref().map(|h| h.resolve(cx, config)).transpose()?;
        cx.mount_effect(move || {
            if let Some(mounted) = mounted {
                mounted();
            }
            reflect_core::on_unmount(move || {
                if let Some(unmounted) = unmounted {
                    unmounted();
                }
            })
        });
        Ok(())
    }
}
