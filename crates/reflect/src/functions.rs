use std::rc::Rc;

use reflect_core::{Handler, Prop, Props, RenderCx, Scope, Value, scope_bind_safe};

pub type Functions = Vec<(String, Handler)>;

/// Rebinds each function to run inside `scope`. Without a scope the
/// functions run unscoped.
pub fn bind_functions(functions: &[(String, Handler)], scope: Option<&Scope>) -> Props {
    functions
        .iter()
        .map(|(key, f)| {
            let f = f.clone();
            let bound = scope_bind_safe(move |payload: Value| f(payload), scope.cloned());
            (key.clone(), Prop::Handler(bound))
        })
        .collect()
}

/// [`bind_functions`] cached per instance until the ambient scope or the
/// function set changes, so views see stable handler identities.
pub(crate) fn use_bound_functions(cx: &mut RenderCx<'_>, functions: &Rc<Functions>) -> Props {
    if functions.is_empty() {
        return Props::new();
    }
    let scope = cx.scope();
    let key = (scope.as_ref().map(Scope::id), Rc::as_ptr(functions) as usize);
    cx.memo(key, || bind_functions(functions, scope.as_ref()))
}
