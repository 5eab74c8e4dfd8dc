use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reflect_core::*;
use serde::Serialize;

use crate::*;

fn log() -> Rc<RefCell<Vec<String>>> {
    Rc::new(RefCell::new(Vec::new()))
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

fn element(root: &Root) -> Element {
    root.output()
        .first_element()
        .cloned()
        .expect("rendered an element")
}

fn name_input() -> (Store<String>, Event<String>, Component) {
    let changed = Event::<String>::named("changed");
    let name = Store::named("name", String::new()).on(&changed, |_, v: &String| v.clone());
    let input = reflect(ReflectConfig::new(
        from_tag("input"),
        Bind::new()
            .with("value", name.clone())
            .with("placeholder", "Name")
            .with("on_change", changed.clone()),
    ));
    (name, changed, input)
}

#[test]
fn test_store_change_rerenders() {
    let (name, _, input) = name_input();
    let mut root = Root::new(input);
    insta::assert_snapshot!(
        root.render().unwrap().to_string(),
        @r#"<input on_change=fn placeholder="Name" value=""/>"#
    );

    assert!(element(&root).props.call("on_change", json!("Ann")));
    assert_eq!(name.get(), "Ann");
    assert!(root.is_dirty());
    assert!(root.flush().unwrap());
    insta::assert_snapshot!(
        root.output().to_string(),
        @r#"<input on_change=fn placeholder="Name" value="Ann"/>"#
    );
    assert!(!root.flush().unwrap());
}

#[test]
fn test_call_site_props_override_every_category() {
    let calls = log();
    let changed = Event::<String>::new();
    let value = Store::new("bound".to_string()).on(&changed, |_, v: &String| v.clone());
    let input = reflect(ReflectConfig::new(
        from_tag("input"),
        Bind::new()
            .with("value", value.clone())
            .with("placeholder", "bound")
            .with("on_change", changed.clone())
            .with("on_blur", func({
                let calls = calls.clone();
                move |_| calls.borrow_mut().push("bound blur".into())
            })),
    ));

    let caller = Props::new()
        .with("value", "caller")
        .with("placeholder", "caller")
        .with("on_change", handler({
            let calls = calls.clone();
            move |v| calls.borrow_mut().push(format!("caller change {v}"))
        }))
        .with("on_blur", handler({
            let calls = calls.clone();
            move |_| calls.borrow_mut().push("caller blur".into())
        }));

    let mut root = Root::with_props(input, caller);
    root.render().unwrap();
    let el = element(&root);
    assert_eq!(el.props.str("value"), Some("caller"));
    assert_eq!(el.props.str("placeholder"), Some("caller"));

    el.props.call("on_change", json!("x"));
    el.props.call("on_blur", Value::Null);
    assert_eq!(*calls.borrow(), vec![r#"caller change "x""#, "caller blur"]);
    assert_eq!(value.get(), "bound");
}

#[test]
fn test_rebinding_a_key_keeps_the_last_source() {
    let input = reflect(ReflectConfig::new(
        from_tag("input"),
        Bind::new()
            .with("value", "static")
            .with("value", Store::new(7i64)),
    ));
    let mut root = Root::new(input);
    insta::assert_snapshot!(root.render().unwrap().to_string(), @"<input value=7/>");
}

#[test]
fn test_hooks_fire_once_in_order() {
    let events = log();
    let mounted = Event::<()>::new();
    mounted.watch({
        let events = events.clone();
        move |_| events.borrow_mut().push("mounted".into())
    });
    let tick = Store::new(0i64);

    let view = reflect(
        ReflectConfig::new(from_tag("div"), Bind::new().with("tick", tick.clone())).hooks(
            Hooks::new().mounted(mounted.clone()).unmounted(Hook::callback({
                let events = events.clone();
                move || events.borrow_mut().push("unmounted".into())
            })),
        ),
    );

    let mut root = Root::new(view);
    root.render().unwrap();
    tick.set(1);
    root.flush().unwrap();
    root.render().unwrap();
    assert_eq!(*events.borrow(), vec!["mounted"]);

    root.unmount();
    root.unmount();
    assert_eq!(*events.borrow(), vec!["mounted", "unmounted"]);

    tick.set(2);
    assert!(!root.is_dirty());
    assert_eq!(tick.watcher_count(), 0);
}

#[test]
fn test_unit_hook_fires_in_ambient_scope() {
    let mounted = Event::<()>::new();
    let mounts = Store::new(0i64).on(&mounted, |n, _| n + 1);
    let view = reflect(
        ReflectConfig::new(from_tag("div"), Bind::new())
            .hooks(Hooks::new().mounted(mounted.clone())),
    );

    let scope = fork();
    let mut root = Root::new(view).with_scope(scope.clone());
    root.render().unwrap();
    assert_eq!(scope.get(&mounts), 1);
    assert_eq!(mounts.get(), 0);
}

#[derive(Clone, PartialEq, Serialize)]
struct Todo {
    id: String,
    title: String,
}

fn todo(id: &str, title: &str) -> Todo {
    Todo {
        id: id.into(),
        title: title.into(),
    }
}

/// An `li` stamped with the order in which its instance was created.
fn born_row() -> Component {
    let born = Rc::new(Cell::new(0u64));
    Component::from_fn("Row", move |cx, mut props| {
        let n = cx.remember(|| {
            born.set(born.get() + 1);
            born.get()
        });
        props.insert("born", *n);
        Ok(Node::element("li", props, vec![]))
    })
}

#[test]
fn test_list_spreads_items_and_keeps_keyed_state() {
    let row = born_row();
    let todos = Store::new(vec![todo("a", "A"), todo("b", "B"), todo("c", "C")]);
    let view = list(ListConfig::new(todos.clone(), row).get_key(|t: &Todo| t.id.clone()));

    let mut root = Root::new(view);
    insta::assert_snapshot!(
        root.render().unwrap().to_string(),
        @r#"<li born=1 id="a" title="A"/><li born=2 id="b" title="B"/><li born=3 id="c" title="C"/>"#
    );

    todos.update(|t| {
        t.remove(0);
    });
    root.flush().unwrap();
    insta::assert_snapshot!(
        root.output().to_string(),
        @r#"<li born=2 id="b" title="B"/><li born=3 id="c" title="C"/>"#
    );
}

#[test]
fn test_list_map_item_wins_over_shared_bind() {
    let todos = Store::new(vec![todo("a", "A"), todo("b", "B")]);
    let view = list(
        ListConfig::new(todos, from_tag("li"))
            .bind(Bind::new().with("class", "row").with("children", "shared"))
            .map_item("children", |t: &Todo, i| format!("{i}: {}", t.title)),
    );

    let mut root = Root::new(view);
    insta::assert_snapshot!(
        root.render().unwrap().to_string(),
        @r#"<li class="row">0: A</li><li class="row">1: B</li>"#
    );
}

#[test]
fn test_empty_list_renders_nothing() {
    let todos = Store::new(Vec::<Todo>::new());
    let mut root = Root::new(list(ListConfig::new(todos.clone(), from_tag("li"))));
    assert_eq!(root.render().unwrap().to_string(), "");

    todos.set(vec![todo("a", "A")]);
    root.flush().unwrap();
    assert_eq!(root.output().to_string(), r#"<li id="a" title="A"/>"#);
}

#[test]
fn test_list_of_non_records_needs_map_item() {
    let numbers = Store::new(vec![1i64, 2]);
    let mut root = Root::new(list(ListConfig::new(numbers.clone(), from_tag("li"))));
    assert!(matches!(
        root.render().unwrap_err(),
        CoreError::NotARecord { index: 0 }
    ));

    let mut root = Root::new(list(
        ListConfig::new(numbers, from_tag("li")).map_item("children", |n: &i64, _| *n),
    ));
    assert_eq!(root.render().unwrap().to_string(), "<li>1</li><li>2</li>");
}

#[test]
fn test_keyed_list_survives_middle_removal() {
    let todos = Store::new(vec![
        todo("a", "A"),
        todo("b", "B"),
        todo("c", "C"),
        todo("d", "D"),
    ]);
    let view = list(ListConfig::new(todos.clone(), born_row()).get_key(|t: &Todo| t.id.clone()));
    let mut root = Root::new(view);
    root.render().unwrap();

    todos.update(|t| {
        t.remove(1);
    });
    root.flush().unwrap();
    insta::assert_snapshot!(
        root.output().to_string(),
        @r#"<li born=1 id="a" title="A"/><li born=3 id="c" title="C"/><li born=4 id="d" title="D"/>"#
    );
}

#[test]
fn test_unkeyed_list_keeps_instances_by_position() {
    let todos = Store::new(vec![todo("a", "A"), todo("b", "B"), todo("c", "C")]);
    let mut root = Root::new(list(ListConfig::new(todos.clone(), born_row())));
    root.render().unwrap();
    // list, then a reflect wrapper and a row per item
    assert_eq!(root.instance_count(), 7);

    todos.update(|t| {
        t.remove(0);
    });
    root.flush().unwrap();
    insta::assert_snapshot!(
        root.output().to_string(),
        @r#"<li born=1 id="b" title="B"/><li born=2 id="c" title="C"/>"#
    );
    assert_eq!(root.instance_count(), 5);
}

#[test]
fn test_failed_list_releases_its_store_on_unmount() {
    let numbers = Store::new(vec![1i64, 2]);
    let items = list(ListConfig::new(numbers.clone(), from_tag("li")));
    let app = Component::from_fn("App", move |_, _| Ok(items.call(Props::new()).into()));

    let mut root = Root::new(app);
    assert!(root.render().is_err());
    assert!(root.render().is_err());
    assert_eq!(numbers.watcher_count(), 1);

    root.unmount();
    assert_eq!(numbers.watcher_count(), 0);
}

#[test]
fn test_variant_selects_case_or_default() {
    let mode = Store::new("a");
    let shared = Bind::new().with("children", "hi");
    let mut root = Root::new(variant(
        VariantConfig::new(mode.clone())
            .case("a", from_tag("a"))
            .case("b", from_tag("b"))
            .default_view(from_tag("none"))
            .bind(shared.clone()),
    ));
    assert_eq!(root.render().unwrap().to_string(), "<a>hi</a>");

    mode.set("b");
    root.flush().unwrap();
    assert_eq!(root.output().to_string(), "<b>hi</b>");

    mode.set("z");
    root.flush().unwrap();
    assert_eq!(root.output().to_string(), "<none>hi</none>");

    let mut bare = Root::new(variant(
        VariantConfig::new(mode.clone())
            .case("a", from_tag("a"))
            .bind(shared),
    ));
    assert!(bare.render().unwrap().is_empty());
}

#[test]
fn test_bool_variant() {
    let on = Store::new(true);
    let mut root = Root::new(variant(
        VariantConfig::when(on.clone(), from_tag("on")).otherwise(from_tag("off")),
    ));
    assert_eq!(root.render().unwrap().to_string(), "<on/>");
    on.set(false);
    root.flush().unwrap();
    assert_eq!(root.output().to_string(), "<off/>");

    let mut only = Root::new(variant(VariantConfig::when(on.clone(), from_tag("on"))));
    assert_eq!(only.render().unwrap().to_string(), "");
    on.set(true);
    only.flush().unwrap();
    assert_eq!(only.output().to_string(), "<on/>");
}

fn lifecycle_hooks(events: &Rc<RefCell<Vec<String>>>) -> Hooks {
    Hooks::new()
        .mounted(Hook::callback({
            let events = events.clone();
            move || events.borrow_mut().push("mount".into())
        }))
        .unmounted(Hook::callback({
            let events = events.clone();
            move || events.borrow_mut().push("unmount".into())
        }))
}

#[test]
fn test_variant_hooks_span_branch_switches() {
    let events = log();
    let on = Store::new(true);
    let mut root = Root::new(variant(
        VariantConfig::when(on.clone(), from_tag("on"))
            .otherwise(from_tag("off"))
            .hooks(lifecycle_hooks(&events)),
    ));

    root.render().unwrap();
    on.set(false);
    root.flush().unwrap();
    assert_eq!(root.output().to_string(), "<off/>");
    on.set(true);
    root.flush().unwrap();
    assert_eq!(*events.borrow(), vec!["mount"]);

    root.unmount();
    assert_eq!(*events.borrow(), vec!["mount", "unmount"]);
}

#[test]
fn test_variant_hooks_fire_with_nothing_selected() {
    let events = log();
    let on = Store::new(false);
    let mut root = Root::new(variant(
        VariantConfig::when(on.clone(), from_tag("on")).hooks(lifecycle_hooks(&events)),
    ));

    assert!(root.render().unwrap().is_empty());
    assert_eq!(*events.borrow(), vec!["mount"]);
    on.set(true);
    root.flush().unwrap();
    on.set(false);
    root.flush().unwrap();
    root.unmount();
    assert_eq!(*events.borrow(), vec!["mount", "unmount"]);
}

#[test]
fn test_bound_functions_follow_scope() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let functions = vec![(
        "probe".to_string(),
        handler({
            let seen = seen.clone();
            move |_| seen.borrow_mut().push(current_scope())
        }),
    )];

    let unscoped = bind_functions(&functions, None);
    unscoped.call("probe", Value::Null);

    let scope = fork();
    let scoped = bind_functions(&functions, Some(&scope));
    scoped.call("probe", Value::Null);

    assert_eq!(*seen.borrow(), vec![None, Some(scope)]);
    assert!(current_scope().is_none());
}

#[test]
fn test_reflected_callback_runs_in_ambient_scope() {
    let add = Event::<i64>::new();
    let total = Store::new(0i64).on(&add, |t, n| t + n);
    let view = reflect(ReflectConfig::new(
        from_tag("button"),
        Bind::new().with("on_click", func({
            let add = add.clone();
            move |_| add.emit(5)
        })),
    ));

    let scope = fork();
    let mut root = Root::new(view).with_scope(scope.clone());
    root.render().unwrap();
    element(&root).props.call("on_click", Value::Null);
    assert_eq!(scope.get(&total), 5);
    assert_eq!(total.get(), 0);
}

#[test]
fn test_scopes_are_isolated_through_reflect() {
    let (name, _, input) = name_input();
    let a = fork();
    let b = fork();
    let mut root_a = Root::new(input.clone()).with_scope(a.clone());
    let mut root_b = Root::new(input).with_scope(b.clone());
    root_a.render().unwrap();
    root_b.render().unwrap();

    element(&root_a).props.call("on_change", json!("only a"));
    assert!(root_a.is_dirty());
    assert!(!root_b.is_dirty());
    root_a.flush().unwrap();

    assert_eq!(element(&root_a).props.str("value"), Some("only a"));
    assert_eq!(element(&root_b).props.str("value"), Some(""));
    assert_eq!(a.get(&name), "only a");
    assert_eq!(b.get(&name), "");
    assert_eq!(name.get(), "");
}

#[test]
fn test_ref_reaches_primitive_element() {
    let (_, _, input) = name_input();
    let node_ref = NodeRef::new();
    let mut root = Root::new(input);
    root.set_node_ref(Some(node_ref.clone()));
    root.render().unwrap();

    let el = node_ref.current().expect("ref attached");
    assert_eq!(el.tag, "input");
    assert!(!el.props.contains_key(REF));
    assert!(!root.output().to_string().contains("ref"));
}

#[test]
fn test_ref_forwarded_through_variant() {
    let node_ref = NodeRef::new();
    let mut root = Root::new(variant(VariantConfig::when(Store::new(true), from_tag("on"))));
    root.set_node_ref(Some(node_ref.clone()));
    root.render().unwrap();
    assert_eq!(node_ref.current().map(|el| el.tag), Some("on".to_string()));
}

#[test]
fn test_handlers_are_stable_across_renders() {
    let tick = Store::new(0i64);
    let changed = Event::<String>::new();
    let view = reflect(ReflectConfig::new(
        from_tag("input"),
        Bind::new()
            .with("tick", tick.clone())
            .with("on_change", changed)
            .with("on_blur", func(|_| {})),
    ));

    let mut root = Root::new(view).with_scope(fork());
    root.render().unwrap();
    let before = element(&root).props;
    tick.set(1);
    root.flush().unwrap();
    let after = element(&root).props;

    assert_eq!(after.value("tick"), Some(&json!(1)));
    for key in ["on_change", "on_blur"] {
        let (a, b) = (before.handler(key).unwrap(), after.handler(key).unwrap());
        assert!(same_handler(&a, &b), "{key} changed identity");
    }
}

#[test]
fn test_force_scope_requires_a_scope() {
    let flag = Store::named("flag", true);
    let strict = reflect(
        ReflectConfig::new(from_tag("div"), Bind::new().with("flag", flag.clone()))
            .unit_config(UnitConfig::default().force_scope(true)),
    );

    let mut root = Root::new(strict.clone());
    let err = root.render().unwrap_err();
    assert!(matches!(err, CoreError::ScopeRequired { ref unit } if unit == "flag"));

    let mut scoped = Root::new(strict).with_scope(fork());
    assert_eq!(scoped.render().unwrap().to_string(), "<div flag=true/>");
}

#[test]
fn test_create_reflect_fixes_the_view() {
    let bind_input = create_reflect(from_tag("input"));
    let text = bind_input(Bind::new().with("type", "text"), Features::default());
    let check = bind_input(Bind::new().with("type", "checkbox"), Features::default());

    assert_eq!(Root::new(text).render().unwrap().to_string(), r#"<input type="text"/>"#);
    assert_eq!(
        Root::new(check).render().unwrap().to_string(),
        r#"<input type="checkbox"/>"#
    );
}

#[test]
fn test_bad_payload_is_dropped() {
    let (name, _, input) = name_input();
    let mut root = Root::new(input);
    root.render().unwrap();
    element(&root).props.call("on_change", json!(42));
    assert_eq!(name.get(), "");
    assert!(!root.is_dirty());
}
