use jl_core::DocumentHost;
use jl_core::EventKind;
use jl_core::WindowHost;
use jl_dom::NodeId;
use jl_lazy::Activation;
use jl_lazy::LazyOptions;
use jl_lazy::LoadOutcome;
use jl_lazy::register_lazy_load;
use jl_lazy::register_lazy_load_by_class;
use jl_page::Page;
use jl_page::PageConfig;
use jl_page::StaticImageLoader;
use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

// Viewport is 800px tall. `near` sits at 850, `far` at 3000.
const LONG_PAGE: &str = r#"<html><body>
<div style="height: 850px"></div>
<span id="near" class="lazy" data-src="near.png" data-alt="near" height="100"></span>
<div style="height: 2050px"></div>
<span id="far" class="lazy" data-src="far.png" data-alt="" height="100"></span>
<div style="height: 1000px"></div>
</body></html>"#;

fn long_page() -> Page {
    Page::from_html(
        LONG_PAGE,
        PageConfig::default(),
        StaticImageLoader::new().with_fallback(10, 100),
    )
}

fn placeholder(page: &Page, id: &str) -> NodeId {
    page.element_by_id(id).expect("placeholder present")
}

fn counting_options(loads: &Rc<Cell<u32>>) -> LazyOptions<Page> {
    let loads = Rc::clone(loads);
    LazyOptions::new().with_on_replace(move |_page: &mut Page, _img: NodeId| {
        loads.set(loads.get() + 1);
    })
}

#[test]
fn visible_placeholder_loads_synchronously_without_binding() {
    let mut page = Page::from_html(
        r#"<body><span id="p" data-src="a.png" data-alt="a"></span></body>"#,
        PageConfig::default(),
        StaticImageLoader::new(),
    );
    let p = placeholder(&page, "p");
    let replaced = Rc::new(Cell::new(0));

    let activation =
        register_lazy_load(&mut page, p, counting_options(&replaced)).expect("register");

    assert!(matches!(activation, Activation::Immediate(LoadOutcome::Replaced(_))));
    assert_eq!(replaced.get(), 1);
    assert_eq!(page.listener_count(EventKind::Scroll), 0);
    assert!(!page.is_connected(p));
}

#[test]
fn hidden_placeholder_waits_for_a_qualifying_scroll() {
    let mut page = long_page();
    let far = placeholder(&page, "far");
    let replaced = Rc::new(Cell::new(0));

    let activation =
        register_lazy_load(&mut page, far, counting_options(&replaced)).expect("register");
    assert!(matches!(activation, Activation::Pending(_)));
    assert_eq!(page.listener_count(EventKind::Scroll), 1);

    page.scroll_to(1000.0);
    page.scroll_to(2000.0);
    assert_eq!(replaced.get(), 0);
    assert!(page.is_connected(far));

    page.scroll_to(2200.0);
    assert_eq!(replaced.get(), 1);
    assert!(!page.is_connected(far));
    assert_eq!(page.listener_count(EventKind::Scroll), 0);
}

#[test]
fn a_fired_listener_never_loads_twice() {
    let mut page = long_page();
    let near = placeholder(&page, "near");
    let replaced = Rc::new(Cell::new(0));

    let Activation::Pending(listener) =
        register_lazy_load(&mut page, near, counting_options(&replaced)).expect("register")
    else {
        panic!("placeholder below the fold must wait");
    };

    page.scroll_to(100.0);
    page.scroll_to(200.0);
    page.dispatch_event(EventKind::Scroll);

    assert_eq!(replaced.get(), 1);
    assert!(!page.remove_event_listener(EventKind::Scroll, listener));
}

#[test]
fn threshold_starts_loading_before_the_fold() {
    let mut page = long_page();
    let near = placeholder(&page, "near");
    let replaced = Rc::new(Cell::new(0));

    let activation = register_lazy_load(
        &mut page,
        near,
        counting_options(&replaced).with_threshold(100.0),
    )
    .expect("register");

    assert!(matches!(activation, Activation::Immediate(_)));
    assert_eq!(replaced.get(), 1);
}

#[test]
fn negative_threshold_waits_until_past_the_edge() {
    let mut page = long_page();
    let near = placeholder(&page, "near");
    let replaced = Rc::new(Cell::new(0));

    register_lazy_load(
        &mut page,
        near,
        counting_options(&replaced).with_threshold(-200.0),
    )
    .expect("register");

    // top = 850 - 200 = 650, 650 - 800 = -150 > -200
    page.scroll_to(200.0);
    assert_eq!(replaced.get(), 0);

    // top = 600, 600 - 800 = -200
    page.scroll_to(250.0);
    assert_eq!(replaced.get(), 1);
}

#[test]
fn scroll_path_reports_validation_failures_through_on_error() {
    let mut page = Page::from_html(
        r#"<body><div style="height: 2000px"></div><span id="p" data-alt="x"></span><div style="height: 500px"></div></body>"#,
        PageConfig::default(),
        StaticImageLoader::new(),
    );
    let p = placeholder(&page, "p");
    let errors = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&errors);
    let options = LazyOptions::<Page>::new()
        .with_on_error(move |_page: &mut Page, node: NodeId| sink.borrow_mut().push(node));

    register_lazy_load(&mut page, p, options).expect("register");
    page.scroll_to(1500.0);
    page.scroll_to(1600.0);

    assert_eq!(*errors.borrow(), vec![p]);
    assert!(page.is_connected(p));
    assert_eq!(page.listener_count(EventKind::Scroll), 0);
}

#[test]
fn placeholder_detached_while_pending_is_released_on_next_scroll() {
    let mut page = long_page();
    let far = placeholder(&page, "far");
    let replaced = Rc::new(Cell::new(0));
    register_lazy_load(&mut page, far, counting_options(&replaced)).expect("register");

    let parent = page.parent_node(far).expect("parent");
    let stand_in = page.create_element("div");
    page.replace_child(parent, stand_in, far).expect("detach");
    assert_eq!(page.listener_count(EventKind::Scroll), 1);

    page.scroll_to(10.0);

    assert_eq!(replaced.get(), 0);
    assert_eq!(page.listener_count(EventKind::Scroll), 0);
    assert!(page.is_connected(stand_in));
}

#[test]
fn by_class_registers_each_placeholder_with_shared_callbacks() {
    let mut page = long_page();
    let near = placeholder(&page, "near");
    let far = placeholder(&page, "far");
    let replaced = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&replaced);
    let options = LazyOptions::<Page>::new()
        .with_threshold(60.0)
        .with_on_replace(move |page: &mut Page, img: NodeId| {
            sink.borrow_mut().push(page.get_attribute(img, "src"));
        });

    let activations = register_lazy_load_by_class(&mut page, "lazy", &options).expect("register");

    assert_eq!(activations.len(), 2);
    assert!(matches!(activations[0], Activation::Immediate(_)));
    assert!(matches!(activations[1], Activation::Pending(_)));
    assert!(!page.is_connected(near));
    assert!(page.is_connected(far));

    page.scroll_to(page.max_scroll_y());
    assert_eq!(
        *replaced.borrow(),
        vec![Some("near.png".to_owned()), Some("far.png".to_owned())]
    );
}

#[test]
fn by_class_with_no_matches_does_nothing() {
    let mut page = long_page();
    let activations =
        register_lazy_load_by_class(&mut page, "missing", &LazyOptions::default()).expect("ok");
    assert!(activations.is_empty());
    assert_eq!(page.listener_count(EventKind::Scroll), 0);
}

#[test]
fn load_callback_fires_once_the_host_finishes_loading() {
    let mut page = long_page();
    let far = placeholder(&page, "far");
    let loaded = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&loaded);
    let options = LazyOptions::<Page>::new()
        .with_on_load(move |page: &mut Page, img: NodeId| {
            sink.borrow_mut().push(page.get_attribute(img, "alt"));
        });

    register_lazy_load(&mut page, far, options).expect("register");
    page.scroll_to(page.max_scroll_y());
    assert!(loaded.borrow().is_empty());

    page.flush_image_loads(16);
    assert_eq!(*loaded.borrow(), vec![Some(String::new())]);
}

#[test]
fn falls_back_to_client_height_without_inner_height() {
    let mut page = Page::from_html(
        LONG_PAGE,
        PageConfig {
            viewport_height: None,
            client_height: 900.0,
            ..PageConfig::default()
        },
        StaticImageLoader::new(),
    );
    let near = placeholder(&page, "near");
    let activation =
        register_lazy_load(&mut page, near, LazyOptions::default()).expect("register");
    assert!(matches!(activation, Activation::Immediate(_)));
}
