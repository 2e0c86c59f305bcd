mod api;
mod app;
mod colors;
mod map_view;
mod overlay;
mod panels;
mod render_loop;
mod spatial;
mod tiles;
mod toolbar;
mod viewport;

use std::any::Any;
use std::cell::RefCell;

use leptos::mount::mount_to;
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

/// Id of the container element in `index.html`.
const MOUNT_ID: &str = "app";

thread_local! {
    static MOUNTED: RefCell<Option<Box<dyn Any>>> = const { RefCell::new(None) };
}

/// The `#app` container, or the page body when the shell lacks one.
fn mount_target() -> Option<HtmlElement> {
    let document = web_sys::window()?.document()?;
    let container = document
        .get_element_by_id(MOUNT_ID)
        .and_then(|node| node.dyn_into::<HtmlElement>().ok());
    if container.is_none() {
        web_sys::console::warn_1(&format!("no #{MOUNT_ID} element, mounting on <body>").into());
    }
    container.or_else(|| document.body())
}

fn main() {
    console_error_panic_hook::set_once();
    let Some(target) = mount_target() else {
        web_sys::console::error_1(&"no document to mount the opportunity map into".into());
        return;
    };

    MOUNTED.with(|mounted| {
        // Unmount first; a second live tree would keep its fetch and redraw effects.
        drop(mounted.borrow_mut().take());
        let handle = mount_to(target, app::App);
        *mounted.borrow_mut() = Some(Box::new(handle));
    });
}
