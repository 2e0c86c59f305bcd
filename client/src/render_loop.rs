use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

/// Coalesces redraw requests into one `requestAnimationFrame` callback.
///
/// Any number of `mark_dirty()` calls between two frames produce a single call to
/// the draw function.
pub struct RenderScheduler {
    inner: Rc<Inner>,
}

struct Inner {
    window: Option<web_sys::Window>,
    scheduled: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    callback: RefCell<Option<Closure<dyn FnMut()>>>,
}

impl RenderScheduler {
    pub fn new(draw: impl Fn() + 'static) -> Self {
        let inner = Rc::new(Inner {
            window: web_sys::window(),
            scheduled: Cell::new(false),
            raf_id: Cell::new(None),
            callback: RefCell::new(None),
        });

        let inner_cb = inner.clone();
        let cb = Closure::<dyn FnMut()>::new(move || {
            inner_cb.scheduled.set(false);
            inner_cb.raf_id.set(None);
            draw();
        });
        *inner.callback.borrow_mut() = Some(cb);

        Self { inner }
    }

    pub fn mark_dirty(&self) {
        if self.inner.scheduled.get() {
            return;
        }
        let Some(window) = self.inner.window.as_ref() else {
            return;
        };
        let cb_ref = self.inner.callback.borrow();
        let Some(cb) = cb_ref.as_ref() else {
            return;
        };
        if let Ok(id) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
            self.inner.scheduled.set(true);
            self.inner.raf_id.set(Some(id));
        }
    }
}

impl Drop for RenderScheduler {
    fn drop(&mut self) {
        if let Some(raf_id) = self.inner.raf_id.replace(None)
            && let Some(window) = self.inner.window.as_ref()
        {
            let _ = window.cancel_animation_frame(raf_id);
        }
        self.inner.scheduled.set(false);
        // Break the callback->inner reference cycle on teardown.
        self.inner.callback.borrow_mut().take();
    }
}
