//! WASM entry point: a standalone designer page.

use flowdesign_designer::HandleSlot;
use flowdesign_ui::FlowDesigner;
use leptos::prelude::*;

fn main() {
    // Set up panic hook for better error messages in browser console
    console_error_panic_hook::set_once();

    mount_to_body(|| {
        let handle = HandleSlot::new();
        view! { <FlowDesigner project_id=1 handle=handle /> }
    })
}
