//! Notifications rendered as transient toasts.

use std::cell::Cell;

use flowdesign_designer::{Level, Notification, Notifier};
use gloo_timers::callback::Timeout;
use leptos::prelude::*;

const TOAST_MILLIS: u32 = 3_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub level: Level,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self.level {
            Level::Info => "toast toast-info",
            Level::Success => "toast toast-success",
            Level::Warning => "toast toast-warning",
            Level::Error => "toast toast-error",
        }
    }
}

/// Pushes notifications into a signal and removes each after a few seconds
#[derive(Debug)]
pub struct ToastNotifier {
    toasts: RwSignal<Vec<Toast>>,
    next_id: Cell<u64>,
}

impl ToastNotifier {
    #[must_use]
    pub fn new(toasts: RwSignal<Vec<Toast>>) -> Self {
        Self {
            toasts,
            next_id: Cell::new(0),
        }
    }
}

impl Notifier for ToastNotifier {
    fn notify(&self, notification: Notification) {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));

        let toasts = self.toasts;
        let _ = toasts.try_update(|list| {
            list.push(Toast {
                id,
                level: notification.level,
                message: notification.message,
            });
        });
        Timeout::new(TOAST_MILLIS, move || {
            let _ = toasts.try_update(|list| list.retain(|toast| toast.id != id));
        })
        .forget();
    }
}

#[component]
pub fn ToastList(toasts: RwSignal<Vec<Toast>>) -> impl IntoView {
    view! {
        <div class="toast-list">
            <For
                each=move || toasts.get()
                key=|toast| toast.id
                children=move |toast| {
                    let class = toast.class();
                    view! { <div class=class>{toast.message}</div> }
                }
            />
        </div>
    }
}
