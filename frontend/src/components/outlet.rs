//! 路由出口
//!
//! 把最近一次导航的插槽渲染为 `<header>` / `<main>` / `<footer>`。

use std::sync::Arc;

use gitdeploy_console::component::{ComponentDefinition, catalog};
use gitdeploy_console::{Slot, SlotContent};
use leptos::ev::MouseEvent;
use leptos::prelude::*;

use crate::components::navbar::NavbarView;
use crate::components::signin::SigninView;
use crate::components::template_view::TemplateView;
use crate::context::use_shell;
use crate::web::router::{intercept_link_click, use_router};

/// 按组件名挂接行为；其余组件只渲染模板
fn component_view(definition: Arc<ComponentDefinition>) -> AnyView {
    match definition.name() {
        catalog::SIGNIN => view! { <SigninView definition=definition /> }.into_any(),
        catalog::NAVBAR => view! { <NavbarView definition=definition /> }.into_any(),
        _ => view! { <TemplateView definition=definition /> }.into_any(),
    }
}

fn slot_view(slot: Slot, content: SlotContent) -> AnyView {
    let body = match content {
        SlotContent::Ready(definition) => component_view(definition),
        // 解析失败：留下空区域，错误已由引擎记录
        SlotContent::Failed(e) => {
            view! { <div class="component-error" data-error=e.error_code() title=e.to_string()></div> }
                .into_any()
        }
    };

    match slot {
        Slot::Header => view! { <header>{body}</header> }.into_any(),
        Slot::Main => view! { <main>{body}</main> }.into_any(),
        Slot::Footer => view! { <footer>{body}</footer> }.into_any(),
    }
}

/// 路由出口组件
///
/// 根据当前导航结果渲染插槽，并代理模板内站内链接的点击。
#[component]
pub fn RouterOutlet() -> impl IntoView {
    let router = use_router();
    let on_click = move |ev: MouseEvent| intercept_link_click(router, &ev);

    view! {
        <div class="router-outlet" on:click=on_click>
            {move || match router.current().get() {
                None => view! { <div class="loading">"Loading..."</div> }.into_any(),
                Some(navigation) => navigation
                    .slots
                    .into_iter()
                    .map(|(slot, content)| slot_view(slot, content))
                    .collect_view()
                    .into_any(),
            }}
        </div>
    }
}

/// 错误横幅：守卫失败等需要用户知晓的错误
#[component]
pub fn ErrorBanner() -> impl IntoView {
    let ctx = use_shell();
    let message = move || ctx.state.with(|s| s.banner.as_ref().map(|e| e.to_string()));

    view! {
        <Show when=move || message().is_some()>
            <div role="alert" class="alert alert-error">
                <span>{move || message().unwrap_or_default()}</span>
                <button class="btn btn-sm btn-ghost" on:click=move |_| ctx.shell().dismiss_banner()>
                    "×"
                </button>
            </div>
        </Show>
    }
}
