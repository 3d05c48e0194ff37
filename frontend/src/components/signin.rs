use std::sync::Arc;

use gitdeploy_console::component::{ComponentDefinition, Scope};
use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlFormElement, HtmlInputElement};

use crate::components::template_view::TemplateView;
use crate::context::use_shell;
use crate::web::router::use_router;

/// 从提交的表单中读取 email 输入框
fn submitted_email(ev: &SubmitEvent) -> Option<String> {
    let form = ev.target()?.dyn_into::<HtmlFormElement>().ok()?;
    let input = form
        .query_selector("input[name=email], input[type=email]")
        .ok()??
        .dyn_into::<HtmlInputElement>()
        .ok()?;
    let email = input.value().trim().to_string();
    (!email.is_empty()).then_some(email)
}

/// 登录页
///
/// 模板中的表单提交被这里接管：email 作为令牌保存，然后回到首页。
#[component]
pub fn SigninView(definition: Arc<ComponentDefinition>) -> impl IntoView {
    let ctx = use_shell();
    let router = use_router();

    let local = Signal::derive(|| {
        let mut scope = Scope::new();
        scope.insert("state".into(), "signingIn".into());
        scope
    });

    let on_submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        ev.stop_propagation();

        let Some(email) = submitted_email(&ev) else {
            log::warn!("[Signin] submitted without an email");
            return;
        };

        let shell = ctx.shell();
        // 服务端尚无签发接口，email 直接作为令牌
        if shell.sign_in(&email) {
            router.navigate(&shell.config().home_path);
        }
    };

    view! {
        <div on:submit=on_submit>
            <TemplateView definition=definition local=local />
        </div>
    }
}
