use std::sync::Arc;

use gitdeploy_console::component::{ComponentDefinition, Scope};
use leptos::prelude::*;
use leptos::task::spawn_local;

use crate::components::template_view::TemplateView;
use crate::context::use_shell;
use crate::web::router::use_router;

/// 导航栏
///
/// 挂载后请求当前用户；用户为空时回到登录页。
#[component]
pub fn NavbarView(definition: Arc<ComponentDefinition>) -> impl IntoView {
    let ctx = use_shell();
    let router = use_router();
    let ready = RwSignal::new(false);

    Effect::new(move |_| {
        let shell = ctx.shell();
        spawn_local(async move {
            match shell.get_user().await {
                Ok(user) if !user.is_empty() => ready.set(true),
                Ok(_) => router.navigate(&shell.config().signin_path),
                Err(e) => log::error!("[Navbar] failed to load user: {}", e),
            }
        });
    });

    let local = Signal::derive(move || {
        let mut scope = Scope::new();
        scope.insert("ready".into(), ready.get().into());
        scope
    });

    view! { <TemplateView definition=definition local=local /> }
}
