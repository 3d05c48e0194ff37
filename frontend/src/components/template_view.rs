use std::sync::Arc;

use gitdeploy_console::component::{ComponentDefinition, Scope};
use leptos::prelude::*;

use crate::context::use_shell;

/// 渲染已解析组件的模板
///
/// 作用域 = 蓝图 data + 当前用户属性 + computed，再叠加组件的本地状态。
/// 用户信息变化时自动重新渲染。
#[component]
pub fn TemplateView(
    definition: Arc<ComponentDefinition>,
    /// 覆盖 data 的本地状态
    #[prop(optional, into)]
    local: Option<Signal<Scope>>,
) -> impl IntoView {
    let ctx = use_shell();
    let class = format!("component component-{}", definition.name());

    let html = move || {
        let props = ctx.state.with(|s| s.user_props());
        let mut scope = definition.scope(&props);
        if let Some(local) = local {
            scope.extend(local.get());
        }
        definition.render(&scope)
    };

    view! { <div class=class inner_html=html></div> }
}
