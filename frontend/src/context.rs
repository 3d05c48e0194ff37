//! 外壳上下文
//!
//! 把引擎的 `AppShell` 注入组件树，并把它的状态镜像为响应式信号。

use std::rc::Rc;

use gitdeploy_console::{AppShell, ShellState};
use leptos::prelude::*;
use leptos::reactive::owner::LocalStorage;

use crate::web::{FetchHttpClient, LocalStorageStore};

pub type Shell = AppShell<FetchHttpClient, LocalStorageStore>;

/// 外壳上下文
///
/// `Copy`，通过 Context 在组件间共享。外壳本身不是 `Send`，保存在本地存储区。
#[derive(Clone, Copy)]
pub struct ShellContext {
    shell: StoredValue<Rc<Shell>, LocalStorage>,
    /// 当前用户、就绪标记、错误横幅（只读镜像）
    pub state: ReadSignal<ShellState>,
}

impl ShellContext {
    pub fn new(shell: Rc<Shell>) -> Self {
        let (state, set_state) = signal(shell.state());
        shell.subscribe(move |s| set_state.set(s.clone()));
        Self {
            shell: StoredValue::new_local(shell),
            state,
        }
    }

    pub fn shell(&self) -> Rc<Shell> {
        self.shell.get_value()
    }

    pub fn signed_in_signal(&self) -> Signal<bool> {
        let state = self.state;
        Signal::derive(move || state.with(|s| s.signed_in()))
    }
}

/// 从 Context 获取外壳上下文
pub fn use_shell() -> ShellContext {
    use_context::<ShellContext>().expect("ShellContext should be provided")
}
