//! LocalStorage 封装模块
//!
//! 使用 `web_sys::Storage` 提供本地存储接口，并实现引擎的 `SessionStore`。

use gitdeploy_console::SessionStore;

/// 本地存储操作封装
///
/// 提供静态方法访问浏览器 LocalStorage API。
pub struct BrowserStorage;

impl BrowserStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }

    /// 获取存储的字符串值
    ///
    /// # 返回
    /// - `Some(String)` 如果键存在且有值
    /// - `None` 如果键不存在或发生错误
    pub fn get(key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok()?
    }

    /// 设置存储值，返回操作是否成功
    pub fn set(key: &str, value: &str) -> bool {
        Self::storage()
            .and_then(|s| s.set_item(key, value).ok())
            .is_some()
    }

    /// 删除存储的键值对，返回操作是否成功
    pub fn delete(key: &str) -> bool {
        Self::storage()
            .and_then(|s| s.remove_item(key).ok())
            .is_some()
    }
}

/// 以固定键保存会话令牌
pub struct LocalStorageStore {
    key: String,
}

impl LocalStorageStore {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl SessionStore for LocalStorageStore {
    fn get_token(&self) -> Option<String> {
        BrowserStorage::get(&self.key).filter(|t| !t.is_empty())
    }

    fn set_token(&self, token: &str) {
        if !BrowserStorage::set(&self.key, token) {
            log::error!("[Storage] failed to persist token");
        }
    }

    fn clear_token(&self) {
        if !BrowserStorage::delete(&self.key) {
            log::warn!("[Storage] failed to remove token");
        }
    }
}
