//! 会话令牌存储
//!
//! 令牌是不透明字符串，只作为"可能已登录"的本地信号，客户端不做任何校验。

use std::cell::RefCell;
use std::collections::HashMap;

/// 持久化的会话存储
///
/// 浏览器中由 LocalStorage 实现；所有调用都发生在 UI 事件循环上，无需同步。
pub trait SessionStore {
    /// 读取令牌；不存在或为空时返回 `None`
    fn get_token(&self) -> Option<String>;

    fn set_token(&self, token: &str);

    fn clear_token(&self);
}

/// 内存实现，用于测试和非浏览器目标
#[derive(Debug, Default)]
pub struct MemoryStore {
    key: String,
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            items: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_token(key: &str, token: &str) -> Self {
        let store = Self::new(key);
        store.set_token(token);
        store
    }
}

impl SessionStore for MemoryStore {
    fn get_token(&self) -> Option<String> {
        self.items
            .borrow()
            .get(&self.key)
            .filter(|t| !t.is_empty())
            .cloned()
    }

    fn set_token(&self, token: &str) {
        self.items
            .borrow_mut()
            .insert(self.key.clone(), token.to_string());
    }

    fn clear_token(&self) {
        self.items.borrow_mut().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_reads_as_absent() {
        let store = MemoryStore::with_token("token", "");
        assert_eq!(store.get_token(), None);
    }

    #[test]
    fn set_then_clear() {
        let store = MemoryStore::new("token");
        assert_eq!(store.get_token(), None);
        store.set_token("abc");
        assert_eq!(store.get_token().as_deref(), Some("abc"));
        store.clear_token();
        assert_eq!(store.get_token(), None);
    }
}
