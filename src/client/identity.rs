//! Logged-in customer identity as seen by the client

use std::sync::Arc;
use tokio::sync::watch;

/// Source of the logged-in customer id, if any.
pub trait CustomerIdentity: Send + Sync {
    fn logged_in_customer_id(&self) -> Option<i64>;
}

/// Shared, observable login state. Clones observe the same value.
#[derive(Clone, Debug)]
pub struct IdentityHandle {
    tx: Arc<watch::Sender<Option<i64>>>,
}

impl IdentityHandle {
    pub fn new(customer_id: Option<i64>) -> Self {
        let (tx, _) = watch::channel(customer_id);
        Self { tx: Arc::new(tx) }
    }

    pub fn login(&self, customer_id: i64) { self.set(Some(customer_id)); }

    pub fn logout(&self) { self.set(None); }

    fn set(&self, customer_id: Option<i64>) {
        self.tx.send_if_modified(|current| {
            let changed = *current != customer_id;
            *current = customer_id;
            changed
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<i64>> { self.tx.subscribe() }
}

impl CustomerIdentity for IdentityHandle {
    fn logged_in_customer_id(&self) -> Option<i64> { *self.tx.borrow() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_notifies_once() {
        let identity = IdentityHandle::new(None);
        let mut rx = identity.subscribe();
        identity.login(7);
        identity.login(7);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Some(7));
        assert!(!rx.has_changed().unwrap());
        identity.logout();
        assert_eq!(identity.logged_in_customer_id(), None);
        assert!(rx.has_changed().unwrap());
    }
}
