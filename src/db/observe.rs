//! Change subscriptions over the local record collection.

use std::sync::Arc;
use tokio::sync::watch;

use super::blogs::BlogRecord;

/// Live view of the whole collection.
///
/// The first [`Subscription::next`] returns the current result set right away;
/// later calls wait for the next committed write. Dropping the subscription
/// unregisters it.
pub struct Subscription {
  rx: watch::Receiver<Arc<Vec<BlogRecord>>>,
  delivered_initial: bool,
}

impl Subscription {
  pub(super) fn new(rx: watch::Receiver<Arc<Vec<BlogRecord>>>) -> Self {
    Self {
      rx,
      delivered_initial: false,
    }
  }

  /// Next result set, or `None` once the store is gone.
  pub async fn next(&mut self) -> Option<Arc<Vec<BlogRecord>>> {
    if !self.delivered_initial {
      self.delivered_initial = true;
      return Some(self.rx.borrow_and_update().clone());
    }

    self.rx.changed().await.ok()?;
    Some(self.rx.borrow_and_update().clone())
  }
}

/// Live view of a single record, keyed by id.
///
/// Only reports when the record itself changes (appears, or any field differs).
pub struct RecordSubscription {
  inner: Subscription,
  id: String,
  last: Option<Option<BlogRecord>>,
}

impl RecordSubscription {
  pub(super) fn new(inner: Subscription, id: String) -> Self {
    Self {
      inner,
      id,
      last: None,
    }
  }

  /// Next state of the record (`Some(None)` while it does not exist), or
  /// `None` once the store is gone.
  pub async fn next(&mut self) -> Option<Option<BlogRecord>> {
    loop {
      let records = self.inner.next().await?;
      let current = records.iter().find(|r| r.id == self.id).cloned();

      if self.last.as_ref() != Some(&current) {
        self.last = Some(current.clone());
        return Some(current);
      }
    }
  }
}
