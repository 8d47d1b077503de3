//! Completion sink: where mailed items end up.
//!
//! Its capacity is the number of items the run expects, fixed when it is
//! built. A full sink therefore means every item has been delivered, and
//! that is the signal every worker waits for.

use crate::error::{Error, Result};
use crate::model::MailItem;
use crate::queue::BoundedQueue;

#[derive(Debug)]
pub struct CompletionSink {
    items: BoundedQueue<MailItem>,
}

impl CompletionSink {
    /// A sink that completes after exactly `expected` deliveries.
    pub fn expecting(expected: usize) -> Result<Self> {
        if expected == 0 {
            return Err(Error::InvalidArgs(
                "completion sink must expect at least one item".to_string(),
            ));
        }
        Ok(Self {
            items: BoundedQueue::new(expected)?,
        })
    }

    /// Accept a mailed item.
    ///
    /// Items that are not mailed are refused, as are deliveries past the
    /// expected count; neither can block.
    pub fn deliver(&self, item: MailItem) -> Result<()> {
        if !item.state().is_terminal() {
            return Err(Error::NotDelivered {
                id: item.id(),
                state: item.state(),
            });
        }
        self.items.try_push(item).map_err(|_| Error::SinkOverflow {
            capacity: self.items.capacity(),
        })
    }

    /// Every expected item has arrived.
    pub fn is_complete(&self) -> bool {
        self.items.is_full()
    }

    pub fn delivered(&self) -> usize {
        self.items.len()
    }

    pub fn expected(&self) -> usize {
        self.items.capacity()
    }

    /// Take the delivered items, sorted by id.
    pub fn into_items(self) -> Vec<MailItem> {
        let mut items = self.items.drain();
        items.sort_by_key(MailItem::id);
        items
    }
}
