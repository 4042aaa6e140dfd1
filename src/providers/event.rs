//! Backward pagination over a single event stream

use std::sync::Arc;

use tracing::{error, warn};

use crate::models::{Event, EventHandle};
use crate::rest::error::pruned_floor;
use crate::rest::RestApi;

/// Walks one event handle backward from its counter toward sequence zero,
/// buffering pages newest-first.
///
/// The cursor only ever decreases. A short page from the node, or pruned
/// history below the node's retained floor, marks the stream exhausted; it
/// then drains its buffer and reports done.
pub struct EventProvider<A> {
    api: Arc<A>,
    address: String,
    creation_number: u64,
    step: u64,
    /// Next sequence number boundary; events at `[cursor, counter)` have
    /// already been extracted or buffered.
    cursor: u64,
    /// Buffered events, newest first.
    buffer: Vec<Event>,
    exhausted: bool,
    done: bool,
}

impl<A: RestApi> EventProvider<A> {
    pub fn new(api: Arc<A>, handle: &EventHandle, step: u64) -> Self {
        Self {
            api,
            address: handle.guid.id.addr.clone(),
            creation_number: handle.guid.id.creation_num,
            step,
            cursor: handle.counter,
            buffer: Vec::new(),
            exhausted: false,
            done: false,
        }
    }

    pub fn creation_number(&self) -> u64 {
        self.creation_number
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Fetch the next page below the cursor, if the buffer does not already
    /// cover it, and report how far back the stream safely reaches.
    ///
    /// Returns the version of the oldest buffered event, or 0 when the
    /// stream is exhausted with an empty buffer. Callers use the maximum of
    /// these across streams as a safe extraction floor.
    pub async fn fetch_more(&mut self) -> u64 {
        let start = self.cursor.saturating_sub(self.step);
        let buffered = self.buffer.len() as u64;
        let limit = self.cursor.saturating_sub(buffered).saturating_sub(start);

        if limit > 0 && !self.exhausted {
            match self
                .api
                .get_events(&self.address, self.creation_number, start, limit)
                .await
            {
                Ok(events) => {
                    let got = events.len() as u64;
                    self.buffer.extend(events);
                    if got != limit {
                        error!(
                            address = %self.address,
                            creation_number = self.creation_number,
                            expected = limit,
                            got,
                            "short event page, stopping stream"
                        );
                        self.exhausted = true;
                    }
                }
                Err(err) => {
                    if let Some(min_available) = pruned_floor(&err) {
                        warn!(
                            address = %self.address,
                            creation_number = self.creation_number,
                            min_available,
                            "event history pruned, narrowing window"
                        );
                        let narrowed = self
                            .cursor
                            .saturating_sub(buffered)
                            .saturating_sub(min_available);
                        if narrowed > 0 {
                            if let Ok(events) = self
                                .api
                                .get_events(
                                    &self.address,
                                    self.creation_number,
                                    min_available,
                                    narrowed,
                                )
                                .await
                            {
                                self.buffer.extend(events);
                            }
                        }
                    } else {
                        error!(
                            address = %self.address,
                            creation_number = self.creation_number,
                            %err,
                            "event fetch failed, stopping stream"
                        );
                    }
                    // Either way nothing below this point is reachable.
                    self.exhausted = true;
                }
            }
        }

        match self.buffer.last() {
            Some(oldest) => oldest.version,
            None => 0,
        }
    }

    /// Drain every buffered event with `version >= from_version`, newest
    /// first, advancing the cursor past them.
    pub fn extract(&mut self, from_version: u64) -> Vec<Event> {
        let keep = self
            .buffer
            .iter()
            .position(|e| e.version < from_version)
            .unwrap_or(self.buffer.len());
        let extracted: Vec<Event> = self.buffer.drain(..keep).collect();
        self.cursor = self.cursor.saturating_sub(extracted.len() as u64);
        self.done = (self.cursor == 0 || self.exhausted) && self.buffer.is_empty();
        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventHandle, EventHandleGuid, EventHandleId};
    use crate::rest::testing::MockApi;

    const ADDR: &str = "0xa11ce";

    fn handle(counter: u64, creation_num: u64) -> EventHandle {
        EventHandle {
            counter,
            guid: EventHandleGuid {
                id: EventHandleId {
                    addr: ADDR.to_string(),
                    creation_num,
                },
            },
        }
    }

    fn seed(api: &MockApi, creation_num: u64, count: u64) {
        api.seed_handle(
            ADDR,
            creation_num,
            count,
            100,
            1,
            "0x1::coin::DepositEvent",
            serde_json::json!({ "amount": "1" }),
        );
    }

    #[tokio::test]
    async fn walks_backward_in_pages() {
        let api = Arc::new(MockApi::new());
        seed(&api, 2, 25);
        let mut provider = EventProvider::new(api.clone(), &handle(25, 2), 20);

        // First page covers sequences [5, 25).
        let floor = provider.fetch_more().await;
        assert_eq!(floor, 105);

        let newest = provider.extract(110);
        assert_eq!(newest.len(), 15);
        assert_eq!(newest[0].sequence_number, 24);
        assert_eq!(newest[14].sequence_number, 10);
        assert!(!provider.is_done());

        let rest = provider.extract(0);
        assert_eq!(rest.len(), 5);
        assert!(!provider.is_done());

        // Second page covers the remaining [0, 5).
        let floor = provider.fetch_more().await;
        assert_eq!(floor, 100);
        let last = provider.extract(0);
        assert_eq!(last.len(), 5);
        assert_eq!(last[4].sequence_number, 0);
        assert!(provider.is_done());
    }

    #[tokio::test]
    async fn buffered_page_is_not_refetched() {
        let api = Arc::new(MockApi::new());
        seed(&api, 2, 25);
        let mut provider = EventProvider::new(api.clone(), &handle(25, 2), 20);

        provider.fetch_more().await;
        provider.fetch_more().await;
        assert_eq!(
            api.calls.events.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn pruned_history_narrows_once_then_stops() {
        let api = Arc::new(MockApi::new());
        seed(&api, 2, 25);
        api.set_handle_min_available(ADDR, 2, 5);
        let mut provider = EventProvider::new(api.clone(), &handle(25, 2), 30);

        // [0, 25) is rejected; the retry fetches [5, 25).
        let floor = provider.fetch_more().await;
        assert_eq!(floor, 105);

        let events = provider.extract(0);
        assert_eq!(events.len(), 20);
        assert_eq!(events.last().unwrap().sequence_number, 5);
        assert!(provider.is_done());
    }

    #[tokio::test]
    async fn short_page_marks_stream_done_after_drain() {
        let api = Arc::new(MockApi::new());
        seed(&api, 2, 10);
        api.set_handle_short_page(ADDR, 2);
        let mut provider = EventProvider::new(api.clone(), &handle(10, 2), 20);

        provider.fetch_more().await;
        let events = provider.extract(0);
        assert_eq!(events.len(), 9);
        assert!(provider.is_done());
    }

    #[tokio::test]
    async fn exhausted_empty_stream_reports_zero_floor() {
        let api = Arc::new(MockApi::new());
        seed(&api, 2, 0);
        let mut provider = EventProvider::new(api.clone(), &handle(0, 2), 20);

        assert_eq!(provider.fetch_more().await, 0);
        assert!(provider.extract(0).is_empty());
        assert!(provider.is_done());
    }
}
