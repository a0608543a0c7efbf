//! Collection subscription that rebuilds the list from positional diffs
//!
//! The server sends `add`, `update` and `remove` events whose positions are only valid against the collection as it
//! stands right before each one, then `sync` once the batch is consistent. Only `sync` (and `notModified`) emit, and
//! every emission is a copy: the collection keeps changing after it has been handed out.

use serde::de::DeserializeOwned;

use super::{Materializer, SyncStream};
use crate::{
    constants::{NEW_POSITION, OLD_POSITION},
    errors::{Error, Result},
    event::{Event, EventKind},
    resource::Resource,
    tagged::Tagged,
};

pub type DiffListStream<T = serde_json::Map<String, serde_json::Value>> = SyncStream<DiffList<T>>;

#[derive(Debug)]
pub struct DiffList<T> {
    items: Vec<Resource<T>>,
    prev: Option<Tagged<Vec<Resource<T>>>>,
}

impl<T> DiffList<T> {
    /// Starts from an empty collection. `prev` is what `notModified` resolves to, at most once.
    pub fn new(prev: Option<Tagged<Vec<Resource<T>>>>) -> Self {
        Self {
            items: Vec::new(),
            prev,
        }
    }

    /// The collection as of the last applied event, which may be mid batch
    pub fn items(&self) -> &[Resource<T>] {
        &self.items
    }
}

impl<T: DeserializeOwned> DiffList<T> {
    fn add(&mut self, event: &Event) -> Result<()> {
        let new = event.position(NEW_POSITION)?;
        check_position(event, NEW_POSITION, new, self.items.len() + 1)?;
        let resource = event.decode()?;
        self.items.insert(new, resource);
        Ok(())
    }

    fn update(&mut self, event: &Event) -> Result<()> {
        let old = event.position(OLD_POSITION)?;
        let new = event.position(NEW_POSITION)?;
        check_position(event, OLD_POSITION, old, self.items.len())?;
        // the new position counts from the list with the old element taken out
        check_position(event, NEW_POSITION, new, self.items.len())?;
        let resource = event.decode()?;
        self.items.remove(old);
        self.items.insert(new, resource);
        Ok(())
    }

    fn remove(&mut self, event: &Event) -> Result<()> {
        let old = event.position(OLD_POSITION)?;
        check_position(event, OLD_POSITION, old, self.items.len())?;
        self.items.remove(old);
        Ok(())
    }
}

/// `position` must be below `bound`
fn check_position(event: &Event, key: &str, position: usize, bound: usize) -> Result<()> {
    if position < bound {
        return Ok(());
    }
    Err(Error::protocol(format!(
        "{} event {key} {position} is out of range, must be below {bound}",
        event.kind
    )))
}

impl<T: DeserializeOwned + Clone> Materializer for DiffList<T> {
    type Output = Tagged<Vec<Resource<T>>>;

    fn apply(&mut self, event: Event) -> Result<Option<Self::Output>> {
        match event.kind {
            EventKind::Add => self.add(&event).map(|()| None),
            EventKind::Update => self.update(&event).map(|()| None),
            EventKind::Remove => self.remove(&event).map(|()| None),
            EventKind::Sync => {
                tracing::trace!(len = self.items.len(), "diff batch synced");
                Ok(Some(Tagged::with_revision(
                    self.items.clone(),
                    event.snapshot_tag(),
                )))
            }
            EventKind::NotModified => {
                let prev = self
                    .prev
                    .take()
                    .ok_or_else(|| Error::protocol("notModified without a prior list"))?;
                self.items = prev.value().clone();
                Ok(Some(prev))
            }
            EventKind::Heartbeat => Ok(None),
            kind => Err(Error::protocol(format!(
                "unexpected {kind} event on a diff list subscription"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::{
        resource::Metadata,
        sync::test_support::{live_body, send},
        tagged::RevisionTag,
    };

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Item {
        #[serde(default)]
        n: u32,
    }

    fn apply_all(list: &mut DiffList<Item>, events: Vec<Event>) -> Vec<Result<Option<Tagged<Vec<Resource<Item>>>>>> {
        events.into_iter().map(|event| list.apply(event)).collect()
    }

    fn add(position: usize, id: &str) -> Event {
        Event::new(EventKind::Add)
            .with_param(NEW_POSITION, position.to_string())
            .with_data(format!("{{\"id\":\"{id}\"}}"))
    }

    fn update(old: usize, new: usize, id: &str, n: u32) -> Event {
        Event::new(EventKind::Update)
            .with_param(OLD_POSITION, old.to_string())
            .with_param(NEW_POSITION, new.to_string())
            .with_data(format!("{{\"id\":\"{id}\",\"n\":{n}}}"))
    }

    fn remove(old: usize) -> Event {
        Event::new(EventKind::Remove).with_param(OLD_POSITION, old.to_string())
    }

    fn ids(items: &[Resource<Item>]) -> Vec<&str> {
        items.iter().map(Resource::id).collect()
    }

    #[test]
    fn adds_splice_in_arrival_order() {
        let mut list = DiffList::new(None);
        let results = apply_all(
            &mut list,
            vec![add(0, "A"), add(1, "B"), add(0, "C"), Event::new(EventKind::Sync)],
        );
        let emitted = results
            .into_iter()
            .map(|res| res.unwrap())
            .collect::<Vec<_>>();

        assert!(emitted[..3].iter().all(Option::is_none));
        let snapshot = emitted[3].as_ref().unwrap();
        assert_eq!(ids(snapshot), ["C", "A", "B"]);
    }

    #[test]
    fn matches_reference_splicing() {
        let mut list = DiffList::<Item>::new(None);
        let mut reference: Vec<(String, u32)> = Vec::new();

        let ops = vec![
            add(0, "a"),
            add(1, "b"),
            add(2, "c"),
            add(1, "d"),
            update(0, 3, "a", 7),
            remove(1),
            update(2, 0, "a", 8),
            add(3, "e"),
            remove(3),
            update(1, 1, "d", 2),
        ];
        for event in ops {
            let entry = || {
                let res = event.decode::<Resource<Item>>().unwrap();
                (res.metadata.id, res.payload.n)
            };
            match event.kind {
                EventKind::Add => {
                    reference.insert(event.position(NEW_POSITION).unwrap(), entry());
                }
                EventKind::Update => {
                    reference.remove(event.position(OLD_POSITION).unwrap());
                    reference.insert(event.position(NEW_POSITION).unwrap(), entry());
                }
                EventKind::Remove => {
                    reference.remove(event.position(OLD_POSITION).unwrap());
                }
                _ => unreachable!(),
            }
            assert_eq!(list.apply(event).unwrap(), None);
        }

        let snapshot = list
            .apply(Event::new(EventKind::Sync).with_param("id", "v9"))
            .unwrap()
            .unwrap();
        let actual = snapshot
            .iter()
            .map(|res| (res.id().to_owned(), res.n))
            .collect::<Vec<_>>();
        assert_eq!(actual, reference);
        assert_eq!(snapshot.revision(), Some(&RevisionTag::quoted("v9")));
    }

    #[test]
    fn emissions_are_snapshots() {
        let mut list = DiffList::new(None);
        list.apply(add(0, "a")).unwrap();
        let first = list.apply(Event::new(EventKind::Sync)).unwrap().unwrap();

        list.apply(add(0, "b")).unwrap();
        list.apply(remove(1)).unwrap();
        assert_eq!(ids(&first), ["a"]);
        assert_eq!(ids(list.items()), ["b"]);
    }

    #[test]
    fn bad_positions_are_violations() {
        let mut list = DiffList::new(None);
        assert!(list.apply(add(1, "a")).unwrap_err().is_protocol_violation());
        assert!(list.apply(remove(0)).unwrap_err().is_protocol_violation());

        list.apply(add(0, "a")).unwrap();
        assert!(
            list.apply(update(0, 1, "a", 1))
                .unwrap_err()
                .is_protocol_violation()
        );
        assert!(
            list.apply(Event::new(EventKind::Remove).with_param(OLD_POSITION, "zero"))
                .unwrap_err()
                .is_protocol_violation()
        );
        assert!(
            list.apply(Event::new(EventKind::Add).with_data("{}"))
                .unwrap_err()
                .is_protocol_violation()
        );
        // nothing was applied by the failures
        assert_eq!(ids(list.items()), ["a"]);
    }

    #[test]
    fn undecodable_update_leaves_collection_alone() {
        let mut list = DiffList::<Item>::new(None);
        list.apply(add(0, "a")).unwrap();
        let bad = Event::new(EventKind::Update)
            .with_param(OLD_POSITION, "0")
            .with_param(NEW_POSITION, "0")
            .with_data("{\"id\":\"a\",\"n\":\"x\"}");
        assert!(matches!(list.apply(bad), Err(Error::Decode(_))));
        assert_eq!(ids(list.items()), ["a"]);
    }

    #[test]
    fn not_modified_adopts_prior() {
        let prev = Tagged::new(
            vec![
                Resource::new(
                    Metadata {
                        id: "x".into(),
                        ..Default::default()
                    },
                    Item { n: 1 },
                ),
                Resource::new(
                    Metadata {
                        id: "y".into(),
                        ..Default::default()
                    },
                    Item { n: 2 },
                ),
            ],
            RevisionTag::quoted("s1"),
        );
        let mut list = DiffList::new(Some(prev.clone()));

        assert_eq!(list.apply(Event::new(EventKind::NotModified)).unwrap(), Some(prev));
        assert!(
            list.apply(Event::new(EventKind::NotModified))
                .unwrap_err()
                .is_protocol_violation()
        );

        // later diffs apply on top of the adopted collection
        list.apply(remove(0)).unwrap();
        let snapshot = list.apply(Event::new(EventKind::Sync)).unwrap().unwrap();
        assert_eq!(ids(&snapshot), ["y"]);
    }

    #[test]
    fn not_modified_without_prior() {
        let mut list = DiffList::<Item>::new(None);
        assert!(
            list.apply(Event::new(EventKind::NotModified))
                .unwrap_err()
                .is_protocol_violation()
        );
    }

    #[test]
    fn full_list_events_are_rejected() {
        let mut list = DiffList::<Item>::new(None);
        for kind in [EventKind::List, EventKind::Initial] {
            assert!(list.apply(Event::new(kind)).unwrap_err().is_protocol_violation());
        }
        assert_eq!(list.apply(Event::new(EventKind::Heartbeat)).unwrap(), None);
    }

    #[tokio::test]
    async fn batches_over_a_live_stream() {
        let (tx, body) = live_body();
        let mut stream: DiffListStream<Item> = SyncStream::spawn(body, DiffList::new(None), 2);

        send(
            &tx,
            "event: add\nnew-position: 0\ndata: {\"id\":\"A\"}\n\nevent: add\nnew-position: 1\n",
        );
        send(&tx, "data: {\"id\":\"B\"}\n\nevent: heartbeat\n\n");
        send(&tx, "event: add\nnew-position: 0\ndata: {\"id\":\"C\"}\n\nevent: sync\nid: 1\n\n");

        let snapshot = stream.read().await.unwrap().unwrap();
        assert_eq!(ids(&snapshot), ["C", "A", "B"]);
        assert_eq!(snapshot.revision().unwrap().as_str(), "\"1\"");

        send(&tx, "event: update\nold-position: 2\nnew-position: 0\ndata: {\"id\":\"B\",\"n\":1}\n\n");
        send(&tx, "event: remove\nold-position: 1\n\nevent: sync\n\n");

        let snapshot = stream.read().await.unwrap().unwrap();
        assert_eq!(ids(&snapshot), ["B", "A"]);
        assert_eq!(snapshot[0].n, 1);

        drop(tx);
        assert!(stream.read().await.unwrap().is_none());
    }
}
