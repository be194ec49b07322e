//! Listener registration and notification dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use smallvec::SmallVec;

use super::note::MpeNote;

/// Receives note changes from an [`MpeInstrument`](super::MpeInstrument).
///
/// Callbacks run synchronously on whichever thread drove the instrument,
/// which is often a real-time MIDI or audio thread. They must not block and
/// must not call back into the instrument that invoked them.
#[allow(unused_variables)]
pub trait MpeListener: Send + Sync {
    /// A new note was triggered.
    fn note_added(&self, note: &MpeNote) {}

    fn note_pressure_changed(&self, note: &MpeNote) {}

    /// The note's total pitchbend changed, either from its own channel or
    /// from the zone's master channel.
    fn note_pitchbend_changed(&self, note: &MpeNote) {}

    fn note_timbre_changed(&self, note: &MpeNote) {}

    /// Key down and/or sustain state changed. A transition to
    /// [`KeyState::Off`](super::KeyState::Off) is reported through
    /// [`note_released`](Self::note_released) instead.
    fn note_key_state_changed(&self, note: &MpeNote) {}

    /// The note stopped playing and was removed.
    fn note_released(&self, note: &MpeNote) {}
}

pub type ListenerId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoteEvent {
    Added,
    PressureChanged,
    PitchbendChanged,
    TimbreChanged,
    KeyStateChanged,
    Released,
}

/// A note change recorded under the instrument lock and dispatched after it
/// is released.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Notification {
    pub(crate) event: NoteEvent,
    pub(crate) note: MpeNote,
}

pub(crate) type Notifications = SmallVec<[Notification; 8]>;

#[inline]
pub(crate) fn notify(out: &mut Notifications, event: NoteEvent, note: &MpeNote) {
    out.push(Notification { event, note: *note });
}

type Entries = Vec<(ListenerId, Arc<dyn MpeListener>)>;

/// Copy-on-write listener list. Dispatch works on a snapshot, so listeners
/// can be added or removed from any thread, including mid-dispatch.
pub(crate) struct ListenerList {
    entries: ArcSwap<Entries>,
    next_id: AtomicU64,
}

impl ListenerList {
    pub(crate) fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn add(&self, listener: Arc<dyn MpeListener>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.push((id, Arc::clone(&listener)));
            next
        });
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut removed = false;
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            let before = next.len();
            next.retain(|(entry_id, _)| *entry_id != id);
            removed = next.len() != before;
            next
        });
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.load().len()
    }

    /// Fire every notification on every listener, in registration order.
    pub(crate) fn dispatch(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            return;
        }
        let entries = self.entries.load();
        for notification in notifications {
            for (_, listener) in entries.iter() {
                let note = &notification.note;
                match notification.event {
                    NoteEvent::Added => listener.note_added(note),
                    NoteEvent::PressureChanged => listener.note_pressure_changed(note),
                    NoteEvent::PitchbendChanged => listener.note_pitchbend_changed(note),
                    NoteEvent::TimbreChanged => listener.note_timbre_changed(note),
                    NoteEvent::KeyStateChanged => listener.note_key_state_changed(note),
                    NoteEvent::Released => listener.note_released(note),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mpe::MpeValue;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counter {
        added: Mutex<Vec<u8>>,
        released: Mutex<Vec<u8>>,
    }

    impl MpeListener for Counter {
        fn note_added(&self, note: &MpeNote) {
            self.added.lock().push(note.initial_note());
        }

        fn note_released(&self, note: &MpeNote) {
            self.released.lock().push(note.initial_note());
        }
    }

    fn note(number: u8) -> MpeNote {
        let v = MpeValue::from_7bit(100);
        MpeNote::new(1, 2, number, v, MpeValue::CENTRE, v, MpeValue::CENTRE)
    }

    #[test]
    fn test_dispatch_in_order_to_all_listeners() {
        let list = ListenerList::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        list.add(a.clone());
        list.add(b.clone());

        let mut out = Notifications::new();
        notify(&mut out, NoteEvent::Added, &note(60));
        notify(&mut out, NoteEvent::Added, &note(64));
        notify(&mut out, NoteEvent::Released, &note(60));
        list.dispatch(&out);

        assert_eq!(*a.added.lock(), vec![60, 64]);
        assert_eq!(*b.added.lock(), vec![60, 64]);
        assert_eq!(*a.released.lock(), vec![60]);
    }

    #[test]
    fn test_remove_listener() {
        let list = ListenerList::new();
        let a = Arc::new(Counter::default());
        let id = list.add(a.clone());
        assert_eq!(list.len(), 1);

        assert!(list.remove(id));
        assert!(!list.remove(id), "Second removal is a no-op");
        assert_eq!(list.len(), 0);

        let mut out = Notifications::new();
        notify(&mut out, NoteEvent::Added, &note(60));
        list.dispatch(&out);
        assert!(a.added.lock().is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let list = ListenerList::new();
        let a = list.add(Arc::new(Counter::default()));
        let b = list.add(Arc::new(Counter::default()));
        assert_ne!(a, b);
    }
}
