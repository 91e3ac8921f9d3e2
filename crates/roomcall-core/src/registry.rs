use std::collections::HashMap;
use std::sync::Arc;

use crate::events::TrackKind;
use crate::session::{RemoteMediaTrack, RenderSurface};

/// A registry entry projected into a renderable layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceBinding {
    pub participant: String,
    pub kind: TrackKind,
    pub surface: RenderSurface,
}

struct Entry {
    track: Arc<dyn RemoteMediaTrack>,
    surface: RenderSurface,
}

/// Currently subscribed remote tracks, keyed by (participant, kind).
///
/// Updated by the session event loop; read by UI layers through
/// [`RemoteTrackRegistry::bindings`]. Mutations are idempotent so they
/// tolerate events racing an in-flight disconnect.
pub struct RemoteTrackRegistry {
    entries: HashMap<(String, TrackKind), Entry>,
}

impl RemoteTrackRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a subscribed track under its (participant, kind) key.
    ///
    /// A duplicate subscription for the same key replaces the previous
    /// entry; the displaced track is detached. Returns true when an entry
    /// was replaced.
    pub fn insert(
        &mut self,
        participant: String,
        track: Arc<dyn RemoteMediaTrack>,
        surface: RenderSurface,
    ) -> bool {
        let kind = track.kind();
        let previous = self
            .entries
            .insert((participant, kind), Entry { track, surface });
        if let Some(previous) = previous {
            previous.track.detach();
            true
        } else {
            false
        }
    }

    /// Detach and drop the entry for (participant, kind).
    ///
    /// Absent entries are left alone; returns whether one was removed.
    pub fn remove(&mut self, participant: &str, kind: TrackKind) -> bool {
        match self.entries.remove(&(participant.to_string(), kind)) {
            Some(entry) => {
                entry.track.detach();
                true
            }
            None => false,
        }
    }

    /// Detach everything and empty the registry.
    pub fn clear(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.track.detach();
        }
    }

    pub fn contains(&self, participant: &str, kind: TrackKind) -> bool {
        self.entries.contains_key(&(participant.to_string(), kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The full registry as a stably ordered layout, recomputed on each
    /// call rather than maintained imperatively.
    pub fn bindings(&self) -> Vec<SurfaceBinding> {
        let mut bindings: Vec<SurfaceBinding> = self
            .entries
            .iter()
            .map(|((participant, kind), entry)| SurfaceBinding {
                participant: participant.clone(),
                kind: *kind,
                surface: entry.surface.clone(),
            })
            .collect();
        bindings.sort_by(|a, b| {
            a.participant
                .cmp(&b.participant)
                .then(a.kind.cmp(&b.kind))
        });
        bindings
    }
}

impl Default for RemoteTrackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubTrack {
        kind: TrackKind,
        surface_id: String,
        attached: AtomicBool,
    }

    impl StubTrack {
        fn new(kind: TrackKind, surface_id: &str) -> Arc<Self> {
            Arc::new(Self {
                kind,
                surface_id: surface_id.to_string(),
                attached: AtomicBool::new(false),
            })
        }
    }

    impl RemoteMediaTrack for StubTrack {
        fn kind(&self) -> TrackKind {
            self.kind
        }

        fn attach(&self) -> RenderSurface {
            self.attached.store(true, Ordering::SeqCst);
            RenderSurface {
                id: self.surface_id.clone(),
            }
        }

        fn detach(&self) {
            self.attached.store(false, Ordering::SeqCst);
        }
    }

    fn insert(registry: &mut RemoteTrackRegistry, participant: &str, track: Arc<StubTrack>) -> bool {
        let surface = track.attach();
        registry.insert(participant.to_string(), track, surface)
    }

    #[test]
    fn insert_and_lookup() {
        let mut registry = RemoteTrackRegistry::new();
        insert(&mut registry, "alice", StubTrack::new(TrackKind::Video, "s1"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("alice", TrackKind::Video));
        assert!(!registry.contains("alice", TrackKind::Audio));
    }

    #[test]
    fn duplicate_key_replaces_and_detaches_previous() {
        let mut registry = RemoteTrackRegistry::new();
        let first = StubTrack::new(TrackKind::Video, "s1");
        let second = StubTrack::new(TrackKind::Video, "s2");

        assert!(!insert(&mut registry, "alice", first.clone()));
        assert!(insert(&mut registry, "alice", second.clone()));

        assert_eq!(registry.len(), 1);
        assert!(!first.attached.load(Ordering::SeqCst));
        assert!(second.attached.load(Ordering::SeqCst));
        assert_eq!(registry.bindings()[0].surface.id, "s2");
    }

    #[test]
    fn remove_unknown_entry_is_a_noop() {
        let mut registry = RemoteTrackRegistry::new();
        insert(&mut registry, "alice", StubTrack::new(TrackKind::Audio, "s1"));
        assert!(!registry.remove("bob", TrackKind::Audio));
        assert!(!registry.remove("alice", TrackKind::Video));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_detaches_track() {
        let mut registry = RemoteTrackRegistry::new();
        let track = StubTrack::new(TrackKind::Video, "s1");
        insert(&mut registry, "alice", track.clone());
        assert!(registry.remove("alice", TrackKind::Video));
        assert!(!track.attached.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[test]
    fn clear_detaches_everything() {
        let mut registry = RemoteTrackRegistry::new();
        let a = StubTrack::new(TrackKind::Audio, "s1");
        let v = StubTrack::new(TrackKind::Video, "s2");
        insert(&mut registry, "alice", a.clone());
        insert(&mut registry, "alice", v.clone());
        registry.clear();
        assert!(registry.is_empty());
        assert!(!a.attached.load(Ordering::SeqCst));
        assert!(!v.attached.load(Ordering::SeqCst));
    }

    #[test]
    fn bindings_are_stably_ordered() {
        let mut registry = RemoteTrackRegistry::new();
        insert(&mut registry, "bob", StubTrack::new(TrackKind::Video, "s3"));
        insert(&mut registry, "alice", StubTrack::new(TrackKind::Video, "s2"));
        insert(&mut registry, "alice", StubTrack::new(TrackKind::Audio, "s1"));

        let bindings = registry.bindings();
        assert_eq!(bindings.len(), 3);
        assert_eq!(
            bindings
                .iter()
                .map(|b| (b.participant.as_str(), b.kind))
                .collect::<Vec<_>>(),
            vec![
                ("alice", TrackKind::Audio),
                ("alice", TrackKind::Video),
                ("bob", TrackKind::Video),
            ]
        );
    }
}
