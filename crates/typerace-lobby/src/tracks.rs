//! The set of tracks a host can pick from.

use typerace_protocol::TrackId;

/// A fixed, enumerable set of track ids plus the one new lobbies start on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCatalog {
    tracks: Vec<TrackId>,
    default: TrackId,
}

impl TrackCatalog {
    /// Creates a catalog. `default` is added to `tracks` if missing, so
    /// the default is always selectable.
    pub fn new(default: TrackId, tracks: impl IntoIterator<Item = TrackId>) -> Self {
        let mut list: Vec<TrackId> = Vec::new();
        for track in tracks {
            if !list.contains(&track) {
                list.push(track);
            }
        }
        if !list.contains(&default) {
            list.insert(0, default.clone());
        }
        Self {
            tracks: list,
            default,
        }
    }

    pub fn contains(&self, track: &TrackId) -> bool {
        self.tracks.contains(track)
    }

    /// The track a freshly created lobby uses.
    pub fn default_track(&self) -> &TrackId {
        &self.default
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackId> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl Default for TrackCatalog {
    fn default() -> Self {
        Self::new(
            "track1".into(),
            ["track1", "track2", "track3"].into_iter().map(TrackId::from),
        )
    }
}
