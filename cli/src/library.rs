use crate::types::Track;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Generated tracks, newest first, plus the favorites annotation over them.
#[derive(Debug, Default)]
pub struct Library {
    tracks: IndexMap<String, Track>,
    favorites: HashSet<String>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Track> {
        self.tracks.get_index(index).map(|(_, track)| track)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.tracks.get_index_of(id)
    }

    #[cfg(test)]
    pub fn first(&self) -> Option<&Track> {
        self.get_index(0)
    }

    /// Inserts at the front. A track whose id is already present is rejected
    /// and handed back.
    pub fn prepend(&mut self, track: Track) -> Result<(), Track> {
        if self.tracks.contains_key(&track.id) {
            return Err(track);
        }
        self.tracks.shift_insert(0, track.id.clone(), track);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Track> {
        self.favorites.remove(id);
        self.tracks.shift_remove(id)
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.contains(id)
    }

    #[cfg(test)]
    pub fn favorites_len(&self) -> usize {
        self.favorites.len()
    }

    /// Flips the favorite flag and returns the new state. Unknown ids are
    /// never marked.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        if !self.tracks.contains_key(id) {
            return None;
        }
        if self.favorites.remove(id) {
            Some(false)
        } else {
            self.favorites.insert(id.to_string());
            Some(true)
        }
    }
}
