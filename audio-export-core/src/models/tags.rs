use serde::{Deserialize, Serialize};

/// Metadata attached to an exported file.
///
/// Populated by the caller and handed to the backend untouched. Only
/// backends that advertise `can_tags` look at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTags {
    pub encoder: String,
    pub title: String,
    pub comments: String,
    pub bpm: String,
    pub artist: String,
    pub album: String,
    pub track_number: String,
    pub year: String,
    pub url: String,
    pub genre: String,
}

impl FileTags {
    pub fn is_empty(&self) -> bool {
        self.fields().all(|(_, value)| value.is_empty())
    }

    /// Non-empty fields as `(name, value)` pairs, in a stable order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", self.title.as_str()),
            ("artist", self.artist.as_str()),
            ("album", self.album.as_str()),
            ("track", self.track_number.as_str()),
            ("year", self.year.as_str()),
            ("genre", self.genre.as_str()),
            ("comments", self.comments.as_str()),
            ("bpm", self.bpm.as_str()),
            ("url", self.url.as_str()),
            ("encoder", self.encoder.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }
}
