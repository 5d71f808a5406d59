use std::fmt;

use crate::error::VectorError;

/// A vector-bearing modality. Each variant maps to one Postgres table:
/// audio-spectral, lyrics-semantic, visual-aesthetic, and one stems
/// table per stem type. Only `[a-z0-9_]` stem names are accepted since
/// the stem name is interpolated into the table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VectorModality {
    AudioSpectral,
    LyricsSemantic,
    VisualAesthetic,
    Stem(String),
}

impl VectorModality {
    pub fn parse(tag: &str) -> Result<Self, VectorError> {
        match tag {
            "audio-spectral" => Ok(Self::AudioSpectral),
            "lyrics-semantic" => Ok(Self::LyricsSemantic),
            "visual-aesthetic" => Ok(Self::VisualAesthetic),
            other => other
                .strip_prefix("stems:")
                .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
                .map(|s| Self::Stem(s.to_string()))
                .ok_or_else(|| VectorError::UnknownModality(tag.to_string())),
        }
    }

    /// The Postgres table backing this modality. Safe to interpolate
    /// into raw SQL — every code path into this function is validated
    /// in `parse`.
    pub fn table_name(&self) -> String {
        match self {
            Self::AudioSpectral => "vectors_audio_spectral".to_string(),
            Self::LyricsSemantic => "vectors_lyrics_semantic".to_string(),
            Self::VisualAesthetic => "vectors_visual_aesthetic".to_string(),
            Self::Stem(name) => format!("vectors_stems_{name}"),
        }
    }
}

impl fmt::Display for VectorModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AudioSpectral => write!(f, "audio-spectral"),
            Self::LyricsSemantic => write!(f, "lyrics-semantic"),
            Self::VisualAesthetic => write!(f, "visual-aesthetic"),
            Self::Stem(name) => write!(f, "stems:{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_tags() {
        assert_eq!(VectorModality::parse("audio-spectral").unwrap(), VectorModality::AudioSpectral);
        assert_eq!(VectorModality::parse("stems:vocals").unwrap(), VectorModality::Stem("vocals".to_string()));
    }

    #[test]
    fn rejects_unsafe_stem_names() {
        assert!(VectorModality::parse("stems:vocals; drop table x").is_err());
        assert!(VectorModality::parse("nonsense").is_err());
    }

    #[test]
    fn round_trips_display_through_parse() {
        let m = VectorModality::Stem("drums".to_string());
        assert_eq!(VectorModality::parse(&m.to_string()).unwrap(), m);
    }
}
