use clap::{Parser, ValueEnum};

/// Runs one auris plugin instance: a job API, worker pool, and (if
/// Postgres is configured) the recommendation/analytics surface, all
/// scoped to a single job modality.
#[derive(Parser, Debug)]
#[command(name = "auris", about = "Run one auris plugin instance")]
pub struct CliArgs {
    /// Which compute back-end this instance mints and processes jobs for.
    #[arg(long, value_enum)]
    pub modality: PluginModality,

    /// Active config profile (falls back to AURIS_PROFILE env var, then "default").
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PluginModality {
    Embedding,
    StemSeparation,
    Enrichment,
    Download,
}

impl PluginModality {
    /// Short tag used as the job store's Redis key namespace.
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Embedding => "embed",
            Self::StemSeparation => "separate",
            Self::Enrichment => "enrich",
            Self::Download => "download",
        }
    }

    pub fn as_core(self) -> auris_core::Modality {
        match self {
            Self::Embedding => auris_core::Modality::Embedding,
            Self::StemSeparation => auris_core::Modality::StemSeparation,
            Self::Enrichment => auris_core::Modality::Enrichment,
            Self::Download => auris_core::Modality::Download,
        }
    }
}
