//! Multi-modal weighted-fusion recommendation engine with diversity
//! re-ranking and artist/album roll-up.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::VectorError;
use crate::modality::VectorModality;
use crate::repository::VectorRepository;

#[derive(Debug, Clone)]
pub struct ModalityWeight {
    pub modality: VectorModality,
    pub weight: f32,
}

pub struct RecommendationRequest {
    pub subject_id: Option<String>,
    pub weights: Vec<ModalityWeight>,
    pub limit: usize,
    pub diversity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Track,
    Artist,
    Album,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct TrackMeta {
    artist_id: Option<String>,
    album_id: Option<String>,
}

pub struct RecommendationEngine {
    repository: VectorRepository,
    catalog_pool: PgPool,
}

impl RecommendationEngine {
    pub fn new(repository: VectorRepository, catalog_pool: PgPool) -> Self {
        Self { repository, catalog_pool }
    }

    pub async fn recommend(&self, req: &RecommendationRequest) -> Result<Vec<RecommendationEntry>, VectorError> {
        let active = self.active_modalities(req).await?;
        let Some(active) = active else {
            return self.discovery(req.limit).await;
        };

        let pool_size = pool_size(req.limit, req.diversity);
        let mut candidates: HashMap<String, HashMap<String, f64>> = HashMap::new();

        for w in &active {
            let subject_id = req.subject_id.as_deref().unwrap_or_default();
            let rows = self.repository.nearest(&w.modality, subject_id, pool_size as i64).await?;
            for row in rows {
                candidates
                    .entry(row.subject_id)
                    .or_default()
                    .insert(w.modality.to_string(), row.score);
            }
        }

        let weights: Vec<(String, f32)> = active.iter().map(|w| (w.modality.to_string(), w.weight)).collect();
        let mut fused = fuse(&candidates, &weights);
        fused.truncate(pool_size);

        let final_tracks = select_with_diversity(fused, req.limit, req.diversity);
        self.to_entries(final_tracks, pool_size as f32).await
    }

    async fn active_modalities(&self, req: &RecommendationRequest) -> Result<Option<Vec<ModalityWeight>>, VectorError> {
        let Some(subject_id) = &req.subject_id else { return Ok(None) };

        let mut active = Vec::new();
        for w in &req.weights {
            if w.weight > 0.0 && self.repository.has_vector(&w.modality, subject_id).await? {
                active.push(w.clone());
            }
        }
        if !active.is_empty() {
            return Ok(Some(active));
        }

        let audio = VectorModality::AudioSpectral;
        if self.repository.has_vector(&audio, subject_id).await? {
            return Ok(Some(vec![ModalityWeight { modality: audio, weight: 1.0 }]));
        }

        Ok(None)
    }

    async fn discovery(&self, limit: usize) -> Result<Vec<RecommendationEntry>, VectorError> {
        let ids = self.repository.discovery_sample(&VectorModality::AudioSpectral, limit as i64).await?;
        let with_score: Vec<(String, f32, Option<String>)> = ids.into_iter().map(|id| (id, 0.0, None)).collect();
        let denom = with_score.len().max(1) as f32;
        self.to_entries(with_score, denom).await
    }

    /// `pool_size` is the candidate-pool size the caller fused and
    /// diversity-selected from, not `tracks.len()` — after truncation to
    /// `limit` the two diverge whenever diversity re-ranking is active.
    async fn to_entries(&self, tracks: Vec<(String, f32, Option<String>)>, pool_size: f32) -> Result<Vec<RecommendationEntry>, VectorError> {
        let ids: Vec<String> = tracks.iter().map(|(id, _, _)| id.clone()).collect();
        let meta = self.fetch_track_meta(&ids).await?;

        let mut artist_score: HashMap<String, f32> = HashMap::new();
        let mut album_score: HashMap<String, f32> = HashMap::new();

        let mut entries = Vec::with_capacity(tracks.len());
        for (id, score, reason) in &tracks {
            let m = meta.get(id).cloned().unwrap_or_default();
            if let Some(artist_id) = &m.artist_id {
                *artist_score.entry(artist_id.clone()).or_insert(0.0) += score;
            }
            if let Some(album_id) = &m.album_id {
                *album_score.entry(album_id.clone()).or_insert(0.0) += score;
            }
            entries.push(RecommendationEntry {
                id: id.clone(),
                kind: EntryKind::Track,
                score: *score,
                reason: reason.clone(),
                artist_id: m.artist_id,
                album_id: m.album_id,
            });
        }

        entries.extend(top_n(&artist_score, 3, pool_size, EntryKind::Artist));
        entries.extend(top_n(&album_score, 3, pool_size, EntryKind::Album));
        Ok(entries)
    }

    async fn fetch_track_meta(&self, ids: &[String]) -> Result<HashMap<String, TrackMeta>, VectorError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query("SELECT subject_id, artist_id, album_id FROM tracks WHERE subject_id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.catalog_pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| {
                (
                    r.get::<String, _>("subject_id"),
                    TrackMeta { artist_id: r.get("artist_id"), album_id: r.get("album_id") },
                )
            })
            .collect())
    }
}

fn top_n(scores: &HashMap<String, f32>, n: usize, denom: f32, kind: EntryKind) -> Vec<RecommendationEntry> {
    let mut sorted: Vec<(&String, &f32)> = scores.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    sorted
        .into_iter()
        .take(n)
        .map(|(id, score)| RecommendationEntry {
            id: id.clone(),
            kind,
            score: score / denom,
            reason: None,
            artist_id: None,
            album_id: None,
        })
        .collect()
}

fn pool_size(limit: usize, diversity: f32) -> usize {
    ((limit as f32) * (1.0 + 4.0 * diversity)).ceil() as usize
}

/// Pure fusion step: given each candidate's per-modality similarity
/// contribution and the active weight map, compute the fused score and
/// the dominant-modality reason tag. Candidates missing a contribution
/// for a given modality count that contribution as zero.
fn fuse(candidates: &HashMap<String, HashMap<String, f64>>, weights: &[(String, f32)]) -> Vec<(String, f32, Option<String>)> {
    let total_weight: f32 = weights.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    let mut scored: Vec<(String, f32, Option<String>)> = candidates
        .iter()
        .map(|(id, contributions)| {
            let mut sum = 0.0f32;
            let mut per_modality: Vec<(&str, f32)> = Vec::with_capacity(weights.len());
            for (modality, weight) in weights {
                let raw = contributions.get(modality).copied().unwrap_or(0.0) as f32;
                let weighted = weight * raw;
                sum += weighted;
                per_modality.push((modality.as_str(), raw));
            }
            let fused = sum / total_weight;
            let reason = dominant_reason(&per_modality);
            (id.clone(), fused, reason)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

fn dominant_reason(per_modality: &[(&str, f32)]) -> Option<String> {
    if per_modality.is_empty() {
        return None;
    }
    let mut sorted: Vec<&(&str, f32)> = per_modality.iter().collect();
    sorted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let top = sorted[0];
    let runner_up = sorted.get(1).map(|(_, v)| *v).unwrap_or(0.0);
    if (top.1 - runner_up).abs() <= 0.2 && sorted.len() > 1 {
        Some("Balanced".to_string())
    } else {
        Some(top.0.to_string())
    }
}

/// Take the pool, shuffle for diversity when warranted, and truncate to
/// the requested limit. `d <= 0.1` is deterministic-by-score; higher
/// diversity uniformly shuffles the whole pool before truncating.
fn select_with_diversity(
    mut pool: Vec<(String, f32, Option<String>)>,
    limit: usize,
    diversity: f32,
) -> Vec<(String, f32, Option<String>)> {
    if diversity > 0.1 && pool.len() > limit {
        let mut rng = rand::thread_rng();
        pool.shuffle(&mut rng);
    }
    pool.truncate(limit);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates_fixture() -> HashMap<String, HashMap<String, f64>> {
        let mut m = HashMap::new();
        let mut a = HashMap::new();
        a.insert("audio-spectral".to_string(), 0.9);
        a.insert("lyrics-semantic".to_string(), 0.1);
        m.insert("A".to_string(), a);

        let mut b = HashMap::new();
        b.insert("audio-spectral".to_string(), 0.2);
        m.insert("B".to_string(), b);
        m
    }

    #[test]
    fn fused_score_divides_by_total_active_weight() {
        let candidates = candidates_fixture();
        let weights = vec![("audio-spectral".to_string(), 1.0), ("lyrics-semantic".to_string(), 1.0)];
        let fused = fuse(&candidates, &weights);
        let a = fused.iter().find(|(id, _, _)| id == "A").unwrap();
        assert!((a.1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_modality_contribution_counts_as_zero() {
        let candidates = candidates_fixture();
        let weights = vec![("audio-spectral".to_string(), 1.0), ("lyrics-semantic".to_string(), 1.0)];
        let fused = fuse(&candidates, &weights);
        let b = fused.iter().find(|(id, _, _)| id == "B").unwrap();
        assert!((b.1 - 0.1).abs() < 1e-6);
    }

    #[test]
    fn balanced_reason_when_top_two_modalities_are_close() {
        let per_modality = vec![("audio-spectral", 0.5), ("lyrics-semantic", 0.45)];
        assert_eq!(dominant_reason(&per_modality), Some("Balanced".to_string()));
    }

    #[test]
    fn dominant_modality_named_when_gap_exceeds_threshold() {
        let per_modality = vec![("audio-spectral", 0.9), ("lyrics-semantic", 0.1)];
        assert_eq!(dominant_reason(&per_modality), Some("audio-spectral".to_string()));
    }

    #[test]
    fn pool_size_grows_with_diversity() {
        assert_eq!(pool_size(10, 0.0), 10);
        assert_eq!(pool_size(10, 1.0), 50);
    }

    #[test]
    fn top_n_normalizes_by_the_given_denominator_not_the_entry_count() {
        let mut scores = HashMap::new();
        scores.insert("artist-1".to_string(), 3.0);
        let entries = top_n(&scores, 3, 10.0, EntryKind::Artist);
        assert_eq!(entries.len(), 1);
        assert!((entries[0].score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn zero_diversity_truncates_by_score_order() {
        let pool = vec![
            ("A".to_string(), 0.9, None),
            ("B".to_string(), 0.5, None),
            ("C".to_string(), 0.1, None),
        ];
        let selected = select_with_diversity(pool, 2, 0.0);
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].0, "A");
        assert_eq!(selected[1].0, "B");
    }
}
