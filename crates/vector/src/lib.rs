pub mod error;
pub mod modality;
pub mod recommend;
pub mod repository;

pub use error::VectorError;
pub use modality::VectorModality;
pub use recommend::{EntryKind, ModalityWeight, RecommendationEngine, RecommendationEntry, RecommendationRequest};
pub use repository::{VectorRepository, VectorRow};
