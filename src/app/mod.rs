mod song_service;

pub use song_service::{ProviderFailure, SongOperation, SongService, SongServiceError};
