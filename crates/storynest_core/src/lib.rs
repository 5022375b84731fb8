pub mod domain;
pub mod generation;
pub mod media;
pub mod ports;
pub mod validate;

pub use domain::{
    CommentWithAuthor, GeneratedStory, Genre, LikeState, Page, Story, StoryDetail, StoryStatus,
    StoryWithAuthor, User, UserCredentials,
};
pub use generation::{generate_story, GenerationError};
pub use media::{ingest, EncodedImage, ACCEPTED_IMAGE_TYPES, MAX_IMAGE_BYTES};
pub use ports::{
    AssetStore, DatabaseService, NewStory, NewUser, PortError, PortResult, ProfileChanges,
    PublishedAsset, StoryChanges, StoryQuery, TextCompletionService,
};
pub use validate::ValidationError;
