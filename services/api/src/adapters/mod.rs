pub mod assets;
pub mod db;
pub mod story_llm;

pub use assets::{HttpAssetStore, LocalAssetStore};
pub use db::DbAdapter;
pub use story_llm::OpenAiCompletionAdapter;
