pub mod domain;
pub mod fallback;
pub mod feed;
pub mod ports;

pub use domain::{DisplayVerse, Edition, Language, Verse, VerseSnapshot};
pub use feed::{FeedState, RetryPolicy};
pub use ports::{PersistentStore, PortError, PortResult, VerseRepository};
