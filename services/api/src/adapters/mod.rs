pub mod scripture;
pub mod store;

pub use scripture::ScriptureApiAdapter;
pub use store::JsonFileStore;
