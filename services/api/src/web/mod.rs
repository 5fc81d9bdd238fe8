pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary that
// builds the web server router.
pub use rest::{
    get_edition_handler, get_verses_after_handler, get_verses_before_handler, get_verses_handler,
    list_editions_handler,
};
