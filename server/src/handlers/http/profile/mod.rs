pub mod profile;

pub use profile::{handle_delete_me, handle_get_me, handle_update_me};
