pub mod filesystem;

pub use filesystem::{
    JobStorage, DEBUG_AFTER_FILTER_FILE, DEBUG_BEFORE_FILTER_FILE, RESULT_FILE,
    SELECTED_FRAME_FILE,
};
