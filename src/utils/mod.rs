pub mod compare;
pub mod directory;
pub mod drive_map;
pub mod progress;
