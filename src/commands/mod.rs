pub mod download_tiles;
pub mod list_tiles;

pub use download_tiles::download_tiles;
pub use list_tiles::list_tiles;
