pub mod anime;
pub mod episode;
pub mod media_format;
pub mod video;

pub use anime::{Anime, AnimeBuilder, AnimeStatus, AnimesPage};
pub use episode::Episode;
pub use media_format::MediaFormat;
pub use video::{Track, Video};
