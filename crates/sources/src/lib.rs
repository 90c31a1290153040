//! Catalog scraping and stream resolution for anime sites.
//!
//! The crate is organised the way a request flows:
//!
//! - [`source`]: per-site catalog, episode and video listing ([`source::AnimeSource`]).
//! - [`extractor`]: embed URL → [`extractor::Hoster`] dispatch and the per-host decoders.
//! - [`decode`]: base64, AES and packed-JS routines shared by the decoders.
//! - [`quality`]: preference-driven ranking of the resolved candidates.
//! - [`media`]: the transient records passed between all of the above.

pub mod decode;
pub mod extractor;
pub mod js_engine;
pub mod media;
pub mod quality;
pub mod source;

pub use extractor::{Hoster, HosterFactory, error::ExtractorError};
pub use media::{Anime, AnimeStatus, AnimesPage, Episode, MediaFormat, Track, Video};
pub use source::sites::{SourceInfo, available_sources, create_source};
pub use source::{AnimeSource, SearchFilters, SourceConfig};
