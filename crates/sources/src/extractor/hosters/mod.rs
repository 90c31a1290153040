//! One decoder per [`Hoster`](super::Hoster) variant.
//!
//! Each decoder keeps its page parsing in free functions over the fetched
//! body so it can be checked against saved fixtures.

pub mod allanime;
pub mod animefire;
pub mod dood;
pub mod emturbo;
pub mod fastream;
pub mod filemoon;
pub mod kickassanime;
pub mod mixdrop;
pub mod mp4upload;
pub mod okru;
pub mod rapidcloud;
pub mod sendvid;
pub mod sibnet;
pub mod streamtape;
pub mod streamwish;
pub mod uqload;
pub mod voe;
pub mod yourupload;
