//! # pmvcovers - Cache de vignettes
//!
//! Cache disque pour les vignettes servies par le serveur. Une vignette
//! est téléchargée au premier accès puis servie depuis le disque; il n'y
//! a ni éviction ni invalidation (on vide le cache en supprimant le
//! répertoire).
//!
//! Cache layout: one directory per server identity, one file per remote
//! thumbnail path with the path separator substituted, so distinct remote
//! paths never collide on disk.

mod cache;

pub use cache::{CoverCache, CoverError};
