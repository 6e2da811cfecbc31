//! Turning what the user typed into a downloadable series URL.
//!
//! A direct URL is used as-is. Anything else is matched against the site
//! registry, exactly and then fuzzily, and entries with rotating domains
//! have their live mirror hunted down with a [`MirrorHunter`].

pub mod error;
mod mirror;
mod resolver;
mod score;

pub use crate::mirror::{HostCatalog, MirrorHunter, Prober, origin_of};
pub use crate::resolver::{Choice, Disambiguator, Resolution, ResolvedTarget, Resolver, parse_choice};
pub use crate::score::{Candidate, ScoreConfig, normalize_input, rank, score, similarity};
