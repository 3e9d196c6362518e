use async_trait::async_trait;
use std::fmt::Debug;

use crate::{error::ResolveError, model::Coordinates};

pub mod wikipedia;

pub use wikipedia::WikipediaResolver;

/// Maps a free-text city name to coordinates.
#[async_trait]
pub trait CoordinateResolver: Send + Sync + Debug {
    async fn resolve(&self, city_name: &str) -> Result<Coordinates, ResolveError>;
}
