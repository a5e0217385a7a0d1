pub mod geocode;
pub mod musicbrainz;
pub mod sparql;
pub mod wikipedia;
