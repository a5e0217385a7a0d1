use crate::types::{Area, AreaType, GeoResult};

/// Total function mapping an area type to a specificity score: country=0,
/// subdivision=1, county=2, city-level=3, anything unrecognized=1, and a
/// missing type entirely=-1 (ranks below even a country).
pub fn area_specificity(area_type: AreaType) -> i8 {
    match area_type {
        AreaType::Country => 0,
        AreaType::Subdivision => 1,
        AreaType::County => 2,
        AreaType::City
        | AreaType::Municipality
        | AreaType::District
        | AreaType::Town
        | AreaType::Village
        | AreaType::Island => 3,
        AreaType::Other => 1,
        AreaType::Null => -1,
    }
}

pub fn is_city_level(area_type: AreaType) -> bool {
    area_specificity(area_type) >= 3
}

const CITY_LEVEL_ADDRESS_TYPES: &[&str] = &[
    "city",
    "town",
    "village",
    "municipality",
    "suburb",
    "neighbourhood",
    "district",
    "borough",
    "locality",
];

pub fn is_city_level_geocode(result: &GeoResult) -> bool {
    match &result.address_type {
        Some(t) => CITY_LEVEL_ADDRESS_TYPES
            .iter()
            .any(|c| c.eq_ignore_ascii_case(t)),
        None => false,
    }
}

/// Picks the more specific of two areas, with ties favoring `area` — it
/// tends to be the country while `begin_area` tends to be the city, but
/// `area` wins on a tie since single-country acts often have both fields
/// populated identically.
pub fn choose_best_area<'a>(begin: Option<&'a Area>, area: Option<&'a Area>) -> Option<&'a Area> {
    match (begin, area) {
        (None, None) => None,
        (Some(b), None) => Some(b),
        (None, Some(a)) => Some(a),
        (Some(b), Some(a)) => {
            if area_specificity(a.area_type) >= area_specificity(b.area_type) {
                Some(a)
            } else {
                Some(b)
            }
        }
    }
}
