use crate::{
    error::StoreError,
    models::{LocationType, MapLocation, NearestLocation},
};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn check_coordinates(lat: f64, lon: f64) -> Result<(), StoreError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(StoreError::InvalidInput(format!("coordinates out of range: {lat},{lon}")));
    }
    Ok(())
}

/// Static set of recycling, donation and campaign locations.
pub struct Locations {
    all: Vec<MapLocation>,
}

impl Locations {
    pub fn new(all: Vec<MapLocation>) -> Self {
        Self { all }
    }

    pub fn seeded() -> Self {
        Self::new(seed_locations())
    }

    /// Case-insensitive match on name or address, optionally restricted to one type.
    pub fn filter(&self, search: Option<&str>, kind: Option<LocationType>) -> Vec<MapLocation> {
        let term = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());
        self.all
            .iter()
            .filter(|loc| match &term {
                Some(t) => {
                    loc.name.to_lowercase().contains(t)
                        || loc.address.as_deref().is_some_and(|a| a.to_lowercase().contains(t))
                }
                None => true,
            })
            .filter(|loc| kind.map_or(true, |k| loc.location_type == k))
            .cloned()
            .collect()
    }

    pub fn nearest(&self, lat: f64, lon: f64) -> Result<Option<NearestLocation>, StoreError> {
        check_coordinates(lat, lon)?;
        let nearest = self
            .all
            .iter()
            .map(|loc| (loc, haversine_km(lat, lon, loc.latitude, loc.longitude)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(loc, distance_km)| NearestLocation { location: loc.clone(), distance_km });
        Ok(nearest)
    }
}

fn seed_locations() -> Vec<MapLocation> {
    let loc = |id: &str, name: &str, location_type, latitude, longitude, address: &str| MapLocation {
        id: id.into(),
        name: name.into(),
        location_type,
        latitude,
        longitude,
        address: Some(address.into()),
    };
    vec![
        loc("1", "Swachh Bangalore Recycling", LocationType::Recycler, 12.9716, 77.5946, "10 MG Road, Bangalore"),
        loc("2", "Seva Foundation Drop-off", LocationType::Ngo, 12.9750, 77.6000, "25 Koramangala Main Rd, Bangalore"),
        loc("3", "Indiranagar Compost Hub", LocationType::DropOffPoint, 12.9780, 77.6400, "50, 100 Feet Rd, Indiranagar, Bangalore"),
        loc("4", "Mahila Shakti SHG", LocationType::Shg, 12.9600, 77.5800, "75 Chickpet, Bangalore"),
        loc("5", "Lalbagh Cleanup Drive", LocationType::Campaign, 12.9507, 77.5848, "Lalbagh Botanical Garden, Bangalore"),
        loc("6", "Jayanagar E-Waste Collection", LocationType::Recycler, 12.9293, 77.5824, "100 Jayanagar 4th Block, Bangalore"),
        loc("7", "Whitefield Community Composting", LocationType::DropOffPoint, 12.9698, 77.7499, "200 ITPL Main Road, Whitefield, Bangalore"),
    ]
}
