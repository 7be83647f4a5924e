use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    error::StoreError,
    models::{ClassificationResult, NewWasteReport, Recyclability, ReuseSuggestion, Unit, WasteReport},
    store::locations::check_coordinates,
};

/// Waste collection reports, newest first.
pub struct WasteReports {
    reports: RwLock<Vec<WasteReport>>,
}

impl WasteReports {
    pub fn new(reports: Vec<WasteReport>) -> Self {
        Self { reports: RwLock::new(reports) }
    }

    pub fn seeded() -> Self {
        Self::new(seed_reports())
    }

    pub fn list(&self) -> Vec<WasteReport> {
        self.reports.read().clone()
    }

    pub fn get(&self, id: Uuid) -> Result<WasteReport, StoreError> {
        self.reports
            .read()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn add(&self, report: NewWasteReport) -> Result<WasteReport, StoreError> {
        let item_name = report.item_name.trim();
        if item_name.is_empty() {
            return Err(StoreError::InvalidInput("itemName is required".into()));
        }
        if !(report.quantity.is_finite() && report.quantity > 0.0) {
            return Err(StoreError::InvalidInput("quantity must be a positive number".into()));
        }
        check_coordinates(report.latitude, report.longitude)?;

        let created = WasteReport {
            id: Uuid::new_v4(),
            classification: report.classification,
            latitude: report.latitude,
            longitude: report.longitude,
            timestamp: Utc::now(),
            item_name: item_name.to_string(),
            quantity: report.quantity,
            unit: report.unit,
            notes: report.notes.filter(|n| !n.trim().is_empty()),
        };
        self.reports.write().insert(0, created.clone());
        Ok(created)
    }

    /// Google Maps directions to a report, starting from `origin` when known.
    pub fn directions_url(&self, id: Uuid, origin: Option<(f64, f64)>) -> Result<String, StoreError> {
        let report = self.get(id)?;
        let mut url = format!(
            "https://www.google.com/maps/dir/?api=1&destination={},{}",
            report.latitude, report.longitude
        );
        if let Some((lat, lon)) = origin {
            check_coordinates(lat, lon)?;
            url.push_str(&format!("&origin={},{}", lat, lon));
        }
        Ok(url)
    }
}

fn at(ts: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(ts).map(|t| t.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

fn seed_reports() -> Vec<WasteReport> {
    vec![
        WasteReport {
            id: Uuid::new_v4(),
            classification: ClassificationResult {
                recyclability: Recyclability::Recyclable,
                reuse_suggestions: vec![ReuseSuggestion {
                    suggestion: "Melt into a block".into(),
                    video_search_query: "melt plastic bottles".into(),
                }],
                recycle_channels: vec!["Municipal recycling bin".into()],
                donate_suggestions: vec![],
            },
            latitude: 12.9716,
            longitude: 77.5946,
            timestamp: at("2024-07-29T10:00:00Z"),
            item_name: "Plastic Bottles".into(),
            quantity: 15.0,
            unit: Unit::Items,
            notes: Some("In a blue bag by the gate.".into()),
        },
        WasteReport {
            id: Uuid::new_v4(),
            classification: ClassificationResult {
                recyclability: Recyclability::Recyclable,
                reuse_suggestions: vec![],
                recycle_channels: vec!["E-waste collection center".into()],
                donate_suggestions: vec![],
            },
            latitude: 12.9780,
            longitude: 77.6400,
            timestamp: at("2024-07-29T11:30:00Z"),
            item_name: "Old Keyboard".into(),
            quantity: 1.0,
            unit: Unit::Items,
            notes: Some("Handle with care.".into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_report(item: &str) -> NewWasteReport {
        NewWasteReport {
            classification: ClassificationResult {
                recyclability: Recyclability::Unsure,
                reuse_suggestions: vec![],
                recycle_channels: vec![],
                donate_suggestions: vec!["Local NGO".into()],
            },
            latitude: 12.95,
            longitude: 77.6,
            item_name: item.into(),
            quantity: 2.0,
            unit: Unit::Kg,
            notes: None,
        }
    }

    #[test]
    fn added_report_round_trips_through_list() {
        let store = WasteReports::new(Vec::new());
        let mut input = new_report("Old clothes");
        input.notes = Some("Two bags at the gate".into());
        let before = Utc::now();
        let created = store.add(input.clone()).unwrap();

        let listed = store.list();
        assert_eq!(listed, vec![created.clone()]);
        let got = &listed[0];
        assert_eq!(got.id.get_version_num(), 4);
        assert_eq!(got.classification, input.classification);
        assert_eq!(got.item_name, input.item_name);
        assert_eq!(got.latitude, input.latitude);
        assert_eq!(got.longitude, input.longitude);
        assert_eq!(got.quantity, input.quantity);
        assert_eq!(got.unit, input.unit);
        assert_eq!(got.notes, input.notes);
        assert!(got.timestamp >= before);

        let rendered = serde_json::to_value(got).unwrap();
        let timestamp = DateTime::parse_from_rfc3339(rendered["timestamp"].as_str().unwrap()).unwrap();
        assert_eq!(timestamp.with_timezone(&Utc), got.timestamp);
    }

    #[test]
    fn newest_report_comes_first() {
        let store = WasteReports::seeded();
        let created = store.add(new_report("Cardboard")).unwrap();
        let listed = store.list();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].id, created.id);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let store = WasteReports::new(Vec::new());
        let mut bad = new_report("Cans");
        bad.latitude = 123.0;
        assert!(matches!(store.add(bad), Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn directions_include_origin_when_given() {
        let store = WasteReports::new(Vec::new());
        let report = store.add(new_report("Cans")).unwrap();
        assert_eq!(
            store.directions_url(report.id, Some((12.9, 77.5))).unwrap(),
            "https://www.google.com/maps/dir/?api=1&destination=12.95,77.6&origin=12.9,77.5"
        );
        assert!(matches!(store.directions_url(Uuid::new_v4(), None), Err(StoreError::NotFound(_))));
    }
}
