pub mod community;
pub mod locations;
pub mod reports;
pub mod waste_log;

use crate::{config::Config, error::StoreError};

use self::{
    community::{CommunityFeed, UpcycleIdeas},
    locations::Locations,
    reports::WasteReports,
    waste_log::{WasteLog, WASTE_LOG_FILE},
};

/// Every collection the app serves, built once at start-up and shared by handlers.
pub struct Stores {
    pub waste_log: WasteLog,
    pub reports: WasteReports,
    pub locations: Locations,
    pub posts: CommunityFeed,
    pub ideas: UpcycleIdeas,
}

impl Stores {
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        Ok(Self {
            waste_log: WasteLog::open(config.data_dir.join(WASTE_LOG_FILE))?,
            reports: WasteReports::seeded(),
            locations: Locations::seeded(),
            posts: CommunityFeed::seeded(),
            ideas: UpcycleIdeas::new(),
        })
    }

    /// Seeded stores without a backing file.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self {
            waste_log: WasteLog::in_memory(Vec::new()),
            reports: WasteReports::seeded(),
            locations: Locations::seeded(),
            posts: CommunityFeed::seeded(),
            ideas: UpcycleIdeas::new(),
        }
    }
}
