use pss_core::Collection;

/// Store collection names for each logical collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub stations: String,
    pub people: String,
    pub submissions: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            stations: "stations".to_string(),
            people: "people".to_string(),
            submissions: "submissions".to_string(),
        }
    }
}

impl Collections {
    pub fn name(&self, collection: Collection) -> &str {
        match collection {
            Collection::Stations => &self.stations,
            Collection::People => &self.people,
            Collection::Submissions => &self.submissions,
        }
    }
}
