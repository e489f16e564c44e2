// Canonical relay state: tourists, incidents, alerts and derived stats

mod entity;
mod merge;
mod store;

pub use entity::{
    Activity, AdminSnapshot, Alert, Incident, Location, NewIncident, Stats, Tourist,
    ACTIVE_STATUS, SYSTEM_REPORTER,
};
pub use merge::{merge_fields, MergeError};
pub use store::{StateStore, StoreError};

#[cfg(test)]
mod tests;
