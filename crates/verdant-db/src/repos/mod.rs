pub(crate) mod actions;
pub(crate) mod findings;
pub(crate) mod maintenance;
pub(crate) mod preferences;
pub(crate) mod stats;
pub(crate) mod subjects;
