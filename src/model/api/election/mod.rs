mod desc;
mod spec;

pub use desc::{ElectionDescription, ElectionSummary};
pub(crate) use spec::validate_dates;
pub use spec::{ElectionPatch, ElectionSpec, StatusChange};
