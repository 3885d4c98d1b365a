mod bson;
mod collection;
mod counter;
mod errors;

pub use bson::{optional_bson_datetime, u32_id_filter};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_counters_exist, Counter, CounterName};
pub use errors::is_duplicate_key_error;
