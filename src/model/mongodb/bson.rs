use mongodb::bson::{doc, Document};

/// Filter matching the document with the given integer `_id`.
pub fn u32_id_filter(id: u32) -> Document {
    doc! { "_id": id }
}

/// Serde helper storing an `Option<DateTime<Utc>>` as a BSON datetime or null.
///
/// `mongodb::bson::serde_helpers` only covers the non-optional case.
pub mod optional_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson::DateTime as BsonDateTime;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .map(BsonDateTime::from_chrono)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<BsonDateTime>::deserialize(deserializer)?;
        Ok(value.map(BsonDateTime::to_chrono))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mongodb::bson::{from_document, to_document, Bson};

    use crate::model::db::election::NewElection;

    use super::*;

    #[test]
    fn optional_dates_round_trip_through_bson() {
        let mut election = NewElection::ongoing_example();
        election.start_date = Some(Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());

        let document = to_document(&election).unwrap();
        assert!(matches!(document.get("start_date"), Some(Bson::DateTime(_))));
        assert_eq!(document.get("end_date"), Some(&Bson::Null));

        let restored: NewElection = from_document(document).unwrap();
        assert_eq!(restored, election);
    }

    #[test]
    fn id_filter() {
        assert_eq!(u32_id_filter(7).get("_id"), Some(&Bson::from(7u32)));
    }
}
