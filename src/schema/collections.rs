//! Field sets of the two standard collections: places and the opinions
//! written about them.

use std::sync::Arc;

use crate::error::Result;
use crate::schema::field::FieldDescriptor;
use crate::schema::registry::SchemaRegistry;
use crate::schema::schema::Schema;

pub const PLACES: &str = "places";
pub const OPINIONS: &str = "opinions";

/// Places: one record per business.
pub fn places_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::identifier("business_id")
            .stored(true)
            .unique(true)
            .required(true),
        FieldDescriptor::text("name").stored(true),
        FieldDescriptor::text("address").stored(true),
        FieldDescriptor::text("city").stored(true),
        FieldDescriptor::text("state").stored(true),
        FieldDescriptor::identifier("postal_code").stored(true),
        FieldDescriptor::numeric("latitude").stored(true),
        FieldDescriptor::numeric("longitude").stored(true),
        FieldDescriptor::numeric("stars").stored(true),
        FieldDescriptor::numeric("review_count").stored(true),
        FieldDescriptor::boolean("is_open").stored(true),
        FieldDescriptor::text("attributes").stored(true),
        FieldDescriptor::tag_list("categories").stored(true),
        FieldDescriptor::text("hours").stored(true),
    ]
}

/// Opinions: one review of a place by an author.
pub fn opinions_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::identifier("review_id")
            .stored(true)
            .unique(true)
            .required(true),
        FieldDescriptor::identifier("user_id").stored(true),
        FieldDescriptor::identifier("business_id").stored(true),
        FieldDescriptor::numeric("stars").stored(true),
        FieldDescriptor::numeric("useful").stored(true),
        FieldDescriptor::numeric("funny").stored(true),
        FieldDescriptor::numeric("cool").stored(true),
        FieldDescriptor::text("text").stored(true),
        FieldDescriptor::timestamp("date").stored(true),
    ]
}

pub fn places_schema() -> Result<Schema> {
    Schema::from_fields(places_fields())
}

pub fn opinions_schema() -> Result<Schema> {
    Schema::from_fields(opinions_fields())
}

/// Define both standard collections in `registry`.
pub fn define_defaults(registry: &SchemaRegistry) -> Result<(Arc<Schema>, Arc<Schema>)> {
    let places = registry.define(PLACES, places_fields())?;
    let opinions = registry.define(OPINIONS, opinions_fields())?;
    Ok((places, opinions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::FieldType;

    #[test]
    fn test_default_collections() {
        let registry = SchemaRegistry::new();
        let (places, opinions) = define_defaults(&registry).unwrap();

        assert_eq!(places.len(), 14);
        assert_eq!(opinions.len(), 9);
        assert_eq!(places.unique_field().unwrap().name, "business_id");
        assert_eq!(opinions.unique_field().unwrap().name, "review_id");
        assert_eq!(
            registry.field_type(PLACES, "categories"),
            Some(FieldType::TagList)
        );
        assert_eq!(registry.field_type(OPINIONS, "date"), Some(FieldType::Timestamp));
        assert!(define_defaults(&registry).is_err());
    }
}
