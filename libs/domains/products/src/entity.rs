//! Mapping between [`Product`] and the store's entity shape.

use crate::datastore::{Entity, Key, Value};
use crate::models::Product;

/// Store kind for products.
pub const KIND: &str = "Product";

const NAME: &str = "name";
const DOWNCASE_NAME: &str = "downcase_name";
const IMAGE_URL: &str = "image_url";

impl Product {
    /// Build a product from a stored entity.
    ///
    /// Only the three product attributes are read; other properties and
    /// non-text values are ignored.
    pub fn from_entity(entity: Entity) -> Self {
        let mut product = Product {
            id: entity.key.id,
            ..Default::default()
        };

        for (name, value) in entity.properties {
            let Value::String(text) = value else {
                continue;
            };
            match name.as_str() {
                NAME => product.name = text,
                DOWNCASE_NAME => product.downcase_name = text,
                IMAGE_URL => product.image_url = text,
                _ => {}
            }
        }

        product
    }

    /// The entity to write for this product, keyed by its current id.
    pub fn to_entity(&self) -> Entity {
        let mut entity = Entity::new(Key::new(KIND, self.id));
        entity.set(NAME, self.name.as_str());
        entity.set(DOWNCASE_NAME, self.downcase_name.as_str());
        entity.set(IMAGE_URL, self.image_url.as_str());
        entity
    }
}
