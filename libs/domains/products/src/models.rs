use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError, ValidationErrors};

/// Message attached to a required attribute left blank.
pub const BLANK_MESSAGE: &str = "can't be blank";

/// Rejects empty and whitespace-only text.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed(BLANK_MESSAGE)));
    }
    Ok(())
}

/// Product entity
///
/// A product is only written to the store when `name`, `downcase_name` and
/// `image_url` are all present. The failures of the last validation stay on
/// the record until the next one succeeds.
#[derive(Debug, Clone, Default, Serialize, Validate, ToSchema)]
pub struct Product {
    /// Store-assigned id, absent until the first successful save
    #[schema(example = 42)]
    pub id: Option<i64>,
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Gopher Plush")]
    pub name: String,
    /// Lower-cased `name`; the sort and prefix-search key
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "gopher plush")]
    pub downcase_name: String,
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "https://example.com/gopher.png")]
    pub image_url: String,
    #[serde(skip)]
    pub(crate) errors: Option<ValidationErrors>,
}

impl Product {
    /// Build an unsaved product from submitted attributes.
    pub fn new(params: ProductParams) -> Self {
        let mut product = Self::default();
        product.apply(params);
        product
    }

    /// Set the attributes present in `params`, leaving the others untouched.
    pub fn apply(&mut self, params: ProductParams) {
        if let Some(name) = params.name {
            self.name = name;
        }
        if let Some(downcase_name) = params.downcase_name {
            self.downcase_name = downcase_name;
        }
        if let Some(image_url) = params.image_url {
            self.image_url = image_url;
        }
    }

    /// Whether the product has been stored (has an id).
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Run validation and record the outcome on the product.
    pub fn check_valid(&mut self) -> bool {
        match self.validate() {
            Ok(()) => {
                self.errors = None;
                true
            }
            Err(errors) => {
                self.errors = Some(errors);
                false
            }
        }
    }

    /// Failures from the last validation, if it failed.
    pub fn errors(&self) -> Option<&ValidationErrors> {
        self.errors.as_ref()
    }

    /// Failures from the last validation as attribute -> messages.
    pub fn error_messages(&self) -> BTreeMap<String, Vec<String>> {
        let Some(errors) = &self.errors else {
            return BTreeMap::new();
        };

        errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .as_ref()
                            .map_or_else(|| error.code.to_string(), |m| m.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect()
    }
}

/// Attributes a client may set on a product.
///
/// Anything else in the submission is ignored. HTML forms may also nest the
/// keys as `product[name]` and so on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct ProductParams {
    #[serde(default, alias = "product[name]")]
    pub name: Option<String>,
    #[serde(default, alias = "product[downcase_name]")]
    pub downcase_name: Option<String>,
    #[serde(default, alias = "product[image_url]")]
    pub image_url: Option<String>,
}

/// Query parameters for listing products
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListParams {
    /// Opaque cursor returned by a previous page
    pub cursor: Option<String>,
}

/// One page of products
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Cursor for the next page; absent when this page was the last
    pub cursor: Option<String>,
}

/// Query parameters for the autocomplete endpoint
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AutosearchParams {
    /// Prefix to match against `downcase_name` (used verbatim)
    #[serde(default)]
    pub phrase: String,
    /// JSONP callback name
    pub callback: Option<String>,
}

/// A product form: the record being edited plus any validation failures.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductForm {
    pub product: Product,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl From<Product> for ProductForm {
    fn from(product: Product) -> Self {
        let errors = product.error_messages();
        Self { product, errors }
    }
}

/// Body of the redirect sent after a successful write.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Notice {
    /// One-shot message for the next page
    #[schema(example = "Added Product")]
    pub notice: String,
    /// Where the client is redirected
    pub location: String,
}
