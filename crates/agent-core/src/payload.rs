//! The item a run is asked to post.

use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// Read-only description of the listing. The loop only references it: it is sent to the
/// planner and used by the recovery heuristics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingPayload {
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    #[serde(alias = "original_price")]
    pub original_price: Option<f64>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub tags: Vec<String>,
    #[serde(alias = "imageUrls", alias = "image_urls")]
    pub images: Vec<String>,
}

impl ListingPayload {
    /// Reject payloads no marketplace would accept.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.title.trim().is_empty() {
            return Err(AgentError::invalid_listing("title cannot be empty"));
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(AgentError::invalid_listing(format!(
                    "price must be a non-negative number, got {price}"
                )));
            }
        }
        Ok(())
    }

    pub fn has_images(&self) -> bool {
        self.images.iter().any(|url| !url.trim().is_empty())
    }

    /// Price as typed into a form: no trailing `.0` for whole amounts.
    pub fn price_text(&self) -> Option<String> {
        self.price.map(format_amount)
    }

    pub fn original_price_text(&self) -> Option<String> {
        self.original_price.or(self.price).map(format_amount)
    }
}

pub(crate) fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}
