//! Marketplace profiles.
//!
//! Everything the loop needs to know about one marketplace lives here: where the create form
//! is, what a finished listing looks like, field limits, condition vocabulary, and the
//! selectors the direct-fill fallback tries for each logical field.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::{errors::AgentError, payload::ListingPayload};

static POSHMARK_LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?poshmark\.com/listing/[A-Za-z0-9\-_]+")
        .expect("poshmark listing pattern")
});

static MERCARI_LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?mercari\.com(?:/us)?/item/m\d+").expect("mercari listing pattern")
});

static EBAY_LISTING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?ebay\.com/itm/\d+").expect("ebay listing pattern")
});

/// Ordered selector candidates per logical form field. The first visible match wins.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FieldSelectors {
    pub title: Vec<String>,
    pub description: Vec<String>,
    pub brand: Vec<String>,
    pub price: Vec<String>,
    pub original_price: Vec<String>,
    pub size: Vec<String>,
    pub category: Vec<String>,
    pub color: Vec<String>,
    pub condition: Vec<String>,
    pub file_input: Vec<String>,
}

impl FieldSelectors {
    /// Name/placeholder based candidates that work on most listing forms.
    pub fn generic() -> Self {
        Self {
            title: strings(&[
                "input[name=\"title\"]",
                "input[name*=\"title\"]",
                "input[placeholder*=\"title\"]",
                "input[placeholder*=\"Title\"]",
            ]),
            description: strings(&[
                "textarea[name=\"description\"]",
                "textarea[name*=\"description\"]",
                "textarea[placeholder*=\"escri\"]",
            ]),
            brand: strings(&[
                "input[name=\"brand\"]",
                "input[name*=\"brand\"]",
                "input[placeholder*=\"rand\"]",
            ]),
            price: strings(&[
                "input[name=\"price\"]",
                "input[name*=\"listingPrice\"]",
                "input[placeholder*=\"$\"]",
            ]),
            original_price: strings(&[
                "input[name=\"originalPrice\"]",
                "input[name*=\"original\"]",
            ]),
            size: strings(&["select[name*=\"size\"]", "[data-test*=\"size\"]"]),
            category: strings(&["select[name*=\"category\"]", "[data-test*=\"category\"]"]),
            color: strings(&["select[name*=\"color\"]", "[data-test*=\"color\"]"]),
            condition: strings(&[
                "select[name*=\"condition\"]",
                "[data-test*=\"condition\"]",
            ]),
            file_input: strings(&["input[type=\"file\"]"]),
        }
    }

    fn prepend(mut self, specific: FieldSelectors) -> Self {
        fn join(first: Vec<String>, rest: Vec<String>) -> Vec<String> {
            first.into_iter().chain(rest).collect()
        }
        self.title = join(specific.title, self.title);
        self.description = join(specific.description, self.description);
        self.brand = join(specific.brand, self.brand);
        self.price = join(specific.price, self.price);
        self.original_price = join(specific.original_price, self.original_price);
        self.size = join(specific.size, self.size);
        self.category = join(specific.category, self.category);
        self.color = join(specific.color, self.color);
        self.condition = join(specific.condition, self.condition);
        self.file_input = join(specific.file_input, self.file_input);
        self
    }
}

/// Marketplace-specific knowledge used by one run.
#[derive(Clone, Debug)]
pub struct MarketplaceProfile {
    /// Tag sent to the planner and echoed in notifications.
    pub name: String,
    pub create_url: String,
    /// Path fragment only finished listings have.
    pub listing_path: String,
    /// Path fragment of the create form itself.
    pub create_path: String,
    /// Lowercase phrases shown once a listing is published.
    pub success_phrases: Vec<String>,
    pub listing_url_pattern: Regex,
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_images: usize,
    pub max_tags: Option<usize>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub condition_map: BTreeMap<String, String>,
    /// Label used when the payload condition is missing or unknown.
    pub default_condition: String,
    pub fields: FieldSelectors,
    pub price_markers: Vec<String>,
}

/// Serializable view of a profile's limits, for listings and logs.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub name: String,
    pub create_url: String,
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_images: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    pub conditions: BTreeMap<String, String>,
}

impl MarketplaceProfile {
    /// Names of the built-in profiles.
    pub const BUILT_IN: [&'static str; 3] = ["poshmark", "mercari", "ebay"];

    /// Look up a built-in profile by name, case-insensitively.
    pub fn by_name(name: &str) -> Result<Self, AgentError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "poshmark" => Ok(Self::poshmark()),
            "mercari" => Ok(Self::mercari()),
            "ebay" => Ok(Self::ebay()),
            other => Err(AgentError::UnknownMarketplace(other.to_string())),
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::poshmark(), Self::mercari(), Self::ebay()]
    }

    pub fn poshmark() -> Self {
        Self {
            name: "poshmark".to_string(),
            create_url: "https://poshmark.com/create-listing".to_string(),
            listing_path: "/listing/".to_string(),
            create_path: "/create-listing".to_string(),
            success_phrases: strings(&[
                "your listing is live",
                "listing has been created",
                "successfully listed",
            ]),
            listing_url_pattern: POSHMARK_LISTING.clone(),
            max_title_len: 80,
            max_description_len: 1500,
            max_images: 16,
            max_tags: Some(10),
            min_price: None,
            max_price: None,
            condition_map: pairs(&[
                ("new", "NWT"),
                ("nwt", "NWT"),
                ("like_new", "NWOT"),
                ("nwot", "NWOT"),
                ("good", "Good"),
                ("fair", "Fair"),
                ("poor", "Poor"),
            ]),
            default_condition: "Good".to_string(),
            fields: FieldSelectors::generic().prepend(FieldSelectors {
                title: strings(&["input[data-vv-name=\"title\"]"]),
                description: strings(&["textarea[data-vv-name=\"description\"]"]),
                brand: strings(&["input[placeholder*=\"Enter the Brand\"]"]),
                price: strings(&["input[data-vv-name=\"listingPrice\"]"]),
                original_price: strings(&["input[data-vv-name=\"originalPrice\"]"]),
                size: strings(&["[data-et-name=\"size\"]"]),
                category: strings(&["[data-et-name=\"category\"]"]),
                color: strings(&["[data-et-name=\"color\"]"]),
                condition: strings(&["[data-et-name=\"condition\"]"]),
                file_input: strings(&["input[name=\"img-file-input\"]"]),
            }),
            price_markers: strings(&["listingPrice", "originalPrice", "price"]),
        }
    }

    pub fn mercari() -> Self {
        Self {
            name: "mercari".to_string(),
            create_url: "https://www.mercari.com/sell".to_string(),
            listing_path: "/item/m".to_string(),
            create_path: "/sell".to_string(),
            success_phrases: strings(&[
                "your item is listed",
                "listing is live",
                "successfully listed",
            ]),
            listing_url_pattern: MERCARI_LISTING.clone(),
            max_title_len: 80,
            max_description_len: 1000,
            max_images: 12,
            max_tags: None,
            min_price: Some(1.0),
            max_price: Some(2000.0),
            condition_map: pairs(&[
                ("new", "New"),
                ("nwt", "New"),
                ("nwot", "Like New"),
                ("like_new", "Like New"),
                ("excellent", "Good"),
                ("good", "Good"),
                ("fair", "Fair"),
                ("poor", "Poor"),
            ]),
            default_condition: "Good".to_string(),
            fields: FieldSelectors::generic().prepend(FieldSelectors {
                title: strings(&["input[data-testid=\"Title\"]"]),
                description: strings(&["textarea[data-testid=\"Description\"]"]),
                brand: strings(&["input[data-testid=\"Brand\"]"]),
                price: strings(&["input[data-testid=\"Price\"]"]),
                size: strings(&["[data-testid=\"Size\"]"]),
                category: strings(&["[data-testid=\"CategoryL0\"]"]),
                color: strings(&["[data-testid=\"Color\"]"]),
                condition: strings(&["[data-testid=\"Condition\"]"]),
                file_input: strings(&["input[data-testid=\"PhotoUploadInput\"]"]),
                ..FieldSelectors::default()
            }),
            price_markers: strings(&["Price", "price"]),
        }
    }

    pub fn ebay() -> Self {
        Self {
            name: "ebay".to_string(),
            create_url: "https://www.ebay.com/sl/sell".to_string(),
            listing_path: "/itm/".to_string(),
            create_path: "/sl/".to_string(),
            success_phrases: strings(&[
                "your listing is live",
                "congratulations, your item is listed",
                "you've listed your item",
            ]),
            listing_url_pattern: EBAY_LISTING.clone(),
            max_title_len: 80,
            max_description_len: 500_000,
            max_images: 24,
            max_tags: None,
            min_price: None,
            max_price: None,
            condition_map: pairs(&[
                ("new", "New with tags"),
                ("nwt", "New with tags"),
                ("nwot", "New without tags"),
                ("like_new", "New without tags"),
                ("good", "Pre-owned"),
                ("fair", "Pre-owned"),
                ("poor", "For parts or not working"),
            ]),
            default_condition: "Pre-owned".to_string(),
            fields: FieldSelectors::generic().prepend(FieldSelectors {
                title: strings(&["input[name=\"title\"][maxlength=\"80\"]"]),
                description: strings(&["textarea[name=\"description\"]"]),
                price: strings(&["input[name=\"price\"]", "input[aria-label*=\"Price\"]"]),
                size: strings(&["button[name*=\"Size\"]"]),
                color: strings(&["button[name*=\"Color\"]"]),
                condition: strings(&["button[name=\"condition\"]"]),
                ..FieldSelectors::default()
            }),
            price_markers: strings(&["price"]),
        }
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            name: self.name.clone(),
            create_url: self.create_url.clone(),
            max_title_len: self.max_title_len,
            max_description_len: self.max_description_len,
            max_images: self.max_images,
            min_price: self.min_price,
            max_price: self.max_price,
            conditions: self.condition_map.clone(),
        }
    }

    /// True when the URL points at a finished listing rather than the create form.
    pub fn is_listing_url(&self, url: &str) -> bool {
        let path = url_path(url);
        (path.contains(&self.listing_path) && !path.contains(&self.create_path))
            || self.listing_url_pattern.is_match(url)
    }

    /// Success check run every iteration: listing URL shape or a success phrase on the page.
    pub fn is_success(&self, url: &str, page_text: &str) -> bool {
        if self.is_listing_url(url) {
            return true;
        }
        let text = page_text.to_lowercase();
        self.success_phrases
            .iter()
            .any(|phrase| text.contains(phrase.as_str()))
    }

    /// Canonical listing URL found in the final URL, else in the page text.
    pub fn listing_url(&self, url: &str, page_text: &str) -> Option<String> {
        self.listing_url_pattern
            .find(url)
            .or_else(|| self.listing_url_pattern.find(page_text))
            .map(|found| found.as_str().to_string())
    }

    /// Marketplace label for a payload condition such as `like_new` or `Like New`.
    pub fn map_condition(&self, condition: Option<&str>) -> String {
        let Some(raw) = condition else {
            return self.default_condition.clone();
        };
        let key = raw.trim().to_lowercase();
        let underscored = key.replace([' ', '-'], "_");
        self.condition_map
            .get(&key)
            .or_else(|| self.condition_map.get(&underscored))
            .cloned()
            .unwrap_or_else(|| self.default_condition.clone())
    }

    /// Normalized copy of `listing` that fits this marketplace's limits.
    ///
    /// Steps:
    /// 1. Truncate title and description on character boundaries
    /// 2. Clamp price into the allowed range; default the original price to the price
    /// 3. Cap images and tags
    /// 4. Map the condition into the marketplace vocabulary
    pub fn prepare(&self, listing: &ListingPayload) -> ListingPayload {
        let mut prepared = listing.clone();

        prepared.title = truncate_chars(listing.title.trim(), self.max_title_len);
        prepared.description = truncate_chars(
            &listing.description.replace("\\n", "\n"),
            self.max_description_len,
        );

        prepared.price = listing.price.map(|price| {
            let floor = self.min_price.unwrap_or(f64::MIN);
            let ceiling = self.max_price.unwrap_or(f64::MAX);
            price.clamp(floor, ceiling)
        });
        if prepared.original_price.is_none() {
            prepared.original_price = prepared.price;
        }

        prepared.images = listing
            .images
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .take(self.max_images)
            .map(str::to_string)
            .collect();

        let mut tags: Vec<String> = Vec::new();
        for tag in &listing.tags {
            let clean = tag.trim_start_matches('#').trim();
            if !clean.is_empty() && !tags.iter().any(|existing| existing == clean) {
                tags.push(clean.to_string());
            }
        }
        if let Some(max) = self.max_tags {
            tags.truncate(max);
        }
        prepared.tags = tags;

        prepared.condition = Some(self.map_condition(listing.condition.as_deref()));
        prepared
    }
}

fn url_path(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
    items
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url_shapes() {
        let posh = MarketplaceProfile::poshmark();
        assert!(!posh.is_listing_url("https://poshmark.com/create-listing"));
        assert!(posh.is_listing_url("https://poshmark.com/listing/denim-jacket-64f1a2"));

        let mercari = MarketplaceProfile::mercari();
        assert!(!mercari.is_listing_url("https://www.mercari.com/sell/"));
        assert!(mercari.is_listing_url("https://www.mercari.com/us/item/m12345678/"));
        assert_eq!(
            mercari.listing_url("https://www.mercari.com/us/item/m12345678/?ref=sell", ""),
            Some("https://www.mercari.com/us/item/m12345678".to_string())
        );

        let ebay = MarketplaceProfile::ebay();
        assert!(ebay.is_listing_url("https://www.ebay.com/itm/1234567890"));
        assert_eq!(
            ebay.listing_url(
                "https://www.ebay.com/sl/success",
                "View it at https://www.ebay.com/itm/998877 now"
            ),
            Some("https://www.ebay.com/itm/998877".to_string())
        );
    }

    #[test]
    fn test_success_phrase_is_case_insensitive() {
        let posh = MarketplaceProfile::poshmark();
        assert!(posh.is_success(
            "https://poshmark.com/create-listing",
            "Congrats! Your listing is LIVE."
        ));
        assert!(!posh.is_success("https://poshmark.com/create-listing", "Add photos"));
    }

    #[test]
    fn test_prepare_normalizes_without_touching_input() {
        let listing = ListingPayload {
            title: "é".repeat(100),
            description: "line one\\nline two".to_string(),
            price: Some(4500.0),
            condition: Some("Like New".to_string()),
            images: (0..20).map(|n| format!("https://img.test/{n}.jpg")).collect(),
            tags: vec!["#vintage".into(), "vintage".into(), " denim ".into()],
            ..ListingPayload::default()
        };

        let mercari = MarketplaceProfile::mercari().prepare(&listing);
        assert_eq!(mercari.title.chars().count(), 80);
        assert_eq!(mercari.description, "line one\nline two");
        assert_eq!(mercari.price, Some(2000.0));
        assert_eq!(mercari.original_price, Some(2000.0));
        assert_eq!(mercari.images.len(), 12);
        assert_eq!(mercari.condition.as_deref(), Some("Like New"));
        assert_eq!(mercari.tags, vec!["vintage", "denim"]);

        let posh = MarketplaceProfile::poshmark().prepare(&listing);
        assert_eq!(posh.price, Some(4500.0));
        assert_eq!(posh.images.len(), 16);
        assert_eq!(posh.condition.as_deref(), Some("NWOT"));

        assert_eq!(listing.title.chars().count(), 100);
        assert_eq!(listing.condition.as_deref(), Some("Like New"));
    }

    #[test]
    fn test_unknown_condition_and_marketplace() {
        let ebay = MarketplaceProfile::ebay();
        assert_eq!(ebay.map_condition(Some("mint")), "Pre-owned");
        assert_eq!(ebay.map_condition(None), "Pre-owned");
        assert_eq!(ebay.map_condition(Some("NWT")), "New with tags");

        assert!(MarketplaceProfile::by_name("Mercari").is_ok());
        assert!(matches!(
            MarketplaceProfile::by_name("etsy"),
            Err(AgentError::UnknownMarketplace(name)) if name == "etsy"
        ));
    }
}
