//! HTTP marketplace client built on reqwest.
//!
//! Maps the marketplace's JSON search response onto [`Listing`] values. The
//! user-agent header comes from the identity chosen by the resilience layer
//! per call, so a single shared `reqwest::Client` serves every identity.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::MarketplaceConfig;
use crate::domain::{ClientIdentity, Listing};
use crate::error::{Error, ResilienceError, Result};
use crate::port::{MarketplaceClient, SearchPage, SearchQuery};
use crate::resilience::is_blocking_response;

/// Wire shape of one listing in a search response.
#[derive(Debug, Deserialize)]
struct ListingDto {
    id: String,
    title: String,
    seller: String,
    #[serde(default)]
    description: String,
    price: Decimal,
    #[serde(default)]
    bid_count: i64,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl ListingDto {
    fn into_listing(self) -> Listing {
        Listing {
            external_id: self.id,
            title: self.title,
            seller: self.seller,
            description: self.description,
            current_price: self.price,
            bid_count: self.bid_count,
            image_url: self.image_url,
            category: self.category,
            subcategory: self.subcategory,
            location: self.location,
            url: self.url,
        }
    }
}

/// Wire shape of a search response page.
#[derive(Debug, Deserialize)]
struct SearchResponseDto {
    results: Vec<ListingDto>,
    #[serde(default)]
    total: u64,
}

/// Marketplace client speaking the REST search API.
pub struct HttpMarketplaceClient {
    http: reqwest::Client,
    config: MarketplaceConfig,
}

impl HttpMarketplaceClient {
    pub fn new(config: MarketplaceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = Url::parse(&self.config.base_url)?;
        base.join(path).map_err(Error::from)
    }
}

#[async_trait]
impl MarketplaceClient for HttpMarketplaceClient {
    async fn authenticate(&self) -> Result<()> {
        let Some(path) = self.config.auth_path.as_deref() else {
            debug!("no auth endpoint configured, skipping authentication");
            return Ok(());
        };
        let url = self.endpoint(path)?;
        let response = self.http.post(url).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(Error::Status { status });
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery, identity: &ClientIdentity) -> Result<SearchPage> {
        let mut url = self.endpoint(&self.config.search_path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &query.query);
            pairs.append_pair("page", &query.page.to_string());
            pairs.append_pair("page_size", &query.page_size.to_string());
            if let Some(category) = &query.category {
                pairs.append_pair("category", category);
            }
            if let Some(max_price) = &query.max_price {
                pairs.append_pair("max_price", &max_price.to_string());
            }
        }

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &identity.user_agent)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        // Soft blocks hide behind both error statuses and 200s with a
        // challenge page in the body.
        if is_blocking_response(status, &body) {
            debug!(status, identity_id = identity.id, "soft block detected");
            return Err(ResilienceError::SoftBlock { status }.into());
        }
        if !(200..300).contains(&status) {
            return Err(Error::Status { status });
        }

        let page: SearchResponseDto = serde_json::from_str(&body)?;
        Ok(SearchPage {
            total: page.total.max(page.results.len() as u64),
            listings: page
                .results
                .into_iter()
                .map(ListingDto::into_listing)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn listing_dto_maps_onto_domain() {
        let json = r#"{
            "id": "ext-1",
            "title": "Vintage Camera",
            "seller": "shopco",
            "price": "24.99",
            "bid_count": 3,
            "category": "Electronics"
        }"#;
        let dto: ListingDto = serde_json::from_str(json).unwrap();
        let listing = dto.into_listing();
        assert_eq!(listing.external_id, "ext-1");
        assert_eq!(listing.current_price, dec!(24.99));
        assert_eq!(listing.description, "");
        assert_eq!(listing.category.as_deref(), Some("Electronics"));
    }

    #[test]
    fn search_response_defaults_total() {
        let json = r#"{"results": []}"#;
        let dto: SearchResponseDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.total, 0);
        assert!(dto.results.is_empty());
    }

    #[test]
    fn endpoint_joins_relative_paths() {
        let client = HttpMarketplaceClient::new(MarketplaceConfig {
            base_url: "https://market.example.com".into(),
            search_path: "/api/search".into(),
            auth_path: None,
            timeout_secs: 5,
            page_size: 50,
        })
        .unwrap();
        let url = client.endpoint("/api/search").unwrap();
        assert_eq!(url.as_str(), "https://market.example.com/api/search");
    }
}
