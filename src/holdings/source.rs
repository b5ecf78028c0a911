//! Fetch collaborator for raw holdings tables
//!
//! The resolver only sees the [`HoldingsSource`] trait: give it a fund
//! reference, get raw tabular bytes or a [`FetchError`]. The shipped
//! implementation scrapes iShares product pages for their holdings-CSV
//! download link; references that already point at a CSV are downloaded
//! directly.

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::errors::FetchError;

/// Anchor-text marker of the holdings download link on the Italian
/// iShares product pages.
const HOLDINGS_LINK_MARKER: &str = "informazioni dettagliate sulle partecipazioni";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; FolioxBot/1.0)";

/// Opaque capability that turns a fund reference into raw table bytes.
#[async_trait]
pub trait HoldingsSource: Send + Sync {
    /// Name of the source, for logs and reports
    fn name(&self) -> &str;

    /// Fetch the current raw holdings table for a fund reference
    async fn fetch_raw(&self, reference: &str) -> Result<Vec<u8>, FetchError>;
}

/// iShares web source: product page -> CSV link -> raw bytes.
pub struct IsharesSource {
    client: reqwest::Client,
}

impl IsharesSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for IsharesSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HoldingsSource for IsharesSource {
    fn name(&self) -> &str {
        "iShares web"
    }

    async fn fetch_raw(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        let page_url = Url::parse(reference).map_err(|e| FetchError::BadReference {
            reference: reference.to_string(),
            message: e.to_string(),
        })?;

        let file_url = if is_direct_file(&page_url) {
            page_url
        } else {
            let response = self.client.get(page_url.clone()).send().await?;
            if !response.status().is_success() {
                return Err(FetchError::Status(response.status().as_u16()));
            }
            let html = response.text().await?;

            let href = find_holdings_link(&html)
                .ok_or_else(|| FetchError::LinkNotFound(reference.to_string()))?;
            page_url.join(&href).map_err(|e| FetchError::BadReference {
                reference: href.clone(),
                message: e.to_string(),
            })?
        };

        debug!(url = %file_url, "Downloading holdings file");
        let response = self.client.get(file_url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes().await?.to_vec();
        info!(url = %file_url, bytes = bytes.len(), "Holdings file downloaded");
        Ok(bytes)
    }
}

/// Null source for offline runs: every fetch fails, which routes the
/// resolver straight to its cache fallback.
pub struct OfflineSource;

#[async_trait]
impl HoldingsSource for OfflineSource {
    fn name(&self) -> &str {
        "offline"
    }

    async fn fetch_raw(&self, _reference: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::Offline)
    }
}

#[async_trait]
impl HoldingsSource for Box<dyn HoldingsSource> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch_raw(&self, reference: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch_raw(reference).await
    }
}

/// References that already point at the holdings file skip the page scan.
fn is_direct_file(url: &Url) -> bool {
    url.path().to_lowercase().ends_with(".csv")
        || url
            .query()
            .map(|q| q.to_lowercase().contains("filetype=csv"))
            .unwrap_or(false)
}

/// Scan page HTML for the holdings download anchor: either its text
/// carries the product-page marker or its href names a CSV download.
/// Deliberately a plain string scan; the pages are machine-generated and
/// the two patterns are stable. ASCII lowercasing keeps byte offsets
/// aligned with the original text.
fn find_holdings_link(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let mut pos = 0;

    while let Some(anchor_off) = lower[pos..].find("<a ") {
        let anchor_start = pos + anchor_off;
        let Some(tag_end_off) = lower[anchor_start..].find('>') else {
            return None;
        };
        let tag_end = anchor_start + tag_end_off;
        let close = lower[tag_end..]
            .find("</a>")
            .map(|off| tag_end + off)
            .unwrap_or(lower.len());

        let tag = &lower[anchor_start..tag_end];
        let text = &lower[tag_end + 1..close];

        if let Some(href) = extract_href(&html[anchor_start..tag_end]) {
            let href_lower = href.to_lowercase();
            if text.contains(HOLDINGS_LINK_MARKER)
                || href_lower.contains("filetype=csv")
                || (tag.contains("holdings") && href_lower.ends_with(".csv"))
            {
                return Some(href);
            }
        }

        pos = tag_end + 1;
    }

    None
}

fn extract_href(tag: &str) -> Option<String> {
    let lower = tag.to_ascii_lowercase();
    let start = lower.find("href=")? + "href=".len();
    let rest = &tag[start..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_find_link_by_anchor_text() {
        let html = r#"
            <html><body>
            <a href="/it/prodotti/251850">Scheda prodotto</a>
            <a href="/it/prodotti/251850/fund/1506575546154.ajax?fileType=csv&dataType=fund">
              Informazioni dettagliate sulle partecipazioni e analisi
            </a>
            </body></html>
        "#;
        let href = find_holdings_link(html).unwrap();
        assert!(href.contains("fileType=csv"));
    }

    #[test]
    fn test_find_link_is_case_insensitive_on_text() {
        let html = r#"<a href='/dl/holdings.csv' class="holdings">INFORMAZIONI DETTAGLIATE SULLE PARTECIPAZIONI</a>"#;
        assert_eq!(find_holdings_link(html).unwrap(), "/dl/holdings.csv");
    }

    #[test]
    fn test_no_link_found() {
        let html = "<html><body><a href='/somewhere'>Altro</a></body></html>";
        assert!(find_holdings_link(html).is_none());
    }

    #[test]
    fn test_is_direct_file() {
        assert!(is_direct_file(&Url::parse("https://x.com/holdings.CSV").unwrap()));
        assert!(is_direct_file(
            &Url::parse("https://x.com/fund/123.ajax?fileType=csv").unwrap()
        ));
        assert!(!is_direct_file(&Url::parse("https://x.com/prodotti/251850/").unwrap()));
    }

    #[tokio::test]
    async fn test_fetch_scrapes_page_then_downloads_csv() {
        let server = MockServer::start().await;

        let page = format!(
            r#"<html><a href="{}/download?fileType=csv">informazioni dettagliate sulle partecipazioni</a></html>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/prodotti/251850/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Name,Weight\nAlpha,100\n"))
            .mount(&server)
            .await;

        let source = IsharesSource::new();
        let raw = source
            .fetch_raw(&format!("{}/prodotti/251850/", server.uri()))
            .await
            .unwrap();
        assert_eq!(raw, b"Name,Weight\nAlpha,100\n");
    }

    #[tokio::test]
    async fn test_fetch_direct_csv_reference() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/holdings.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Name,Weight\nBeta,100\n"))
            .mount(&server)
            .await;

        let source = IsharesSource::new();
        let raw = source
            .fetch_raw(&format!("{}/holdings.csv", server.uri()))
            .await
            .unwrap();
        assert_eq!(raw, b"Name,Weight\nBeta,100\n");
    }

    #[tokio::test]
    async fn test_missing_link_is_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/prodotti/000000/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing here</html>"))
            .mount(&server)
            .await;

        let source = IsharesSource::new();
        let err = source
            .fetch_raw(&format!("{}/prodotti/000000/", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::LinkNotFound(_)));
    }
}
