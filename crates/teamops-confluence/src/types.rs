//! Confluence REST API payloads (the subset the jobs touch).

use serde::{Deserialize, Serialize};

use teamops_types::WikiPage;

/// `GET /content` and `GET /content/{id}/child/page` wrapper.
#[derive(Debug, Deserialize)]
pub struct ContentList {
    #[serde(default)]
    pub results: Vec<Content>,
}

/// A content item as returned by the v1 API.
#[derive(Debug, Deserialize)]
pub struct Content {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub version: Option<ContentVersion>,
    #[serde(rename = "_links", default)]
    pub links: Option<ContentLinks>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ContentVersion {
    pub number: u64,
}

#[derive(Debug, Deserialize)]
pub struct ContentLinks {
    #[serde(default)]
    pub webui: Option<String>,
}

impl From<Content> for WikiPage {
    fn from(content: Content) -> Self {
        WikiPage {
            id: content.id,
            title: content.title,
            // Listings omit the version unless expanded; a fresh page is at 1.
            version: content.version.map_or(1, |v| v.number),
            web_ui: content.links.and_then(|l| l.webui),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpaceRef<'a> {
    pub key: &'a str,
}

#[derive(Debug, Serialize)]
pub struct AncestorRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct StorageBody<'a> {
    pub value: &'a str,
    pub representation: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PageBody<'a> {
    pub storage: StorageBody<'a>,
}

/// `POST /content/`
#[derive(Debug, Serialize)]
pub struct CreatePageParams<'a> {
    #[serde(rename = "type")]
    pub content_type: &'static str,
    pub title: &'a str,
    pub space: SpaceRef<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ancestors: Vec<AncestorRef<'a>>,
    pub body: PageBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct CopyDestination<'a> {
    #[serde(rename = "type")]
    pub destination_type: &'static str,
    pub value: &'a str,
}

/// `POST /content/{id}/copy`
#[derive(Debug, Serialize)]
pub struct CopyPageParams<'a> {
    pub destination: CopyDestination<'a>,
}

/// `PUT /content/{id}`
#[derive(Debug, Serialize)]
pub struct UpdatePageParams<'a> {
    pub version: ContentVersion,
    pub title: &'a str,
    #[serde(rename = "type")]
    pub content_type: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_to_page() {
        let content: Content = serde_json::from_value(json!({
            "id": "123",
            "type": "page",
            "title": "2025 W24 Team Report (0609-0613)",
            "version": { "number": 4, "minorEdit": false },
            "_links": { "webui": "/spaces/TEAM/pages/123/2025+W24", "self": "ignored" }
        }))
        .unwrap();
        let page = WikiPage::from(content);
        assert_eq!(page.id, "123");
        assert_eq!(page.version, 4);
        assert_eq!(page.web_ui.as_deref(), Some("/spaces/TEAM/pages/123/2025+W24"));
    }

    #[test]
    fn test_listing_without_version() {
        let list: ContentList = serde_json::from_value(json!({
            "results": [ { "id": "1", "title": "a" }, { "id": "2", "title": "b" } ],
            "size": 2
        }))
        .unwrap();
        let pages: Vec<WikiPage> = list.results.into_iter().map(WikiPage::from).collect();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].version, 1);
        assert!(pages[1].web_ui.is_none());
    }

    #[test]
    fn test_empty_listing() {
        let list: ContentList = serde_json::from_value(json!({})).unwrap();
        assert!(list.results.is_empty());
    }

    #[test]
    fn test_create_params_shape() {
        let params = CreatePageParams {
            content_type: "page",
            title: "Team Weekly 2026",
            space: SpaceRef { key: "TEAM" },
            ancestors: vec![],
            body: PageBody {
                storage: StorageBody {
                    value: "2026 weekly reports.",
                    representation: "storage",
                },
            },
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["type"], "page");
        assert_eq!(value["space"]["key"], "TEAM");
        assert!(value.get("ancestors").is_none());
        assert_eq!(value["body"]["storage"]["representation"], "storage");
    }

    #[test]
    fn test_copy_params_shape() {
        let params = CopyPageParams {
            destination: CopyDestination {
                destination_type: "parent_page",
                value: "42",
            },
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({ "destination": { "type": "parent_page", "value": "42" } })
        );
    }
}
