//! Jira Cloud REST (v2) client: issue lookup and workflow transitions.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{IntegrationError, Result};
use crate::types::IssueInfo;
use crate::IssueTracker;

#[derive(Debug, Clone)]
pub struct JiraClient {
    http: Client,
    base_url: String,
    email: String,
    token: String,
}

impl JiraClient {
    /// `base_url` is the site root, e.g. `https://acme.atlassian.net`.
    pub fn new(base_url: &str, email: &str, token: &str) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(IntegrationError::MissingCredential("Jira base URL".into()));
        }
        if email.trim().is_empty() {
            return Err(IntegrationError::MissingCredential("Jira email".into()));
        }
        if token.trim().is_empty() {
            return Err(IntegrationError::MissingCredential("Jira API token".into()));
        }
        Ok(Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            email: email.to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Browse URL for a ticket.
    pub fn issue_url(&self, key: &str) -> String {
        format!("{}/browse/{}", self.base_url, key)
    }

    fn issue_endpoint(&self, key: &str) -> String {
        format!(
            "{}/rest/api/2/issue/{}",
            self.base_url,
            urlencoding::encode(key)
        )
    }

    async fn transitions(&self, key: &str) -> Result<Vec<Transition>> {
        let resp = self
            .http
            .get(format!("{}/transitions", self.issue_endpoint(key)))
            .basic_auth(&self.email, Some(&self.token))
            .header("Accept", "application/json")
            .send()
            .await?;
        let body: TransitionsResponse = check(resp).await?.json().await?;
        Ok(body.transitions)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn get_issue(&self, key: &str) -> Result<IssueInfo> {
        debug!(ticket = key, "fetching issue");
        let resp = self
            .http
            .get(self.issue_endpoint(key))
            .query(&[("fields", "summary,status")])
            .basic_auth(&self.email, Some(&self.token))
            .header("Accept", "application/json")
            .send()
            .await?;
        let issue: IssueResponse = check(resp).await?.json().await?;
        Ok(IssueInfo {
            key: issue.key,
            summary: issue.fields.summary,
            status: issue.fields.status.name,
        })
    }

    async fn update_status(&self, key: &str, status: &str) -> Result<()> {
        let transitions = self.transitions(key).await?;
        let Some(transition) = find_transition(&transitions, status) else {
            return Err(IntegrationError::TransitionNotFound {
                key: key.to_string(),
                status: status.to_string(),
            });
        };

        let resp = self
            .http
            .post(format!("{}/transitions", self.issue_endpoint(key)))
            .basic_auth(&self.email, Some(&self.token))
            .json(&serde_json::json!({ "transition": { "id": transition.id } }))
            .send()
            .await?;
        check(resp).await?;
        info!(ticket = key, status, transition = %transition.name, "transitioned issue");
        Ok(())
    }
}

/// Pass through success responses; turn anything else into an error
/// carrying the response body.
async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(IntegrationError::from_status(status.as_u16(), body))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IssueResponse {
    key: String,
    fields: IssueFields,
}

#[derive(Debug, Deserialize)]
struct IssueFields {
    #[serde(default)]
    summary: String,
    status: NamedRef,
}

#[derive(Debug, Clone, Deserialize)]
struct NamedRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    to: NamedRef,
}

impl Transition {
    pub fn target_status(&self) -> &str {
        &self.to.name
    }
}

/// First transition whose own name or destination status equals `status`,
/// ignoring case.
pub fn find_transition<'a>(transitions: &'a [Transition], status: &str) -> Option<&'a Transition> {
    transitions.iter().find(|t| {
        t.name.eq_ignore_ascii_case(status) || t.to.name.eq_ignore_ascii_case(status)
    })
}
