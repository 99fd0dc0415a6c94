use serde::{Deserialize, Serialize};

/// `GET /posts?location=`; an empty value means no filter.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub location: Option<String>,
}

impl ListingQuery {
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.is_empty())
    }
}

/// Text fields of a listing as submitted in the create form.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    #[serde(rename = "whatsapp")]
    pub contact: String,
}
