use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductMeta {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub gender: Option<String>,
    pub size: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductDescribeRequest {
    pub image_base64: String,
    pub product: Option<ProductMeta>,
    pub hints: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoDescribeRequest {
    pub image_base64: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PhotoDescription {
    #[serde(rename = "descriptionText")]
    pub description_text: String,
}

/// Returned when the model's text could not be read as JSON.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RawText {
    pub raw: String,
}
