//! Identity-document sub-schemas shared across parties
//!
//! Owners, witnesses, khatoni holders and customers all carry the same set of
//! uploaded document URLs. Files are uploaded elsewhere; only URLs land here.

use serde::{Deserialize, Serialize};

/// URLs of a party's uploaded identity documents
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct DocumentSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhar_front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhar_back: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_photo: Option<String>,
}

/// Personal details shared by registry owners, witnesses and khatoni holders
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PartyDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aadhar_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub son_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daughter_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wife_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub documents: DocumentSet,
}
