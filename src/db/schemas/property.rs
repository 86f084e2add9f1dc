//! Property document schema
//!
//! A sellable unit of land inside a colony. Older colonies may predate the
//! property split; migration backfills link their plots to a property.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for properties
pub const PROPERTY_COLLECTION: &str = "properties";

/// Property sales status
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    Draft,
    Active,
    Inactive,
    ReadyToSell,
    UnderDevelopment,
    SoldOut,
}

/// Property document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PropertyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    /// Colony this property belongs to
    pub colony: ObjectId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price_per_sq_ft: Option<f64>,

    /// Uploaded media URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facilities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roads: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parks: Vec<String>,

    #[serde(default)]
    pub status: PropertyStatus,

    pub created_by: ObjectId,
}

impl PropertyDoc {
    pub fn new(name: String, colony: ObjectId, created_by: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            colony,
            created_by,
            ..Default::default()
        }
    }
}

impl IntoIndexes for PropertyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "colony": 1 },
            Some(
                IndexOptions::builder()
                    .name("colony_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for PropertyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
