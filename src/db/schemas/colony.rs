//! Colony document schema
//!
//! The four plot-count fields are a cache over the plots collection. They are
//! written only by the colony recount and never accepted from clients.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::{documents::PartyDetails, Metadata};

/// Collection name for colonies
pub const COLONY_COLLECTION: &str = "colonies";

/// Geographic location of a colony
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ColonyLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Cached plot counts for a colony
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlotCounts {
    pub total: i64,
    pub available: i64,
    pub sold: i64,
    pub blocked: i64,
}

/// Colony document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ColonyDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default)]
    pub location: ColonyLocation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_area: Option<f64>,

    /// Derived plot counts - maintained by the recount, never by clients
    #[serde(default)]
    pub total_plots: i64,
    #[serde(default)]
    pub available_plots: i64,
    #[serde(default)]
    pub sold_plots: i64,
    #[serde(default)]
    pub blocked_plots: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_sq_ft: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,

    /// Land-right holders with their identity documents
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub khatoni_holders: Vec<PartyDetails>,

    #[serde(default = "default_colony_status")]
    pub status: String,

    pub created_by: ObjectId,
}

fn default_colony_status() -> String {
    "planning".to_string()
}

impl ColonyDoc {
    pub fn new(name: String, created_by: ObjectId) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            status: default_colony_status(),
            created_by,
            ..Default::default()
        }
    }

    pub fn counts(&self) -> PlotCounts {
        PlotCounts {
            total: self.total_plots,
            available: self.available_plots,
            sold: self.sold_plots,
            blocked: self.blocked_plots,
        }
    }
}

impl IntoIndexes for ColonyDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(IndexOptions::builder().name("name_index".to_string()).build()),
        )]
    }
}

impl MutMetadata for ColonyDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
