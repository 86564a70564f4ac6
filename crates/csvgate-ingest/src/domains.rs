//! Built-in domains
//!
//! Used when no descriptor file is configured.

use csvgate_common::types::{
    ColumnSpec, ColumnType, SchemaDescriptor, HASH_CONTROL_COLUMN, OPERATOR_COLUMN,
};
use csvgate_common::Result;

use crate::registry::DomainRegistry;

pub const PURCHASE_ORDER: &str = "purchase_order";
pub const INTERNAL_LEAD_TIME: &str = "internal_lead_time";

/// Open purchase order lines, one per supplier, delivery date, item and location
pub fn purchase_order() -> Result<SchemaDescriptor> {
    SchemaDescriptor::builder()
        .delimiter(';')
        .columns([
            ColumnSpec::new("supplier", ColumnType::String).mandatory().key(),
            ColumnSpec::new("delivery_date", ColumnType::Date).mandatory().key(),
            ColumnSpec::new("item", ColumnType::String).mandatory().key(),
            ColumnSpec::new("location", ColumnType::Int).mandatory().key(),
            ColumnSpec::new("quantity", ColumnType::Float).mandatory(),
        ])
        .enforce_uniqueness(true)
        .build()
}

/// Supplier lead-time master data, maintained through CUD markers
pub fn internal_lead_time() -> Result<SchemaDescriptor> {
    SchemaDescriptor::builder()
        .delimiter(';')
        .columns([
            ColumnSpec::new(OPERATOR_COLUMN, ColumnType::String).mandatory(),
            ColumnSpec::new("supplier", ColumnType::String).mandatory().key(),
            ColumnSpec::new("location", ColumnType::String).mandatory().key(),
            ColumnSpec::new("review_date", ColumnType::Date).mandatory(),
            ColumnSpec::new("review_day", ColumnType::Int).mandatory().key(),
            ColumnSpec::new("delivery_day", ColumnType::Int).mandatory(),
            ColumnSpec::new("min_intervel_weeks", ColumnType::Int).mandatory(),
            ColumnSpec::new("lead_time", ColumnType::Int).derived(),
            ColumnSpec::new(HASH_CONTROL_COLUMN, ColumnType::String),
        ])
        .enforce_uniqueness(true)
        .cud_control(true)
        .build()
}

/// Registry holding every built-in domain
pub fn builtin_registry() -> Result<DomainRegistry> {
    Ok(DomainRegistry::new()
        .with_descriptor(PURCHASE_ORDER, purchase_order()?)
        .with_descriptor(INTERNAL_LEAD_TIME, internal_lead_time()?))
}
