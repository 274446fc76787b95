//! Schemas and fixtures for tests
//!
//! A cut-down Open vSwitch schema: enough tables and column shapes to
//! exercise every command (scalars, optional values, sets, maps, row
//! references and name indexes).

use ovstxn_core::{AtomType, ColumnType, DatabaseSchema, Datum, TableSchema};

/// `Open_vSwitch`, `Bridge` and `Port` tables.
pub fn vswitch_schema() -> DatabaseSchema {
    DatabaseSchema::new()
        .with_table(
            TableSchema::new("Open_vSwitch")
                .column("bridges", ColumnType::set(AtomType::Uuid))
                .column(
                    "external_ids",
                    ColumnType::map(AtomType::String, AtomType::String),
                ),
        )
        .with_table(
            TableSchema::new("Bridge")
                .column("name", ColumnType::scalar(AtomType::String))
                .column("ports", ColumnType::set(AtomType::Uuid))
                .column(
                    "external_ids",
                    ColumnType::map(AtomType::String, AtomType::String),
                )
                .column(
                    "other_config",
                    ColumnType::map(AtomType::String, AtomType::String),
                )
                .column("datapath_type", ColumnType::scalar(AtomType::String))
                .column(
                    "flood_vlans",
                    ColumnType::set(AtomType::Integer).with_max(4096),
                )
                .column("stp_enable", ColumnType::scalar(AtomType::Boolean))
                .column("fail_mode", ColumnType::optional(AtomType::String))
                .index("name"),
        )
        .with_table(
            TableSchema::new("Port")
                .column("name", ColumnType::scalar(AtomType::String))
                .column("tag", ColumnType::optional(AtomType::Integer))
                .column("trunks", ColumnType::set(AtomType::Integer))
                .column(
                    "external_ids",
                    ColumnType::map(AtomType::String, AtomType::String),
                )
                .index("name"),
        )
}

/// Column values for a bridge called `name`
pub fn bridge_row(name: &str) -> Vec<(&'static str, Datum)> {
    vec![("name", Datum::from(name))]
}

/// Column values for a port called `name`
pub fn port_row(name: &str) -> Vec<(&'static str, Datum)> {
    vec![("name", Datum::from(name))]
}
