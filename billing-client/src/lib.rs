//! Records and Postgres queries for the billing store.
//!
//! `domain` holds plain row types; `db` holds the query functions that load and
//! write them. Nothing here traverses relations implicitly: callers ask for the
//! related record by id.

pub mod db;
pub mod domain;
