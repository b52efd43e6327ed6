// Copyright 2025 Cowboy AI, LLC.

//! Record builder: construct data and accessor records from flexible
//! argument lists
//!
//! Both builders classify their positional arguments once into
//! [`ArgShape`]s and resolve the overload from a small decision table.

pub mod accessor;
pub mod args;
pub mod data;
pub mod liaison;

pub use accessor::make_accessor_record;
pub use args::{ArgShape, RecordArg, RecordOptions, DEFAULT_STORAGE_KEY};
pub use data::make_data_record;
pub use liaison::{storage_cell, DefaultLiaison, FnLiaison, Liaison};
