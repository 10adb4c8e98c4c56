//! Core library for extracting Stone Age pet data from chat logs.

pub mod error;
pub mod file_utils;
pub mod merge;
pub mod models;
pub mod parsers;

pub use error::{PetlogError, Result};
pub use merge::{Dataset, MergeSummary, merge_into_dataset};
pub use models::{Attributes, BaseStats, Grade, GrowthStats, PetIndex, PetRecord};
pub use parsers::{parse_chat, parse_chat_file};
