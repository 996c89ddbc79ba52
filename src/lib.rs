//! Insertion-ordered multi-valued hash maps for Rust.
//!
//! This crate provides [`MultiDict`], a hash map that keeps every entry in insertion order and
//! allows a key to appear any number of times. It mirrors the std `HashMap` API where the two
//! agree and adds the operations unique to multi-maps:
//!
//! - [`add`](MultiDict::add) - Append an entry without replacing existing occurrences
//! - [`get_all`](MultiDict::get_all) - Iterate every value of a key in insertion order
//! - [`set`](MultiDict::set) - Overwrite the first occurrence of a key and drop the rest
//! - [`pop_all`](MultiDict::pop_all) - Remove every occurrence of a key at once
//!
//! # Example
//!
//! ```
//! use multicollections::MultiDict;
//!
//! let mut map = MultiDict::new();
//! map.add("a", 1);
//! map.add("b", 2);
//! map.add("a", 3);
//!
//! // every occurrence is an entry
//! assert_eq!(map.len(), 3);
//! let items: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
//! assert_eq!(items, [("a", 1), ("b", 2), ("a", 3)]);
//!
//! // single-valued access reads the first occurrence
//! assert_eq!(map["a"], 1);
//! let all: Vec<_> = map.get_all("a").copied().collect();
//! assert_eq!(all, [1, 3]);
//!
//! // `set` keeps the first position and removes the rest
//! map.set("a", 99);
//! let items: Vec<_> = map.iter().map(|(&k, &v)| (k, v)).collect();
//! assert_eq!(items, [("a", 99), ("b", 2)]);
//! assert_eq!(map.len(), 2);
//! ```
//!
//! # Missing keys
//!
//! Every lookup or removal that can miss comes in an `Option` form and a `try_` form returning
//! [`Result<_, Error>`](Error). [`WithDefault`] turns [`Error::KeyNotFound`] into a fallback value:
//!
//! ```
//! use multicollections::{Error, MultiDict, WithDefault};
//!
//! let mut map = MultiDict::from([("a", 1)]);
//! assert_eq!(map.try_get_one("z"), Err(Error::KeyNotFound));
//! assert_eq!(map.try_get_one("z").with_default(&0), Ok(&0));
//! assert_eq!(map.try_pop_one("z").with_default(0), Ok(0));
//! assert_eq!(map.len(), 1);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Generic interface** - [`MultiMapping`] and [`MutableMultiMapping`] derive the full
//!   multi-map API from a few primitives
//! - **`serde`** - Optional feature; maps serialize as sequences of pairs so duplicates survive
//! - **`tracing`** - Optional feature; emits trace events when the entry vector is compacted
//!
//! # Implementation
//!
//! Entries are stored in a vector next to a hash table, the key index, that maps each distinct key
//! to the ascending positions of its occurrences. Appends and removals of the trailing entry are
//! O(1); removals from the middle compact the entry vector in one pass and rebuild the key index.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod multi_mapping;
mod raw;

pub mod multi_dict;

pub use error::{Error, WithDefault};
pub use hashbrown::DefaultHashBuilder;
pub use multi_dict::MultiDict;
pub use multi_mapping::{MultiMapping, MutableMultiMapping};
