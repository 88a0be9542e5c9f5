//! Operation descriptors for the `operate` resource.
//!
//! An operation is a tagged instruction applied server-side to one bin of one
//! record: the kind plus an operand bag keyed by operand name (`bin`, `value`,
//! `incr`, ...). A batch is an ordered list of these, applied atomically in
//! submission order. Raw byte operands (bit operations) are carried as
//! standard-base64 strings since operation lists travel as JSON.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::types::{BinValue, Bins};

/// The kinds of operation the server accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Read,
    Put,
    Append,
    Add,
    ListAppend,
    HllInit,
    HllAdd,
    HllSetCount,
    BitInsert,
    BitNot,
}

/// A single operation descriptor: kind plus operand bag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Operation {
    pub operation: OperationKind,
    #[serde(rename = "opValues")]
    pub op_values: Bins,
}

impl Operation {
    fn new(operation: OperationKind, op_values: Vec<(&str, BinValue)>) -> Operation {
        Operation {
            operation,
            op_values: op_values
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    /// Read the current value of a bin; the result is folded into the
    /// response bins.
    pub fn read(bin: &str) -> Operation {
        Operation::new(OperationKind::Read, vec![("bin", bin.into())])
    }

    /// Write a value into a bin, replacing whatever was there.
    pub fn put(bin: &str, value: impl Into<BinValue>) -> Operation {
        Operation::new(
            OperationKind::Put,
            vec![("bin", bin.into()), ("value", value.into())],
        )
    }

    /// Append a string to a string bin.
    pub fn append(bin: &str, value: &str) -> Operation {
        Operation::new(
            OperationKind::Append,
            vec![("bin", bin.into()), ("value", value.into())],
        )
    }

    /// Add an increment to an integer bin.
    pub fn add(bin: &str, incr: i64) -> Operation {
        Operation::new(
            OperationKind::Add,
            vec![("bin", bin.into()), ("incr", incr.into())],
        )
    }

    /// Append a value to a list bin; the result is the new list length.
    pub fn list_append(bin: &str, value: impl Into<BinValue>) -> Operation {
        Operation::new(
            OperationKind::ListAppend,
            vec![("bin", bin.into()), ("value", value.into())],
        )
    }

    /// Initialize a HyperLogLog bin.
    pub fn hll_init(bin: &str, index_bit_count: i64, min_hash_bit_count: i64) -> Operation {
        Operation::new(
            OperationKind::HllInit,
            vec![
                ("bin", bin.into()),
                ("indexBitCount", index_bit_count.into()),
                ("minHashBitCount", min_hash_bit_count.into()),
            ],
        )
    }

    /// Add values to a HyperLogLog bin.
    pub fn hll_add(bin: &str, values: Vec<BinValue>) -> Operation {
        Operation::new(
            OperationKind::HllAdd,
            vec![("bin", bin.into()), ("values", values.into())],
        )
    }

    /// Refresh and return the cached cardinality of a HyperLogLog bin.
    pub fn hll_set_count(bin: &str) -> Operation {
        Operation::new(OperationKind::HllSetCount, vec![("bin", bin.into())])
    }

    /// Insert bytes into a blob bin at a byte offset.
    pub fn bit_insert(bin: &str, byte_offset: i64, value: &[u8]) -> Operation {
        Operation::new(
            OperationKind::BitInsert,
            vec![
                ("bin", bin.into()),
                ("byteOffset", byte_offset.into()),
                ("value", STANDARD.encode(value).into()),
            ],
        )
    }

    /// Invert a bit range of a blob bin.
    pub fn bit_not(bin: &str, bit_offset: i64, bit_size: i64) -> Operation {
        Operation::new(
            OperationKind::BitNot,
            vec![
                ("bin", bin.into()),
                ("bitOffset", bit_offset.into()),
                ("bitSize", bit_size.into()),
            ],
        )
    }
}
