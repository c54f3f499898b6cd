//! # Revert Reasons
//!
//! Diagnostics attached to failed calls. A reason names the failing
//! function, the pc trace at the failure and, when a caller re-reverts with
//! the same data it received, the nested reason it originated from.

use crate::domain::value_objects::{fr_low_u128, fr_to_hex, serde_fr_vec, Address, Fr, FunctionSelector};
use crate::errors::AvmError;
use serde::Serialize;
use std::fmt;

/// Prefix of every explicit REVERT message.
pub const ASSERTION_PREFIX: &str = "Assertion failed: ";

/// The function executing when a call failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailingFunction {
    /// Contract address.
    pub address: Address,
    /// Function selector.
    pub selector: FunctionSelector,
    /// Name from the contracts database, if known.
    pub debug_name: Option<String>,
}

impl fmt::Display for FailingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.debug_name {
            Some(name) => write!(f, "{}:{}", self.address, name),
            None => write!(f, "{}:{}", self.address, self.selector),
        }
    }
}

/// Why a call failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RevertReason {
    /// Human-readable message.
    pub message: String,
    /// Where it failed.
    pub function: FailingFunction,
    /// pc at the failure, then pending internal return locations.
    pub pc_trace: Vec<u32>,
    /// REVERT payload, empty for exceptional halts.
    #[serde(with = "serde_fr_vec")]
    pub revert_data: Vec<Fr>,
    /// Reason of the nested call this one re-raised.
    pub cause: Option<Box<RevertReason>>,
}

/// Renders REVERT data for a message: as text when every field is a
/// printable ASCII byte, otherwise as a hex list.
#[must_use]
pub fn render_revert_data(data: &[Fr]) -> String {
    let printable: Option<String> = data
        .iter()
        .map(|field| {
            let value = fr_low_u128(field);
            let byte = u8::try_from(value).ok().filter(|b| (0x20..0x7f).contains(b))?;
            (Fr::from(u64::from(byte)) == *field).then_some(char::from(byte))
        })
        .collect();
    match printable {
        Some(text) if !data.is_empty() => text,
        _ => {
            let items: Vec<String> = data.iter().map(fr_to_hex).collect();
            format!("[{}]", items.join(", "))
        }
    }
}

impl RevertReason {
    /// Reason for an exceptional halt.
    #[must_use]
    pub fn exceptional(error: &AvmError, function: FailingFunction, pc_trace: Vec<u32>) -> Self {
        Self::plain(error.to_string(), function, pc_trace)
    }

    /// Reason with a bare message and no data.
    #[must_use]
    pub fn plain(message: String, function: FailingFunction, pc_trace: Vec<u32>) -> Self {
        Self {
            message,
            function,
            pc_trace,
            revert_data: Vec::new(),
            cause: None,
        }
    }

    /// Reason for an explicit REVERT.
    ///
    /// If `nested` carries the same data, this call is re-raising it and the
    /// nested reason becomes the cause.
    #[must_use]
    pub fn explicit(
        revert_data: Vec<Fr>,
        function: FailingFunction,
        pc_trace: Vec<u32>,
        nested: Option<Self>,
    ) -> Self {
        match nested {
            Some(nested) if nested.revert_data == revert_data => Self {
                message: nested.message.clone(),
                function,
                pc_trace,
                revert_data,
                cause: Some(Box::new(nested)),
            },
            _ => Self {
                message: format!("{ASSERTION_PREFIX}{}", render_revert_data(&revert_data)),
                function,
                pc_trace,
                revert_data,
                cause: None,
            },
        }
    }

    /// The deepest reason in the chain.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Some(cause) = &current.cause {
            current = cause;
        }
        current
    }

    /// Number of reasons in the chain, including this one.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.cause.as_ref().map_or(0, |c| c.depth())
    }
}

impl fmt::Display for RevertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} (pc {:?})", self.message, self.function, self.pc_trace)?;
        let mut cause = self.cause.as_deref();
        while let Some(reason) = cause {
            write!(f, "\n  from {} (pc {:?})", reason.function, reason.pc_trace)?;
            cause = reason.cause.as_deref();
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
