//! 🔍 Error classification — recovering structure from reason strings.
//!
//! The cluster reports mapping rejections as free text. Somewhere inside
//! that text, for the failure family we know how to repair, sits a
//! `mapper [<field>]` fragment naming the offending field. This module
//! fishes it out. Pure function, no state, no apologies for the format —
//! we didn't design the error payload, we just mine it.

use anyhow::{Result, bail};
use memchr::{memchr, memmem};

/// The fragment that precedes the field name in a mapping error reason.
const MAPPER_PREFIX: &[u8] = b"mapper [";

/// 🎯 Extract the offending field name from a bulk-error reason string.
///
/// Looks for the `mapper [<field>]` pattern and returns `<field>` as a
/// slice of the input. A reason without the pattern (or with an empty
/// field name, which would classify nothing) is a classification error:
/// fatal for this one document's repair attempt, non-fatal for the run —
/// the orchestrator logs it and moves on.
pub fn extract_bad_field(reason: &str) -> Result<&str> {
    let bytes = reason.as_bytes();
    let Some(start) = memmem::find(bytes, MAPPER_PREFIX) else {
        bail!("unable to extract bad field from '{reason}'");
    };

    let field_start = start + MAPPER_PREFIX.len();
    let Some(len) = memchr(b']', &bytes[field_start..]) else {
        bail!("unable to extract bad field from '{reason}': unterminated 'mapper [' fragment");
    };
    if len == 0 {
        bail!("unable to extract bad field from '{reason}': empty field name");
    }

    // Both delimiters are ASCII, so the slice boundaries land on char
    // boundaries and this cannot panic on multi-byte reasons.
    Ok(&reason[field_start..field_start + len])
}
