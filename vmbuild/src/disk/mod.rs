//! Disk image preparation.
//!
//! This module provides the pieces of the disk step:
//! - `inspect_format` - Ask the driver for a source image's format
//! - `resolve_destination` - Where the prepared disk goes
//! - `prepare_disk` - Copy, convert, or skip
//! - `copy_file` - Straight byte copy used when no conversion is needed

mod copy;
mod inspect;
mod layout;
mod prepare;

pub use copy::copy_file;
pub use inspect::inspect_format;
pub use layout::resolve_destination;
pub use prepare::{
    CONVERT_PROGRESS_MESSAGE, DiskAction, DiskPrepInput, DiskPrepOutput, convert_args,
    decide_action, prepare_disk,
};
