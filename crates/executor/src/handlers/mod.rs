//! Command handlers organized by kind.
//!
//! | Module | Commands |
//! |--------|----------|
//! | `write` | Create, Destroy, Set, Add, Clear |
//! | `read` | Get, List, Find |

pub(crate) mod read;
pub(crate) mod write;
