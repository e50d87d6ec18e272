// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the workshop coordinator

use crate::id::{UserId, WorkplaceId};
use thiserror::Error;

/// Errors surfaced by [`crate::Workshop`]
#[derive(Debug, Error)]
pub enum WorkshopError {
    #[error("workshop requires at least one workplace")]
    NoWorkplaces,
    #[error("duplicate workplace id: {0}")]
    DuplicateWorkplace(WorkplaceId),
    #[error("unknown workplace: {0}")]
    UnknownWorkplace(WorkplaceId),
    #[error("user {0} already occupies a workplace")]
    AlreadyResident(UserId),
    #[error("user {0} is already waiting for a workplace")]
    AlreadyWaiting(UserId),
    #[error("user {0} does not occupy a workplace")]
    NotResident(UserId),
    #[error("coordination state for user {0} was lost mid-wait")]
    Interrupted(UserId),
}
